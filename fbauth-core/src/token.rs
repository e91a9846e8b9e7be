use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::Config, environment::Environment, identity::Identity, Error};

/// The JOSE header of a compact token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    #[serde(rename = "alg")]
    pub algorithm: String,
    #[serde(rename = "kid", default)]
    pub key_id: String,
    #[serde(rename = "typ", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Claims carried by a Firebase ID token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "aud")]
    pub audience: String,
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub auth_time: Option<i64>,
    #[serde(rename = "iat", with = "numeric_date")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "numeric_date")]
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub firebase: Option<FirebaseData>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub claims: Option<HashMap<String, String>>,
}

/// Provider details Firebase nests under the `firebase` claim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FirebaseData {
    #[serde(default)]
    pub identities: HashMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sign_in_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tenant: Option<String>,
}

impl TokenClaims {
    /// Drops everything the caller has no business seeing.
    pub fn into_identity(self) -> Identity {
        Identity {
            uid: self.subject,
            email: self.email,
            email_verified: self.email_verified,
            claims: self.claims,
        }
    }
}

/// A token split into its parts, with header and payload decoded.
///
/// Nothing here has been verified yet.
#[derive(Debug)]
pub struct ParsedToken<'a> {
    pub header: TokenHeader,
    pub claims: TokenClaims,
    signing_input: &'a str,
    signature: &'a str,
}

impl<'a> ParsedToken<'a> {
    /// The `header.payload` text the signature covers.
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    /// The signature segment, still base64url encoded.
    pub fn signature(&self) -> &'a str {
        self.signature
    }
}

pub fn parse(token: &str) -> Result<ParsedToken<'_>, Error> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        tracing::debug!(segments = segments.len(), "token does not have three segments");
        return Err(Error::InvalidToken);
    }

    let header: TokenHeader = decode_json(segments[0])?;
    let claims: TokenClaims = decode_json(segments[1])?;
    let signing_input = &token[..segments[0].len() + 1 + segments[1].len()];

    Ok(ParsedToken {
        header,
        claims,
        signing_input,
        signature: segments[2],
    })
}

/// Checks token lifetime and, outside the emulator, issuer and audience.
pub fn validate_claims(
    claims: &TokenClaims,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    if claims.expires_at <= now {
        return Err(Error::TokenExpired);
    }

    // Forward-dated tokens are rejected outright.
    if claims.issued_at >= now {
        return Err(Error::InvalidToken);
    }

    match config.environment() {
        Environment::Production => {
            if claims.issuer != config.expected_issuer() {
                return Err(Error::InvalidIssuer);
            }
            if claims.audience != config.project_id() {
                return Err(Error::InvalidAudience);
            }
        }
        Environment::Emulator { .. } => {}
    }

    Ok(())
}

/// Decodes a base64url segment, tolerating trailing padding.
pub(crate) fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::decode_config(segment.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, Error> {
    let bytes = decode_segment(segment).map_err(|e| {
        tracing::debug!(err = format!("{}", e), "token segment is not base64url");
        Error::InvalidToken
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(err = format!("{}", e), "token segment is not valid JSON");
        Error::InvalidToken
    })
}

/// Seconds since the epoch, as an integer or with a fractional part.
mod numeric_date {
    use std::fmt;

    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;

    const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.timestamp_subsec_nanos() {
            0 => serializer.serialize_i64(value.timestamp()),
            nanos => serializer
                .serialize_f64(value.timestamp() as f64 + nanos as f64 / NANOS_PER_SECOND),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NumericDateVisitor)
    }

    struct NumericDateVisitor;

    impl<'de> Visitor<'de> for NumericDateVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a timestamp in seconds since the epoch")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            from_parts(value, 0)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            let seconds = i64::try_from(value)
                .map_err(|_| E::custom(format!("timestamp out of range: {}", value)))?;
            from_parts(seconds, 0)
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            if !value.is_finite() || value.abs() >= i64::MAX as f64 {
                return Err(E::custom(format!("timestamp out of range: {}", value)));
            }
            let seconds = value.floor();
            let nanos = ((value - seconds) * NANOS_PER_SECOND) as u32;
            from_parts(seconds as i64, nanos.min(999_999_999))
        }
    }

    fn from_parts<E: de::Error>(seconds: i64, nanos: u32) -> Result<DateTime<Utc>, E> {
        Utc.timestamp_opt(seconds, nanos)
            .single()
            .ok_or_else(|| E::custom(format!("timestamp out of range: {}", seconds)))
    }
}

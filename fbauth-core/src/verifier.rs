use std::sync::Arc;

use chrono::{DateTime, Utc};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{Id, PKey, Public};
use openssl::sign::Verifier as SignatureVerifier;
use openssl::x509::X509;

use crate::config::Config;
use crate::environment::Environment;
use crate::identity::Identity;
use crate::key_store::KeyStore;
use crate::token::{self, ParsedToken};
use crate::Error;

/// Token the Auth emulator accepts as the project owner.
///
/// This is a local development convenience and is not a security boundary:
/// it is only honoured when the verifier runs against the emulator, and can
/// never match in production.
pub const EMULATOR_OWNER_TOKEN: &str = "owner";

/// Verifies Firebase ID tokens and turns them into an [`Identity`].
///
/// Cheap to share behind an `Arc`; calls run concurrently and only contend
/// on the key cache when it needs refreshing.
pub struct Verifier {
    config: Arc<Config>,
    key_store: KeyStore,
}

impl Verifier {
    pub fn new(config: Config) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Uses `client` to fetch signing keys, so its connection pool can be
    /// shared with the rest of the application.
    pub fn with_client(config: Config, client: reqwest::Client) -> Self {
        let key_store = KeyStore::from_config(&config, client);
        Self {
            config: Arc::new(config),
            key_store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    pub async fn verify(&self, token: &str) -> Result<Identity, Error> {
        self.verify_at(token, Utc::now()).await
    }

    /// Like [`Verifier::verify`], with token lifetime checked against `now`.
    pub async fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, Error> {
        let claims = match self.config.environment() {
            Environment::Emulator { .. } => {
                if token == EMULATOR_OWNER_TOKEN {
                    tracing::debug!("emulator owner token accepted");
                    return Ok(Identity::emulator_owner());
                }
                // The emulator does not sign its tokens.
                token::parse(token)?.claims
            }
            Environment::Production => {
                let parsed = token::parse(token)?;
                self.verify_signature(&parsed).await?;
                parsed.claims
            }
        };

        token::validate_claims(&claims, &self.config, now)?;

        Ok(claims.into_identity())
    }

    async fn verify_signature(&self, token: &ParsedToken<'_>) -> Result<(), Error> {
        let kid = token.header.key_id.as_str();
        if kid.is_empty() {
            tracing::debug!("token header has no key ID");
            return Err(Error::InvalidToken);
        }

        let pem = self.key_store.get_key(kid).await.map_err(|e| {
            tracing::debug!(kid, kind = e.kind(), "failed to resolve signing key");
            Error::VerificationFailed
        })?;

        match signature_matches(token, &pem) {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::debug!(
                    kid,
                    alg = token.header.algorithm.as_str(),
                    "token signature rejected"
                );
                Err(Error::VerificationFailed)
            }
            Err(e) => {
                tracing::debug!(kid, err = format!("{}", e), "failed to check token signature");
                Err(Error::VerificationFailed)
            }
        }
    }
}

fn signature_matches(token: &ParsedToken<'_>, pem: &str) -> Result<bool, ErrorStack> {
    let digest = match digest_for(&token.header.algorithm) {
        Some(digest) => digest,
        None => return Ok(false),
    };

    let public_key = public_key_from_pem(pem.as_bytes())?;
    if public_key.id() != Id::RSA {
        return Ok(false);
    }

    let signature = match token::decode_segment(token.signature()) {
        Ok(signature) => signature,
        Err(_) => return Ok(false),
    };

    let mut verifier = SignatureVerifier::new(digest, &public_key)?;
    verifier.update(token.signing_input().as_bytes())?;
    verifier.verify(&signature)
}

fn digest_for(algorithm: &str) -> Option<MessageDigest> {
    match algorithm {
        "RS256" => Some(MessageDigest::sha256()),
        "RS384" => Some(MessageDigest::sha384()),
        "RS512" => Some(MessageDigest::sha512()),
        _ => None,
    }
}

/// Google publishes X.509 certificates; a bare public key is accepted too.
fn public_key_from_pem(pem: &[u8]) -> Result<PKey<Public>, ErrorStack> {
    match X509::from_pem(pem) {
        Ok(certificate) => certificate.public_key(),
        Err(_) => PKey::public_key_from_pem(pem),
    }
}

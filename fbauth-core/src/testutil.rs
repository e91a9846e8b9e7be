//! Helpers for building tokens in tests: throwaway RSA keys, self-signed
//! certificates like the ones Google publishes, and segment encoding.

use chrono::{DateTime, Duration, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use openssl::x509::{X509Name, X509};
use serde::Serialize;
use serde_json::{json, Value};

pub(crate) struct TestKey {
    pub kid: String,
    pub certificate_pem: String,
    pub public_key_pem: String,
    private_key: PKey<Private>,
}

impl TestKey {
    pub fn generate(kid: &str) -> Self {
        let rsa = Rsa::generate(2048).unwrap();
        let private_key = PKey::from_rsa(rsa).unwrap();

        let mut name = X509Name::builder().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, "securetoken.system.gserviceaccount.com")
            .unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(1).unwrap())
            .unwrap();
        builder.set_pubkey(&private_key).unwrap();
        let mut serial = BigNum::new().unwrap();
        serial.rand(128, MsbOption::MAYBE_ZERO, false).unwrap();
        builder
            .set_serial_number(&serial.to_asn1_integer().unwrap())
            .unwrap();
        builder.sign(&private_key, MessageDigest::sha256()).unwrap();
        let certificate = builder.build();

        Self {
            kid: kid.to_string(),
            certificate_pem: String::from_utf8(certificate.to_pem().unwrap()).unwrap(),
            public_key_pem: String::from_utf8(private_key.public_key_to_pem().unwrap()).unwrap(),
            private_key,
        }
    }

    /// Signs `claims` with RS256 under this key's ID.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_header(
            &json!({"alg": "RS256", "kid": self.kid, "typ": "JWT"}),
            claims,
        )
    }

    pub fn sign_with_header(&self, header: &Value, claims: &Value) -> String {
        let digest = match header["alg"].as_str() {
            Some("RS384") => MessageDigest::sha384(),
            Some("RS512") => MessageDigest::sha512(),
            _ => MessageDigest::sha256(),
        };
        let signing_input = format!("{}.{}", encode_segment(header), encode_segment(claims));
        let mut signer = Signer::new(digest, &self.private_key).unwrap();
        signer.update(signing_input.as_bytes()).unwrap();
        let signature = signer.sign_to_vec().unwrap();
        format!(
            "{}.{}",
            signing_input,
            base64::encode_config(&signature, base64::URL_SAFE_NO_PAD)
        )
    }
}

pub(crate) fn encode_segment<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_vec(value).unwrap();
    base64::encode_config(&json, base64::URL_SAFE_NO_PAD)
}

/// A token as the Auth emulator issues them: `alg: none`, empty signature.
pub(crate) fn unsigned_token(claims: &Value) -> String {
    format!(
        "{}.{}.",
        encode_segment(&json!({"alg": "none", "typ": "JWT"})),
        encode_segment(claims)
    )
}

/// Claims that pass validation for `project_id` at `now`.
pub(crate) fn claims(project_id: &str, now: DateTime<Utc>) -> Value {
    json!({
        "iss": format!("https://securetoken.google.com/{}", project_id),
        "aud": project_id,
        "auth_time": (now - Duration::minutes(1)).timestamp(),
        "user_id": "test-uid",
        "sub": "test-uid",
        "iat": (now - Duration::minutes(1)).timestamp(),
        "exp": (now + Duration::hours(1)).timestamp(),
        "email": "test@example.com",
        "email_verified": true,
        "firebase": {
            "identities": {"email": ["test@example.com"]},
            "sign_in_provider": "password"
        }
    })
}

/// Overwrites top-level fields of `target` with those in `patch`.
pub(crate) fn merge(target: &mut Value, patch: Value) {
    if let (Some(target), Value::Object(patch)) = (target.as_object_mut(), patch) {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
}

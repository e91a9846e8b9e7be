pub mod config;
pub mod environment;
pub mod identity;
pub mod key_store;
pub mod token;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{Config, KeyStoreOptions};
pub use environment::Environment;
pub use identity::Identity;
pub use key_store::{KeyStore, KeyStoreError};
pub use verifier::Verifier;

/// Environment variable naming the Firebase Auth emulator host, e.g. `127.0.0.1:9099`.
pub const EMULATOR_HOST_ENV: &str = "FIREBASE_AUTH_EMULATOR_HOST";
/// Environment variable naming the Firebase project tokens are issued for.
pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
/// Environment variable overriding the URL signing keys are fetched from.
pub const KEYS_URL_ENV: &str = "FIREBASE_KEYS_URL";

/// Reasons a token can be rejected.
///
/// Variants carry no detail on purpose: callers only learn the kind of
/// failure, never key material, network errors or parser output.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("token is malformed")]
    InvalidToken,
    #[error("no token was presented")]
    MissingToken,
    #[error("token has expired")]
    TokenExpired,
    #[error("token issuer does not match project")]
    InvalidIssuer,
    #[error("token audience does not match project")]
    InvalidAudience,
    #[error("token verification failed")]
    VerificationFailed,
}

impl Error {
    /// Short machine-friendly name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidToken => "invalid_token",
            Error::MissingToken => "missing_token",
            Error::TokenExpired => "token_expired",
            Error::InvalidIssuer => "invalid_issuer",
            Error::InvalidAudience => "invalid_audience",
            Error::VerificationFailed => "verification_failed",
        }
    }
}

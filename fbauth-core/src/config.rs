use std::time::Duration;

use crate::environment::Environment;

/// Google's published certificates for Firebase ID token signing keys.
pub const DEFAULT_KEYS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

/// Issuer prefix of Firebase ID tokens; the project ID is appended.
pub const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

pub const DEFAULT_MAX_KEYS: usize = 100;
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(3600);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Settings for a verifier. Built once and shared read-only between calls.
#[derive(Clone, Debug)]
pub struct Config {
    project_id: String,
    keys_url: String,
    environment: Environment,
    key_store: KeyStoreOptions,
}

/// Tuning for the signing key cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyStoreOptions {
    /// Upper bound on cached keys; extra entries in a response are dropped.
    pub max_keys: usize,
    /// How long a fetched key set is served before it is considered stale.
    pub validity: Duration,
    pub request_timeout: Duration,
    pub max_response_bytes: usize,
}

impl Default for KeyStoreOptions {
    fn default() -> Self {
        Self {
            max_keys: DEFAULT_MAX_KEYS,
            validity: DEFAULT_VALIDITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl Config {
    pub fn new(project_id: &str, environment: Environment) -> Self {
        Self {
            project_id: project_id.to_string(),
            keys_url: DEFAULT_KEYS_URL.to_string(),
            environment,
            key_store: KeyStoreOptions::default(),
        }
    }

    /// Configuration for `project_id`, with the environment taken from
    /// `FIREBASE_AUTH_EMULATOR_HOST`.
    pub fn from_env(project_id: &str) -> Self {
        Self::new(project_id, Environment::from_env())
    }

    pub fn with_keys_url(mut self, keys_url: &str) -> Self {
        self.keys_url = keys_url.to_string();
        self
    }

    pub fn with_key_store_options(mut self, options: KeyStoreOptions) -> Self {
        self.key_store = options;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn keys_url(&self) -> &str {
        &self.keys_url
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn key_store_options(&self) -> &KeyStoreOptions {
        &self.key_store
    }

    /// The `iss` value tokens for this project must carry.
    pub fn expected_issuer(&self) -> String {
        format!("{}{}", ISSUER_PREFIX, self.project_id)
    }
}

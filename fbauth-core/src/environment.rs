use std::fmt;

use crate::EMULATOR_HOST_ENV;

const BASE_URL_FORMAT: &str =
    "https://identitytoolkit.googleapis.com/{version}/projects/{project_id}{api}";
const EMULATOR_BASE_URL_FORMAT: &str =
    "http://{host}/identitytoolkit.googleapis.com/{version}/projects/{project_id}{api}";
const TENANT_URL_FORMAT: &str =
    "https://identitytoolkit.googleapis.com/{version}/projects/{project_id}/tenants/{tenant_id}{api}";
const EMULATOR_TENANT_URL_FORMAT: &str =
    "http://{host}/identitytoolkit.googleapis.com/{version}/projects/{project_id}/tenants/{tenant_id}{api}";

/// Where tokens come from: the real Firebase backend, or a local Auth emulator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    Emulator { host: String },
}

impl Environment {
    /// Resolves the environment from `FIREBASE_AUTH_EMULATOR_HOST`.
    ///
    /// Read once when building a [`crate::Config`]; nothing on the
    /// verification path looks at the process environment.
    pub fn from_env() -> Self {
        Self::resolve(std::env::var(EMULATOR_HOST_ENV).ok())
    }

    /// Resolves the environment from an optional emulator host value.
    ///
    /// A missing or blank host (empty or only whitespace) means production.
    pub fn resolve(emulator_host: Option<String>) -> Self {
        match emulator_host {
            Some(host) if !host.trim().is_empty() => Environment::Emulator {
                host: host.trim().to_string(),
            },
            _ => Environment::Production,
        }
    }

    pub fn is_emulator(&self) -> bool {
        matches!(self, Environment::Emulator { .. })
    }

    /// Identity Toolkit base URL for a project-scoped API path.
    pub fn base_url(&self, version: &str, project_id: &str, api: &str) -> String {
        let url = match self {
            Environment::Production => BASE_URL_FORMAT.to_string(),
            Environment::Emulator { host } => EMULATOR_BASE_URL_FORMAT.replace("{host}", host),
        };
        substitute(&url, version, project_id, api)
    }

    /// Identity Toolkit base URL for a tenant-scoped API path.
    pub fn tenant_base_url(
        &self,
        version: &str,
        project_id: &str,
        tenant_id: &str,
        api: &str,
    ) -> String {
        let url = match self {
            Environment::Production => TENANT_URL_FORMAT.to_string(),
            Environment::Emulator { host } => EMULATOR_TENANT_URL_FORMAT.replace("{host}", host),
        };
        substitute(&url.replace("{tenant_id}", tenant_id), version, project_id, api)
    }
}

fn substitute(template: &str, version: &str, project_id: &str, api: &str) -> String {
    template
        .replace("{version}", version)
        .replace("{project_id}", project_id)
        .replace("{api}", api)
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Emulator { host } => write!(f, "emulator ({})", host),
        }
    }
}

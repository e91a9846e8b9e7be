use argh::FromArgs;
use fbauth_core::Environment;

use crate::CliError;

/// Print the Identity Toolkit base URL for the current environment.
#[derive(FromArgs, PartialEq, Eq, Debug)]
#[argh(subcommand, name = "urls")]
pub struct UrlsCommand {
    /// the Firebase project ID (default: FIREBASE_PROJECT_ID environment variable)
    #[argh(option)]
    project_id: Option<String>,
    /// tenant ID, for tenant-scoped URLs
    #[argh(option)]
    tenant_id: Option<String>,
    /// API path appended to the URL, e.g. /accounts:lookup (default: none)
    #[argh(option, default = "String::new()")]
    api: String,
    /// API version (default: v1)
    #[argh(option, default = "String::from(\"v1\")")]
    version: String,
    /// host:port of the Firebase Auth emulator (default: FIREBASE_AUTH_EMULATOR_HOST environment variable)
    #[argh(option)]
    emulator_host: Option<String>,
}

impl UrlsCommand {
    pub async fn run(&self) -> Result<(), CliError> {
        let project_id = crate::project_id(&self.project_id)?;
        let environment = match &self.emulator_host {
            Some(host) => Environment::resolve(Some(host.clone())),
            None => Environment::from_env(),
        };

        let url = match &self.tenant_id {
            Some(tenant_id) => {
                environment.tenant_base_url(&self.version, &project_id, tenant_id, &self.api)
            }
            None => environment.base_url(&self.version, &project_id, &self.api),
        };

        tracing::debug!("resolved URL for {}", environment);
        println!("{}", url);

        Ok(())
    }
}

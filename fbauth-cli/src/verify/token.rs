use std::fs;

use argh::FromArgs;
use camino::Utf8PathBuf;
use fbauth_core::{Config, Environment, Verifier};
use serde_json::json;

use crate::CliError;

/// Verify a Firebase ID token stored in a file.
#[derive(FromArgs, PartialEq, Eq, Debug)]
#[argh(subcommand, name = "token")]
pub struct VerifyToken {
    /// path to file containing the ID token to verify
    #[argh(positional)]
    token_file_name: Utf8PathBuf,
    /// the Firebase project ID the token must be issued for (default: FIREBASE_PROJECT_ID environment variable)
    #[argh(option)]
    project_id: Option<String>,
    /// host:port of the Firebase Auth emulator (default: FIREBASE_AUTH_EMULATOR_HOST environment variable)
    #[argh(option)]
    emulator_host: Option<String>,
    /// URL to fetch signing keys from (default: FIREBASE_KEYS_URL environment variable, or Google's securetoken certificates)
    #[argh(option)]
    keys_url: Option<String>,
}

impl VerifyToken {
    pub async fn run(&self) -> Result<(), CliError> {
        let project_id = crate::project_id(&self.project_id)?;
        let environment = match &self.emulator_host {
            Some(host) => Environment::resolve(Some(host.clone())),
            None => Environment::from_env(),
        };

        tracing::info!(
            "verifying token from {} for project {} ({})",
            self.token_file_name,
            project_id,
            environment
        );

        let config =
            Config::new(&project_id, environment).with_keys_url(&crate::keys_url(&self.keys_url));
        let verifier = Verifier::new(config);

        let token = fs::read_to_string(&self.token_file_name)?;
        let identity = verifier.verify(token.trim()).await?;

        tracing::info!("token verified with identity: {}", json!(identity));
        println!("{}", serde_json::to_string_pretty(&identity)?);

        Ok(())
    }
}

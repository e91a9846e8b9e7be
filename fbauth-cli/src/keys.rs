use argh::FromArgs;
use fbauth_core::{KeyStore, KeyStoreOptions};

use crate::CliError;

/// Fetch the published signing keys and list their key IDs.
#[derive(FromArgs, PartialEq, Eq, Debug)]
#[argh(subcommand, name = "keys")]
pub struct KeysCommand {
    /// URL to fetch signing keys from (default: FIREBASE_KEYS_URL environment variable, or Google's securetoken certificates)
    #[argh(option)]
    keys_url: Option<String>,
}

impl KeysCommand {
    pub async fn run(&self) -> Result<(), CliError> {
        let key_store = KeyStore::new(
            reqwest::Client::new(),
            &crate::keys_url(&self.keys_url),
            KeyStoreOptions::default(),
        );
        tracing::info!("fetching signing keys from {}", key_store.keys_url());

        key_store.refresh().await?;

        let key_ids = key_store.key_ids();
        tracing::info!("{} signing key(s) published", key_ids.len());
        for key_id in key_ids {
            println!("{}", key_id);
        }

        Ok(())
    }
}

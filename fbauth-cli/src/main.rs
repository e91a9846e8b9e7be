use argh::FromArgs;
use dotenv::dotenv;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod keys;
mod urls;
mod verify;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    JSONSerializationError(#[from] serde_json::Error),
    #[error("token rejected: {0}")]
    TokenVerificationError(#[from] fbauth_core::Error),
    #[error("failed to fetch signing keys: {0}")]
    KeyStoreError(#[from] fbauth_core::KeyStoreError),
    #[error("a project ID is required, pass --project-id or set {0}")]
    MissingProjectId(&'static str),
}

/// Command-line interface for verifying Firebase ID tokens.
#[derive(FromArgs, PartialEq, Eq, Debug)]
pub struct Arguments {
    /// use JSON for log messages
    #[argh(switch)]
    json: bool,
    #[argh(subcommand)]
    command: RootCommand,
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
#[argh(subcommand)]
pub enum RootCommand {
    Verify(verify::VerifyCommand),
    Keys(keys::KeysCommand),
    Urls(urls::UrlsCommand),
}

impl RootCommand {
    pub async fn run(&self) -> Result<(), CliError> {
        match self {
            RootCommand::Verify(cmd) => cmd.run().await,
            RootCommand::Keys(cmd) => cmd.run().await,
            RootCommand::Urls(cmd) => cmd.run().await,
        }
    }
}

/// Project ID from the command line, falling back to `FIREBASE_PROJECT_ID`.
pub(crate) fn project_id(arg: &Option<String>) -> Result<String, CliError> {
    match arg {
        Some(project_id) => Ok(project_id.clone()),
        None => std::env::var(fbauth_core::PROJECT_ID_ENV)
            .map_err(|_| CliError::MissingProjectId(fbauth_core::PROJECT_ID_ENV)),
    }
}

/// Key source URL from the command line, falling back to `FIREBASE_KEYS_URL`
/// and then Google's published certificates.
pub(crate) fn keys_url(arg: &Option<String>) -> String {
    match arg {
        Some(keys_url) => keys_url.clone(),
        None => std::env::var(fbauth_core::KEYS_URL_ENV)
            .unwrap_or_else(|_| fbauth_core::config::DEFAULT_KEYS_URL.to_string()),
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    if std::env::var_os("RUST_BACKTRACE").is_none() {
        std::env::set_var("RUST_BACKTRACE", "1")
    }

    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "fbauthcli=debug,fbauth_core=info")
    }

    let args: Arguments = argh::from_env();

    if args.json {
        tracing_subscriber::fmt::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    if let Err(e) = args.command.run().await {
        tracing::error!("command failed: {}", e);
        std::process::exit(1);
    }
}

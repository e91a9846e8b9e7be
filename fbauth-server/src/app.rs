use std::net::SocketAddr;
use std::sync::Arc;

use argh::FromArgs;
use dotenv::dotenv;
use fbauth_core::{Config, Environment, Verifier, KEYS_URL_ENV, PROJECT_ID_ENV};
use miette::{Diagnostic, IntoDiagnostic, Result};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api;

pub struct App {
    args: Args,
}

#[derive(Error, Diagnostic, Debug)]
pub enum AppError {
    #[error("required environment variable {name} is not set, required for {purpose}")]
    #[diagnostic(code(fbauth::error::env))]
    MissingEnvironmentVariable { name: String, purpose: String },
    #[error("failed to create HTTP client: {0}")]
    #[diagnostic(code(fbauth::error::http_client))]
    HttpClientError(#[from] reqwest::Error),
}

impl App {
    pub fn new() -> Self {
        Self::with_args(argh::from_env())
    }

    pub fn with_args(args: Args) -> Self {
        Self { args }
    }

    pub async fn run(&self) -> Result<()> {
        dotenv().ok();

        miette::set_panic_hook();

        if std::env::var_os("RUST_BACKTRACE").is_none() {
            std::env::set_var("RUST_BACKTRACE", "1")
        }

        if std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var("RUST_LOG", "fbauth_server=debug,fbauth_core=debug")
        }

        if self.args.json {
            tracing_subscriber::fmt::fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .try_init()
                .ok();
        } else {
            tracing_subscriber::fmt::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .try_init()
                .ok();
        }

        let verifier = Arc::new(self.verifier()?);

        tracing::debug!(
            project_id = verifier.config().project_id(),
            environment = verifier.config().environment().to_string().as_str(),
            keys_url = verifier.config().keys_url(),
            "verifying Firebase ID tokens"
        );

        let router = api::build(verifier);

        tracing::debug!(
            ip = self.args.listen_address.ip().to_string().as_str(),
            port = self.args.listen_address.port(),
            url = format!(
                "http://{}:{}",
                self.args.listen_address.ip(),
                self.args.listen_address.port()
            ),
            "server started"
        );

        let server = axum::Server::bind(&self.args.listen_address)
            .serve(router.into_make_service_with_connect_info::<SocketAddr>());

        let graceful = server.with_graceful_shutdown(shutdown_signal());
        graceful.await.into_diagnostic()?;

        tracing::debug!("server terminated");

        Ok(())
    }

    fn verifier(&self) -> Result<Verifier, AppError> {
        let project_id = match &self.args.project_id {
            Some(project_id) => project_id.clone(),
            None => env_or_error(PROJECT_ID_ENV, "token issuer and audience checks")?,
        };

        let mut config = match &self.args.emulator_host {
            Some(host) => Config::new(&project_id, Environment::resolve(Some(host.clone()))),
            None => Config::from_env(&project_id),
        };
        if let Some(keys_url) = self.args.keys_url.clone().or_else(default_keys_url) {
            config = config.with_keys_url(&keys_url);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("fbauth-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Verifier::with_client(config, client))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(err = format!("{}", e), "failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("ctrl-c received");
}

#[derive(FromArgs)]
/// Verifies Firebase ID tokens presented to an HTTP API.
pub struct Args {
    /// server address:port to listen on (default: 0.0.0.0:8080, PORT environment variable can override default port 8080)
    #[argh(
        option,
        default = "SocketAddr::from(([0, 0, 0, 0], default_listen_port()))"
    )]
    pub listen_address: SocketAddr,
    /// the Firebase project ID tokens are issued for (default: FIREBASE_PROJECT_ID environment variable)
    #[argh(option)]
    pub project_id: Option<String>,
    /// host:port of the Firebase Auth emulator; tokens are not signature checked when set (default: FIREBASE_AUTH_EMULATOR_HOST environment variable)
    #[argh(option)]
    pub emulator_host: Option<String>,
    /// URL to fetch signing keys from (default: Google's securetoken certificates, or FIREBASE_KEYS_URL environment variable)
    #[argh(option)]
    pub keys_url: Option<String>,
    /// use JSON for log messages
    #[argh(switch)]
    pub json: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([127, 0, 0, 1], default_listen_port())),
            project_id: None,
            emulator_host: None,
            keys_url: None,
            json: false,
        }
    }
}

const DEFAULT_LISTEN_PORT: u16 = 8080;

fn default_listen_port() -> u16 {
    if let Ok(port_str) = std::env::var("PORT") {
        if let Ok(port) = port_str.parse() {
            tracing::debug!("using port from PORT environment variable");
            port
        } else {
            DEFAULT_LISTEN_PORT
        }
    } else {
        DEFAULT_LISTEN_PORT
    }
}

fn default_keys_url() -> Option<String> {
    std::env::var(KEYS_URL_ENV).ok()
}

fn env_or_error(name: &str, purpose: &str) -> Result<String, AppError> {
    if let Ok(value) = std::env::var(name) {
        Ok(value)
    } else {
        Err(AppError::MissingEnvironmentVariable {
            name: name.to_string(),
            purpose: purpose.to_string(),
        })
    }
}

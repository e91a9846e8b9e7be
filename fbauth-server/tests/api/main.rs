use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener},
    time::Duration,
};

use fbauth_core::Identity;
use fbauth_server::app::{App, Args};
use reqwest::{header::AUTHORIZATION, StatusCode};
use thiserror::Error;

mod health;
mod identity;

const PROJECT_ID: &str = "test-project";
const EMULATOR_HOST: &str = "127.0.0.1:9099";

pub struct TestApp {
    url: String,
}

#[derive(Error, Debug)]
pub enum TestError {
    #[error("failed to connect to test server: {0}")]
    ConnectError(#[source] reqwest::Error),
    #[error("failed to check test server health")]
    HealthCheckError,
    #[error("failed to execute request: {0}")]
    RequestError(#[from] reqwest::Error),
}

pub type TestResult<T> = Result<T, TestError>;

impl TestApp {
    /// Starts a server verifying tokens against the Auth emulator, so the
    /// emulator's `owner` token and unsigned tokens are accepted.
    pub async fn start() -> TestResult<Self> {
        let port = next_available_port();
        let listen_address = SocketAddr::from(([127, 0, 0, 1], port));

        let app = App::with_args(Args {
            listen_address,
            project_id: Some(PROJECT_ID.to_string()),
            emulator_host: Some(EMULATOR_HOST.to_string()),
            ..Args::default()
        });

        let _ = tokio::spawn(async move { app.run().await });

        let test_app = Self {
            url: format!("http://127.0.0.1:{}", port),
        };
        test_app.wait_until_healthy().await?;
        Ok(test_app)
    }

    async fn wait_until_healthy(&self) -> TestResult<()> {
        let client = reqwest::Client::new();
        let mut remaining_tries = 50;

        loop {
            match client.get(self.url("/health")).send().await {
                Ok(res) => {
                    return if res.text().await?.trim() == "UP" {
                        Ok(())
                    } else {
                        Err(TestError::HealthCheckError)
                    };
                }
                Err(e) if e.is_connect() && remaining_tries > 0 => {
                    tracing::trace!("test server not up yet");
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    remaining_tries -= 1;
                }
                Err(e) => return Err(TestError::ConnectError(e)),
            }
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResult<reqwest::Response> {
        let mut request = reqwest::Client::new().get(self.url(path));
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        Ok(request.send().await?)
    }

    pub async fn identity(&self, token: Option<&str>) -> TestResult<(StatusCode, Option<Identity>)> {
        let response = self.get("/api/v1/identity", token).await?;
        let status = response.status();
        if status.is_success() {
            Ok((status, Some(response.json().await?)))
        } else {
            Ok((status, None))
        }
    }
}

fn next_available_port() -> u16 {
    for _ in 0..10 {
        if let Some(port) = bind_os_available_port() {
            return port;
        }
    }

    panic!("no port available")
}

fn bind_os_available_port() -> Option<u16> {
    TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .ok()
}

//! Typed Rust client for the Hetzner Robot webservice.
//!
//! Covers the subset needed for provisioning a leased bare-metal server:
//! key registration, Linux installation, hardware reset.
//!
//! API documentation: <https://robot.hetzner.com/doc/webservice/en.html>

mod types;

pub use types::*;

use tracing::debug;

const BASE_URL: &str = "https://robot-ws.your-server.de";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("robot api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("robot api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the Robot webservice.
///
/// Every request is authenticated with HTTP Basic auth using the Robot
/// account credentials. The webservice accepts form-encoded bodies only.
#[derive(Clone)]
pub struct RobotClient {
    login: String,
    password: String,
    base_url: String,
    http: reqwest::Client,
}

impl RobotClient {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_base_url(login, password, BASE_URL)
    }

    /// Client pointed at a non-production endpoint. Used by tests.
    pub fn with_base_url(
        login: impl Into<String>,
        password: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_form<B: serde::Serialize>(
        &self,
        path: &str,
        endpoint: &'static str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        debug!(url = %url, "POST request (form)");

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.login, Some(&self.password))
            .form(body)
            .send()
            .await?;

        Self::check(resp, endpoint).await
    }

    /// The webservice reports success as exactly 200 or 201; anything else
    /// is an error carrying the response body.
    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !matches!(status.as_u16(), 200 | 201) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                endpoint,
                status,
                body,
            });
        }
        Ok(resp)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Register a public key with the Robot account.
    ///
    /// Returns the stored key record; its `fingerprint` is what the boot
    /// endpoint takes as `authorized_key`.
    pub async fn upload_key(&self, name: &str, data: &str) -> Result<SshKey> {
        let req = UploadKey {
            name: name.into(),
            data: data.into(),
        };

        let envelope: KeyEnvelope = self
            .post_form("/key", "upload key", &req)
            .await?
            .json()
            .await?;

        Ok(envelope.key)
    }

    /// Stage a Linux installation on the server at `ip`. The install runs
    /// on the next boot; this call only accepts the request.
    pub async fn install_linux(&self, ip: &str, req: &InstallLinux) -> Result<()> {
        self.post_form(&format!("/boot/{ip}/linux"), "install linux", req)
            .await?;
        Ok(())
    }

    /// Issue a hardware reset (power cycle) for the server at `ip`.
    pub async fn reset(&self, ip: &str) -> Result<()> {
        self.post_form(&format!("/reset/{ip}"), "reset", &Reset::hardware())
            .await?;
        Ok(())
    }
}

//! HTTP client for the LTOS REST status endpoint.

use tracing::{debug, trace};

use crate::config::TargetConfig;
use crate::document::StatusDocument;
use crate::error::FetchError;

/// Path of the status endpoint relative to the API base URL.
pub const STATUS_PATH: &str = "/api/status";

/// Client for one LTOS device.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct LtosClient {
    http: reqwest::Client,
    target: String,
    status_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl LtosClient {
    /// Build a client from target settings.
    pub fn new(config: &TargetConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(FetchError::Client)?;

        let base_url = config.url.trim_end_matches('/');
        let (username, password) = match config.credentials() {
            Some((user, pass)) => (Some(user.to_string()), pass.map(str::to_string)),
            None => (None, None),
        };

        Ok(Self {
            http,
            status_url: format!("{}{}", base_url, STATUS_PATH),
            target: config.url.clone(),
            username,
            password,
        })
    }

    /// Base URL of the device API, verbatim as configured.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Fetch and decode the status document.
    ///
    /// Issues exactly one request. Non-2xx responses, transport failures,
    /// malformed JSON and non-object documents are errors; a sparse but valid
    /// object is returned as-is.
    pub async fn fetch_status(&self) -> Result<StatusDocument, FetchError> {
        let mut request = self.http.get(&self.status_url);
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_ref());
        }

        trace!(url = %self.status_url, "Fetching status document");

        let response = request.send().await.map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.status_url.clone(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport(e))?;

        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
                url: self.status_url.clone(),
                source,
            })?;

        let document = StatusDocument::new(value).ok_or_else(|| FetchError::NotAnObject {
            url: self.status_url.clone(),
        })?;

        debug!(url = %self.status_url, bytes = body.len(), "Fetched status document");
        Ok(document)
    }

    /// Check whether the device answers with a usable status document.
    ///
    /// Returns `Ok(false)` when the document decodes but carries no
    /// `system-information` object.
    pub async fn check_health(&self) -> Result<bool, FetchError> {
        let document = self.fetch_status().await?;
        let healthy = document
            .as_value()
            .get("system-information")
            .is_some_and(|v| v.is_object());
        Ok(healthy)
    }

    fn transport(&self, source: reqwest::Error) -> FetchError {
        FetchError::Transport {
            url: self.status_url.clone(),
            source,
        }
    }
}

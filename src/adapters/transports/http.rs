//! Delivers dispatch requests to a remote queue over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::domain::ports::{DispatchRequest, Transport, TransportError};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// POSTs the JSON request to `{endpoint}{path}`. Any non-2xx answer is a
/// failed delivery.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    url: String,
    name: String,
}

impl HttpTransport {
    /// POST to `{endpoint}{path}` with the default 30 s timeout.
    pub fn new(endpoint: &str, path: &str) -> Self {
        Self::with_timeout(endpoint, path, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, path: &str, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let url = format!("{}{}", endpoint.trim_end_matches('/'), path);
        Self {
            http,
            name: format!("http:{}", endpoint.trim_end_matches('/')),
            url,
        }
    }

    /// Full dispatch URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, request: &DispatchRequest) -> Result<(), TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable {
                transport: self.name.clone(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                transport: self.name.clone(),
                reason: format!("{status}: {body}"),
            });
        }

        debug!(url = %self.url, agent = %request.agent_name, "dispatched over http");
        Ok(())
    }
}

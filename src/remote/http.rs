//! HTTP implementation of RemoteClient.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Url};
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::remote::{RemoteClient, RemoteError};

/// Fallback request timeout when none is configured.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HttpRemoteClient issues a GET against the configured orders endpoint.
pub struct HttpRemoteClient {
    url: Url,
    http_client: HttpClient,
}

impl HttpRemoteClient {
    /// Creates a client for the given endpoint.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, RemoteError> {
        let timeout = if timeout.is_zero() {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            timeout
        };

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self { url, http_client })
    }

    /// Creates a client from the remote section of the config.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let url = config
            .endpoint()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Self::new(url, config.timeout)
    }

    /// Returns the endpoint this client requests.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn fetch(&self) -> Result<Vec<u8>, RemoteError> {
        debug!(url = %self.url, "sending request");

        let response = self.http_client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "unexpected status code");
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;

        debug!(url = %self.url, bytes = body.len(), "response received");

        Ok(body.to_vec())
    }
}

//! Remote orders source.

mod http;

pub use http::HttpRemoteClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::codec::{self, DecodeError};
use crate::domain::Order;

/// Remote source errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request could not be sent or no HTTP response was read back.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered outside the 2xx range.
    #[error("unexpected status code {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// RemoteClient fetches the raw orders payload from the remote endpoint.
///
/// Every call is a single attempt; retries are left to the caller.
/// Dropping the returned future cancels the request.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Issues one request and returns the body of a successful response.
    async fn fetch(&self) -> Result<Vec<u8>, RemoteError>;

    /// Fetches and decodes the orders in a single call.
    async fn fetch_orders(&self) -> Result<Vec<Order>, RemoteError> {
        let payload = self.fetch().await?;
        Ok(codec::decode(&payload)?)
    }
}

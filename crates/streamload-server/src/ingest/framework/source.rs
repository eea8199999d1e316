//! Byte sources for remote datasets
//!
//! A source performs a single GET and hands back the raw `Content-Length`
//! header together with the body as a stream of byte chunks. Chunk boundaries
//! are arbitrary and may split a line or a multi-byte character.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_LENGTH;
use std::time::Duration;
use thiserror::Error;

/// Body chunks in arrival order
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Transport failure, before or during streaming
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Response to a single GET
pub struct SourceResponse {
    /// Raw `Content-Length` header value, if the server sent one
    pub content_length: Option<String>,
    pub body: ByteStream,
}

impl std::fmt::Debug for SourceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResponse")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<SourceResponse, FetchError>;
}

/// [`ByteSource`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Build a client that gives up on connecting after `connect_timeout`.
    ///
    /// No overall request timeout is set; large downloads stream for as long
    /// as they take.
    pub fn new(connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("streamload/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn get(&self, url: &str) -> Result<SourceResponse, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        tracing::debug!(url, content_length = ?content_length, "Opened byte stream");

        let body = response.bytes_stream().map_err(FetchError::from).boxed();

        Ok(SourceResponse {
            content_length,
            body,
        })
    }
}

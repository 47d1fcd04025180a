use std::io;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("camera responded with status {0}")]
    UpstreamStatus(StatusCode),
    #[error("camera unreachable: {0}")]
    Unreachable(String),
}

/// Live response from the camera. Holds the outbound connection open until
/// `body.close()` is called or the value is dropped.
pub struct UpstreamStream {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Box<dyn UpstreamBody>,
}

#[async_trait]
pub trait UpstreamBody: Send {
    /// Next chunk of the stream, `None` once the camera closed the connection.
    async fn chunk(&mut self) -> io::Result<Option<Bytes>>;
    /// Releases the connection. Calling it more than once is a no-op.
    async fn close(&mut self) -> io::Result<()>;
}

#[async_trait]
pub trait UpstreamSource: Send + Sync {
    fn endpoint(&self) -> &str;
    async fn connect(&self) -> Result<UpstreamStream, ConnectError>;
}

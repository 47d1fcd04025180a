use std::{io, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use tokio::time::timeout;
use tracing::debug;

use super::traits::{ConnectError, UpstreamBody, UpstreamSource, UpstreamStream};

#[derive(Debug, Clone)]
pub struct HttpUpstream {
    url: String,
    client: Client,
    connect_timeout: Duration,
}

impl HttpUpstream {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .no_proxy()
            .build()
            .context("failed to build camera http client")?;

        Ok(Self {
            url: url.into(),
            client,
            connect_timeout,
        })
    }
}

#[async_trait]
impl UpstreamSource for HttpUpstream {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<UpstreamStream, ConnectError> {
        // connect_timeout only covers the TCP handshake; the response head
        // must arrive within the same bound.
        let response = match timeout(self.connect_timeout, self.client.get(&self.url).send()).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return Err(ConnectError::Unreachable(format!(
                    "{:#}",
                    anyhow::Error::from(err)
                )));
            }
            Err(_) => {
                return Err(ConnectError::Unreachable(format!(
                    "no response within {}s",
                    self.connect_timeout.as_secs_f32()
                )));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectError::UpstreamStatus(status));
        }

        debug!(url = %self.url, %status, "camera response head received");
        let headers = response.headers().clone();
        Ok(UpstreamStream {
            status,
            headers,
            body: Box::new(HttpBody {
                response: Some(response),
            }),
        })
    }
}

struct HttpBody {
    response: Option<Response>,
}

#[async_trait]
impl UpstreamBody for HttpBody {
    async fn chunk(&mut self) -> io::Result<Option<Bytes>> {
        let Some(response) = self.response.as_mut() else {
            return Ok(None);
        };
        response.chunk().await.map_err(io::Error::other)
    }

    async fn close(&mut self) -> io::Result<()> {
        // Dropping the response tears down the pooled connection mid-body.
        self.response.take();
        Ok(())
    }
}

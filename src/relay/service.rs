use std::{io, sync::Arc, time::Duration};

use axum::http::{
    HeaderMap, HeaderName, StatusCode,
    header::{CONNECTION, CONTENT_LENGTH, TE, TRAILER, TRANSFER_ENCODING, UPGRADE},
};
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::{
    core::state::RelayStatus,
    upstream::traits::{ConnectError, UpstreamSource},
};

use super::{
    pump::{PumpOutcome, pump},
    slot::RelaySlot,
};

const RELAY_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("stream already in use")]
    SlotBusy,
    #[error("camera unreachable: {0}")]
    UpstreamUnreachable(String),
    #[error("camera responded with status {0}")]
    UpstreamBadStatus(StatusCode),
}

impl From<ConnectError> for RelayError {
    fn from(value: ConnectError) -> Self {
        match value {
            ConnectError::UpstreamStatus(status) => Self::UpstreamBadStatus(status),
            ConnectError::Unreachable(reason) => Self::UpstreamUnreachable(reason),
        }
    }
}

/// An admitted session: headers to send downstream and the body channel fed
/// by the relay task.
pub struct RelayResponse {
    pub session: u64,
    pub headers: HeaderMap,
    pub body: mpsc::Receiver<io::Result<Bytes>>,
}

pub struct RelayService {
    source: Arc<dyn UpstreamSource>,
    slot: Arc<RelaySlot>,
    idle_timeout: Option<Duration>,
    shutdown: watch::Receiver<bool>,
}

impl RelayService {
    pub fn new(
        source: Arc<dyn UpstreamSource>,
        idle_timeout: Option<Duration>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            slot: RelaySlot::new(),
            idle_timeout,
            shutdown,
        }
    }

    pub fn status(&self) -> RelayStatus {
        self.slot.status()
    }

    pub fn is_idle(&self) -> bool {
        self.slot.is_idle()
    }

    /// Admits one viewer and starts relaying, or fails without touching the
    /// camera when another viewer holds the slot.
    pub async fn open(&self) -> Result<RelayResponse, RelayError> {
        let Some(mut lease) = self.slot.try_acquire() else {
            info!("relay rejected: stream already in use");
            return Err(RelayError::SlotBusy);
        };
        let session = lease.session();
        info!(session, camera = self.source.endpoint(), "relay admitted, connecting to camera");

        // If this future is dropped mid-connect the lease drop frees the slot.
        let upstream = match self.source.connect().await {
            Ok(upstream) => upstream,
            Err(err) => {
                lease.begin_closing();
                lease.release();
                error!(session, "relay failed to open camera stream: {err}");
                return Err(err.into());
            }
        };

        let headers = forwardable_headers(&upstream.headers);
        let mut body = upstream.body;
        let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        let mut shutdown = self.shutdown.clone();
        let idle_timeout = self.idle_timeout;

        tokio::spawn(async move {
            info!(session, "relay streaming to client");
            let report = pump(body.as_mut(), &tx, &mut shutdown, idle_timeout).await;
            lease.begin_closing();
            drop(tx);

            if let Err(err) = body.close().await {
                warn!(session, "failed to close camera connection: {err}");
            }

            let (bytes, chunks) = (report.bytes, report.chunks);
            match report.outcome {
                PumpOutcome::SourceEnded => {
                    info!(session, bytes, chunks, "relay ended: camera closed the stream")
                }
                PumpOutcome::SinkClosed => {
                    info!(session, bytes, chunks, "relay ended: client disconnected")
                }
                PumpOutcome::Cancelled => {
                    info!(session, bytes, chunks, "relay ended: server shutting down")
                }
                PumpOutcome::SourceFailed(err) => {
                    warn!(session, bytes, chunks, "relay interrupted: camera read failed: {err}")
                }
                PumpOutcome::SourceStalled(after) => warn!(
                    session,
                    bytes,
                    chunks,
                    "relay interrupted: camera silent for {}s",
                    after.as_secs_f32()
                ),
            }

            lease.release();
        });

        Ok(RelayResponse {
            session,
            headers,
            body: rx,
        })
    }
}

/// Every upstream header except the ones describing the upstream connection
/// itself; the local HTTP layer frames the relayed body on its own.
fn forwardable_headers(upstream: &HeaderMap) -> HeaderMap {
    let keep_alive = HeaderName::from_static("keep-alive");
    let proxy_connection = HeaderName::from_static("proxy-connection");

    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        let hop_by_hop = [
            &CONNECTION,
            &CONTENT_LENGTH,
            &TE,
            &TRAILER,
            &TRANSFER_ENCODING,
            &UPGRADE,
            &keep_alive,
            &proxy_connection,
        ]
        .contains(&name);
        if !hop_by_hop {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

use std::{io, time::Duration};

use bytes::Bytes;
use tokio::{
    sync::{mpsc, watch},
    time::timeout,
};

use crate::upstream::traits::UpstreamBody;

pub type BodySender = mpsc::Sender<io::Result<Bytes>>;

#[derive(Debug)]
pub enum PumpOutcome {
    SourceEnded,
    SourceFailed(io::Error),
    SourceStalled(Duration),
    SinkClosed,
    Cancelled,
}

#[derive(Debug)]
pub struct PumpReport {
    pub outcome: PumpOutcome,
    pub bytes: u64,
    pub chunks: u64,
}

enum Read {
    Chunk(Bytes),
    Ended,
    Failed(io::Error),
    Stalled(Duration),
}

/// Copies camera bytes into the response channel until one side finishes.
///
/// The sink is watched for closure while waiting on the camera, so a client
/// that disconnects is noticed even when no chunk is in flight. Source errors
/// and stalls are pushed into the sink as well, behind any buffered chunks;
/// the HTTP layer then aborts the response instead of ending it cleanly.
pub async fn pump(
    body: &mut dyn UpstreamBody,
    sink: &BodySender,
    shutdown: &mut watch::Receiver<bool>,
    idle_timeout: Option<Duration>,
) -> PumpReport {
    let mut bytes = 0_u64;
    let mut chunks = 0_u64;

    let outcome = loop {
        let read = tokio::select! {
            _ = sink.closed() => break PumpOutcome::SinkClosed,
            _ = shutdown_requested(shutdown) => break PumpOutcome::Cancelled,
            read = read_chunk(body, idle_timeout) => read,
        };

        let chunk = match read {
            Read::Chunk(chunk) => chunk,
            Read::Ended => break PumpOutcome::SourceEnded,
            Read::Failed(err) => {
                let forwarded = io::Error::new(err.kind(), err.to_string());
                deliver_failure(sink, shutdown, forwarded).await;
                break PumpOutcome::SourceFailed(err);
            }
            Read::Stalled(after) => {
                let stalled =
                    io::Error::new(io::ErrorKind::TimedOut, "camera stopped sending data");
                deliver_failure(sink, shutdown, stalled).await;
                break PumpOutcome::SourceStalled(after);
            }
        };

        let len = chunk.len() as u64;
        tokio::select! {
            sent = sink.send(Ok(chunk)) => {
                if sent.is_err() {
                    break PumpOutcome::SinkClosed;
                }
            }
            _ = shutdown_requested(shutdown) => break PumpOutcome::Cancelled,
        }
        bytes += len;
        chunks += 1;
    };

    PumpReport {
        outcome,
        bytes,
        chunks,
    }
}

async fn read_chunk(body: &mut dyn UpstreamBody, idle_timeout: Option<Duration>) -> Read {
    let result = match idle_timeout {
        Some(limit) => match timeout(limit, body.chunk()).await {
            Ok(result) => result,
            Err(_) => return Read::Stalled(limit),
        },
        None => body.chunk().await,
    };

    match result {
        Ok(Some(chunk)) => Read::Chunk(chunk),
        Ok(None) => Read::Ended,
        Err(err) => Read::Failed(err),
    }
}

/// Waits for room in the body channel so the error is not lost behind
/// buffered chunks. Gives up only when the client is gone or on shutdown.
async fn deliver_failure(
    sink: &BodySender,
    shutdown: &mut watch::Receiver<bool>,
    err: io::Error,
) {
    tokio::select! {
        _ = sink.send(Err(err)) => {}
        _ = sink.closed() => {}
        _ = shutdown_requested(shutdown) => {}
    }
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        // Sender gone without signalling: nothing will ever cancel us.
        std::future::pending::<()>().await;
    }
}

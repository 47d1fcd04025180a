//! Scripted camera used by relay and handler tests.

use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};
use bytes::Bytes;
use tokio::sync::{Notify, mpsc};

use super::traits::{ConnectError, UpstreamBody, UpstreamSource, UpstreamStream};

pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=X";

pub enum MockBehaviour {
    Stream(HeaderMap),
    Status(StatusCode),
    Unreachable,
}

pub struct MockSource {
    behaviour: MockBehaviour,
    connects: AtomicUsize,
    gate: Option<Arc<Notify>>,
    fail_close: bool,
    feeds: Mutex<Vec<MockFeed>>,
}

impl MockSource {
    pub fn streaming() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(MJPEG_CONTENT_TYPE));
        Self::with_behaviour(MockBehaviour::Stream(headers))
    }

    pub fn with_behaviour(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            connects: AtomicUsize::new(0),
            gate: None,
            fail_close: false,
            feeds: Mutex::new(Vec::new()),
        }
    }

    /// Holds every `connect` call until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Bodies count the close call but report it as failed.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Control handle for the most recently opened body.
    pub fn last_feed(&self) -> MockFeed {
        self.feeds
            .lock()
            .expect("feeds lock")
            .last()
            .cloned()
            .expect("no body has been opened")
    }
}

#[async_trait]
impl UpstreamSource for MockSource {
    fn endpoint(&self) -> &str {
        "mock://camera"
    }

    async fn connect(&self) -> Result<UpstreamStream, ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match &self.behaviour {
            MockBehaviour::Status(status) => Err(ConnectError::UpstreamStatus(*status)),
            MockBehaviour::Unreachable => {
                Err(ConnectError::Unreachable("connection refused".to_string()))
            }
            MockBehaviour::Stream(headers) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let closed = Arc::new(AtomicUsize::new(0));
                self.feeds.lock().expect("feeds lock").push(MockFeed {
                    tx: Arc::new(Mutex::new(Some(tx))),
                    closed: closed.clone(),
                });
                Ok(UpstreamStream {
                    status: StatusCode::OK,
                    headers: headers.clone(),
                    body: Box::new(MockBody {
                        rx,
                        closed,
                        fail_close: self.fail_close,
                    }),
                })
            }
        }
    }
}

struct MockBody {
    rx: mpsc::UnboundedReceiver<io::Result<Bytes>>,
    closed: Arc<AtomicUsize>,
    fail_close: bool,
}

#[async_trait]
impl UpstreamBody for MockBody {
    async fn chunk(&mut self) -> io::Result<Option<Bytes>> {
        self.rx.recv().await.transpose()
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.rx.close();
        if self.fail_close {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "socket already gone"));
        }
        Ok(())
    }
}

type FeedSender = mpsc::UnboundedSender<io::Result<Bytes>>;

#[derive(Clone)]
pub struct MockFeed {
    tx: Arc<Mutex<Option<FeedSender>>>,
    closed: Arc<AtomicUsize>,
}

impl MockFeed {
    pub fn send(&self, chunk: &'static [u8]) {
        if let Some(tx) = self.tx.lock().expect("feed lock").as_ref() {
            let _ = tx.send(Ok(Bytes::from_static(chunk)));
        }
    }

    pub fn fail(&self, message: &str) {
        if let Some(tx) = self.tx.lock().expect("feed lock").as_ref() {
            let _ = tx.send(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                message.to_string(),
            )));
        }
    }

    /// Camera closes the connection cleanly.
    pub fn finish(&self) {
        self.tx.lock().expect("feed lock").take();
    }

    pub fn close_calls(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s: {what}");
}

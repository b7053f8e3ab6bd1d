//! In-process bus
//!
//! Request/reply over registered per-subject responders, with hooks to drive
//! the connection through disconnects and exhausted reconnects. Used by the
//! test suites and anywhere the relay is embedded without a NATS server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{BusClient, BusError, BusEvent, BusObserver, ConnectionMonitor, ConnectionState};

type Handler = Arc<dyn Fn(Bytes) -> Result<Bytes, String> + Send + Sync>;

#[derive(Clone)]
struct Responder {
    handler: Handler,
    delay: Duration,
}

/// In-memory [`BusClient`].
pub struct MemoryBus {
    monitor: ConnectionMonitor,
    responders: RwLock<HashMap<String, Responder>>,
    published: Mutex<Vec<(String, Bytes)>>,
    requests: Mutex<Vec<(String, Bytes)>>,
    closed: AtomicBool,
}

impl MemoryBus {
    /// Create a bus that is already connected.
    pub fn new(observers: Vec<Arc<dyn BusObserver>>) -> Self {
        let monitor = ConnectionMonitor::new(observers);
        monitor.notify(BusEvent::Connecting);
        monitor.notify(BusEvent::Connected);

        Self {
            monitor,
            responders: RwLock::new(HashMap::new()),
            published: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Answer requests on `subject` with `handler` after `delay`.
    ///
    /// An `Err` from the handler is surfaced to the caller as a transport
    /// error.
    pub fn respond_with<F>(&self, subject: impl Into<String>, delay: Duration, handler: F)
    where
        F: Fn(Bytes) -> Result<Bytes, String> + Send + Sync + 'static,
    {
        if let Ok(mut responders) = self.responders.write() {
            responders.insert(
                subject.into(),
                Responder {
                    handler: Arc::new(handler),
                    delay,
                },
            );
        }
    }

    /// Messages published so far, in order.
    pub fn published(&self) -> Vec<(String, Bytes)> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Request payloads received so far, in order.
    pub fn requests(&self) -> Vec<(String, Bytes)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Drop the transport; requests wait for a reconnect.
    pub fn simulate_disconnect(&self, reason: &str) {
        self.monitor.notify(BusEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    pub fn simulate_reconnect(&self) {
        self.monitor.notify(BusEvent::Reconnected);
    }

    /// Give up reconnecting; pending and later calls fail with `ConnectionLost`.
    pub fn simulate_connection_lost(&self) {
        self.monitor.notify(BusEvent::ConnectionLost);
    }

    fn responder(&self, subject: &str) -> Option<Responder> {
        self.responders
            .read()
            .ok()
            .and_then(|responders| responders.get(subject).cloned())
    }
}

#[async_trait]
impl BusClient for MemoryBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        self.monitor.ensure_usable()?;
        if let Ok(mut published) = self.published.lock() {
            published.push((subject.to_owned(), payload));
        }
        Ok(())
    }

    async fn request(&self, subject: &str, payload: Bytes, timeout: Duration) -> Result<Bytes, BusError> {
        self.monitor
            .bounded(subject, timeout, async {
                let mut state = self.monitor.subscribe();
                let ready = state
                    .wait_for(|s| *s != ConnectionState::Reconnecting)
                    .await
                    .map(|s| *s);
                if !matches!(ready, Ok(ConnectionState::Connected)) {
                    return Err(self.monitor.unusable_error());
                }

                if let Ok(mut requests) = self.requests.lock() {
                    requests.push((subject.to_owned(), payload.clone()));
                }

                let responder = self
                    .responder(subject)
                    .ok_or_else(|| BusError::Transport(format!("no responders on '{subject}'")))?;

                if !responder.delay.is_zero() {
                    tokio::time::sleep(responder.delay).await;
                }

                (responder.handler)(payload).map_err(BusError::Transport)
            })
            .await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.monitor.notify(BusEvent::Closed);
    }

    fn state(&self) -> ConnectionState {
        self.monitor.state()
    }
}

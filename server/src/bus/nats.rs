//! NATS bus connection
//!
//! Wraps an `async_nats::Client` with a fixed-interval, bounded reconnect
//! policy and maps the client's connection events onto [`BusEvent`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_nats::client::{Request, RequestErrorKind};
use async_nats::{ClientError, ConnectOptions, Event};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};

use super::{BusClient, BusError, BusEvent, BusObserver, ConnectionMonitor, ConnectionState};

/// Connection settings for [`NatsBus`].
#[derive(Clone)]
pub struct NatsSettings {
    /// Server URL, e.g. `nats://localhost:4222`
    pub url: String,
    /// Client name reported to the server
    pub name: String,
    /// Optional user/password pair
    pub credentials: Option<(String, String)>,
    /// Fixed wait between reconnect attempts
    pub reconnect_wait: Duration,
    /// Reconnect attempts before the connection is given up
    pub max_reconnects: usize,
    /// Timeout for the initial connect
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for NatsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsSettings")
            .field("url", &self.url)
            .field("name", &self.name)
            .field("credentials", &self.credentials.as_ref().map(|(user, _)| user))
            .field("reconnect_wait", &self.reconnect_wait)
            .field("max_reconnects", &self.max_reconnects)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for NatsSettings {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            name: "koksmat-emit".to_string(),
            credentials: None,
            reconnect_wait: Duration::from_secs(2),
            max_reconnects: 10,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Bus connection backed by NATS core request/reply.
pub struct NatsBus {
    client: RwLock<Option<async_nats::Client>>,
    monitor: Arc<ConnectionMonitor>,
    closed: AtomicBool,
}

impl NatsBus {
    /// Connect to the server. Fails if the first connect does not succeed.
    pub async fn connect(
        settings: &NatsSettings,
        observers: Vec<Arc<dyn BusObserver>>,
    ) -> Result<Self, BusError> {
        let monitor = Arc::new(ConnectionMonitor::new(observers));
        monitor.notify(BusEvent::Connecting);

        let client = build_connect_options(settings, Arc::clone(&monitor))
            .connect(&settings.url)
            .await
            .map_err(|e| BusError::ConnectionFailed {
                url: settings.url.clone(),
                reason: e.to_string(),
            })?;

        monitor.notify(BusEvent::Connected);
        info!(url = %settings.url, "Connected to NATS");

        Ok(Self {
            client: RwLock::new(Some(client)),
            monitor,
            closed: AtomicBool::new(false),
        })
    }

    fn client(&self) -> Result<async_nats::Client, BusError> {
        self.client
            .read()
            .map_err(|_| BusError::Transport("client lock poisoned".to_string()))?
            .clone()
            .ok_or(BusError::NotConnected)
    }
}

#[async_trait]
impl BusClient for NatsBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        self.monitor.ensure_usable()?;
        let client = self.client()?;

        client
            .publish(subject.to_owned(), payload)
            .await
            .map_err(|e| BusError::Transport(e.to_string()))
    }

    async fn request(&self, subject: &str, payload: Bytes, timeout: Duration) -> Result<Bytes, BusError> {
        let client = self.client()?;
        let request = Request::new()
            .payload(payload)
            .timeout(Some(timeout));

        self.monitor
            .bounded(subject, timeout, async {
                let message = client
                    .send_request(subject.to_owned(), request)
                    .await
                    .map_err(|e| match e.kind() {
                        RequestErrorKind::TimedOut => BusError::Timeout {
                            subject: subject.to_owned(),
                            timeout,
                        },
                        RequestErrorKind::NoResponders => {
                            BusError::Transport(format!("no responders on '{subject}'"))
                        }
                        _ => BusError::Transport(e.to_string()),
                    })?;
                Ok(message.payload)
            })
            .await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let client = self.client.write().ok().and_then(|mut guard| guard.take());
        if let Some(client) = client {
            if let Err(e) = client.flush().await {
                warn!(error = %e, "Failed to flush NATS connection before close");
            }
        }

        self.monitor.notify(BusEvent::Closed);
    }

    fn state(&self) -> ConnectionState {
        self.monitor.state()
    }
}

/// Build NATS connect options from settings.
fn build_connect_options(settings: &NatsSettings, monitor: Arc<ConnectionMonitor>) -> ConnectOptions {
    let reconnect_wait = settings.reconnect_wait;

    let mut opts = ConnectOptions::new()
        .name(&settings.name)
        .connection_timeout(settings.connect_timeout)
        .max_reconnects(settings.max_reconnects)
        .reconnect_delay_callback(move |_attempts| reconnect_wait)
        .event_callback(move |event| {
            let monitor = Arc::clone(&monitor);
            async move {
                let event = map_event(event, monitor.state());
                debug!(event = event.label(), "NATS connection event");
                monitor.notify(event);
            }
        });

    if let Some((user, password)) = &settings.credentials {
        opts = opts.user_and_password(user.clone(), password.clone());
    }

    opts
}

/// Translate a client event into a lifecycle event.
fn map_event(event: Event, current: ConnectionState) -> BusEvent {
    match event {
        Event::Connected if current == ConnectionState::Reconnecting => BusEvent::Reconnected,
        Event::Connected => BusEvent::Connected,
        Event::Disconnected => BusEvent::Disconnected {
            reason: "transport disconnected".to_string(),
        },
        Event::ClientError(ClientError::MaxReconnects) => BusEvent::ConnectionLost,
        other => BusEvent::Error(other.to_string()),
    }
}

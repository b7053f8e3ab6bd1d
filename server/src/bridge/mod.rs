//! Request/Reply Bridge
//!
//! The only place application code talks to the bus. Wraps typed calls into
//! the `{args, body, channel}` envelope, sends them as correlated requests and
//! hands back the raw reply.

mod error;
mod forward;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use emit_common::BridgeRequest;
use tracing::{debug, error};

use crate::bus::BusClient;
use crate::util::{truncate_for_log, LOG_BODY_LIMIT};

pub use error::BridgeError;
pub use forward::EventForwarder;

/// Request/reply client over a shared bus connection.
///
/// Cheap to clone; concurrent callers each get their own correlation and
/// deadline from the bus.
#[derive(Clone)]
pub struct Bridge {
    bus: Arc<dyn BusClient>,
    channel: String,
    log_bodies: bool,
}

impl Bridge {
    pub fn new(bus: Arc<dyn BusClient>, channel: impl Into<String>, log_bodies: bool) -> Self {
        Self {
            bus,
            channel: channel.into(),
            log_bodies,
        }
    }

    /// Routing channel stamped on every envelope.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Send `args`/`body` to `subject` and wait at most `timeout` for the reply.
    ///
    /// The reply body is returned unmodified.
    #[tracing::instrument(skip(self, args, body), fields(channel = %self.channel))]
    pub async fn request(
        &self,
        subject: &str,
        args: Vec<String>,
        body: &str,
        timeout: Duration,
    ) -> Result<String, BridgeError> {
        if timeout.is_zero() {
            return Err(BridgeError::InvalidRequest(
                "timeout must be greater than zero".to_string(),
            ));
        }

        let envelope = BridgeRequest::new(args, body, self.channel.as_str())?;
        let payload = envelope.to_bytes()?;

        if self.log_bodies {
            debug!(
                subject,
                verb = envelope.verb(),
                body = %String::from_utf8_lossy(&payload),
                "Bridge request"
            );
        } else {
            debug!(subject, verb = envelope.verb(), bytes = payload.len(), "Bridge request");
        }

        let reply = self
            .bus
            .request(subject, Bytes::from(payload), timeout)
            .await
            .map_err(|e| {
                let err = BridgeError::from(e);
                error!(
                    subject,
                    verb = envelope.verb(),
                    body = %truncate_for_log(envelope.body(), LOG_BODY_LIMIT),
                    error = %err,
                    "Bridge request failed"
                );
                err
            })?;

        let reply = String::from_utf8(reply.to_vec()).map_err(|_| BridgeError::InvalidReply)?;

        if self.log_bodies {
            debug!(subject, body = %reply, "Bridge reply");
        } else {
            debug!(subject, bytes = reply.len(), "Bridge reply");
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crate::bus::MemoryBus;

    use super::*;

    fn bridge_with(bus: &Arc<MemoryBus>) -> Bridge {
        Bridge::new(Arc::clone(bus) as Arc<dyn BusClient>, "noma2", false)
    }

    #[tokio::test]
    async fn wraps_envelope_and_returns_reply_verbatim() {
        let bus = Arc::new(MemoryBus::new(Vec::new()));
        bus.respond_with("svc", Duration::ZERO, |_| {
            Ok(Bytes::from_static(b"  not json, untouched "))
        });

        let reply = bridge_with(&bus)
            .request("svc", vec!["execute".into(), "ping".into()], "hello", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, "  not json, untouched ");

        let requests = bus.requests();
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].1).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({"args": ["execute", "ping"], "body": "hello", "channel": "noma2"})
        );
    }

    #[tokio::test]
    async fn timeout_shorter_than_reply_delay() {
        let bus = Arc::new(MemoryBus::new(Vec::new()));
        bus.respond_with("svc", Duration::from_secs(3), |p| Ok(p));

        let started = Instant::now();
        let err = bridge_with(&bus)
            .request("svc", vec!["execute".into()], "{}", Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn concurrent_requests_are_independent() {
        let bus = Arc::new(MemoryBus::new(Vec::new()));
        bus.respond_with("svc", Duration::from_millis(50), |p| Ok(p));
        let bridge = bridge_with(&bus);

        let calls = (0..8).map(|i| {
            let bridge = bridge.clone();
            async move {
                bridge
                    .request("svc", vec!["execute".into()], &i.to_string(), Duration::from_secs(2))
                    .await
            }
        });
        let started = Instant::now();
        let replies = futures::future::join_all(calls).await;

        assert!(replies.iter().all(Result::is_ok));
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn rejects_empty_args_and_zero_timeout() {
        let bus = Arc::new(MemoryBus::new(Vec::new()));
        let bridge = bridge_with(&bus);

        let err = bridge
            .request("svc", Vec::new(), "", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidRequest(_)));

        let err = bridge
            .request("svc", vec!["execute".into()], "", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidRequest(_)));
        assert!(bus.requests().is_empty());
    }

    #[tokio::test]
    async fn lost_connection_maps_to_connection_lost() {
        let bus = Arc::new(MemoryBus::new(Vec::new()));
        bus.simulate_disconnect("io");
        bus.simulate_connection_lost();

        let err = bridge_with(&bus)
            .request("svc", vec!["execute".into()], "", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionLost));
        assert_eq!(err.outcome(), "unavailable");
    }

    #[tokio::test]
    async fn non_utf8_reply_is_rejected() {
        let bus = Arc::new(MemoryBus::new(Vec::new()));
        bus.respond_with("svc", Duration::ZERO, |_| Ok(Bytes::from_static(&[0xff, 0xfe])));

        let err = bridge_with(&bus)
            .request("svc", vec!["execute".into()], "", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidReply));
    }
}

//! Event forwarding
//!
//! Wraps an inbound webhook body in an [`EventRecord`], mints a relay
//! credential and hands the record to the backend's `create_event` operation.

use emit_common::EventRecord;
use tracing::{info, warn};

use crate::auth::TokenIssuer;
use crate::config::BridgeConfig;
use crate::error::RelayError;
use crate::observability::Metrics;
use crate::util::{truncate_for_log, LOG_BODY_LIMIT};

use super::Bridge;

const EVENT_NAME: &str = "webhook";

/// Forwards webhook payloads to the automation backend.
#[derive(Clone)]
pub struct EventForwarder {
    bridge: Bridge,
    issuer: TokenIssuer,
    config: BridgeConfig,
    metrics: Metrics,
}

impl EventForwarder {
    pub const fn new(bridge: Bridge, issuer: TokenIssuer, config: BridgeConfig, metrics: Metrics) -> Self {
        Self {
            bridge,
            issuer,
            config,
            metrics,
        }
    }

    /// Forward `body`, tagged with `endpoint`, and return the raw reply.
    #[tracing::instrument(skip(self, body), fields(subject = %self.config.subject))]
    pub async fn forward(&self, endpoint: &str, body: &str) -> Result<String, RelayError> {
        let record = EventRecord::builder(EVENT_NAME)
            .description(EVENT_NAME)
            .source(self.config.source.as_str())
            .tag(endpoint)
            .build(body)
            .map_err(|e| {
                warn!(endpoint, body = %truncate_for_log(body, LOG_BODY_LIMIT), error = %e, "Rejected event payload");
                self.metrics.record_bridge_outcome("invalid");
                RelayError::Validation(e.to_string())
            })?;

        let token = self.issuer.issue(&self.config.source).map_err(|e| {
            warn!(endpoint, error = %e, "Failed to mint relay credential");
            self.metrics.record_bridge_outcome("signing_failed");
            RelayError::from(e)
        })?;

        let record_json = record
            .to_json()
            .map_err(|e| RelayError::Upstream(e.to_string()))?;

        let args = vec![
            "execute".to_string(),
            "mix".to_string(),
            "create_event".to_string(),
            token,
            body.to_string(),
        ];

        match self
            .bridge
            .request(&self.config.subject, args, &record_json, self.config.timeout)
            .await
        {
            Ok(reply) => {
                self.metrics.record_bridge_outcome("success");
                info!(endpoint, reply_bytes = reply.len(), "Event forwarded");
                Ok(reply)
            }
            Err(e) => {
                self.metrics.record_bridge_outcome(e.outcome());
                warn!(
                    endpoint,
                    body = %truncate_for_log(body, LOG_BODY_LIMIT),
                    error = %e,
                    "Failed to forward event"
                );
                Err(e.into())
            }
        }
    }
}

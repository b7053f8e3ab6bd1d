//! Bus lifecycle logging.

use tracing::{error, info, warn};

use crate::bus::{BusEvent, BusObserver, ConnectionState};

use super::health::HealthFlag;
use super::metrics::Metrics;

/// Logs bus lifecycle events, exports them as metrics and flips the health
/// flag when the connection is lost.
pub struct BusEventLogger {
    metrics: Metrics,
    health: HealthFlag,
}

impl BusEventLogger {
    pub const fn new(metrics: Metrics, health: HealthFlag) -> Self {
        Self { metrics, health }
    }
}

impl BusObserver for BusEventLogger {
    fn on_event(&self, event: &BusEvent, state: ConnectionState) {
        self.metrics.record_bus_event(event.label());
        self.metrics.set_bus_state(state);

        match event {
            BusEvent::Connecting => info!(%state, "Connecting to bus"),
            BusEvent::Connected => info!(%state, "Bus connected"),
            BusEvent::Disconnected { reason } => {
                warn!(%state, reason = %reason, "Bus disconnected, reconnecting");
            }
            BusEvent::Reconnected => info!(%state, "Bus reconnected"),
            BusEvent::ConnectionLost => {
                self.health.mark_unhealthy();
                error!(%state, "Bus connection lost, reconnect attempts exhausted");
            }
            BusEvent::Closed => info!(%state, "Bus connection closed"),
            BusEvent::Error(message) => warn!(%state, error = %message, "Bus error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_lost_flips_health_and_gauge() {
        let metrics = Metrics::new("test").unwrap();
        let health = HealthFlag::default();
        let logger = BusEventLogger::new(metrics.clone(), health.clone());

        logger.on_event(&BusEvent::Connected, ConnectionState::Connected);
        assert!(health.is_healthy());

        logger.on_event(&BusEvent::ConnectionLost, ConnectionState::Closed);
        assert!(!health.is_healthy());

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"event="connection_lost""#));
        assert!(text.lines().any(|l| l.starts_with("bus_connection_state") && l.ends_with(" 4")));
    }

    #[test]
    fn explicit_close_keeps_health() {
        let health = HealthFlag::default();
        let logger = BusEventLogger::new(Metrics::new("test").unwrap(), health.clone());
        logger.on_event(&BusEvent::Closed, ConnectionState::Closed);
        assert!(health.is_healthy());
    }
}

//! Observability: structured logging, Prometheus metrics, request counting,
//! bus lifecycle reporting and the health flag.
//!
//! ```rust,no_run
//! # use emit_server::{config::LogConfig, observability};
//! # let config = LogConfig { level: "info".into(), output_paths: vec!["stdout".into()] };
//! // In main(), before any logging:
//! observability::tracing::init(&config).expect("logging");
//! ```

pub mod bus_events;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod tracing;

pub use bus_events::BusEventLogger;
pub use health::HealthFlag;
pub use metrics::{metrics_handler, metrics_router, Metrics};
pub use middleware::track_requests;

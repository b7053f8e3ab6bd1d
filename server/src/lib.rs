//! Koksmat Emit Server
//!
//! Webhook ingestion and relay: accepts GitHub and Microsoft Graph callbacks,
//! validates them and forwards events to the automation bus over NATS
//! request/reply.

pub mod api;
pub mod auth;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod error;
pub mod observability;
pub mod util;
pub mod webhooks;

//! Process health flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared health flag, flipped once the bus connection is lost.
///
/// The flag never recovers on its own: a lost connection means the
/// orchestrator should restart or reroute the process.
#[derive(Debug, Clone)]
pub struct HealthFlag(Arc<AtomicBool>);

impl Default for HealthFlag {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl HealthFlag {
    pub fn is_healthy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn mark_unhealthy(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

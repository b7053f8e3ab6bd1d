//! Koksmat Emit Common Library
//!
//! Envelope and payload types shared by the relay server and anything that
//! talks to it over the automation bus.

pub mod error;
pub mod types;

pub use error::{CommonError, Result};
pub use types::*;

//! Bridge wire envelope sent to the automation bus.

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, Result};

/// Request envelope understood by the backend bus service.
///
/// `args[0]` is the verb (e.g. `execute`), followed by sub-operation and
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBridgeRequest")]
pub struct BridgeRequest {
    args: Vec<String>,
    body: String,
    channel: String,
}

#[derive(Deserialize)]
struct RawBridgeRequest {
    args: Vec<String>,
    body: String,
    channel: String,
}

impl TryFrom<RawBridgeRequest> for BridgeRequest {
    type Error = CommonError;

    fn try_from(raw: RawBridgeRequest) -> Result<Self> {
        Self::new(raw.args, raw.body, raw.channel)
    }
}

impl BridgeRequest {
    pub fn new(args: Vec<String>, body: impl Into<String>, channel: impl Into<String>) -> Result<Self> {
        if args.is_empty() {
            return Err(CommonError::EmptyArgs);
        }
        Ok(Self {
            args,
            body: body.into(),
            channel: channel.into(),
        })
    }

    pub fn verb(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Encode to the JSON bytes published on the bus.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

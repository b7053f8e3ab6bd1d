//! Event Record
//!
//! Canonical envelope wrapping any inbound webhook payload before it is
//! forwarded to the automation bus.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{CommonError, Result};

/// Canonical event envelope.
///
/// Built once per inbound request through [`EventRecordBuilder`] and never
/// mutated afterwards. The payload is kept as raw JSON so the bytes the
/// provider sent are forwarded untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawEventRecord")]
pub struct EventRecord {
    tenant: String,
    #[serde(rename = "searchindex")]
    search_index: String,
    name: String,
    description: String,
    source: String,
    tag: String,
    payload: Box<RawValue>,
}

#[derive(Deserialize)]
struct RawEventRecord {
    #[serde(default)]
    tenant: String,
    #[serde(rename = "searchindex", default)]
    search_index: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    tag: String,
    payload: Box<RawValue>,
}

impl TryFrom<RawEventRecord> for EventRecord {
    type Error = CommonError;

    fn try_from(raw: RawEventRecord) -> Result<Self> {
        if raw.name.is_empty() {
            return Err(CommonError::MissingField("name"));
        }
        Ok(Self {
            tenant: raw.tenant,
            search_index: raw.search_index,
            name: raw.name,
            description: raw.description,
            source: raw.source,
            tag: raw.tag,
            payload: raw.payload,
        })
    }
}

impl EventRecord {
    /// Start building a record with the given event name.
    pub fn builder(name: impl Into<String>) -> EventRecordBuilder {
        EventRecordBuilder {
            name: name.into(),
            ..EventRecordBuilder::default()
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn search_index(&self) -> &str {
        &self.search_index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Raw JSON payload exactly as received.
    pub fn payload(&self) -> &str {
        self.payload.get()
    }

    /// Encode the record as a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Builder for [`EventRecord`].
#[derive(Debug, Default)]
pub struct EventRecordBuilder {
    tenant: String,
    search_index: String,
    name: String,
    description: String,
    source: String,
    tag: String,
}

impl EventRecordBuilder {
    #[must_use]
    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    #[must_use]
    pub fn search_index(mut self, search_index: impl Into<String>) -> Self {
        self.search_index = search_index.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Identifies the relay that produced the record.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Free-form classification, usually the endpoint name.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Finish the record.
    ///
    /// Fails when the name is empty or `payload` is not valid JSON.
    pub fn build(self, payload: &str) -> Result<EventRecord> {
        if self.name.is_empty() {
            return Err(CommonError::MissingField("name"));
        }

        let payload =
            RawValue::from_string(payload.to_owned()).map_err(CommonError::InvalidPayload)?;

        Ok(EventRecord {
            tenant: self.tenant,
            search_index: self.search_index,
            name: self.name,
            description: self.description,
            source: self.source,
            tag: self.tag,
            payload,
        })
    }
}

//! Inbound producer messages.
//!
//! Every decoded document is an envelope whose `data` field carries a
//! [`Snapshot`]: the parts of the producer's state that changed since the
//! previous message, plus any events raised in between. Fields that did not
//! change are omitted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Event type that carries a log entry.
pub const LOG_EVENT: &str = "log";

/// One decoded document from a producer.
///
/// Only `data` is forwarded to the display sink. Other envelope fields are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProducerMessage {
    /// Payload forwarded to the display sink. `Null` when absent.
    #[serde(default)]
    pub data: Value,
}

impl ProducerMessage {
    /// Build a message from a decoded document.
    ///
    /// Never fails: a document that is not an object, or that has no `data`
    /// field, yields a `Null` payload.
    pub fn from_document(document: Value) -> Self {
        let data = match document {
            Value::Object(mut fields) => fields.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        Self { data }
    }
}

/// A named component or resource snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    /// Type name, used for stable ordering in the view.
    pub name: String,
    /// Serialized value (for components, a map from entity to value).
    #[serde(default)]
    pub data: Value,
}

/// An event raised by the producer between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type, e.g. [`LOG_EVENT`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Event body.
    #[serde(default)]
    pub data: Value,
}

impl Event {
    /// Event is a log entry.
    pub fn is_log(&self) -> bool {
        self.kind == LOG_EVENT
    }
}

/// Payload shape of a producer message's `data` field.
///
/// All fields are optional and present only when they changed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Live entity identifiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Value>>,
    /// Component snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Named>>,
    /// Resource snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Named>>,
    /// Events raised since the previous message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Event>>,
}

impl Snapshot {
    /// Interpret a forwarded `data` payload as a snapshot.
    ///
    /// `Null` is treated as an empty snapshot. Explicit `null` fields are
    /// treated as absent.
    pub fn from_data(data: &Value) -> Result<Self> {
        if data.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(data).map_err(ProtocolError::PayloadShape)
    }
}

//! Outbound edit commands.
//!
//! The observer forwards edits to a producer as a JSON document followed by
//! the frame delimiter, the same framing producers use inbound. The target
//! session is not part of the wire body: it only selects the destination
//! address.
//!
//! ```text
//! {"id":3,"entity":12,"data":{"x":1.0},"type":"ComponentUpdate"}\x0c
//! ```
//!
//! `entity` is present exactly when the command is component-scoped. Commands
//! that break this are rejected when deserialized and refused by
//! [`Command::encode`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::{ProtocolError, Result},
    frame::encode_frame,
};

/// What an edit command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Replace the value of a resource.
    ResourceUpdate,
    /// Replace the value of a component on one entity.
    ComponentUpdate,
    /// Remove a component from one entity.
    ComponentRemoval,
}

impl CommandKind {
    /// Command is scoped to a single entity.
    pub fn is_component_scoped(self) -> bool {
        matches!(self, Self::ComponentUpdate | Self::ComponentRemoval)
    }
}

/// Body of an edit request sent to a producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CommandBody")]
pub struct Command {
    /// Identifier of the edited resource or component type.
    pub id: Value,
    /// Target entity, only for component-scoped commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Value>,
    /// New value (or the removed value, for removals).
    pub data: Value,
    /// Edit target.
    #[serde(rename = "type")]
    pub kind: CommandKind,
}

impl Command {
    /// Update a resource.
    pub fn resource_update(id: impl Into<Value>, data: Value) -> Self {
        Self { id: id.into(), entity: None, data, kind: CommandKind::ResourceUpdate }
    }

    /// Update a component on `entity`.
    pub fn component_update(id: impl Into<Value>, entity: impl Into<Value>, data: Value) -> Self {
        Self {
            id: id.into(),
            entity: Some(entity.into()),
            data,
            kind: CommandKind::ComponentUpdate,
        }
    }

    /// Remove a component from `entity`.
    pub fn component_removal(
        id: impl Into<Value>,
        entity: impl Into<Value>,
        data: Value,
    ) -> Self {
        Self {
            id: id.into(),
            entity: Some(entity.into()),
            data,
            kind: CommandKind::ComponentRemoval,
        }
    }

    /// Check that `entity` is present exactly when the kind is
    /// component-scoped.
    pub fn check_scope(&self) -> Result<()> {
        let reason = match (self.kind.is_component_scoped(), self.entity.is_some()) {
            (true, false) => "requires an entity",
            (false, true) => "must not carry an entity",
            _ => return Ok(()),
        };
        Err(ProtocolError::CommandShape { kind: self.kind, reason })
    }

    /// Encode as a delimiter-terminated frame, ready for a single datagram.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.check_scope()?;

        let mut out = Vec::new();
        encode_frame(self, &mut out)?;
        Ok(out)
    }
}

/// Command as it appears on the wire, before its entity is checked.
#[derive(Deserialize)]
struct CommandBody {
    id: Value,
    #[serde(default)]
    entity: Option<Value>,
    #[serde(default)]
    data: Value,
    #[serde(rename = "type")]
    kind: CommandKind,
}

impl TryFrom<CommandBody> for Command {
    type Error = ProtocolError;

    fn try_from(body: CommandBody) -> Result<Self> {
        let command = Self { id: body.id, entity: body.entity, data: body.data, kind: body.kind };
        command.check_scope()?;
        Ok(command)
    }
}

//! Headless display sink and command source.
//!
//! Stands in for a graphical observer: keeps a [`ProducerView`] per live
//! producer, reports what changed through `tracing`, and turns edit commands
//! read as JSON lines into edits addressed through those views.

use std::collections::HashMap;

use serde::Deserialize;
use sightline_core::{ProducerView, SessionId};
use sightline_proto::{Command, CommandKind, Snapshot};

use crate::SinkEvent;

/// One line of command input.
///
/// ```text
/// {"sessionId":"127.0.0.1:5000","id":3,"data":{"x":1},"type":"ResourceUpdate"}
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    /// Producer the command is addressed to
    pub session_id: SessionId,
    /// Wire body forwarded to the producer
    #[serde(flatten)]
    pub command: Command,
}

impl CommandRequest {
    /// Parse a single JSON line.
    ///
    /// Fails if `entity` is missing from a component-scoped command or
    /// present on a resource command.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Display sink that keeps per-producer views.
#[derive(Debug, Default)]
pub struct DisplaySink {
    views: HashMap<SessionId, ProducerView>,
}

impl DisplaySink {
    /// Create a sink with no producers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one sink event.
    pub fn handle(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::Message { session_id, data } => {
                let snapshot = match Snapshot::from_data(&data) {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        tracing::warn!("ignoring malformed update from {}: {}", session_id, e);
                        return;
                    },
                };

                for event in snapshot.messages.iter().flatten().filter(|e| e.is_log()) {
                    tracing::info!(session = %session_id, "log: {}", event.data);
                }

                let view = self.views.entry(session_id).or_insert_with(|| {
                    tracing::info!(session = %session_id, "producer connected");
                    ProducerView::new(session_id)
                });
                view.apply_snapshot(snapshot);

                tracing::debug!(
                    session = %view.session_id(),
                    entities = view.entities().len(),
                    components = view.components().len(),
                    resources = view.resources().len(),
                    logs = view.logs().len(),
                    "update {}",
                    view.update_count()
                );
            },

            SinkEvent::Disconnect { session_id } => {
                if self.views.remove(&session_id).is_some() {
                    tracing::info!(session = %session_id, "producer disconnected");
                }
            },
        }
    }

    /// Build the edit for a command request through the addressed producer's
    /// view.
    ///
    /// Returns `None` if the producer has no view, which means it is not
    /// connected as far as the display knows.
    pub fn edit(&self, request: CommandRequest) -> Option<(SessionId, Command)> {
        let Some(view) = self.views.get(&request.session_id) else {
            tracing::debug!("no producer {}, dropping command", request.session_id);
            return None;
        };

        let Command { id, entity, data, kind } = request.command;
        let edit = match (kind, entity) {
            (CommandKind::ResourceUpdate, None) => view.edit_resource(id, data),
            (CommandKind::ComponentUpdate, Some(entity)) => view.edit_component(id, entity, data),
            (CommandKind::ComponentRemoval, Some(entity)) => {
                view.remove_component(id, entity, data)
            },
            (kind, _) => {
                tracing::warn!("dropping {:?} command with mismatched entity", kind);
                return None;
            },
        };

        tracing::info!(session = %edit.0, "edit {:?} {}", kind, edit.1.id);
        Some(edit)
    }

    /// View for a producer, if it has sent anything since it last connected.
    pub fn view(&self, session_id: SessionId) -> Option<&ProducerView> {
        self.views.get(&session_id)
    }

    /// Number of producers with a view.
    pub fn producer_count(&self) -> usize {
        self.views.len()
    }
}

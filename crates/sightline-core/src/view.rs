//! Observer-side model of one producer's exported state.
//!
//! Producers only send what changed, so the display side keeps the last known
//! value of every field and folds each new [`Snapshot`] into it. Components
//! and resources are kept sorted by name so the display order does not depend
//! on the order the producer happened to send them in.

use std::collections::VecDeque;

use serde_json::Value;
use sightline_proto::{Command, Named, Snapshot};

use crate::{error::ViewError, session::SessionId};

/// Maximum number of log entries kept per producer.
pub const MAX_LOGS: usize = 500;

/// Last known state of a single producer.
#[derive(Debug, Clone)]
pub struct ProducerView {
    session_id: SessionId,
    entities: Vec<Value>,
    components: Vec<Named>,
    resources: Vec<Named>,
    logs: VecDeque<Value>,
    updates: u64,
}

impl ProducerView {
    /// Empty view for a newly seen producer.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            entities: Vec::new(),
            components: Vec::new(),
            resources: Vec::new(),
            logs: VecDeque::new(),
            updates: 0,
        }
    }

    /// Producer this view tracks.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Fold a forwarded `data` payload into the view.
    ///
    /// On error the view is left unchanged.
    pub fn apply(&mut self, data: &Value) -> Result<(), ViewError> {
        let snapshot = Snapshot::from_data(data)?;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    /// Fold an already parsed snapshot into the view.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if let Some(entities) = snapshot.entities {
            self.entities = entities;
        }

        if let Some(mut components) = snapshot.components {
            components.sort_by(|a, b| a.name.cmp(&b.name));
            self.components = components;
        }

        if let Some(mut resources) = snapshot.resources {
            resources.sort_by(|a, b| a.name.cmp(&b.name));
            self.resources = resources;
        }

        for event in snapshot.messages.into_iter().flatten() {
            if event.is_log() {
                self.push_log(event.data);
            }
        }

        self.updates += 1;
    }

    /// Append a log entry, dropping the oldest once [`MAX_LOGS`] is reached.
    pub fn push_log(&mut self, entry: Value) {
        if self.logs.len() >= MAX_LOGS {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);
    }

    /// Live entity identifiers.
    pub fn entities(&self) -> &[Value] {
        &self.entities
    }

    /// Component snapshots, sorted by name.
    pub fn components(&self) -> &[Named] {
        &self.components
    }

    /// Resource snapshots, sorted by name.
    pub fn resources(&self) -> &[Named] {
        &self.resources
    }

    /// Log entries, oldest first.
    pub fn logs(&self) -> impl ExactSizeIterator<Item = &Value> + '_ {
        self.logs.iter()
    }

    /// Number of snapshots applied.
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    /// Resource snapshot by name.
    pub fn resource(&self, name: &str) -> Option<&Named> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Components attached to `entity`, with the entity's value for each.
    ///
    /// Component data is a JSON object keyed by entity. A `null` value marks a
    /// tag component (present, but carrying no data).
    pub fn components_for_entity<'a>(
        &'a self,
        entity: &Value,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> + use<'a> {
        let key = entity_key(entity);
        self.components.iter().filter_map(move |component| {
            component.data.get(key.as_str()).map(|value| (component.name.as_str(), value))
        })
    }

    /// Entity has at least one tag component.
    pub fn entity_has_tags(&self, entity: &Value) -> bool {
        self.components_for_entity(entity).any(|(_, value)| value.is_null())
    }

    /// Edit addressed to this producer, replacing resource `id` with `data`.
    pub fn edit_resource(&self, id: impl Into<Value>, data: Value) -> (SessionId, Command) {
        (self.session_id, Command::resource_update(id, data))
    }

    /// Edit addressed to this producer, replacing component `id` on `entity`
    /// with `data`.
    pub fn edit_component(
        &self,
        id: impl Into<Value>,
        entity: impl Into<Value>,
        data: Value,
    ) -> (SessionId, Command) {
        (self.session_id, Command::component_update(id, entity, data))
    }

    /// Edit addressed to this producer, removing component `id` from
    /// `entity`.
    pub fn remove_component(
        &self,
        id: impl Into<Value>,
        entity: impl Into<Value>,
        data: Value,
    ) -> (SessionId, Command) {
        (self.session_id, Command::component_removal(id, entity, data))
    }
}

/// Object key under which component data stores `entity`.
fn entity_key(entity: &Value) -> String {
    match entity {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use serde_json::json;
    use sightline_proto::CommandKind;

    use super::*;

    fn view() -> ProducerView {
        ProducerView::new(SessionId::new(SocketAddr::from(([127, 0, 0, 1], 7000))))
    }

    #[test]
    fn absent_fields_keep_previous_values() {
        let mut view = view();

        view.apply(&json!({"entities": [1, 2], "resources": [{"name": "Time", "data": 0}]}))
            .unwrap();
        view.apply(&json!({"entities": [3]})).unwrap();

        assert_eq!(view.entities(), &[json!(3)]);
        assert_eq!(view.resources().len(), 1);
        assert_eq!(view.update_count(), 2);
    }

    #[test]
    fn named_lists_are_sorted() {
        let mut view = view();

        view.apply(&json!({
            "components": [
                {"name": "Velocity", "data": {}},
                {"name": "Mesh", "data": {}},
                {"name": "Transform", "data": {}},
            ],
            "resources": [{"name": "b", "data": 1}, {"name": "a", "data": 2}],
        }))
        .unwrap();

        let names: Vec<_> = view.components().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Mesh", "Transform", "Velocity"]);
        assert_eq!(view.resources()[0].name, "a");
        assert_eq!(view.resource("b").map(|r| &r.data), Some(&json!(1)));
    }

    #[test]
    fn only_log_events_are_recorded() {
        let mut view = view();

        view.apply(&json!({
            "messages": [
                {"type": "log", "data": "first"},
                {"type": "profile", "data": 12},
                {"type": "log", "data": "second"},
            ]
        }))
        .unwrap();

        let logs: Vec<_> = view.logs().cloned().collect();
        assert_eq!(logs, vec![json!("first"), json!("second")]);
    }

    #[test]
    fn log_is_bounded_oldest_first() {
        let mut view = view();

        for i in 0..(MAX_LOGS + 10) {
            view.push_log(json!(i));
        }

        assert_eq!(view.logs().len(), MAX_LOGS);
        assert_eq!(view.logs().next(), Some(&json!(10)));
        assert_eq!(view.logs().last(), Some(&json!(MAX_LOGS + 9)));
    }

    #[test]
    fn malformed_payload_leaves_view_unchanged() {
        let mut view = view();
        view.apply(&json!({"entities": [1]})).unwrap();

        let result = view.apply(&json!({"entities": "not a list"}));

        assert!(matches!(result, Err(ViewError::MalformedSnapshot(_))));
        assert_eq!(view.entities(), &[json!(1)]);
        assert_eq!(view.update_count(), 1);
    }

    #[test]
    fn components_for_entity_and_tags() {
        let mut view = view();
        view.apply(&json!({
            "components": [
                {"name": "Player", "data": {"4": null}},
                {"name": "Transform", "data": {"4": {"x": 1}, "5": {"x": 2}}},
            ]
        }))
        .unwrap();

        let attached: Vec<_> = view.components_for_entity(&json!(4)).collect();
        assert_eq!(attached, vec![("Player", &Value::Null), ("Transform", &json!({"x": 1}))]);
        assert!(view.entity_has_tags(&json!(4)));
        assert!(!view.entity_has_tags(&json!(5)));
    }

    #[test]
    fn edit_helpers_address_the_viewed_producer() {
        let view = view();
        let producer = SessionId::new(SocketAddr::from(([127, 0, 0, 1], 7000)));

        let (to, command) = view.edit_resource(1, json!(2));
        assert_eq!(to, producer);
        assert_eq!(command.kind, CommandKind::ResourceUpdate);
        assert_eq!(command.entity, None);

        let (to, update) = view.edit_component(3, 4, json!({}));
        assert_eq!(to, producer);
        assert_eq!(update.kind, CommandKind::ComponentUpdate);
        assert_eq!(update.entity, Some(json!(4)));

        let (_, removal) = view.remove_component(3, 4, Value::Null);
        assert_eq!(removal.kind, CommandKind::ComponentRemoval);
        assert!(removal.encode().is_ok());
    }
}

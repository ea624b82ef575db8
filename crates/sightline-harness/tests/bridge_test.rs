//! Forwarding bridge tests.
//!
//! Commands reach the producer that owns the session and nothing else;
//! commands for sessions that don't exist vanish without side effects.

use std::time::Duration;

use serde_json::{Value, json};
use sightline_harness::{InvariantRegistry, SimObserver, producer};
use sightline_observer::SinkEvent;
use sightline_proto::{Command, FRAME_DELIMITER, FrameBuffer};

fn sim() -> SimObserver {
    SimObserver::new().with_invariants(InvariantRegistry::standard())
}

/// Decode a sent datagram the way a producer would.
fn decode(bytes: &[u8]) -> Vec<Value> {
    let feed = FrameBuffer::new().feed(bytes);
    assert!(feed.rejected.is_none(), "outbound datagram failed to decode");
    feed.messages
}

#[test]
fn command_reaches_owning_producer() {
    let mut sim = sim();
    sim.receive(producer(1), b"{}\x0c");
    sim.receive(producer(2), b"{}\x0c");

    sim.submit(producer(2), Command::component_update(4, 17, json!({"x": 1.5})));

    let sent = sim.take_sent();
    assert_eq!(sent.len(), 1);
    let (to, bytes) = &sent[0];
    assert_eq!(*to, producer(2));
    assert_eq!(bytes.last(), Some(&FRAME_DELIMITER));
    assert_eq!(
        decode(bytes),
        vec![json!({"id": 4, "entity": 17, "data": {"x": 1.5}, "type": "ComponentUpdate"})]
    );
}

#[test]
fn command_body_excludes_session() {
    let mut sim = sim();
    sim.receive(producer(1), b"{}\x0c");

    sim.submit(producer(1), Command::resource_update("Gravity", json!(-9.8)));

    let sent = sim.take_sent();
    let body = &decode(&sent[0].1)[0];
    assert!(body.get("sessionId").is_none());
    assert!(body.get("entity").is_none());
    assert_eq!(body["type"], json!("ResourceUpdate"));
}

#[test]
fn removal_uses_standard_shape() {
    let mut sim = sim();
    sim.receive(producer(1), b"{}\x0c");

    sim.submit(producer(1), Command::component_removal("Health", 3, Value::Null));

    let sent = sim.take_sent();
    assert_eq!(
        decode(&sent[0].1),
        vec![json!({"id": "Health", "entity": 3, "data": null, "type": "ComponentRemoval"})]
    );
}

#[test]
fn command_for_unknown_session_is_dropped() {
    let mut sim = sim();

    sim.submit(producer(9), Command::resource_update(1, json!(0)));

    assert!(sim.take_sent().is_empty());
    assert!(sim.take_sink_events().is_empty());
    assert_eq!(sim.driver().session_count(), 0);
}

#[test]
fn command_after_eviction_is_dropped() {
    let mut sim = sim();
    sim.receive(producer(1), b"{}\x0c");
    sim.advance(Duration::from_millis(500));

    sim.submit(producer(1), Command::resource_update(1, json!(0)));

    assert!(sim.take_sent().is_empty());
    assert!(!sim.driver().has_session(producer(1)));
}

#[test]
fn commands_do_not_refresh_liveness() {
    let mut sim = sim();
    sim.receive(producer(1), b"{}\x0c");

    sim.advance(Duration::from_millis(300));
    sim.submit(producer(1), Command::resource_update(1, json!(0)));
    sim.advance(Duration::from_millis(200));

    assert!(!sim.driver().has_session(producer(1)));
    assert_eq!(sim.take_sent().len(), 1);
}

#[test]
fn closed_sink_stops_everything() {
    let mut sim = sim();
    sim.receive(producer(1), b"{}\x0c");
    sim.take_sink_events();

    sim.close_sink();
    sim.receive(producer(1), b"{\"data\":1}\x0c");
    sim.submit(producer(1), Command::resource_update(1, json!(0)));
    sim.advance(Duration::from_millis(1000));

    assert!(sim.take_sink_events().is_empty());
    assert!(sim.take_sent().is_empty());
    assert_eq!(sim.driver().session_count(), 0);
}

#[test]
fn messages_follow_wire_order_per_session() {
    let mut sim = sim();

    sim.receive(producer(1), b"{\"data\":1}\x0c{\"data\":2}\x0c{\"data\"");
    sim.receive(producer(2), b"{\"data\":\"other\"}\x0c");
    sim.receive(producer(1), b":3}\x0c");

    let from_one: Vec<_> = sim
        .take_sink_events()
        .into_iter()
        .filter_map(|e| match e {
            SinkEvent::Message { session_id, data } if session_id == producer(1) => Some(data),
            _ => None,
        })
        .collect();
    assert_eq!(from_one, vec![json!(1), json!(2), json!(3)]);
}

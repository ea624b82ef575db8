//! Fuzz target for the observer driver
//!
//! # Strategy
//!
//! - Datagrams from a handful of producers, arbitrary bytes
//! - Clock advances of arbitrary length, with or without a following tick
//! - Commands for live and unknown sessions
//! - Sink closure at an arbitrary point
//!
//! # Invariants
//!
//! - NEVER panic on any event sequence
//! - Standard observer invariants hold after every step
//! - Commands are only sent to live sessions

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::json;
use sightline_harness::{producer, InvariantRegistry, SimObserver};
use sightline_proto::Command;

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Datagram { port: u8, bytes: Vec<u8> },
    Advance { millis: u16 },
    AdvanceClock { millis: u16 },
    Submit { port: u8 },
    CloseSink,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut sim = SimObserver::new().with_invariants(InvariantRegistry::standard());

    for op in ops {
        match op {
            Op::Datagram { port, bytes } => sim.receive(producer(u16::from(port % 8)), &bytes),
            Op::Advance { millis } => sim.advance(Duration::from_millis(u64::from(millis))),
            Op::AdvanceClock { millis } => {
                sim.advance_clock(Duration::from_millis(u64::from(millis)));
            },
            Op::Submit { port } => {
                let target = producer(u16::from(port % 8));
                let live = sim.driver().has_session(target);

                sim.submit(target, Command::resource_update(1, json!(port)));

                let sent = sim.take_sent();
                assert_eq!(sent.len(), usize::from(live));
                assert!(sent.iter().all(|(to, _)| *to == target));
            },
            Op::CloseSink => sim.close_sink(),
        }
    }
});

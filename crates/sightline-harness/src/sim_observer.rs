//! Simulated observer for deterministic tests.
//!
//! `SimObserver` drives an [`ObserverDriver`] over a [`SimEnv`] and executes
//! its actions in memory: sink events and outbound datagrams are recorded for
//! the test to inspect, and log actions are forwarded to `tracing`. There is
//! no socket and no real time, so every test run sees the same sequence of
//! events.

use std::{net::SocketAddr, time::Duration};

use bytes::Bytes;
use sightline_core::SessionId;
use sightline_observer::{
    DriverConfig, LogLevel, ObserverAction, ObserverDriver, ObserverEvent, SinkEvent,
};
use sightline_proto::Command;

use crate::{
    SimEnv,
    invariants::{InvariantRegistry, ObserverSnapshot},
};

/// Session identifier for a loopback producer on `port`.
pub fn producer(port: u16) -> SessionId {
    SessionId::new(SocketAddr::from(([127, 0, 0, 1], port)))
}

/// Simulated observer.
///
/// Every call processes exactly one event. With invariants enabled, each call
/// panics if the resulting state violates one of them.
pub struct SimObserver {
    /// The action-based observer driver
    driver: ObserverDriver<SimEnv>,
    /// Shared virtual clock
    env: SimEnv,
    /// Sink events not yet taken by the test
    sink: Vec<SinkEvent>,
    /// Outbound datagrams not yet taken by the test
    sent: Vec<(SessionId, Vec<u8>)>,
    /// Every log action, in order
    logs: Vec<(LogLevel, String)>,
    /// Checks run after every step
    invariants: Option<InvariantRegistry>,
}

impl Default for SimObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimObserver {
    /// Create a simulated observer with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DriverConfig::default())
    }

    /// Create a simulated observer with a custom configuration.
    pub fn with_config(config: DriverConfig) -> Self {
        let env = SimEnv::new();
        let driver = ObserverDriver::new(env.clone(), config);
        Self { driver, env, sink: Vec::new(), sent: Vec::new(), logs: Vec::new(), invariants: None }
    }

    /// Enable invariant checking.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Deliver a datagram from `from` at the current virtual time.
    pub fn receive(&mut self, from: SessionId, bytes: &[u8]) {
        let event = ObserverEvent::DatagramReceived { from, bytes: Bytes::copy_from_slice(bytes) };
        self.step(event, false);
    }

    /// Submit a command through the command source.
    pub fn submit(&mut self, session_id: SessionId, command: Command) {
        self.step(ObserverEvent::CommandSubmitted { session_id, command }, false);
    }

    /// Advance the clock by `by`, then run a liveness tick.
    pub fn advance(&mut self, by: Duration) {
        self.env.advance(by);
        self.step(ObserverEvent::Tick, true);
    }

    /// Advance the clock by `by` without a liveness tick.
    ///
    /// Models a runtime that has not delivered the tick yet, for example
    /// because a datagram won the race against the timer.
    pub fn advance_clock(&mut self, by: Duration) {
        self.env.advance(by);
    }

    /// Advance the clock in steps of `step` until `total` has passed,
    /// ticking after each one.
    pub fn advance_in_steps(&mut self, total: Duration, step: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() {
            let by = remaining.min(step);
            self.advance(by);
            remaining -= by;
        }
    }

    /// Close the display sink.
    pub fn close_sink(&mut self) {
        self.step(ObserverEvent::SinkClosed, false);
    }

    /// Take every sink event recorded since the last call.
    pub fn take_sink_events(&mut self) -> Vec<SinkEvent> {
        std::mem::take(&mut self.sink)
    }

    /// Take every outbound datagram recorded since the last call.
    pub fn take_sent(&mut self) -> Vec<(SessionId, Vec<u8>)> {
        std::mem::take(&mut self.sent)
    }

    /// Every log message emitted so far.
    pub fn logs(&self) -> &[(LogLevel, String)] {
        &self.logs
    }

    /// The underlying driver.
    pub fn driver(&self) -> &ObserverDriver<SimEnv> {
        &self.driver
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.env.elapsed()
    }

    /// Observable state for invariant checks.
    pub fn snapshot(&self, ticked: bool, step_events: Vec<SinkEvent>) -> ObserverSnapshot {
        let mut sessions: Vec<_> = self.driver.sessions().collect();
        sessions.sort_unstable();

        ObserverSnapshot {
            now: self.now(),
            ticked,
            sessions,
            sink_open: self.driver.is_sink_open(),
            step_events,
        }
    }

    fn step(&mut self, event: ObserverEvent, ticked: bool) {
        let context = format!("after {event:?} at {:?}", self.now());
        let actions = self.driver.process_event(event);
        let step_events = self.execute(actions);

        if let Some(registry) = &self.invariants {
            registry.assert_all(&self.snapshot(ticked, step_events), &context);
        }
    }

    /// Execute actions, returning the sink events they produced.
    fn execute(&mut self, actions: Vec<ObserverAction>) -> Vec<SinkEvent> {
        let mut step_events = Vec::new();

        for action in actions {
            match action {
                ObserverAction::Deliver { session_id, data } => {
                    step_events.push(SinkEvent::Message { session_id, data });
                },
                ObserverAction::Disconnect { session_id } => {
                    step_events.push(SinkEvent::Disconnect { session_id });
                },
                ObserverAction::SendDatagram { to, bytes } => self.sent.push((to, bytes)),
                ObserverAction::Log { level, message } => {
                    tracing::debug!(?level, "{}", message);
                    self.logs.push((level, message));
                },
            }
        }

        self.sink.extend(step_events.iter().cloned());
        step_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_records_sink_events() {
        let mut sim = SimObserver::new();

        sim.receive(producer(1), b"{\"data\":7}\x0c");

        let events = sim.take_sink_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SinkEvent::Message { session_id, .. } if *session_id == producer(1)));
        assert!(sim.take_sink_events().is_empty());
    }

    #[test]
    fn advance_in_steps_ticks_each_step() {
        let mut sim = SimObserver::new().with_invariants(InvariantRegistry::standard());
        sim.receive(producer(1), b"{}\x0c");

        sim.advance_in_steps(Duration::from_millis(1000), Duration::from_millis(100));

        assert_eq!(sim.now(), Duration::from_millis(1000));
        assert_eq!(sim.take_sink_events().last(), Some(&SinkEvent::Disconnect { session_id: producer(1) }));
    }

    #[test]
    fn advance_clock_does_not_tick() {
        let mut sim = SimObserver::new().with_invariants(InvariantRegistry::standard());
        sim.receive(producer(1), b"{}\x0c");
        sim.take_sink_events();

        sim.advance_clock(Duration::from_millis(800));

        assert!(sim.driver().has_session(producer(1)));
        assert!(sim.take_sink_events().is_empty());
    }

    #[test]
    fn logs_are_recorded() {
        let mut sim = SimObserver::new();

        sim.receive(producer(1), b"nope\x0c");

        assert!(sim.logs().iter().any(|(level, _)| *level == LogLevel::Warn));
    }
}

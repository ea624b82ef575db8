//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties of the observer that must hold after every
//! processed event, whatever the producers send and however time moves.
//! [`SimObserver`](crate::SimObserver) extracts an [`ObserverSnapshot`] after
//! each step and runs the registered checks against it.
//!
//! # Usage
//!
//! ```ignore
//! let mut sim = SimObserver::new().with_invariants(InvariantRegistry::standard());
//! sim.receive(producer, b"{\"data\":1}\x0c"); // panics on violation
//! ```

use std::{collections::HashSet, time::Duration};

use sightline_core::SessionId;
use sightline_observer::SinkEvent;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// Observable observer state at one point in simulated time.
#[derive(Debug, Clone, Default)]
pub struct ObserverSnapshot {
    /// Virtual time of the snapshot
    pub now: Duration,
    /// Whether a liveness tick ran at `now`
    pub ticked: bool,
    /// Live sessions with their deadlines
    pub sessions: Vec<(SessionId, Duration)>,
    /// Whether the display sink is still open
    pub sink_open: bool,
    /// Events the last step delivered to the sink, in order
    pub step_events: Vec<SinkEvent>,
}

/// An invariant that can be checked against observer state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the current state.
    fn check(&self, state: &ObserverSnapshot) -> InvariantResult;
}

/// No live session is past its deadline once a tick has run.
pub struct NoOverdueSessions;

impl Invariant for NoOverdueSessions {
    fn name(&self) -> &'static str {
        "NoOverdueSessions"
    }

    fn check(&self, state: &ObserverSnapshot) -> InvariantResult {
        if !state.ticked {
            return Ok(());
        }

        match state.sessions.iter().find(|(_, deadline)| *deadline <= state.now) {
            Some((id, deadline)) => Err(Violation {
                invariant: self.name(),
                message: format!(
                    "session {id} still live at {:?}, deadline was {deadline:?}",
                    state.now
                ),
            }),
            None => Ok(()),
        }
    }
}

/// A closed sink leaves no sessions behind.
pub struct ClosedSinkHoldsNoSessions;

impl Invariant for ClosedSinkHoldsNoSessions {
    fn name(&self) -> &'static str {
        "ClosedSinkHoldsNoSessions"
    }

    fn check(&self, state: &ObserverSnapshot) -> InvariantResult {
        if state.sink_open || state.sessions.is_empty() {
            return Ok(());
        }

        Err(Violation {
            invariant: self.name(),
            message: format!("{} sessions live after sink closed", state.sessions.len()),
        })
    }
}

/// A disconnected session is gone, and no step disconnects it twice.
///
/// The same endpoint may be live again after the step, but only as a new
/// session whose deadline lies ahead.
pub struct DisconnectEndsSession;

impl Invariant for DisconnectEndsSession {
    fn name(&self) -> &'static str {
        "DisconnectEndsSession"
    }

    fn check(&self, state: &ObserverSnapshot) -> InvariantResult {
        let mut disconnected: HashSet<SessionId> = HashSet::new();

        for event in &state.step_events {
            let SinkEvent::Disconnect { session_id } = event else {
                continue;
            };

            if !disconnected.insert(*session_id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("session {session_id} disconnected twice in one step"),
                });
            }

            let overdue = |(id, deadline): &(SessionId, Duration)| {
                id == session_id && *deadline <= state.now
            };
            if state.sessions.iter().any(overdue) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("session {session_id} still live after its disconnect"),
                });
            }
        }

        Ok(())
    }
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard observer invariants.
    ///
    /// Includes:
    /// - [`NoOverdueSessions`]: ticks evict every expired session
    /// - [`ClosedSinkHoldsNoSessions`]: sink closure drops all sessions
    /// - [`DisconnectEndsSession`]: disconnected sessions are removed
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(NoOverdueSessions);
        registry.add(ClosedSinkHoldsNoSessions);
        registry.add(DisconnectEndsSession);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &ObserverSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on violation.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &ObserverSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;

    fn producer(port: u16) -> SessionId {
        SessionId::new(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        let snapshot = ObserverSnapshot { sink_open: true, ..Default::default() };
        assert!(registry.check_all(&snapshot).is_ok());
    }

    #[test]
    fn overdue_session_after_tick_is_flagged() {
        let snapshot = ObserverSnapshot {
            now: ms(600),
            ticked: true,
            sessions: vec![(producer(1), ms(500))],
            sink_open: true,
            step_events: vec![],
        };

        assert!(NoOverdueSessions.check(&snapshot).is_err());
        assert!(NoOverdueSessions.check(&ObserverSnapshot { ticked: false, ..snapshot }).is_ok());
    }

    #[test]
    fn sessions_after_close_are_flagged() {
        let snapshot = ObserverSnapshot {
            sessions: vec![(producer(1), ms(500))],
            sink_open: false,
            ..Default::default()
        };

        assert!(ClosedSinkHoldsNoSessions.check(&snapshot).is_err());
    }

    #[test]
    fn double_disconnect_is_flagged() {
        let disconnect = SinkEvent::Disconnect { session_id: producer(1) };
        let snapshot = ObserverSnapshot {
            sink_open: true,
            step_events: vec![disconnect.clone(), disconnect],
            ..Default::default()
        };

        assert!(DisconnectEndsSession.check(&snapshot).is_err());
    }

    #[test]
    fn live_disconnected_session_is_flagged() {
        let snapshot = ObserverSnapshot {
            now: ms(600),
            sessions: vec![(producer(1), ms(500))],
            sink_open: true,
            step_events: vec![SinkEvent::Disconnect { session_id: producer(1) }],
            ..Default::default()
        };

        assert!(DisconnectEndsSession.check(&snapshot).is_err());
    }

    #[test]
    fn recreated_session_passes_disconnect_check() {
        let snapshot = ObserverSnapshot {
            now: ms(600),
            sessions: vec![(producer(1), ms(1100))],
            sink_open: true,
            step_events: vec![SinkEvent::Disconnect { session_id: producer(1) }],
            ..Default::default()
        };

        assert!(DisconnectEndsSession.check(&snapshot).is_ok());
    }

    #[test]
    fn messages_do_not_trip_disconnect_check() {
        let snapshot = ObserverSnapshot {
            sessions: vec![(producer(1), ms(900))],
            sink_open: true,
            step_events: vec![SinkEvent::Message {
                session_id: producer(1),
                data: serde_json::Value::Null,
            }],
            ..Default::default()
        };

        assert!(DisconnectEndsSession.check(&snapshot).is_ok());
    }
}

//! Observer driver.
//!
//! Ties together the session registry, per-session framing and liveness, and
//! the forwarding bridge. Pure logic: the runtime feeds it events and executes
//! the actions it returns.
//!
//! # Inbound
//!
//! ```text
//! DatagramReceived ─> overdue? ─ yes ─> Disconnect, drop buffer
//!                        │
//!                        └─> registry.get_or_create ─> session.receive (re-arm + frame)
//!                                                        └─> Deliver per message
//! ```
//!
//! # Outbound
//!
//! ```text
//! CommandSubmitted ─> registry.get ─┬─ None ─> dropped (logged)
//!                                   └─ Some ─> SendDatagram(command + delimiter)
//! ```
//!
//! # Liveness
//!
//! `Tick` evicts every session whose deadline has passed and emits one
//! `Disconnect` per evicted session. [`ObserverDriver::next_deadline`] tells
//! the runtime when the next tick is due.
//!
//! A datagram can reach the driver after its session's deadline but before
//! the tick that would evict it. The overdue session is evicted first, so the
//! datagram always starts a new session with an empty buffer.

use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use sightline_core::{DEFAULT_LIVENESS_TIMEOUT, SessionId, env::Environment};
use sightline_proto::Command;

use crate::registry::SessionRegistry;

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Silence after which a session is evicted
    pub liveness_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { liveness_timeout: DEFAULT_LIVENESS_TIMEOUT }
    }
}

/// Events that the observer driver processes.
///
/// These are produced by the runtime (production or simulation).
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    /// A datagram arrived from a producer
    DatagramReceived {
        /// Endpoint that sent the datagram
        from: SessionId,
        /// Raw datagram contents
        bytes: Bytes,
    },

    /// The command source asked for an edit to be forwarded
    CommandSubmitted {
        /// Producer the command is addressed to
        session_id: SessionId,
        /// Edit to forward
        command: Command,
    },

    /// A liveness deadline may have passed
    Tick,

    /// The display sink is gone
    SinkClosed,
}

/// Actions that the observer driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverAction {
    /// Hand a decoded payload to the display sink
    Deliver {
        /// Producer the payload came from
        session_id: SessionId,
        /// The message's `data` field
        data: Value,
    },

    /// Tell the display sink a producer went silent
    Disconnect {
        /// Evicted producer
        session_id: SessionId,
    },

    /// Send bytes to a producer (fire-and-forget)
    SendDatagram {
        /// Destination producer
        to: SessionId,
        /// Encoded, delimiter-terminated command
        bytes: Vec<u8>,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for driver actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Action-based observer driver.
///
/// Orchestrates session lifecycle, framing, and forwarding.
pub struct ObserverDriver<E>
where
    E: Environment,
{
    /// Live sessions
    registry: SessionRegistry<E::Instant>,
    /// Environment (time)
    env: E,
    /// Driver configuration
    config: DriverConfig,
    /// Whether the display sink still accepts events
    sink_open: bool,
}

impl<E> ObserverDriver<E>
where
    E: Environment,
{
    /// Create a new driver with no sessions.
    pub fn new(env: E, config: DriverConfig) -> Self {
        Self { registry: SessionRegistry::new(), env, config, sink_open: true }
    }

    /// Process an event and return actions to execute.
    ///
    /// Never fails: decode failures, unknown sessions and expiry are all
    /// absorbed here and at most surface as `Log` or `Disconnect` actions.
    pub fn process_event(&mut self, event: ObserverEvent) -> Vec<ObserverAction> {
        match event {
            ObserverEvent::DatagramReceived { from, bytes } => {
                self.handle_datagram(from, &bytes)
            },
            ObserverEvent::CommandSubmitted { session_id, command } => {
                self.handle_command(session_id, &command)
            },
            ObserverEvent::Tick => self.handle_tick(),
            ObserverEvent::SinkClosed => self.handle_sink_closed(),
        }
    }

    /// Handle a datagram from a producer.
    fn handle_datagram(&mut self, from: SessionId, bytes: &[u8]) -> Vec<ObserverAction> {
        if !self.sink_open {
            return vec![];
        }

        let now = self.env.now();
        let mut actions = Vec::new();

        if self.registry.get(from).is_some_and(|session| session.is_expired(now)) {
            self.registry.remove(from);
            actions.extend(Self::evicted(from));
        }

        let (session, created) =
            self.registry.get_or_create(from, now, self.config.liveness_timeout);
        if created {
            actions.push(ObserverAction::Log {
                level: LogLevel::Debug,
                message: format!("session {from} opened"),
            });
        }

        let received = session.receive(bytes, now);

        for message in received.messages {
            actions.push(ObserverAction::Deliver { session_id: from, data: message.data });
        }

        if let Some(e) = received.rejected {
            actions.push(ObserverAction::Log {
                level: LogLevel::Warn,
                message: format!("session {from}: discarded segment: {e}"),
            });
        }

        actions
    }

    /// Handle a command from the command source.
    fn handle_command(&mut self, session_id: SessionId, command: &Command) -> Vec<ObserverAction> {
        let Some(session) = self.registry.get(session_id) else {
            return vec![ObserverAction::Log {
                level: LogLevel::Debug,
                message: format!("dropping {:?} for unknown session {session_id}", command.kind),
            }];
        };

        match command.encode() {
            Ok(bytes) => vec![ObserverAction::SendDatagram { to: session.id(), bytes }],
            Err(e) => vec![ObserverAction::Log {
                level: LogLevel::Error,
                message: format!("failed to encode command for {session_id}: {e}"),
            }],
        }
    }

    /// Evict every session whose deadline has passed.
    fn handle_tick(&mut self) -> Vec<ObserverAction> {
        let now = self.env.now();
        let mut actions = Vec::new();

        for session_id in self.registry.remove_expired(now) {
            actions.extend(Self::evicted(session_id));
        }

        actions
    }

    fn evicted(session_id: SessionId) -> [ObserverAction; 2] {
        [
            ObserverAction::Disconnect { session_id },
            ObserverAction::Log {
                level: LogLevel::Info,
                message: format!("session {session_id} timed out"),
            },
        ]
    }

    /// Drop all sessions and stop accepting datagrams.
    fn handle_sink_closed(&mut self) -> Vec<ObserverAction> {
        self.sink_open = false;
        let dropped = self.registry.clear();

        vec![ObserverAction::Log {
            level: LogLevel::Info,
            message: format!("display sink closed, dropped {dropped} sessions"),
        }]
    }

    /// Earliest liveness deadline among live sessions.
    ///
    /// The runtime should deliver a `Tick` no later than this instant.
    pub fn next_deadline(&self) -> Option<E::Instant> {
        self.registry.next_deadline()
    }

    /// Check if a session is live.
    pub fn has_session(&self, session_id: SessionId) -> bool {
        self.registry.contains(session_id)
    }

    /// Bytes buffered for a session. `None` if the session doesn't exist.
    pub fn pending_bytes(&self, session_id: SessionId) -> Option<&[u8]> {
        self.registry.get(session_id).map(|s| s.pending())
    }

    /// Live sessions with their liveness deadlines, in no particular order.
    pub fn sessions(&self) -> impl Iterator<Item = (SessionId, E::Instant)> + '_ {
        self.registry.iter().map(|session| (session.id(), session.deadline()))
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    /// Whether the display sink still accepts events.
    pub fn is_sink_open(&self) -> bool {
        self.sink_open
    }
}

impl<E> std::fmt::Debug for ObserverDriver<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverDriver")
            .field("session_count", &self.registry.session_count())
            .field("sink_open", &self.sink_open)
            .finish()
    }
}

//! Per-producer session state.
//!
//! A session exists for every remote endpoint that has sent at least one
//! datagram and has not gone silent for longer than the liveness timeout. It
//! owns the endpoint's reassembly buffer and its liveness deadline; nothing
//! else mutates them.
//!
//! Like the rest of the core, sessions are pure: time is passed in, and the
//! caller decides what to do with decoded messages and expiry.
//!
//! # Lifecycle
//!
//! ```text
//!  first datagram          datagram (re-arm deadline)
//!  ───────────────> Live ───────────────────────────┐
//!                    │  ^                           │
//!                    │  └───────────────────────────┘
//!                    │ now >= deadline
//!                    ↓
//!                 Expired (removed by the owner, pending bytes dropped)
//! ```

use std::{
    fmt,
    net::SocketAddr,
    ops::Add,
    str::FromStr,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use sightline_proto::{FrameBuffer, ProducerMessage, ProtocolError};

/// Silence after which a producer is presumed gone.
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_millis(500);

/// Canonical identifier of a producer endpoint.
///
/// Derived once from the datagram source address at the transport boundary
/// and used for registry lookup, liveness tracking and outbound routing
/// alike. Unique per remote sender for as long as the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(SocketAddr);

impl SessionId {
    /// Identifier for datagrams received from `addr`.
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    /// Transport address replies are sent to.
    pub fn addr(self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for SessionId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl FromStr for SessionId {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messages decoded from one datagram.
#[derive(Debug, Default)]
pub struct Received {
    /// Decoded messages, in wire order.
    pub messages: Vec<ProducerMessage>,
    /// Segment that stopped extraction, if any.
    pub rejected: Option<ProtocolError>,
}

/// State for one live producer.
///
/// Generic over `Instant` so tests can drive it with virtual time.
#[derive(Debug, Clone)]
pub struct Session<I = Instant>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Endpoint this session belongs to
    id: SessionId,
    /// Unterminated tail of the byte stream
    frames: FrameBuffer,
    /// Silence allowed before expiry
    timeout: Duration,
    /// When the last datagram arrived
    last_seen: I,
    /// `last_seen + timeout`
    deadline: I,
}

impl<I> Session<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Create a session with an empty buffer, armed to expire at
    /// `now + timeout`.
    pub fn new(id: SessionId, now: I, timeout: Duration) -> Self {
        Self {
            id,
            frames: FrameBuffer::new(),
            timeout,
            last_seen: now,
            deadline: now + timeout,
        }
    }

    /// Endpoint identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Handle a datagram: re-arm the liveness deadline, then extract every
    /// complete message now present in the buffer.
    ///
    /// The deadline is re-armed even when the datagram completes no message,
    /// so a producer streaming one large document is not evicted mid-send.
    pub fn receive(&mut self, bytes: &[u8], now: I) -> Received {
        self.last_seen = now;
        self.deadline = now + self.timeout;

        let feed = self.frames.feed(bytes);

        Received {
            messages: feed.messages.into_iter().map(ProducerMessage::from_document).collect(),
            rejected: feed.rejected,
        }
    }

    /// Session has been silent for at least the timeout.
    pub fn is_expired(&self, now: I) -> bool {
        now >= self.deadline
    }

    /// When the session expires unless another datagram arrives.
    pub fn deadline(&self) -> I {
        self.deadline
    }

    /// When the last datagram arrived.
    pub fn last_seen(&self) -> I {
        self.last_seen
    }

    /// Bytes waiting for a delimiter.
    pub fn pending(&self) -> &[u8] {
        self.frames.pending()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_id(port: u16) -> SessionId {
        SessionId::new(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    #[test]
    fn new_session_is_armed() {
        let session = Session::new(test_id(9000), Duration::ZERO, DEFAULT_LIVENESS_TIMEOUT);

        assert_eq!(session.deadline(), Duration::from_millis(500));
        assert!(!session.is_expired(Duration::from_millis(499)));
        assert!(session.is_expired(Duration::from_millis(500)));
        assert!(session.pending().is_empty());
    }

    #[test]
    fn receive_rearms_deadline() {
        let mut session = Session::new(test_id(9000), Duration::ZERO, DEFAULT_LIVENESS_TIMEOUT);

        session.receive(b"{\"data\":1}\x0c", Duration::from_millis(300));

        assert_eq!(session.last_seen(), Duration::from_millis(300));
        assert_eq!(session.deadline(), Duration::from_millis(800));
        assert!(!session.is_expired(Duration::from_millis(600)));
    }

    #[test]
    fn partial_datagram_still_rearms() {
        let mut session = Session::new(test_id(9000), Duration::ZERO, DEFAULT_LIVENESS_TIMEOUT);

        let received = session.receive(b"{\"data\":", Duration::from_millis(400));

        assert!(received.messages.is_empty());
        assert_eq!(session.deadline(), Duration::from_millis(900));
        assert_eq!(session.pending(), b"{\"data\":");
    }

    #[test]
    fn receive_extracts_data_payloads() {
        let mut session = Session::new(test_id(9000), Duration::ZERO, DEFAULT_LIVENESS_TIMEOUT);

        let received = session.receive(b"{\"data\":1}\x0c{\"data\":{\"a\":2}}\x0c", Duration::ZERO);

        let data: Vec<_> = received.messages.into_iter().map(|m| m.data).collect();
        assert_eq!(data, vec![json!(1), json!({"a": 2})]);
        assert!(session.pending().is_empty());
    }

    #[test]
    fn rejected_segment_is_reported() {
        let mut session = Session::new(test_id(9000), Duration::ZERO, DEFAULT_LIVENESS_TIMEOUT);

        let received = session.receive(b"oops\x0c", Duration::ZERO);

        assert!(received.messages.is_empty());
        assert!(received.rejected.is_some());
    }

    #[test]
    fn session_id_round_trips_through_text() {
        let id = test_id(4567);
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.addr().port(), 4567);
    }

    #[test]
    fn session_id_serializes_as_address_string() {
        let id = test_id(8001);
        assert_eq!(serde_json::to_value(id).unwrap(), json!("127.0.0.1:8001"));
    }
}

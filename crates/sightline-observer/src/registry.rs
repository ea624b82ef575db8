//! Session registry.
//!
//! The single mapping from endpoint identifier to [`Session`]. Sessions are
//! created lazily by the first datagram from an endpoint and removed when
//! their liveness deadline passes. Lookups from the outbound path never
//! create a session.
//!
//! The registry is owned by the driver and only mutated from the driver's
//! event handlers, which the runtime serializes on one task. It therefore
//! needs no locking.

use std::{collections::HashMap, ops::Add, time::Duration};

use sightline_core::{Session, SessionId};

/// Registry of live producer sessions.
#[derive(Debug)]
pub struct SessionRegistry<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Session ID → session state
    sessions: HashMap<SessionId, Session<I>>,
}

impl<I> Default for SessionRegistry<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    fn default() -> Self {
        Self { sessions: HashMap::new() }
    }
}

impl<I> SessionRegistry<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for `id`, creating an empty one if absent.
    ///
    /// Returns `true` alongside the session if it was just created.
    pub fn get_or_create(
        &mut self,
        id: SessionId,
        now: I,
        timeout: Duration,
    ) -> (&mut Session<I>, bool) {
        let mut created = false;
        let session = self.sessions.entry(id).or_insert_with(|| {
            created = true;
            Session::new(id, now, timeout)
        });
        (session, created)
    }

    /// Session for `id`, without creating one.
    pub fn get(&self, id: SessionId) -> Option<&Session<I>> {
        self.sessions.get(&id)
    }

    /// Remove the session for `id`, dropping its buffer and deadline.
    pub fn remove(&mut self, id: SessionId) -> Option<Session<I>> {
        self.sessions.remove(&id)
    }

    /// Check if a session is registered.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Remove every session whose deadline is at or before `now`.
    ///
    /// Returned IDs are sorted so eviction order is deterministic.
    pub fn remove_expired(&mut self, now: I) -> Vec<SessionId> {
        let mut expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|session| session.is_expired(now))
            .map(Session::id)
            .collect();
        expired.sort_unstable();

        for id in &expired {
            self.sessions.remove(id);
        }

        expired
    }

    /// Earliest deadline among live sessions. `None` if there are none.
    pub fn next_deadline(&self) -> Option<I> {
        self.sessions.values().map(Session::deadline).min()
    }

    /// Remove all sessions.
    pub fn clear(&mut self) -> usize {
        let count = self.sessions.len();
        self.sessions.clear();
        count
    }

    /// All live sessions, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Session<I>> + '_ {
        self.sessions.values()
    }

    /// Total number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

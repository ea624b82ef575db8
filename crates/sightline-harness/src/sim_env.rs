//! Simulated environment with a manually advanced clock.
//!
//! Time only moves when a test calls [`SimEnv::advance`]. Instants are the
//! elapsed `Duration` since the environment was created, so assertions can
//! name exact deadlines (`Duration::from_millis(500)`) instead of computing
//! them from a real `Instant`.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use sightline_core::env::Environment;

/// Deterministic environment for tests.
///
/// Clones share one clock, so a test can keep a handle and advance the time
/// seen by a driver that owns another clone.
#[derive(Clone, Debug, Default)]
pub struct SimEnv {
    /// Elapsed virtual time in nanoseconds
    nanos: Arc<AtomicU64>,
}

impl SimEnv {
    /// Create an environment at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.elapsed()
    }

    /// Advances the virtual clock instead of waiting.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }
}

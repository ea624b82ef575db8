//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from the system clock. Production uses real
//! monotonic time; tests use a virtual clock they advance by hand, which makes
//! liveness expiry reproducible without sleeping.

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy
        + Ord
        + Debug
        + Send
        + Sync
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only runtime code awaits this. Session logic receives time as a
    /// parameter instead.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

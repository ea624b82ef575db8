//! Deterministic simulation harness for sightline observer testing.
//!
//! A virtual-clock implementation of the Environment trait plus an in-memory
//! runtime for the observer driver, so liveness expiry and routing can be
//! tested reproducibly without sockets or sleeping.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral checks that run after every
//! simulated step. Invariants verify WHAT must be true across all event
//! sequences, not specific scenarios. Use [`InvariantRegistry::standard()`]
//! for the common observer invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_env;
pub mod sim_observer;

pub use invariants::{
    ClosedSinkHoldsNoSessions, DisconnectEndsSession, Invariant, InvariantRegistry,
    InvariantResult, NoOverdueSessions, ObserverSnapshot, Violation,
};
pub use sim_env::SimEnv;
pub use sim_observer::{SimObserver, producer};

//! Sightline core: sans-IO session state.
//!
//! Pure data structures for the observer side of the sightline protocol. No
//! sockets, no clocks, no tasks: callers pass in received bytes and the
//! current time, and get decoded messages and expiry decisions back.
//!
//! # Components
//!
//! - [`Session`]: one producer's reassembly buffer and liveness deadline
//! - [`SessionId`]: canonical endpoint identifier
//! - [`ProducerView`]: last known state of a producer, folded from snapshots
//! - [`env::Environment`]: time abstraction shared with the runtime

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod session;
pub mod view;

pub use error::ViewError;
pub use session::{DEFAULT_LIVENESS_TIMEOUT, Received, Session, SessionId};
pub use view::{MAX_LOGS, ProducerView};

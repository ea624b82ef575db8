//! Sightline wire protocol.
//!
//! Producers and the observer exchange UTF-8 JSON documents over UDP. Each
//! document is terminated by a single form-feed byte; there is no length
//! prefix and no other framing.
//!
//! # Components
//!
//! - [`FrameBuffer`]: per-producer reassembly of delimiter-terminated
//!   documents from an arbitrary datagram sequence
//! - [`ProducerMessage`] and [`Snapshot`]: inbound payload shapes
//! - [`Command`]: outbound edit requests
//!
//! This crate performs no I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod errors;
pub mod frame;
pub mod message;

pub use command::{Command, CommandKind};
pub use errors::{ProtocolError, Result};
pub use frame::{FRAME_DELIMITER, Feed, FrameBuffer, decode_segment, encode_frame};
pub use message::{Event, LOG_EVENT, Named, ProducerMessage, Snapshot};

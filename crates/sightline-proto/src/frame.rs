//! Delimiter framing.
//!
//! Producers send UTF-8 JSON documents, each terminated by a single form-feed
//! byte ([`FRAME_DELIMITER`]). There is no length prefix. A datagram may carry
//! several documents, and one document may span several datagrams, so the
//! observer keeps a [`FrameBuffer`] per producer and re-scans it every time
//! new bytes arrive.
//!
//! # Invariants
//!
//! - After [`FrameBuffer::feed`] returns without a rejection, the pending
//!   buffer holds no delimiter: every complete segment has been extracted.
//! - When a segment fails to decode, extraction stops for that call. The
//!   remainder (which may contain further complete segments) stays pending
//!   until the next call to `feed`.
//! - The pending buffer is unbounded. A producer that never sends the
//!   delimiter grows it without limit.

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Byte terminating every message on the wire (ASCII form feed).
///
/// Never appears unescaped inside a JSON document.
pub const FRAME_DELIMITER: u8 = 0x0C;

/// Outcome of feeding one datagram into a [`FrameBuffer`].
#[derive(Debug, Default)]
pub struct Feed {
    /// Documents decoded by this call, in wire order.
    pub messages: Vec<Value>,
    /// Decode failure that stopped extraction, if any.
    ///
    /// When set, it always refers to the segment following the last entry in
    /// `messages`.
    pub rejected: Option<ProtocolError>,
}

impl Feed {
    /// No document was decoded and nothing was rejected.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.rejected.is_none()
    }
}

/// Reassembly buffer for one producer's byte stream.
#[derive(Debug, Default, Clone)]
pub struct FrameBuffer {
    pending: BytesMut,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received so far that do not yet form a complete segment.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Number of pending bytes.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Discard all pending bytes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Append `bytes` and extract every complete segment that precedes the
    /// first decode failure.
    ///
    /// An empty `bytes` still runs the extraction loop, which is how segments
    /// left behind by an earlier rejection get picked up.
    pub fn feed(&mut self, bytes: &[u8]) -> Feed {
        self.pending.extend_from_slice(bytes);

        let mut feed = Feed::default();
        while let Some(index) = self.pending.iter().position(|&b| b == FRAME_DELIMITER) {
            let segment = self.pending.split_to(index);
            self.pending.advance(1);

            match decode_segment(&segment) {
                Ok(value) => feed.messages.push(value),
                Err(e) => {
                    feed.rejected = Some(e);
                    break;
                },
            }
        }

        feed
    }
}

/// Decode one segment (delimiter excluded) into a JSON value.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD before parsing, so a stray
/// byte inside a string literal does not reject the whole document. An empty
/// segment is rejected like any other non-JSON text.
pub fn decode_segment(segment: &[u8]) -> Result<Value> {
    let text = String::from_utf8_lossy(segment);
    serde_json::from_str(&text)
        .map_err(|source| ProtocolError::InvalidJson { len: segment.len(), source })
}

/// Serialize `value` as JSON and append it to `dst` followed by
/// [`FRAME_DELIMITER`].
pub fn encode_frame<T: Serialize + ?Sized>(value: &T, dst: &mut impl BufMut) -> Result<()> {
    let body = serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
    dst.put_slice(&body);
    dst.put_u8(FRAME_DELIMITER);
    Ok(())
}

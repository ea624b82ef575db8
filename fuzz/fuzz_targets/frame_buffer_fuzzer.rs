//! Fuzz target for delimiter reassembly
//!
//! # Strategy
//!
//! - Raw chunks: Arbitrary bytes, delimiters anywhere, invalid UTF-8
//! - Valid stream: Well-formed documents cut at arbitrary points
//!
//! # Invariants
//!
//! - NEVER panic, whatever the bytes
//! - Unless a segment was rejected, pending bytes contain no delimiter
//! - A valid stream yields every document, in order, however it is cut
//! - Pending bytes are empty once a valid stream is fully fed

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Value};
use sightline_proto::{FrameBuffer, FRAME_DELIMITER};

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    RawChunks(Vec<Vec<u8>>),
    ValidStream { values: Vec<i32>, cuts: Vec<u16> },
}

fuzz_target!(|input: Input| {
    match input {
        Input::RawChunks(chunks) => {
            let mut buffer = FrameBuffer::new();
            for chunk in chunks {
                let feed = buffer.feed(&chunk);
                if feed.rejected.is_none() {
                    assert!(
                        !buffer.pending().contains(&FRAME_DELIMITER),
                        "complete segment left in pending buffer"
                    );
                }
            }
        },

        Input::ValidStream { values, cuts } => {
            let mut stream = Vec::new();
            for value in &values {
                stream.extend_from_slice(json!({ "data": value }).to_string().as_bytes());
                stream.push(FRAME_DELIMITER);
            }

            let mut points: Vec<usize> =
                cuts.iter().map(|c| usize::from(*c) % (stream.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut buffer = FrameBuffer::new();
            let mut decoded: Vec<Value> = Vec::new();
            let mut start = 0;
            for point in points.into_iter().chain(std::iter::once(stream.len())) {
                let feed = buffer.feed(&stream[start..point]);
                assert!(feed.rejected.is_none(), "valid segment rejected");
                decoded.extend(feed.messages);
                start = point;
            }

            let expected: Vec<Value> = values.iter().map(|v| json!({ "data": v })).collect();
            assert_eq!(decoded, expected);
            assert!(buffer.pending().is_empty());
        },
    }
});

//! Protocol module - command framing, chunk framing, and response parsing.
//!
//! This module implements the daemon-facing wire protocol:
//! - command frames (`n` + text + `\n`)
//! - chunked stream-upload frames (4-byte big-endian length + payload)
//! - the response line grammar and its parsed record type

mod framing;
mod response;

pub use framing::{
    command_frame, decode_chunk_header, encode_chunk_header, CHUNK_HEADER_SIZE, CHUNK_SIZE,
    COMMAND_PREFIX, END_OF_STREAM,
};
pub use response::{parse_response_line, ScanResult, ScanStatus};

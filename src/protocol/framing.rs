//! Wire framing for commands and chunked stream uploads.
//!
//! Command frame:
//! ```text
//! ┌────────┬──────────────┬──────┐
//! │ 'n'    │ command text │ '\n' │
//! └────────┴──────────────┴──────┘
//! ```
//!
//! The leading `n` asks the daemon to newline-terminate its responses
//! instead of holding the connection open; it goes on every command,
//! streaming or not.
//!
//! Chunk frame (stream upload):
//! ```text
//! ┌───────────┬────────────────┐
//! │ length    │ payload        │
//! │ 4 bytes   │ length bytes   │
//! │ uint32 BE │                │
//! └───────────┴────────────────┘
//! ```
//!
//! A zero-length frame (four zero bytes, no payload) is the
//! end-of-stream sentinel and triggers scanning of the assembled
//! stream.

/// Chunk size used when relaying a source stream to the daemon.
pub const CHUNK_SIZE: usize = 1024;

/// Size of the chunk length prefix in bytes.
pub const CHUNK_HEADER_SIZE: usize = 4;

/// Marker byte prepended to every command.
pub const COMMAND_PREFIX: u8 = b'n';

/// The end-of-stream sentinel frame.
pub const END_OF_STREAM: [u8; CHUNK_HEADER_SIZE] = [0, 0, 0, 0];

/// Build the wire bytes for a command.
pub fn command_frame(command: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(command.len() + 2);
    frame.push(COMMAND_PREFIX);
    frame.extend_from_slice(command.as_bytes());
    frame.push(b'\n');
    frame
}

/// Encode a chunk length prefix (network byte order).
#[inline]
pub fn encode_chunk_header(len: u32) -> [u8; CHUNK_HEADER_SIZE] {
    len.to_be_bytes()
}

/// Decode a chunk length prefix (network byte order).
#[inline]
pub fn decode_chunk_header(buf: [u8; CHUNK_HEADER_SIZE]) -> u32 {
    u32::from_be_bytes(buf)
}

// crates/sweep-runner/src/protocol.rs
// ============================================================================
// Module: Worker Wire Protocol
// Description: Content-Length framed JSON messages over pipes.
// Purpose: Carry vectors to workers and device hosts, and replies back.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every message is a JSON document preceded by a `Content-Length: <n>`
//! header and a blank line. The harness sends [`WorkerRequest`] frames to a
//! worker and reads [`sweep_core::WorkerReply`] frames back; a worker sends
//! [`DeviceRequest`] frames to a device host and reads the same reply shape.
//! End of input before a header is the stop signal, reported as
//! [`ProtocolError::Closed`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::Read;
use std::io::Write;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sweep_core::VectorParams;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted frame body size.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
/// Maximum accepted header block size, including blank separator lines.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Request sent from the harness to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Execute the module operation with these parameters.
    Execute {
        /// Vector parameters with identity fields stripped.
        params: VectorParams,
    },
}

/// Request sent from a worker to a device host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DeviceRequest {
    /// Execute the operation on the open device.
    Execute {
        /// Vector parameters.
        params: VectorParams,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Framing and decoding errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Peer closed the stream before a new frame began.
    #[error("stream closed")]
    Closed,
    /// Read or write failed.
    #[error("protocol io error: {0}")]
    Io(String),
    /// Frame header or body is malformed.
    #[error("invalid frame: {0}")]
    Invalid(String),
    /// Frame body exceeds the size limit.
    #[error("frame of {0} bytes exceeds limit")]
    TooLarge(usize),
    /// Frame header block exceeds the size limit.
    #[error("frame header exceeds {0} bytes")]
    HeaderTooLarge(usize),
}

// ============================================================================
// SECTION: Framing
// ============================================================================

/// Reads one framed payload.
///
/// # Errors
///
/// Returns [`ProtocolError::Closed`] on end of input before a header and
/// other variants for malformed or oversized frames. Header lines are read
/// at most [`MAX_HEADER_BYTES`] at a time, so a peer that never sends a
/// newline cannot grow the buffer without bound.
pub fn read_frame(
    reader: &mut impl BufRead,
    max_body_bytes: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    let mut saw_header = false;
    let mut header_bytes = 0usize;
    loop {
        line.clear();
        let budget = MAX_HEADER_BYTES - header_bytes + 1;
        let bytes = reader
            .by_ref()
            .take(u64::try_from(budget).unwrap_or(u64::MAX))
            .read_line(&mut line)
            .map_err(|err| ProtocolError::Io(err.to_string()))?;
        header_bytes += bytes;
        if header_bytes > MAX_HEADER_BYTES {
            return Err(ProtocolError::HeaderTooLarge(MAX_HEADER_BYTES));
        }
        if bytes == 0 {
            return Err(if saw_header {
                ProtocolError::Invalid("stream ended inside frame header".to_string())
            } else {
                ProtocolError::Closed
            });
        }
        if line.trim().is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| ProtocolError::Invalid("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len =
        content_length.ok_or_else(|| ProtocolError::Invalid("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(ProtocolError::TooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|err| ProtocolError::Io(err.to_string()))?;
    Ok(buf)
}

/// Writes one framed payload and flushes.
///
/// # Errors
///
/// Returns [`ProtocolError::Io`] when the write fails.
pub fn write_frame(writer: &mut impl Write, payload: &[u8]) -> Result<(), ProtocolError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes()).map_err(|err| ProtocolError::Io(err.to_string()))?;
    writer.write_all(payload).map_err(|err| ProtocolError::Io(err.to_string()))?;
    writer.flush().map_err(|err| ProtocolError::Io(err.to_string()))
}

/// Reads and decodes one framed JSON message.
///
/// # Errors
///
/// Returns [`ProtocolError`] when framing or decoding fails.
pub fn read_message<T: DeserializeOwned>(reader: &mut impl BufRead) -> Result<T, ProtocolError> {
    let payload = read_frame(reader, MAX_FRAME_BYTES)?;
    serde_json::from_slice(&payload).map_err(|err| ProtocolError::Invalid(err.to_string()))
}

/// Encodes and writes one framed JSON message.
///
/// # Errors
///
/// Returns [`ProtocolError`] when encoding or writing fails.
pub fn write_message<T: Serialize>(
    writer: &mut impl Write,
    message: &T,
) -> Result<(), ProtocolError> {
    let payload =
        serde_json::to_vec(message).map_err(|err| ProtocolError::Invalid(err.to_string()))?;
    write_frame(writer, &payload)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

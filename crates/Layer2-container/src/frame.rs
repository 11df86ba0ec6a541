//! Combined log stream framing
//!
//! Without a TTY the container runtime multiplexes stdout and stderr into a
//! single stream. Each chunk is prefixed by an 8-byte header:
//!
//! ```text
//! ┌────────┬───────────────┬──────────────────────────┐
//! │ stream │ 3 reserved    │ payload length (u32, BE) │
//! └────────┴───────────────┴──────────────────────────┘
//! ```

use infrarun_foundation::Error;
use thiserror::Error;

/// Size of a frame header in bytes
pub const FRAME_HEADER_LEN: usize = 8;

/// Stream tag carried by the first header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamType {
    Stdin = 0,
    Stdout = 1,
    Stderr = 2,
}

impl StreamType {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Truncated or corrupted log data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("unexpected EOF in log header at offset {offset} ({remaining} bytes left)")]
    TruncatedHeader { offset: usize, remaining: usize },

    #[error("unexpected EOF in log payload at offset {offset} (need {expected}, have {remaining})")]
    TruncatedPayload {
        offset: usize,
        expected: usize,
        remaining: usize,
    },
}

impl From<FrameError> for Error {
    fn from(err: FrameError) -> Self {
        Error::OutputRead(err.to_string())
    }
}

/// Extract the stdout payloads of a combined log stream, in order
pub fn demux_stdout(data: &[u8]) -> Result<Vec<u8>, FrameError> {
    let mut out = Vec::new();
    let mut cursor = 0;

    while cursor < data.len() {
        let remaining = data.len() - cursor;
        if remaining < FRAME_HEADER_LEN {
            return Err(FrameError::TruncatedHeader {
                offset: cursor,
                remaining,
            });
        }

        let header = &data[cursor..cursor + FRAME_HEADER_LEN];
        let stream = header[0];
        let length = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        cursor += FRAME_HEADER_LEN;

        let remaining = data.len() - cursor;
        if remaining < length {
            return Err(FrameError::TruncatedPayload {
                offset: cursor,
                expected: length,
                remaining,
            });
        }

        if stream == StreamType::Stdout.tag() {
            out.extend_from_slice(&data[cursor..cursor + length]);
        }
        cursor += length;
    }

    Ok(out)
}

/// Append one frame to `buf`
pub fn encode_frame(stream: StreamType, payload: &[u8], buf: &mut Vec<u8>) {
    buf.reserve(FRAME_HEADER_LEN + payload.len());
    buf.push(stream.tag());
    buf.extend_from_slice(&[0, 0, 0]);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
}

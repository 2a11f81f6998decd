//! Message framing for the peer serial protocol.
//!
//! Peers stream payload in arbitrary chunks; a `%` byte terminates each
//! message. Every complete message whose second-to-last character is `1`
//! carries the peer's alert flag. The host acknowledges every received chunk
//! with a single `*` byte (the acknowledgement itself is written by the
//! session loop, not here).

use bytes::BytesMut;
use tracing::warn;

/// Byte that terminates a message.
pub const FRAME_TERMINATOR: u8 = b'%';

/// Acknowledgement written back to the peer after each received chunk.
pub const ACK: &[u8] = b"*";

/// Messages longer than this without a terminator indicate a peer speaking a
/// different protocol; the buffer is dropped rather than grown unboundedly.
const MAX_PENDING: usize = 4096;

/// A complete message extracted from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message text, trimmed of surrounding whitespace.
    pub text: String,
    /// Whether the peer set its alert flag in this message.
    pub alert: bool,
}

/// Incremental splitter turning raw chunks into [`Frame`]s.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    pending: BytesMut,
}

impl FrameSplitter {
    /// Create an empty splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect any messages it completes.
    ///
    /// Empty messages (terminator with nothing buffered) are skipped, not
    /// errors.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();

        for &byte in chunk {
            if byte == FRAME_TERMINATOR {
                if let Some(frame) = self.take_pending() {
                    frames.push(frame);
                }
            } else {
                if self.pending.len() >= MAX_PENDING {
                    warn!(
                        pending = self.pending.len(),
                        "no frame terminator within limit, dropping buffered data"
                    );
                    self.pending.clear();
                }
                self.pending.extend_from_slice(&[byte]);
            }
        }

        frames
    }

    fn take_pending(&mut self) -> Option<Frame> {
        let raw = self.pending.split();
        let text = String::from_utf8_lossy(&raw);
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let bytes = text.as_bytes();
        let alert = bytes.len() >= 2 && bytes[bytes.len() - 2] == b'1';

        Some(Frame {
            text: text.to_string(),
            alert,
        })
    }
}

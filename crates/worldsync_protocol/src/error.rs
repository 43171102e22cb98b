//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Payload did not parse as a protocol message.
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Discriminator named a type outside the message set.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Declared frame length exceeds the frame-size cap.
    #[error("frame of {length} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared payload length.
        length: usize,
        /// Maximum allowed payload length.
        max: usize,
    },
}

impl ProtocolError {
    /// Returns true if the stream is still synchronized after this error.
    ///
    /// A recoverable error consumed its frame; the connection can keep
    /// reading. An oversized frame cannot be skipped and ends the stream.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProtocolError::FrameTooLarge { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(ProtocolError::UnknownMessageType("NOPE".into()).is_recoverable());
        assert!(!ProtocolError::FrameTooLarge {
            length: usize::MAX,
            max: 1,
        }
        .is_recoverable());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::FrameTooLarge {
            length: 100,
            max: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("10"));
    }
}

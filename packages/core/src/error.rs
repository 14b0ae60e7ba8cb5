//! Error types for the datagram layer.

use iondg_ll_buffer::BufferError;
use thiserror::Error;

use crate::datagram::ValueId;

/// Errors raised while decoding, mutating or encoding a datagram.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw source could not produce a well-formed value.
    #[error(
        "decode error{}: {message}",
        .position.map(|p| format!(" at byte {}", p)).unwrap_or_default()
    )]
    Decode {
        message: String,
        position: Option<usize>,
    },

    /// Re-encoding the datagram into its buffer failed. The buffer is left
    /// in an indeterminate state.
    #[error("encode error: {message}")]
    Encode { message: String },

    /// The datagram deliberately does not support this operation.
    #[error("unsupported operation on datagram: {operation}")]
    UnsupportedOperation { operation: &'static str },

    /// The value is already owned by a container.
    #[error("value {id} is already contained")]
    AlreadyContained { id: ValueId },

    /// A logical or physical index was out of bounds.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The handle does not belong to this datagram.
    #[error("unknown value {id}")]
    UnknownValue { id: ValueId },

    /// Streaming to a sink failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
            position: None,
        }
    }

    pub fn decode_at(position: usize, message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Error::Encode {
            message: message.into(),
        }
    }

    pub fn unsupported(operation: &'static str) -> Self {
        Error::UnsupportedOperation { operation }
    }

    /// Wrap a buffer failure hit while reading.
    pub fn from_read(e: BufferError) -> Self {
        Error::decode(e.to_string())
    }

    /// Wrap a buffer failure hit while synchronizing.
    pub fn from_write(e: BufferError) -> Self {
        Error::encode(e.to_string())
    }
}

/// Result type alias for datagram operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn decode_display_includes_position() {
        let e = Error::decode_at(17, "bad type descriptor");
        assert_eq!(
            format!("{}", e),
            "decode error at byte 17: bad type descriptor"
        );

        let e = Error::decode("truncated");
        assert_eq!(format!("{}", e), "decode error: truncated");
    }

    #[test]
    fn unsupported_display() {
        let e = Error::unsupported("clear");
        assert!(format!("{}", e).contains("clear"));
    }

    #[test]
    fn index_display() {
        let e = Error::IndexOutOfRange { index: 5, len: 2 };
        assert_eq!(format!("{}", e), "index 5 out of range (len 2)");
    }

    #[test]
    fn buffer_errors_wrap_by_direction() {
        let read = Error::from_read(BufferError::UnexpectedEnd {
            needed: 4,
            available: 1,
        });
        assert!(matches!(read, Error::Decode { .. }));

        let write = Error::from_write(BufferError::OutOfBounds {
            position: 9,
            len: 3,
        });
        assert!(matches!(write, Error::Encode { .. }));
    }

    #[test]
    fn io_error_has_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let e: Error = io_err.into();
        assert!(StdError::source(&e).is_some());
    }
}

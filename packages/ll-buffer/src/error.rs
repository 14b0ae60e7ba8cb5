//! Error types for the byte arena.
//!
//! Errors at this level are positional only. Nothing here knows what the
//! bytes mean - malformed values are reported by higher layers.

/// Errors raised by [`crate::Buffer`] cursors.
#[derive(Debug)]
pub enum BufferError {
    /// A cursor was moved outside the valid range.
    OutOfBounds {
        /// The requested position.
        position: usize,
        /// The length (or read limit) the position was checked against.
        len: usize,
    },

    /// A read needed more bytes than the read limit allows.
    UnexpectedEnd {
        /// Bytes requested.
        needed: usize,
        /// Bytes left before the read limit.
        available: usize,
    },

    /// Streaming the buffer to a sink failed.
    Io(std::io::Error),
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::OutOfBounds { position, len } => {
                write!(f, "position {} out of bounds (len {})", position, len)
            }
            BufferError::UnexpectedEnd { needed, available } => write!(
                f,
                "unexpected end of buffer: needed {} bytes, {} available",
                needed, available
            ),
            BufferError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for BufferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BufferError {
    fn from(e: std::io::Error) -> Self {
        BufferError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn error_display_works() {
        let e = BufferError::OutOfBounds {
            position: 12,
            len: 4,
        };
        assert_eq!(format!("{}", e), "position 12 out of bounds (len 4)");

        let e = BufferError::UnexpectedEnd {
            needed: 8,
            available: 3,
        };
        assert!(format!("{}", e).contains("needed 8"));
        assert!(format!("{}", e).contains("3 available"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let e: BufferError = io_err.into();
        assert!(matches!(e, BufferError::Io(_)));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn positional_errors_have_no_source() {
        let e = BufferError::OutOfBounds {
            position: 1,
            len: 0,
        };
        assert!(StdError::source(&e).is_none());
    }
}

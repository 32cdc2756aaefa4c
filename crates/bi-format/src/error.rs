//! Decode faults for the bi format

use std::fmt;
use std::io;

/// A violation of the log grammar, or an I/O failure while reading it.
///
/// Every grammar fault carries the byte offset at which it was detected.
/// None of these are recoverable: the log is unusable from that offset on.
#[derive(Debug)]
pub enum DecodeError {
    Io(Box<io::Error>),
    /// Fixed bytes were required but something else (possibly nothing) was read
    UnexpectedBytes {
        expected: Vec<u8>,
        found: Vec<u8>,
        offset: u64,
    },
    UnknownTag {
        valid: String,
        found: u8,
        offset: u64,
    },
    /// Input ended before a required delimiter
    UnexpectedEof { expected: &'static str, offset: u64 },
    InvalidInteger { text: Vec<u8>, offset: u64 },
    InvalidLength { text: Vec<u8>, offset: u64 },
}

impl DecodeError {
    /// Offset into the stream where the fault was detected, if it is a
    /// grammar fault rather than an I/O failure.
    pub fn offset(&self) -> Option<u64> {
        match self {
            DecodeError::Io(_) => None,
            DecodeError::UnexpectedBytes { offset, .. }
            | DecodeError::UnknownTag { offset, .. }
            | DecodeError::UnexpectedEof { offset, .. }
            | DecodeError::InvalidInteger { offset, .. }
            | DecodeError::InvalidLength { offset, .. } => Some(*offset),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Io(err) => write!(f, "IO error: {}", err),
            DecodeError::UnexpectedBytes {
                expected,
                found,
                offset,
            } => write!(
                f,
                "Expected '{}', but got '{}' at offset {}",
                expected.escape_ascii(),
                found.escape_ascii(),
                offset
            ),
            DecodeError::UnknownTag {
                valid,
                found,
                offset,
            } => write!(
                f,
                "Expected {}, but got '{}' at offset {}",
                valid,
                found.escape_ascii(),
                offset
            ),
            DecodeError::UnexpectedEof { expected, offset } => write!(
                f,
                "Expected {}, reached end of input at offset {}",
                expected, offset
            ),
            DecodeError::InvalidInteger { text, offset } => write!(
                f,
                "Invalid integer '{}' at offset {}",
                text.escape_ascii(),
                offset
            ),
            DecodeError::InvalidLength { text, offset } => write!(
                f,
                "Invalid blob length '{}' at offset {}",
                text.escape_ascii(),
                offset
            ),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;

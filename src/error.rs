//! Error types for tinynpy

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::io;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, NpyError>;

/// Broad failure class of an [`NpyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad magic or signature, unsupported byte order, malformed header
    Format,
    /// Word size, shape or payload length disagrees with what was expected
    SizeMismatch,
    /// Open, read, write or seek failed
    Io,
    /// The deflate codec failed
    Compression,
    /// Requested archive entry does not exist
    NotFound,
}

/// tinynpy error type
#[derive(Debug)]
pub enum NpyError {
    /// File does not start with `\x93NUMPY`
    InvalidMagic,
    /// Header major version not understood
    UnsupportedVersion(u8),
    /// Header dictionary lacks a required key
    MissingKey(&'static str),
    /// Byte order marker other than little-endian or not-applicable
    UnsupportedByteOrder(char),
    /// Type character outside `f`, `i`, `u`, `b`, `c`
    UnsupportedTypeCode(char),
    /// Malformed header dictionary or preamble
    InvalidHeader(Cow<'static, str>),
    /// Malformed archive envelope
    InvalidArchive(Cow<'static, str>),
    /// Entry bytes do not match the recorded CRC-32
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Appending data with a different element width
    WordSizeMismatch { expected: usize, actual: usize },
    /// Appending data whose trailing dimensions differ
    ShapeMismatch {
        existing: Vec<usize>,
        appended: Vec<usize>,
    },
    /// Byte count differs from the count implied by the header
    DataSizeMismatch { expected: u64, actual: u64 },
    /// Underlying I/O failure, including short reads
    Io(io::Error),
    /// Deflate or inflate failure
    Compression(Cow<'static, str>),
    /// Archive has no entry with the requested name
    NotFound { name: String },
}

impl NpyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NpyError::InvalidMagic
            | NpyError::UnsupportedVersion(_)
            | NpyError::MissingKey(_)
            | NpyError::UnsupportedByteOrder(_)
            | NpyError::UnsupportedTypeCode(_)
            | NpyError::InvalidHeader(_)
            | NpyError::InvalidArchive(_)
            | NpyError::ChecksumMismatch { .. } => ErrorKind::Format,
            NpyError::WordSizeMismatch { .. }
            | NpyError::ShapeMismatch { .. }
            | NpyError::DataSizeMismatch { .. } => ErrorKind::SizeMismatch,
            NpyError::Io(_) => ErrorKind::Io,
            NpyError::Compression(_) => ErrorKind::Compression,
            NpyError::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}

impl fmt::Display for NpyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NpyError::InvalidMagic => write!(f, "Invalid header id, not an npy file"),
            NpyError::UnsupportedVersion(v) => write!(f, "Unsupported npy format version: {}", v),
            NpyError::MissingKey(key) => {
                write!(f, "Failed to find header keyword '{}'", key)
            }
            NpyError::UnsupportedByteOrder(c) => write!(f, "Unsupported byte order '{}'", c),
            NpyError::UnsupportedTypeCode(c) => write!(f, "Unsupported type code '{}'", c),
            NpyError::InvalidHeader(msg) => write!(f, "Invalid npy header: {}", msg),
            NpyError::InvalidArchive(msg) => write!(f, "Invalid npz archive: {}", msg),
            NpyError::ChecksumMismatch { expected, actual } => write!(
                f,
                "CRC-32 mismatch: recorded 0x{:08X}, computed 0x{:08X}",
                expected, actual
            ),
            NpyError::WordSizeMismatch { expected, actual } => write!(
                f,
                "Word size mismatch: file has {} bytes per value, got {}",
                expected, actual
            ),
            NpyError::ShapeMismatch { existing, appended } => write!(
                f,
                "Attempting to append misshaped data: {:?} onto {:?}",
                appended, existing
            ),
            NpyError::DataSizeMismatch { expected, actual } => write!(
                f,
                "Data size mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            NpyError::Io(e) => write!(f, "I/O error: {}", e),
            NpyError::Compression(msg) => write!(f, "Compression error: {}", msg),
            NpyError::NotFound { name } => write!(f, "Variable name '{}' not found", name),
        }
    }
}

impl Error for NpyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NpyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NpyError {
    fn from(e: io::Error) -> Self {
        NpyError::Io(e)
    }
}

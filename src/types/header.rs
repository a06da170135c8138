//! Header constants and the parsed array header

use super::{Layout, TypeCode, ValueKind};

/// First byte of every npy file
pub const MAGIC_BYTE: u8 = 0x93;

/// Format name following the magic byte
pub const FORMAT_NAME: &[u8; 5] = b"NUMPY";

/// Magic prefix identifying an npy file
pub const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Magic + major + minor
pub const PREAMBLE_SIZE: usize = 8;

/// Preamble + 2-byte header length (format version 1)
pub const V1_PREFIX_SIZE: usize = 10;

/// Preamble + 4-byte header length (format version 2 and later)
pub const V2_PREFIX_SIZE: usize = 12;

/// Largest dictionary a version 1 header can describe
pub const V1_MAX_HEADER_LEN: usize = u16::MAX as usize;

/// Total header size is padded to a multiple of this
pub const HEADER_ALIGNMENT: usize = 16;

/// Byte order marker written by this machine.
///
/// Payloads are written in native order and decoded as little-endian, and the
/// parser accepts only `<` and `|`, so big-endian hosts are not supported.
pub const NATIVE_BYTE_ORDER: u8 = if cfg!(target_endian = "little") {
    b'<'
} else {
    b'>'
};

/// Array description carried by an npy header dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayHeader {
    pub type_code: TypeCode,
    pub word_size: usize,
    pub layout: Layout,
    pub shape: Vec<usize>,
}

impl ArrayHeader {
    pub fn value_kind(&self) -> ValueKind {
        ValueKind::from_descr(self.type_code as u8, self.word_size)
    }

    /// Element count, `None` when the shape overflows `usize`
    pub fn checked_num_values(&self) -> Option<usize> {
        checked_num_values(&self.shape)
    }

    /// Payload size in bytes, `None` on overflow
    pub fn checked_size_bytes(&self) -> Option<usize> {
        self.checked_num_values()?.checked_mul(self.word_size)
    }
}

/// Product of the dimensions; an empty shape describes one scalar
pub fn checked_num_values(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

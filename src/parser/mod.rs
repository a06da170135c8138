//! Binary parsers for the npy header and the npz envelope
//!
//! Header and record parsing works on in-memory bytes or streams; `parse_npy`
//! returns a view borrowing the payload from the input buffer.

mod header;
mod take;
mod zip;

pub use header::{parse_dictionary, parse_header, read_header};
pub use zip::{compression_method, parse_central_dir, parse_end_of_central_dir, parse_local_header};

use crate::error::{NpyError, Result};
use crate::types::NpyArrayView;
use std::io::{self, Read};

/// Parse a complete npy file held in memory.
///
/// The returned view borrows the payload from `bytes`; bytes after the payload are ignored.
pub fn parse_npy(bytes: &[u8]) -> Result<NpyArrayView<'_>> {
    let (header, header_len) = parse_header(bytes)?;
    let size = payload_size(&header)?;
    let data = bytes
        .get(header_len..)
        .and_then(|rest| rest.get(..size))
        .ok_or_else(|| NpyError::DataSizeMismatch {
            expected: size as u64,
            actual: bytes.len().saturating_sub(header_len) as u64,
        })?;
    NpyArrayView::from_header(header, data)
}

/// Read exactly `len` bytes into a new buffer.
///
/// The buffer grows with the bytes actually read, so a bogus length from an
/// untrusted header fails with `UnexpectedEof` instead of allocating `len` up front.
pub(crate) fn read_bytes<R: Read + ?Sized>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, read {}", len, buf.len()),
        ));
    }
    Ok(buf)
}

pub(crate) fn payload_size(header: &crate::types::ArrayHeader) -> Result<usize> {
    header.checked_size_bytes().ok_or_else(|| {
        NpyError::InvalidHeader(format!("shape {:?} overflows", header.shape).into())
    })
}

//! Serialization of npy headers and npz envelope records

mod header;
mod zip;

pub use header::{dictionary, header_bytes, header_bytes_padded};
pub use zip::{EntrySizes, central_record_bytes, end_of_central_dir_bytes, local_header_bytes};

use crate::error::Result;
use crate::types::NpyArrayView;
use std::io::Write;

/// Write a complete npy file: header then payload
pub fn write_npy<W: Write>(writer: &mut W, array: &NpyArrayView<'_>) -> Result<()> {
    writer.write_all(&header_bytes(&array.header()))?;
    writer.write_all(array.data())?;
    Ok(())
}

/// Write a complete npy file to bytes
pub fn to_bytes(array: &NpyArrayView<'_>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_npy(&mut buf, array)?;
    Ok(buf)
}

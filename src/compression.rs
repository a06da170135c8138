//! Raw deflate compression and decompression for archive entries.
//!
//! Entries use the headerless deflate stream of the ZIP format; both sizes are
//! known up front from the local header.

use crate::error::{NpyError, Result};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use std::io::{Read, Write};

/// Compress bytes into a raw deflate stream
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| NpyError::Compression(format!("can not compress: {}", e).into()))?;
    encoder
        .finish()
        .map_err(|e| NpyError::Compression(format!("can not compress: {}", e).into()))
}

/// Decompress a raw deflate stream that must produce exactly `expected_size` bytes
pub fn inflate(compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    // the declared size is untrusted, so it only bounds the initial capacity
    let mut output = Vec::with_capacity(expected_size.min(compressed.len().saturating_mul(4)));
    // one extra byte is enough to detect an oversized stream
    DeflateDecoder::new(compressed)
        .take((expected_size as u64).saturating_add(1))
        .read_to_end(&mut output)
        .map_err(|e| NpyError::Compression(format!("can not uncompress: {}", e).into()))?;

    if output.len() != expected_size {
        return Err(NpyError::Compression(
            format!(
                "inflated {} bytes, expected {}",
                output.len(),
                expected_size
            )
            .into(),
        ));
    }
    Ok(output)
}

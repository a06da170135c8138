//! ZIP envelope record serialization

use crate::error::{NpyError, Result};
use crate::types::{
    CENTRAL_HEADER_SIGNATURE, CompressionMethod, END_OF_CENTRAL_DIR_SIGNATURE,
    END_OF_CENTRAL_DIR_SIZE, LOCAL_HEADER_SIGNATURE, LOCAL_HEADER_SIZE, ZIP_VERSION,
};

/// Sizes and checksum of one entry body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySizes {
    pub compression: CompressionMethod,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

/// Build a local file header followed by the file name (no extra field)
pub fn local_header_bytes(file_name: &str, sizes: &EntrySizes) -> Result<Vec<u8>> {
    let name = file_name.as_bytes();
    let name_len = u16::try_from(name.len())
        .map_err(|_| NpyError::InvalidArchive("entry name too long".into()))?;

    let mut bytes = Vec::with_capacity(LOCAL_HEADER_SIZE + name.len());
    bytes.extend_from_slice(&LOCAL_HEADER_SIGNATURE.to_le_bytes());
    bytes.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version needed to extract
    bytes.extend_from_slice(&0u16.to_le_bytes()); // general purpose flags
    bytes.extend_from_slice(&(sizes.compression as u16).to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // last mod time
    bytes.extend_from_slice(&0u16.to_le_bytes()); // last mod date
    bytes.extend_from_slice(&sizes.crc32.to_le_bytes());
    bytes.extend_from_slice(&sizes.compressed_size.to_le_bytes());
    bytes.extend_from_slice(&sizes.uncompressed_size.to_le_bytes());
    bytes.extend_from_slice(&name_len.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // extra field length
    bytes.extend_from_slice(name);
    Ok(bytes)
}

/// Build the central directory record matching a local header.
///
/// The span from version-needed through extra-field-length is copied from the
/// local header; `local_header_offset` is where that local header starts.
pub fn central_record_bytes(local_header: &[u8], local_header_offset: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(local_header.len() + 16);
    bytes.extend_from_slice(&CENTRAL_HEADER_SIGNATURE.to_le_bytes());
    bytes.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version made by
    bytes.extend_from_slice(&local_header[4..LOCAL_HEADER_SIZE]);
    bytes.extend_from_slice(&0u16.to_le_bytes()); // file comment length
    bytes.extend_from_slice(&0u16.to_le_bytes()); // disk number start
    bytes.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
    bytes.extend_from_slice(&0u32.to_le_bytes()); // external attributes
    bytes.extend_from_slice(&local_header_offset.to_le_bytes());
    bytes.extend_from_slice(&local_header[LOCAL_HEADER_SIZE..]);
    bytes
}

/// Build the end of central directory record
pub fn end_of_central_dir_bytes(
    entries: u16,
    central_dir_size: u32,
    central_dir_offset: u32,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(END_OF_CENTRAL_DIR_SIZE);
    bytes.extend_from_slice(&END_OF_CENTRAL_DIR_SIGNATURE.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // this disk
    bytes.extend_from_slice(&0u16.to_le_bytes()); // disk with central directory
    bytes.extend_from_slice(&entries.to_le_bytes());
    bytes.extend_from_slice(&entries.to_le_bytes());
    bytes.extend_from_slice(&central_dir_size.to_le_bytes());
    bytes.extend_from_slice(&central_dir_offset.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // comment length
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_central_dir, parse_end_of_central_dir, parse_local_header};
    use crate::types::CENTRAL_HEADER_SIZE;

    fn sizes() -> EntrySizes {
        EntrySizes {
            compression: CompressionMethod::Deflated,
            crc32: 0x1234_5678,
            compressed_size: 40,
            uncompressed_size: 144,
        }
    }

    #[test]
    fn test_local_header_layout() {
        let bytes = local_header_bytes("a.npy", &sizes()).unwrap();
        assert_eq!(bytes.len(), LOCAL_HEADER_SIZE + 5);
        assert_eq!(&bytes[..4], b"PK\x03\x04");
        assert_eq!(&bytes[LOCAL_HEADER_SIZE..], b"a.npy");

        let fixed: [u8; LOCAL_HEADER_SIZE] = bytes[..LOCAL_HEADER_SIZE].try_into().unwrap();
        let parsed = parse_local_header(&fixed).unwrap().unwrap();
        assert_eq!(parsed.version_needed, ZIP_VERSION);
        assert_eq!(parsed.compression, 8);
        assert_eq!(parsed.crc32, 0x1234_5678);
        assert_eq!(parsed.compressed_size, 40);
        assert_eq!(parsed.uncompressed_size, 144);
        assert_eq!(parsed.name_len, 5);
        assert_eq!(parsed.extra_len, 0);
    }

    #[test]
    fn test_central_record_copies_local_fields() {
        let local = local_header_bytes("weights.npy", &sizes()).unwrap();
        let central = central_record_bytes(&local, 777);
        assert_eq!(central.len(), CENTRAL_HEADER_SIZE + "weights.npy".len());
        assert_eq!(&central[6..32], &local[4..30]);

        let records = parse_central_dir(&central).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "weights");
        assert_eq!(records[0].compression, CompressionMethod::Deflated);
        assert_eq!(records[0].compressed_size, 40);
        assert_eq!(records[0].uncompressed_size, 144);
        assert_eq!(records[0].local_header_offset, 777);
    }

    #[test]
    fn test_footer_roundtrip() {
        let bytes = end_of_central_dir_bytes(3, 150, 4096);
        let fixed: [u8; END_OF_CENTRAL_DIR_SIZE] = bytes.try_into().unwrap();
        let eocd = parse_end_of_central_dir(&fixed).unwrap();
        assert_eq!(eocd.entries, 3);
        assert_eq!(eocd.central_dir_size, 150);
        assert_eq!(eocd.central_dir_offset, 4096);
    }

    #[test]
    fn test_name_too_long() {
        let name = "x".repeat(70_000);
        assert!(local_header_bytes(&name, &sizes()).is_err());
    }
}

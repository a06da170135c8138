//! Reading npy files and npz archives
//!
//! Archive entries are scanned front to back through their local headers; the
//! scan stops at the first record that is not a local header, which is where the
//! central directory begins.

use crate::compression;
use crate::error::{NpyError, Result};
use crate::parser::{
    compression_method, parse_central_dir, parse_end_of_central_dir, parse_header,
    parse_local_header, payload_size, read_bytes, read_header,
};
use crate::types::{
    ArrayHeader, CompressionMethod, END_OF_CENTRAL_DIR_SIZE, EndOfCentralDir, EntryRecord,
    LOCAL_HEADER_SIGNATURE, LOCAL_HEADER_SIZE, LocalHeader, MAGIC, NpyArray,
    array_name_from_file_name,
};
use log::{debug, trace};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Arrays of an npz archive keyed by name
pub type NpzArrays = BTreeMap<String, NpyArray>;

/// Outcome of reading one archive entry
#[derive(Debug)]
pub enum NpzEntry {
    /// Entry matched the request and was decoded
    Array { name: String, array: NpyArray },
    /// Entry did not match; its payload was skipped
    Skipped { name: String },
    /// The central directory was reached
    End,
}

/// Contents of a file whose format was detected from its magic bytes
#[derive(Debug)]
pub enum NpyContents {
    Array(NpyArray),
    Archive(NpzArrays),
}

/// Read a single npy array from a stream positioned at its magic bytes
pub fn read_npy<R: Read>(reader: &mut R) -> Result<NpyArray> {
    let (header, _) = read_header(reader)?;
    let size = payload_size(&header)?;
    let data = read_bytes(reader, size)?;
    NpyArray::from_header(header, data)
}

/// Load an npy file
pub fn load_npy<P: AsRef<Path>>(path: P) -> Result<NpyArray> {
    let mut reader = BufReader::new(File::open(path)?);
    read_npy(&mut reader)
}

/// Read the archive entry at the current position.
///
/// An empty `requested` name matches any entry. Non-matching entries are skipped
/// by seeking over their compressed bytes without allocating a buffer.
pub fn read_npz_entry<R: Read + Seek>(reader: &mut R, requested: &str) -> Result<NpzEntry> {
    let mut fixed = [0u8; LOCAL_HEADER_SIZE];
    reader.read_exact(&mut fixed[..4])?;
    if fixed[..4] != LOCAL_HEADER_SIGNATURE.to_le_bytes() {
        reader.seek(SeekFrom::Current(-4))?;
        return Ok(NpzEntry::End);
    }
    reader.read_exact(&mut fixed[4..])?;
    let local = parse_local_header(&fixed)?.ok_or(NpyError::InvalidArchive(
        "local header signature not found".into(),
    ))?;

    let file_name = read_bytes(reader, local.name_len as usize)?;
    let file_name = String::from_utf8(file_name)
        .map_err(|_| NpyError::InvalidArchive("entry name is not UTF-8".into()))?;
    let name = array_name_from_file_name(&file_name).to_string();

    let extra = read_bytes(reader, local.extra_len as usize)?;
    let (compressed_size, uncompressed_size) = entry_sizes(&local, &extra)?;

    if !requested.is_empty() && requested != name {
        trace!("skipping npz entry '{}' ({} bytes)", name, compressed_size);
        let skip = i64::try_from(compressed_size)
            .map_err(|_| NpyError::InvalidArchive("entry size out of range".into()))?;
        reader.seek(SeekFrom::Current(skip))?;
        return Ok(NpzEntry::Skipped { name });
    }

    let method = compression_method(local.compression)?;
    let body = read_bytes(reader, to_usize(compressed_size)?)?;

    let array = match method {
        CompressionMethod::Stored => {
            verify_crc(local.crc32, &body)?;
            decode_stored(body)?
        }
        CompressionMethod::Deflated => {
            let inflated = compression::inflate(&body, to_usize(uncompressed_size)?)?;
            verify_crc(local.crc32, &inflated)?;
            decode_inflated(inflated)?
        }
    };
    debug!(
        "decoded npz entry '{}' shape={:?} method={:?}",
        name,
        array.shape(),
        method
    );
    Ok(NpzEntry::Array { name, array })
}

/// Read the archive entry named `name`; an empty name returns the first entry
pub fn read_npz_array<R: Read + Seek>(reader: &mut R, name: &str) -> Result<NpyArray> {
    loop {
        match read_npz_entry(reader, name)? {
            NpzEntry::Array { array, .. } => return Ok(array),
            NpzEntry::Skipped { .. } => continue,
            NpzEntry::End => {
                return Err(NpyError::NotFound {
                    name: name.to_string(),
                });
            }
        }
    }
}

/// Read every entry of an archive; a repeated name replaces the earlier entry
pub fn read_npz<R: Read + Seek>(reader: &mut R) -> Result<NpzArrays> {
    let mut arrays = NpzArrays::new();
    loop {
        match read_npz_entry(reader, "")? {
            NpzEntry::Array { name, array } => {
                arrays.insert(name, array);
            }
            NpzEntry::Skipped { .. } => continue,
            NpzEntry::End => return Ok(arrays),
        }
    }
}

/// Load one array from an npz file
pub fn load_npz_array<P: AsRef<Path>>(path: P, name: &str) -> Result<NpyArray> {
    let mut reader = BufReader::new(File::open(path)?);
    read_npz_array(&mut reader, name)
}

/// Load every array from an npz file
pub fn load_npz<P: AsRef<Path>>(path: P) -> Result<NpzArrays> {
    let mut reader = BufReader::new(File::open(path)?);
    read_npz(&mut reader)
}

/// Read the footer at the end of an archive
pub fn read_end_of_central_dir<R: Read + Seek>(reader: &mut R) -> Result<EndOfCentralDir> {
    reader.seek(SeekFrom::End(-(END_OF_CENTRAL_DIR_SIZE as i64)))?;
    let mut footer = [0u8; END_OF_CENTRAL_DIR_SIZE];
    reader.read_exact(&mut footer)?;
    parse_end_of_central_dir(&footer)
}

/// List the entries of an archive from its central directory
pub fn read_npz_index<R: Read + Seek>(reader: &mut R) -> Result<Vec<EntryRecord>> {
    let eocd = read_end_of_central_dir(reader)?;
    reader.seek(SeekFrom::Start(eocd.central_dir_offset as u64))?;
    let central_dir = read_bytes(reader, eocd.central_dir_size as usize)?;

    let records = parse_central_dir(&central_dir)?;
    if records.len() != eocd.entries as usize {
        return Err(NpyError::InvalidArchive(
            format!(
                "footer lists {} entries, central directory has {}",
                eocd.entries,
                records.len()
            )
            .into(),
        ));
    }
    Ok(records)
}

/// List the entries of an npz file
pub fn load_npz_index<P: AsRef<Path>>(path: P) -> Result<Vec<EntryRecord>> {
    let mut reader = BufReader::new(File::open(path)?);
    read_npz_index(&mut reader)
}

/// Load a file as either a single array or an archive, chosen by its magic bytes
pub fn load<P: AsRef<Path>>(path: P) -> Result<NpyContents> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;

    if &magic == MAGIC {
        Ok(NpyContents::Array(read_npy(&mut reader)?))
    } else if magic.starts_with(b"PK\x03\x04") || magic.starts_with(b"PK\x05\x06") {
        Ok(NpyContents::Archive(read_npz(&mut reader)?))
    } else {
        Err(NpyError::InvalidMagic)
    }
}

impl NpyArray {
    /// Load an npy file
    pub fn load_npy<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_npy(path)
    }

    /// Load one array from an npz file
    pub fn load_npz<P: AsRef<Path>>(path: P, name: &str) -> Result<Self> {
        load_npz_array(path, name)
    }
}

const ZIP64_SENTINEL: u32 = u32::MAX;
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Effective (compressed, uncompressed) sizes, honoring a ZIP64 extra field
fn entry_sizes(local: &LocalHeader, extra: &[u8]) -> Result<(u64, u64)> {
    let mut compressed = local.compressed_size as u64;
    let mut uncompressed = local.uncompressed_size as u64;
    if local.compressed_size != ZIP64_SENTINEL && local.uncompressed_size != ZIP64_SENTINEL {
        return Ok((compressed, uncompressed));
    }

    let mut fields = extra;
    while fields.len() >= 4 {
        let id = u16::from_le_bytes([fields[0], fields[1]]);
        let len = u16::from_le_bytes([fields[2], fields[3]]) as usize;
        let data = fields
            .get(4..4 + len)
            .ok_or_else(|| NpyError::InvalidArchive("truncated extra field".into()))?;
        if id == ZIP64_EXTRA_ID {
            let mut values = data
                .chunks_exact(8)
                .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]));
            if local.uncompressed_size == ZIP64_SENTINEL {
                uncompressed = values.next().ok_or_else(zip64_missing)?;
            }
            if local.compressed_size == ZIP64_SENTINEL {
                compressed = values.next().ok_or_else(zip64_missing)?;
            }
            return Ok((compressed, uncompressed));
        }
        fields = &fields[4 + len..];
    }
    Err(zip64_missing())
}

fn zip64_missing() -> NpyError {
    NpyError::InvalidArchive("ZIP64 sizes missing from extra field".into())
}

fn verify_crc(expected: u32, bytes: &[u8]) -> Result<()> {
    let actual = crc32fast::hash(bytes);
    if actual != expected {
        return Err(NpyError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Stored entry: the payload follows the header directly
fn decode_stored(body: Vec<u8>) -> Result<NpyArray> {
    let (header, header_len) = parse_header(&body)?;
    extract_payload(header, body, header_len)
}

/// Inflated entry: the payload is the last `size` bytes of the inflated span
fn decode_inflated(inflated: Vec<u8>) -> Result<NpyArray> {
    let (header, header_len) = parse_header(&inflated)?;
    let size = payload_size(&header)?;
    if inflated.len() < header_len + size {
        return Err(NpyError::DataSizeMismatch {
            expected: size as u64,
            actual: (inflated.len() - header_len) as u64,
        });
    }
    let offset = inflated.len() - size;
    extract_payload(header, inflated, offset)
}

fn extract_payload(header: ArrayHeader, mut bytes: Vec<u8>, offset: usize) -> Result<NpyArray> {
    let size = payload_size(&header)?;
    let available = bytes.len().saturating_sub(offset);
    if available < size {
        return Err(NpyError::DataSizeMismatch {
            expected: size as u64,
            actual: available as u64,
        });
    }
    bytes.truncate(offset + size);
    bytes.drain(..offset);
    NpyArray::from_header(header, bytes)
}

fn to_usize(size: u64) -> Result<usize> {
    usize::try_from(size).map_err(|_| NpyError::InvalidArchive("entry size out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Layout, TypeCode};

    #[test]
    fn test_read_npy_stream() {
        let values = [1i32, 2, 3, 4, 5, 6];
        let array = NpyArray::from_vec(vec![2, 3], &values).unwrap();
        let bytes = crate::writer::to_bytes(&array.view().unwrap()).unwrap();

        let decoded = read_npy(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded.shape(), &[2, 3]);
        assert_eq!(decoded.num_values(), 6);
        assert_eq!(decoded.size_bytes(), 24);
        assert_eq!(decoded.to_vec::<i32>(), Some(values.to_vec()));
    }

    #[test]
    fn test_read_npy_short_payload_is_io() {
        let array = NpyArray::from_vec(vec![4], &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let bytes = crate::writer::to_bytes(&array.view().unwrap()).unwrap();
        let result = read_npy(&mut &bytes[..bytes.len() - 2]);
        assert!(matches!(result, Err(NpyError::Io(_))));
    }

    #[test]
    fn test_decode_inflated_uses_trailing_bytes() {
        let header = crate::writer::header_bytes(&ArrayHeader {
            type_code: TypeCode::UInt,
            word_size: 1,
            layout: Layout::RowMajor,
            shape: vec![3],
        });
        let mut inflated = header.clone();
        inflated.extend_from_slice(&[9, 9, 1, 2, 3]);

        let array = decode_inflated(inflated).unwrap();
        assert_eq!(array.data().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_decode_stored_short() {
        let header = crate::writer::header_bytes(&ArrayHeader {
            type_code: TypeCode::Int,
            word_size: 8,
            layout: Layout::RowMajor,
            shape: vec![2],
        });
        let mut body = header;
        body.extend_from_slice(&[0u8; 12]);
        assert!(matches!(
            decode_stored(body),
            Err(NpyError::DataSizeMismatch {
                expected: 16,
                actual: 12
            })
        ));
    }

    #[test]
    fn test_zip64_extra_sizes() {
        let local = LocalHeader {
            version_needed: 45,
            flags: 0,
            compression: 0,
            mod_time: 0,
            mod_date: 0,
            crc32: 0,
            compressed_size: u32::MAX,
            uncompressed_size: u32::MAX,
            name_len: 0,
            extra_len: 20,
        };
        let mut extra = Vec::new();
        extra.extend_from_slice(&ZIP64_EXTRA_ID.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&200u64.to_le_bytes());
        extra.extend_from_slice(&150u64.to_le_bytes());
        assert_eq!(entry_sizes(&local, &extra).unwrap(), (150, 200));

        assert!(entry_sizes(&local, &[]).is_err());
    }

    #[test]
    fn test_huge_declared_shape_is_short_read() {
        let mut bytes = crate::writer::header_bytes(&ArrayHeader {
            type_code: TypeCode::UInt,
            word_size: 1,
            layout: Layout::RowMajor,
            shape: vec![1usize << 50],
        });
        bytes.extend_from_slice(&[0u8; 8]);

        let result = read_npy(&mut bytes.as_slice());
        match result {
            Err(NpyError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected short read, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_zip64_entry_is_short_read() {
        let name = b"a.npy";
        let mut extra = Vec::new();
        extra.extend_from_slice(&ZIP64_EXTRA_ID.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&(1u64 << 50).to_le_bytes());
        extra.extend_from_slice(&(1u64 << 50).to_le_bytes());

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&LOCAL_HEADER_SIGNATURE.to_le_bytes());
        bytes.extend_from_slice(&45u16.to_le_bytes()); // version needed
        bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
        bytes.extend_from_slice(&0u16.to_le_bytes()); // stored
        bytes.extend_from_slice(&[0u8; 4]); // mod time + date
        bytes.extend_from_slice(&0u32.to_le_bytes()); // crc32
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(&extra);
        bytes.extend_from_slice(&[0u8; 64]);

        let result = read_npz_array(&mut std::io::Cursor::new(bytes), "a");
        assert!(matches!(result, Err(NpyError::Io(_))));
    }

    #[test]
    fn test_crc_mismatch() {
        let err = verify_crc(0, b"abc").unwrap_err();
        assert!(matches!(err, NpyError::ChecksumMismatch { expected: 0, .. }));
    }
}

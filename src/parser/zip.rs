//! ZIP envelope record parsing

use super::take::take;
use crate::error::{NpyError, Result};
use crate::types::{
    CENTRAL_HEADER_SIGNATURE, CENTRAL_HEADER_SIZE, CompressionMethod, END_OF_CENTRAL_DIR_SIGNATURE,
    END_OF_CENTRAL_DIR_SIZE, EndOfCentralDir, EntryRecord, LOCAL_HEADER_SIGNATURE,
    LOCAL_HEADER_SIZE, LocalHeader, array_name_from_file_name,
};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Parse the fixed part of a local file header.
///
/// Returns `Ok(None)` when the signature is not a local header signature, which
/// marks the start of the central directory.
pub fn parse_local_header(bytes: &[u8; LOCAL_HEADER_SIZE]) -> Result<Option<LocalHeader>> {
    let mut cursor = Cursor::new(&bytes[..]);
    if cursor.read_u32::<LittleEndian>()? != LOCAL_HEADER_SIGNATURE {
        return Ok(None);
    }
    Ok(Some(LocalHeader {
        version_needed: cursor.read_u16::<LittleEndian>()?,
        flags: cursor.read_u16::<LittleEndian>()?,
        compression: cursor.read_u16::<LittleEndian>()?,
        mod_time: cursor.read_u16::<LittleEndian>()?,
        mod_date: cursor.read_u16::<LittleEndian>()?,
        crc32: cursor.read_u32::<LittleEndian>()?,
        compressed_size: cursor.read_u32::<LittleEndian>()?,
        uncompressed_size: cursor.read_u32::<LittleEndian>()?,
        name_len: cursor.read_u16::<LittleEndian>()?,
        extra_len: cursor.read_u16::<LittleEndian>()?,
    }))
}

/// Resolve a raw compression method, rejecting methods other than stored/deflate
pub fn compression_method(raw: u16) -> Result<CompressionMethod> {
    CompressionMethod::from_u16(raw).ok_or_else(|| {
        NpyError::InvalidArchive(format!("unsupported compression method {}", raw).into())
    })
}

/// Parse the end of central directory record.
///
/// Multi-disk archives, entry-count disagreement and archive comments are rejected.
pub fn parse_end_of_central_dir(bytes: &[u8; END_OF_CENTRAL_DIR_SIZE]) -> Result<EndOfCentralDir> {
    let mut cursor = Cursor::new(&bytes[..]);
    if cursor.read_u32::<LittleEndian>()? != END_OF_CENTRAL_DIR_SIGNATURE {
        return Err(NpyError::InvalidArchive(
            "end of central directory signature not found".into(),
        ));
    }
    let disk = cursor.read_u16::<LittleEndian>()?;
    let disk_start = cursor.read_u16::<LittleEndian>()?;
    if disk != 0 || disk_start != 0 {
        return Err(NpyError::InvalidArchive("multi-disk archives are not supported".into()));
    }
    let entries_on_disk = cursor.read_u16::<LittleEndian>()?;
    let entries = cursor.read_u16::<LittleEndian>()?;
    if entries_on_disk != entries {
        return Err(NpyError::InvalidArchive(
            format!(
                "entry count on disk {} differs from total {}",
                entries_on_disk, entries
            )
            .into(),
        ));
    }
    let central_dir_size = cursor.read_u32::<LittleEndian>()?;
    let central_dir_offset = cursor.read_u32::<LittleEndian>()?;
    let comment_len = cursor.read_u16::<LittleEndian>()?;
    if comment_len != 0 {
        return Err(NpyError::InvalidArchive("archive comments are not supported".into()));
    }
    Ok(EndOfCentralDir {
        entries,
        central_dir_size,
        central_dir_offset,
    })
}

/// Parse every record of a central directory
pub fn parse_central_dir(bytes: &[u8]) -> Result<Vec<EntryRecord>> {
    let mut cursor = Cursor::new(bytes);
    let mut records = Vec::new();
    while (cursor.position() as usize) < bytes.len() {
        records.push(parse_central_record(&mut cursor)?);
    }
    Ok(records)
}

fn parse_central_record(cursor: &mut Cursor<&[u8]>) -> Result<EntryRecord> {
    let fixed = take(cursor, CENTRAL_HEADER_SIZE).map_err(|_| {
        NpyError::InvalidArchive("truncated central directory record".into())
    })?;
    let mut fields = Cursor::new(fixed);
    if fields.read_u32::<LittleEndian>()? != CENTRAL_HEADER_SIGNATURE {
        return Err(NpyError::InvalidArchive(
            "central directory signature not found".into(),
        ));
    }
    let _version_made_by = fields.read_u16::<LittleEndian>()?;
    let _version_needed = fields.read_u16::<LittleEndian>()?;
    let _flags = fields.read_u16::<LittleEndian>()?;
    let compression = compression_method(fields.read_u16::<LittleEndian>()?)?;
    let _mod_time = fields.read_u16::<LittleEndian>()?;
    let _mod_date = fields.read_u16::<LittleEndian>()?;
    let crc32 = fields.read_u32::<LittleEndian>()?;
    let compressed_size = fields.read_u32::<LittleEndian>()?;
    let uncompressed_size = fields.read_u32::<LittleEndian>()?;
    let name_len = fields.read_u16::<LittleEndian>()? as usize;
    let extra_len = fields.read_u16::<LittleEndian>()? as usize;
    let comment_len = fields.read_u16::<LittleEndian>()? as usize;
    let _disk_start = fields.read_u16::<LittleEndian>()?;
    let _internal_attrs = fields.read_u16::<LittleEndian>()?;
    let _external_attrs = fields.read_u32::<LittleEndian>()?;
    let local_header_offset = fields.read_u32::<LittleEndian>()?;

    let truncated = |_| NpyError::InvalidArchive("truncated central directory record".into());
    let name = take(cursor, name_len).map_err(truncated)?;
    take(cursor, extra_len + comment_len).map_err(truncated)?;

    let name = std::str::from_utf8(name)
        .map_err(|_| NpyError::InvalidArchive("entry name is not UTF-8".into()))?;

    Ok(EntryRecord {
        name: array_name_from_file_name(name).to_string(),
        compression,
        compressed_size,
        uncompressed_size,
        crc32,
        local_header_offset,
    })
}

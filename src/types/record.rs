//! Archive envelope records (ZIP local header, central directory, footer)

/// `PK\x03\x04`
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// `PK\x01\x02`
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;

/// `PK\x05\x06`
pub const END_OF_CENTRAL_DIR_SIGNATURE: u32 = 0x0605_4b50;

/// Fixed part of a local file header
pub const LOCAL_HEADER_SIZE: usize = 30;

/// Fixed part of a central directory record
pub const CENTRAL_HEADER_SIZE: usize = 46;

/// End of central directory record without comment
pub const END_OF_CENTRAL_DIR_SIZE: usize = 22;

/// Version needed to extract / version made by
pub const ZIP_VERSION: u16 = 20;

/// Suffix appended to array names inside an archive
pub const NPY_SUFFIX: &str = ".npy";

/// Per-entry compression method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum CompressionMethod {
    #[default]
    Stored = 0,
    Deflated = 8,
}

impl CompressionMethod {
    pub fn from_u16(method: u16) -> Option<Self> {
        match method {
            0 => Some(CompressionMethod::Stored),
            8 => Some(CompressionMethod::Deflated),
            _ => None,
        }
    }
}

/// Fields of a local file header, name and extra field excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

/// End of central directory summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndOfCentralDir {
    pub entries: u16,
    pub central_dir_size: u32,
    pub central_dir_offset: u32,
}

/// One archive entry as described by the envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Array name without the `.npy` suffix
    pub name: String,
    pub compression: CompressionMethod,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub crc32: u32,
    pub local_header_offset: u32,
}

/// Array name for a file name inside the archive.
///
/// Case sensitive; names without the `.npy` suffix are kept whole.
pub fn array_name_from_file_name(file_name: &str) -> &str {
    file_name.strip_suffix(NPY_SUFFIX).unwrap_or(file_name)
}

/// File name stored in the archive for an array name
pub fn file_name_from_array_name(name: &str) -> String {
    format!("{}{}", name, NPY_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures_spell_pk() {
        assert_eq!(&LOCAL_HEADER_SIGNATURE.to_le_bytes(), b"PK\x03\x04");
        assert_eq!(&CENTRAL_HEADER_SIGNATURE.to_le_bytes(), b"PK\x01\x02");
        assert_eq!(&END_OF_CENTRAL_DIR_SIGNATURE.to_le_bytes(), b"PK\x05\x06");
    }

    #[test]
    fn test_name_suffix() {
        assert_eq!(file_name_from_array_name("weights"), "weights.npy");
        assert_eq!(array_name_from_file_name("weights.npy"), "weights");
        assert_eq!(array_name_from_file_name("weights.NPY"), "weights.NPY");
        assert_eq!(array_name_from_file_name("a.npy.npy"), "a.npy");
    }

    #[test]
    fn test_compression_method() {
        assert_eq!(CompressionMethod::from_u16(0), Some(CompressionMethod::Stored));
        assert_eq!(CompressionMethod::from_u16(8), Some(CompressionMethod::Deflated));
        assert_eq!(CompressionMethod::from_u16(12), None);
        assert_eq!(CompressionMethod::Deflated as u16, 8);
    }
}

//! Writing npy files and npz archives
//!
//! An npz archive is treated as an append-only run of entry blocks followed by a
//! relocatable suffix (central directory + footer). Appending an entry writes
//! the new block where the old central directory started, then rewrites the
//! suffix after it; earlier entry bytes are never touched.

use crate::compression;
use crate::decoder::read_end_of_central_dir;
use crate::error::{NpyError, Result};
use crate::parser::{payload_size, read_bytes, read_header};
use crate::types::{
    CompressionMethod, END_OF_CENTRAL_DIR_SIZE, NpyArray, NpyArrayView, file_name_from_array_name,
};
use crate::writer::{
    EntrySizes, central_record_bytes, end_of_central_dir_bytes, header_bytes, header_bytes_padded,
    local_header_bytes, write_npy,
};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Options for saving into an npz archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    /// Add to an existing archive instead of replacing it
    pub append: bool,
    /// Compression applied to the new entry
    pub compression: CompressionMethod,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }
}

/// Save an array as an npy file.
///
/// With `append` set and an existing file at `path`, the array is appended
/// along the first axis; otherwise the file is created or truncated.
pub fn save_npy<P: AsRef<Path>>(path: P, array: &NpyArrayView<'_>, append: bool) -> Result<()> {
    let path = path.as_ref();
    if append {
        if let Some(mut file) = open_existing(path)? {
            debug!("appending {:?} to {}", array.shape(), path.display());
            return append_npy(&mut file, array);
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_npy(&mut writer, array)?;
    writer.flush()?;
    Ok(())
}

/// Append an array to an existing npy file along its first axis.
///
/// The word size, type code and all dimensions except the first must match. The
/// header is rewritten in place; if the grown header no longer fits, the existing
/// payload is moved after it.
pub fn append_npy<F: Read + Write + Seek>(file: &mut F, array: &NpyArrayView<'_>) -> Result<()> {
    file.seek(SeekFrom::Start(0))?;
    let (existing, old_header_len) = read_header(file)?;

    if existing.layout.is_column_major() || array.layout().is_column_major() {
        return Err(NpyError::InvalidHeader(
            "appending column-major arrays is not supported".into(),
        ));
    }
    if existing.word_size != array.word_size() {
        return Err(NpyError::WordSizeMismatch {
            expected: existing.word_size,
            actual: array.word_size(),
        });
    }
    if existing.type_code != array.type_code() {
        return Err(NpyError::InvalidHeader(
            format!(
                "type code mismatch: file holds '{}', appending '{}'",
                existing.type_code.as_char(),
                array.type_code().as_char()
            )
            .into(),
        ));
    }
    let shape_mismatch = || NpyError::ShapeMismatch {
        existing: existing.shape.clone(),
        appended: array.shape().to_vec(),
    };
    if existing.shape.is_empty()
        || existing.shape.len() != array.shape().len()
        || existing.shape[1..] != array.shape()[1..]
    {
        return Err(shape_mismatch());
    }

    let old_payload_len = payload_size(&existing)?;
    let mut grown = existing.clone();
    grown.shape[0] = existing.shape[0]
        .checked_add(array.shape()[0])
        .ok_or_else(shape_mismatch)?;
    payload_size(&grown)?;

    let end = file.seek(SeekFrom::End(0))?;
    let expected_end = (old_header_len + old_payload_len) as u64;
    if end != expected_end {
        return Err(NpyError::DataSizeMismatch {
            expected: old_payload_len as u64,
            actual: end.saturating_sub(old_header_len as u64),
        });
    }

    let header = header_bytes_padded(&grown, old_header_len);
    if header.len() == old_header_len {
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header)?;
        file.seek(SeekFrom::Start(expected_end))?;
        file.write_all(array.data())?;
    } else {
        debug!(
            "npy header grew from {} to {} bytes, relocating payload",
            old_header_len,
            header.len()
        );
        file.seek(SeekFrom::Start(old_header_len as u64))?;
        let old_payload = read_bytes(file, old_payload_len)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header)?;
        file.write_all(&old_payload)?;
        file.write_all(array.data())?;
    }
    file.flush()?;
    Ok(())
}

/// Save an array as entry `name` of an npz archive
pub fn save_npz<P: AsRef<Path>>(
    path: P,
    name: &str,
    array: &NpyArrayView<'_>,
    options: SaveOptions,
) -> Result<()> {
    let path = path.as_ref();
    if options.append {
        if let Some(mut file) = open_existing(path)? {
            debug!("adding entry '{}' to {}", name, path.display());
            return append_npz_entry(&mut file, name, array, options.compression);
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_npz_entry(&mut writer, name, array, options.compression)?;
    writer.flush()?;
    Ok(())
}

/// Write a fresh archive holding a single entry
pub fn write_npz_entry<W: Write>(
    writer: &mut W,
    name: &str,
    array: &NpyArrayView<'_>,
    compression: CompressionMethod,
) -> Result<()> {
    let entry = EncodedEntry::new(name, array, compression, 0)?;
    entry.write_to(writer)?;
    writer.write_all(&entry.central_record)?;
    let footer = end_of_central_dir_bytes(
        1,
        to_u32(entry.central_record.len())?,
        to_u32(entry.len())?,
    );
    writer.write_all(&footer)?;
    debug!("wrote npz entry '{}' ({:?})", name, compression);
    Ok(())
}

/// Append an entry to an existing archive.
///
/// The new entry overwrites the old central directory; the directory is then
/// written back with one more record, followed by a fresh footer.
pub fn append_npz_entry<F: Read + Write + Seek>(
    file: &mut F,
    name: &str,
    array: &NpyArrayView<'_>,
    compression: CompressionMethod,
) -> Result<()> {
    let eocd = read_end_of_central_dir(file)?;
    let end = file.stream_position()?;
    let central_dir_offset = eocd.central_dir_offset as u64;
    if central_dir_offset + eocd.central_dir_size as u64 + END_OF_CENTRAL_DIR_SIZE as u64 != end {
        return Err(NpyError::InvalidArchive(
            "central directory does not end at the footer".into(),
        ));
    }
    let entries = eocd
        .entries
        .checked_add(1)
        .ok_or_else(|| NpyError::InvalidArchive("too many entries".into()))?;

    file.seek(SeekFrom::Start(central_dir_offset))?;
    let mut central_dir = read_bytes(file, eocd.central_dir_size as usize)?;

    let entry = EncodedEntry::new(name, array, compression, eocd.central_dir_offset)?;
    let new_central_dir_offset = to_u32(central_dir_offset as usize + entry.len())?;
    central_dir.extend_from_slice(&entry.central_record);
    let footer = end_of_central_dir_bytes(entries, to_u32(central_dir.len())?, new_central_dir_offset);

    file.seek(SeekFrom::Start(central_dir_offset))?;
    entry.write_to(file)?;
    file.write_all(&central_dir)?;
    file.write_all(&footer)?;
    file.flush()?;
    debug!(
        "appended npz entry '{}' ({:?}), archive now has {} entries",
        name, compression, entries
    );
    Ok(())
}

impl NpyArray {
    /// Save as an npy file; see [`save_npy`]
    pub fn save_npy<P: AsRef<Path>>(&self, path: P, append: bool) -> Result<()> {
        save_npy(path, &self.require_view()?, append)
    }

    /// Save as entry `name` of an npz archive; see [`save_npz`]
    pub fn save_npz<P: AsRef<Path>>(&self, path: P, name: &str, options: SaveOptions) -> Result<()> {
        save_npz(path, name, &self.require_view()?, options)
    }

    fn require_view(&self) -> Result<NpyArrayView<'_>> {
        self.view().ok_or(NpyError::DataSizeMismatch {
            expected: self.size_bytes() as u64,
            actual: 0,
        })
    }
}

/// Entry block ready to be written: local header, npy header and payload
struct EncodedEntry<'a> {
    local_header: Vec<u8>,
    body: EntryBody<'a>,
    central_record: Vec<u8>,
}

enum EntryBody<'a> {
    Stored { npy_header: Vec<u8>, payload: &'a [u8] },
    Deflated(Vec<u8>),
}

impl<'a> EncodedEntry<'a> {
    fn new(
        name: &str,
        array: &NpyArrayView<'a>,
        compression: CompressionMethod,
        local_header_offset: u32,
    ) -> Result<Self> {
        let npy_header = header_bytes(&array.header());
        let payload = array.data();
        let uncompressed_size = to_u32(npy_header.len() + payload.len())?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&npy_header);
        hasher.update(payload);
        let crc32 = hasher.finalize();

        let body = match compression {
            CompressionMethod::Stored => EntryBody::Stored {
                npy_header,
                payload,
            },
            CompressionMethod::Deflated => {
                let mut raw = npy_header;
                raw.extend_from_slice(payload);
                EntryBody::Deflated(compression::deflate(&raw)?)
            }
        };

        let sizes = EntrySizes {
            compression,
            crc32,
            compressed_size: to_u32(body.len())?,
            uncompressed_size,
        };
        let local_header = local_header_bytes(&file_name_from_array_name(name), &sizes)?;
        let central_record = central_record_bytes(&local_header, local_header_offset);

        Ok(Self {
            local_header,
            body,
            central_record,
        })
    }

    /// Bytes occupied by the entry block (local header + body)
    fn len(&self) -> usize {
        self.local_header.len() + self.body.len()
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.local_header)?;
        match &self.body {
            EntryBody::Stored {
                npy_header,
                payload,
            } => {
                writer.write_all(npy_header)?;
                writer.write_all(payload)
            }
            EntryBody::Deflated(bytes) => writer.write_all(bytes),
        }
    }
}

impl EntryBody<'_> {
    fn len(&self) -> usize {
        match self {
            EntryBody::Stored {
                npy_header,
                payload,
            } => npy_header.len() + payload.len(),
            EntryBody::Deflated(bytes) => bytes.len(),
        }
    }
}

/// Open an existing file for read/write; `None` if it does not exist
fn open_existing(path: &Path) -> Result<Option<File>> {
    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn to_u32(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| NpyError::InvalidArchive("archive exceeds 4 GiB; ZIP64 is not supported".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{NpzEntry, read_npy, read_npz, read_npz_entry, read_npz_index};
    use std::io::Cursor;

    fn fresh_archive(name: &str, array: &NpyArrayView<'_>, method: CompressionMethod) -> Cursor<Vec<u8>> {
        let mut bytes = Vec::new();
        write_npz_entry(&mut bytes, name, array, method).unwrap();
        Cursor::new(bytes)
    }

    #[test]
    fn test_fresh_archive_layout() {
        let values = [1.0f32, 2.0, 3.0, 4.0];
        let view = NpyArrayView::from_slice(&values, vec![4]).unwrap();
        let archive = fresh_archive("a", &view, CompressionMethod::Stored).into_inner();

        assert_eq!(&archive[..4], b"PK\x03\x04");
        let footer = &archive[archive.len() - END_OF_CENTRAL_DIR_SIZE..];
        assert_eq!(&footer[..4], b"PK\x05\x06");
        assert_eq!(u16::from_le_bytes([footer[8], footer[9]]), 1);
        assert_eq!(u16::from_le_bytes([footer[10], footer[11]]), 1);
    }

    #[test]
    fn test_append_rebuilds_directory() {
        let a = [1i64, 2, 3];
        let b = [4.0f64, 5.0];
        let mut archive = fresh_archive(
            "first",
            &NpyArrayView::from_slice(&a, vec![]).unwrap(),
            CompressionMethod::Stored,
        );
        append_npz_entry(
            &mut archive,
            "second",
            &NpyArrayView::from_slice(&b, vec![]).unwrap(),
            CompressionMethod::Deflated,
        )
        .unwrap();

        let index = read_npz_index(&mut archive).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].name, "first");
        assert_eq!(index[0].local_header_offset, 0);
        assert_eq!(index[1].name, "second");
        assert_eq!(index[1].compression, CompressionMethod::Deflated);

        // the second local header starts where the first directory used to be
        let first_block = 30 + "first.npy".len() + index[0].compressed_size as usize;
        assert_eq!(index[1].local_header_offset as usize, first_block);

        archive.set_position(0);
        let arrays = read_npz(&mut archive).unwrap();
        assert_eq!(arrays["first"].to_vec::<i64>(), Some(a.to_vec()));
        assert_eq!(arrays["second"].to_vec::<f64>(), Some(b.to_vec()));
    }

    #[test]
    fn test_crc_covers_header_and_payload() {
        let values = [9u8, 8, 7];
        let view = NpyArrayView::from_slice(&values, vec![]).unwrap();
        let mut archive = fresh_archive("x", &view, CompressionMethod::Stored);

        let index = read_npz_index(&mut archive).unwrap();
        let mut npy = header_bytes(&view.header());
        npy.extend_from_slice(&values);
        assert_eq!(index[0].crc32, crc32fast::hash(&npy));
    }

    #[test]
    fn test_corrupted_entry_fails_crc() {
        let values = [1u32, 2, 3, 4];
        let view = NpyArrayView::from_slice(&values, vec![]).unwrap();
        let mut bytes = fresh_archive("x", &view, CompressionMethod::Stored).into_inner();
        // last payload byte sits just before the central directory
        let payload_end = bytes.len() - END_OF_CENTRAL_DIR_SIZE - (46 + "x.npy".len());
        bytes[payload_end - 1] ^= 0xFF;

        let result = read_npz_entry(&mut Cursor::new(bytes), "x");
        assert!(matches!(result, Err(NpyError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_skip_non_matching() {
        let values = [1i16, 2];
        let view = NpyArrayView::from_slice(&values, vec![]).unwrap();
        let mut archive = fresh_archive("a", &view, CompressionMethod::Deflated);

        assert!(matches!(
            read_npz_entry(&mut archive, "b").unwrap(),
            NpzEntry::Skipped { name } if name == "a"
        ));
        assert!(matches!(read_npz_entry(&mut archive, "b").unwrap(), NpzEntry::End));
    }

    #[test]
    fn test_append_npy_in_memory() {
        let first = [1i32, 2, 3, 4, 5, 6];
        let second = [7i32, 8, 9];
        let mut file = Cursor::new(Vec::new());
        write_npy(&mut file, &NpyArrayView::from_slice(&first, vec![2, 3]).unwrap()).unwrap();

        append_npy(&mut file, &NpyArrayView::from_slice(&second, vec![1, 3]).unwrap()).unwrap();

        file.set_position(0);
        let grown = read_npy(&mut file).unwrap();
        assert_eq!(grown.shape(), &[3, 3]);
        assert_eq!(grown.to_vec::<i32>(), Some((1..=9).collect()));
    }

    #[test]
    fn test_append_npy_relocates_when_header_grows() {
        // 80 byte header for (1, 1, 1, 1, 1); (100, 1, 1, 1, 1) needs 96
        let mut file = Cursor::new(Vec::new());
        let base = [7u8];
        write_npy(&mut file, &NpyArrayView::from_slice(&base, vec![1, 1, 1, 1, 1]).unwrap()).unwrap();
        assert_eq!(file.get_ref().len(), 81);

        let extra = [1u8; 99];
        append_npy(&mut file, &NpyArrayView::from_slice(&extra, vec![99, 1, 1, 1, 1]).unwrap()).unwrap();
        assert_eq!(file.get_ref().len(), 96 + 100);

        file.set_position(0);
        let grown = read_npy(&mut file).unwrap();
        assert_eq!(grown.shape(), &[100, 1, 1, 1, 1]);
        let data = grown.data().unwrap();
        assert_eq!(data[0], 7);
        assert!(data[1..].iter().all(|&b| b == 1));
    }

    #[test]
    fn test_append_npy_keeps_header_length_when_it_fits() {
        let mut file = Cursor::new(Vec::new());
        write_npy(&mut file, &NpyArrayView::from_slice(&[7u8], vec![1, 1, 1, 1, 1]).unwrap()).unwrap();
        let extra = [1u8; 9];
        append_npy(&mut file, &NpyArrayView::from_slice(&extra, vec![9, 1, 1, 1, 1]).unwrap()).unwrap();
        assert_eq!(file.get_ref().len(), 80 + 10);
    }

    #[test]
    fn test_append_npy_word_size_mismatch() {
        let mut file = Cursor::new(Vec::new());
        write_npy(&mut file, &NpyArrayView::from_slice(&[1i32, 2], vec![]).unwrap()).unwrap();
        let result = append_npy(&mut file, &NpyArrayView::from_slice(&[1i64], vec![]).unwrap());
        assert!(matches!(
            result,
            Err(NpyError::WordSizeMismatch {
                expected: 4,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_options_builder() {
        let options = SaveOptions::new()
            .with_append(true)
            .with_compression(CompressionMethod::Deflated);
        assert!(options.append);
        assert_eq!(options.compression, CompressionMethod::Deflated);
        assert_eq!(SaveOptions::default().compression, CompressionMethod::Stored);
    }
}

//! npy header parsing: preamble and dictionary

use super::read_bytes;
use super::take::take;
use crate::error::{NpyError, Result};
use crate::types::{ArrayHeader, FORMAT_NAME, Layout, MAGIC_BYTE, PREAMBLE_SIZE, TypeCode};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Validate the magic bytes and return the format major version
fn parse_preamble(preamble: &[u8; PREAMBLE_SIZE]) -> Result<u8> {
    if preamble[0] != MAGIC_BYTE || &preamble[1..6] != FORMAT_NAME {
        return Err(NpyError::InvalidMagic);
    }
    let major = preamble[6];
    if major == 0 {
        return Err(NpyError::UnsupportedVersion(major));
    }
    Ok(major)
}

/// Read the header-length field, whose width depends on the major version
fn read_header_len<R: Read>(reader: &mut R, major: u8) -> Result<(usize, usize)> {
    if major > 1 {
        Ok((reader.read_u32::<LittleEndian>()? as usize, 4))
    } else {
        Ok((reader.read_u16::<LittleEndian>()? as usize, 2))
    }
}

/// Read a full header from a stream.
///
/// Returns the parsed header and the number of bytes consumed; the stream is left
/// positioned at the first payload byte.
pub fn read_header<R: Read>(reader: &mut R) -> Result<(ArrayHeader, usize)> {
    let mut preamble = [0u8; PREAMBLE_SIZE];
    reader.read_exact(&mut preamble)?;
    let major = parse_preamble(&preamble)?;
    let (dict_len, field_size) = read_header_len(reader, major)?;

    let dict = read_bytes(reader, dict_len)?;
    let header = parse_dictionary(dict_as_str(&dict)?)?;

    Ok((header, PREAMBLE_SIZE + field_size + dict_len))
}

/// Parse a header at the start of an in-memory buffer.
///
/// Returns the parsed header and the header length in bytes.
pub fn parse_header(bytes: &[u8]) -> Result<(ArrayHeader, usize)> {
    let mut cursor = Cursor::new(bytes);
    let preamble: &[u8; PREAMBLE_SIZE] = take(&mut cursor, PREAMBLE_SIZE)?
        .try_into()
        .map_err(|_| NpyError::InvalidMagic)?;
    let major = parse_preamble(preamble)?;
    let (dict_len, _) = read_header_len(&mut cursor, major)?;
    let dict = take(&mut cursor, dict_len)?;
    let header = parse_dictionary(dict_as_str(dict)?)?;

    Ok((header, cursor.position() as usize))
}

fn dict_as_str(dict: &[u8]) -> Result<&str> {
    std::str::from_utf8(dict).map_err(|_| NpyError::InvalidHeader("dictionary is not UTF-8".into()))
}

/// Parse the textual header dictionary.
///
/// Only `descr`, `fortran_order` and `shape` are read; key order is not assumed.
pub fn parse_dictionary(dict: &str) -> Result<ArrayHeader> {
    let layout = parse_fortran_order(dict)?;
    let shape = parse_shape(dict)?;
    let (type_code, word_size) = parse_descr(dict)?;
    Ok(ArrayHeader {
        type_code,
        word_size,
        layout,
        shape,
    })
}

/// Text following `key` and its `:` separator
fn value_after<'a>(dict: &'a str, key: &'static str) -> Result<&'a str> {
    let start = dict.find(key).ok_or(NpyError::MissingKey(key))?;
    let rest = dict[start + key.len()..]
        .trim_start_matches(['\'', '"'])
        .trim_start();
    let rest = rest.strip_prefix(':').ok_or_else(|| {
        NpyError::InvalidHeader(format!("expected ':' after '{}'", key).into())
    })?;
    Ok(rest.trim_start())
}

fn parse_fortran_order(dict: &str) -> Result<Layout> {
    let value = value_after(dict, "fortran_order")?;
    if value.starts_with("True") {
        Ok(Layout::ColumnMajor)
    } else if value.starts_with("False") {
        Ok(Layout::RowMajor)
    } else {
        Err(NpyError::InvalidHeader(
            "fortran_order is neither True nor False".into(),
        ))
    }
}

fn parse_shape(dict: &str) -> Result<Vec<usize>> {
    let value = value_after(dict, "shape")?;
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.find(')').map(|end| &v[..end]))
        .ok_or_else(|| NpyError::InvalidHeader("shape is not a parenthesized tuple".into()))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            // python 2 longs carry an `L` suffix
            token.trim_end_matches('L').parse::<usize>().map_err(|_| {
                NpyError::InvalidHeader(format!("invalid dimension '{}'", token).into())
            })
        })
        .collect()
}

fn parse_descr(dict: &str) -> Result<(TypeCode, usize)> {
    let value = value_after(dict, "descr")?;
    let mut chars = value.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('\'' | '"'))) => q,
        _ => {
            return Err(NpyError::InvalidHeader(
                "descr is not a simple type string".into(),
            ));
        }
    };

    let byte_order = chars.next().map(|(_, c)| c).ok_or(NpyError::MissingKey("descr"))?;
    if byte_order != '<' && byte_order != '|' {
        return Err(NpyError::UnsupportedByteOrder(byte_order));
    }

    let (code_pos, code) = chars.next().ok_or(NpyError::MissingKey("descr"))?;
    let type_code = u8::try_from(code)
        .ok()
        .and_then(TypeCode::from_u8)
        .ok_or(NpyError::UnsupportedTypeCode(code))?;

    let width_start = code_pos + code.len_utf8();
    let width_text = value[width_start..]
        .split(quote)
        .next()
        .filter(|_| value[width_start..].contains(quote))
        .ok_or_else(|| NpyError::InvalidHeader("unterminated descr".into()))?;
    let word_size = width_text
        .parse::<usize>()
        .ok()
        .filter(|&w| w > 0)
        .ok_or_else(|| {
            NpyError::InvalidHeader(format!("invalid word size '{}'", width_text).into())
        })?;

    Ok((type_code, word_size))
}

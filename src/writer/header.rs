//! npy header serialization

use crate::types::{
    ArrayHeader, HEADER_ALIGNMENT, MAGIC, NATIVE_BYTE_ORDER, V1_MAX_HEADER_LEN, V1_PREFIX_SIZE,
    V2_PREFIX_SIZE,
};

/// Build the header dictionary text, without padding
pub fn dictionary(header: &ArrayHeader) -> String {
    let dims: Vec<String> = header.shape.iter().map(|d| d.to_string()).collect();
    let shape = match dims.len() {
        1 => format!("({},)", dims[0]),
        _ => format!("({})", dims.join(", ")),
    };
    format!(
        "{{'descr': '{}{}{}', 'fortran_order': {}, 'shape': {}, }}",
        NATIVE_BYTE_ORDER as char,
        header.type_code.as_char(),
        header.word_size,
        if header.layout.is_column_major() {
            "True"
        } else {
            "False"
        },
        shape
    )
}

/// Serialize a complete header: preamble, length field and padded dictionary
pub fn header_bytes(header: &ArrayHeader) -> Vec<u8> {
    header_bytes_padded(header, 0)
}

/// Serialize a header at least `min_len` bytes long.
///
/// The total length is always a multiple of 16 and the dictionary always ends in
/// `\n`; when `min_len` is itself aligned and large enough, the result is exactly
/// `min_len` bytes.
pub fn header_bytes_padded(header: &ArrayHeader, min_len: usize) -> Vec<u8> {
    let dict = dictionary(header);

    let mut major = 1u8;
    let mut prefix = V1_PREFIX_SIZE;
    let mut total = aligned_total(prefix, dict.len(), min_len);
    if total - prefix > V1_MAX_HEADER_LEN {
        major = 2;
        prefix = V2_PREFIX_SIZE;
        total = aligned_total(prefix, dict.len(), min_len);
    }
    let padded_len = total - prefix;

    let mut bytes = Vec::with_capacity(total);
    bytes.extend_from_slice(MAGIC);
    bytes.push(major);
    bytes.push(0);
    if major == 1 {
        bytes.extend_from_slice(&(padded_len as u16).to_le_bytes());
    } else {
        bytes.extend_from_slice(&(padded_len as u32).to_le_bytes());
    }
    bytes.extend_from_slice(dict.as_bytes());
    bytes.resize(total - 1, b' ');
    bytes.push(b'\n');
    bytes
}

/// Smallest aligned total that leaves room for the trailing newline
fn aligned_total(prefix: usize, dict_len: usize, min_len: usize) -> usize {
    round_up(prefix + dict_len + 1).max(round_up(min_len))
}

fn round_up(len: usize) -> usize {
    len.div_ceil(HEADER_ALIGNMENT) * HEADER_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_header;
    use crate::types::{Layout, TypeCode};

    fn header(shape: Vec<usize>) -> ArrayHeader {
        ArrayHeader {
            type_code: TypeCode::Int,
            word_size: 4,
            layout: Layout::RowMajor,
            shape,
        }
    }

    #[test]
    fn test_dictionary_text() {
        let expected = format!(
            "{{'descr': '{}i4', 'fortran_order': False, 'shape': (2, 3), }}",
            NATIVE_BYTE_ORDER as char
        );
        assert_eq!(dictionary(&header(vec![2, 3])), expected);
    }

    #[test]
    fn test_rank_one_trailing_comma() {
        assert!(dictionary(&header(vec![4])).ends_with("'shape': (4,), }"));
    }

    #[test]
    fn test_scalar_shape_text() {
        assert!(dictionary(&header(vec![])).ends_with("'shape': (), }"));
    }

    #[test]
    fn test_column_major_flag() {
        let mut h = header(vec![2, 2]);
        h.layout = Layout::ColumnMajor;
        assert!(dictionary(&h).contains("'fortran_order': True"));
    }

    #[test]
    fn test_padding_is_aligned() {
        for rank in 0..12 {
            let shape: Vec<usize> = (0..rank).map(|i| 10usize.pow(i as u32 % 7)).collect();
            let bytes = header_bytes(&header(shape));
            assert_eq!(bytes.len() % 16, 0, "rank {}", rank);
            assert_eq!(*bytes.last().unwrap(), b'\n');
            assert_eq!(bytes[6], 1);
            assert_eq!(bytes[7], 0);
        }
    }

    #[test]
    fn test_header_length_field() {
        let bytes = header_bytes(&header(vec![2, 3]));
        let len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!(len + V1_PREFIX_SIZE, bytes.len());
    }

    #[test]
    fn test_exact_padding_to_min_len() {
        let natural = header_bytes(&header(vec![2, 3]));
        let padded = header_bytes_padded(&header(vec![2, 3]), natural.len() + 32);
        assert_eq!(padded.len(), natural.len() + 32);

        let (parsed, len) = parse_header(&padded).unwrap();
        assert_eq!(len, padded.len());
        assert_eq!(parsed.shape, vec![2, 3]);
    }

    #[test]
    fn test_large_header_switches_version() {
        let shape = vec![1usize; 30_000];
        let bytes = header_bytes(&header(shape.clone()));
        assert_eq!(bytes[6], 2);
        assert_eq!(bytes.len() % 16, 0);
        let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        assert_eq!(len + V2_PREFIX_SIZE, bytes.len());

        let (parsed, _) = parse_header(&bytes).unwrap();
        assert_eq!(parsed.shape, shape);
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn test_written_marker_is_little_endian() {
        let bytes = header_bytes(&header(vec![1]));
        assert!(dictionary(&header(vec![1])).starts_with("{'descr': '<i4'"));
        assert!(parse_header(&bytes).is_ok());
    }

    #[test]
    fn test_roundtrip_header() {
        let h = header(vec![7, 1, 9]);
        let (parsed, len) = parse_header(&header_bytes(&h)).unwrap();
        assert_eq!(parsed, h);
        assert_eq!(len % 16, 0);
    }
}

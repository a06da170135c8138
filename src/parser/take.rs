//! Zero-copy byte taking over an in-memory cursor

use std::io::{self, Cursor};

/// Take exactly `count` bytes as a slice of the cursor's buffer and advance past them
pub fn take<'a>(cursor: &mut Cursor<&'a [u8]>, count: usize) -> io::Result<&'a [u8]> {
    let data: &'a [u8] = *cursor.get_ref();
    let pos = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    let end = pos
        .checked_add(count)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
    cursor.set_position(end as u64);
    Ok(&data[pos..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_zero() {
        let data: &[u8] = b"hello";
        let mut cursor = Cursor::new(data);
        assert_eq!(take(&mut cursor, 0).unwrap(), b"");
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_take_chained() {
        let data: &[u8] = b"helloworld";
        let mut cursor = Cursor::new(data);
        assert_eq!(take(&mut cursor, 5).unwrap(), b"hello");
        assert_eq!(take(&mut cursor, 5).unwrap(), b"world");
        assert_eq!(cursor.position(), 10);
    }

    #[test]
    fn test_take_too_many() {
        let data: &[u8] = b"hi";
        let mut cursor = Cursor::new(data);
        let err = take(&mut cursor, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_take_is_zero_copy() {
        let data: &[u8] = b"hello";
        let mut cursor = Cursor::new(data);
        let slice = take(&mut cursor, 5).unwrap();
        assert!(std::ptr::eq(slice.as_ptr(), data.as_ptr()));
    }
}

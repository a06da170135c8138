//! Array buffers: owned and borrowed

use super::element::{self, Element};
use super::header::checked_num_values;
use super::{ArrayHeader, TypeCode, ValueKind};
use crate::error::{NpyError, Result};

/// Element order of a multi-dimensional payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// C order, last dimension varies fastest
    #[default]
    RowMajor,
    /// Fortran order, first dimension varies fastest
    ColumnMajor,
}

impl Layout {
    pub fn is_column_major(self) -> bool {
        self == Layout::ColumnMajor
    }
}

/// Owned array: shape, element type and a heap payload.
///
/// The payload is either absent or exactly `num_values() * word_size()` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyArray {
    shape: Vec<usize>,
    type_code: TypeCode,
    word_size: usize,
    layout: Layout,
    data: Option<Vec<u8>>,
}

impl NpyArray {
    /// Describe an array without allocating its payload
    pub fn empty(shape: Vec<usize>, type_code: TypeCode, word_size: usize, layout: Layout) -> Self {
        Self {
            shape,
            type_code,
            word_size,
            layout,
            data: None,
        }
    }

    /// Build an array over an existing payload; the length must match the shape
    pub fn from_bytes(
        shape: Vec<usize>,
        type_code: TypeCode,
        word_size: usize,
        layout: Layout,
        data: Vec<u8>,
    ) -> Result<Self> {
        let expected = size_bytes_for(&shape, word_size)?;
        if data.len() != expected {
            return Err(NpyError::DataSizeMismatch {
                expected: expected as u64,
                actual: data.len() as u64,
            });
        }
        Ok(Self {
            shape,
            type_code,
            word_size,
            layout,
            data: Some(data),
        })
    }

    /// Build a row-major array from typed values
    pub fn from_vec<T: Element>(shape: Vec<usize>, values: &[T]) -> Result<Self> {
        NpyArrayView::from_slice(values, shape).map(|view| view.to_owned())
    }

    pub(crate) fn from_header(header: ArrayHeader, data: Vec<u8>) -> Result<Self> {
        Self::from_bytes(
            header.shape,
            header.type_code,
            header.word_size,
            header.layout,
            data,
        )
    }

    /// Allocate a zeroed payload if none is present
    pub fn allocate(&mut self) -> Result<()> {
        if self.data.is_none() {
            let size = size_bytes_for(&self.shape, self.word_size)?;
            self.data = Some(vec![0u8; size]);
        }
        Ok(())
    }

    /// Drop the payload. Releasing an empty array does nothing.
    pub fn release(&mut self) {
        self.data = None;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn value_kind(&self) -> ValueKind {
        ValueKind::from_descr(self.type_code as u8, self.word_size)
    }

    /// Total number of elements
    pub fn num_values(&self) -> usize {
        num_values_saturating(&self.shape)
    }

    /// Expected payload size in bytes
    pub fn size_bytes(&self) -> usize {
        self.num_values().saturating_mul(self.word_size)
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        self.data.as_deref_mut()
    }

    pub fn into_data(self) -> Option<Vec<u8>> {
        self.data
    }

    /// Copy the payload out as typed values; `None` if empty or of another kind
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        self.view()?.to_vec()
    }

    /// Borrow as a view; `None` when no payload is allocated
    pub fn view(&self) -> Option<NpyArrayView<'_>> {
        let data = self.data.as_deref()?;
        Some(NpyArrayView {
            shape: self.shape.clone(),
            type_code: self.type_code,
            word_size: self.word_size,
            layout: self.layout,
            data,
        })
    }

    pub(crate) fn header(&self) -> ArrayHeader {
        ArrayHeader {
            type_code: self.type_code,
            word_size: self.word_size,
            layout: self.layout,
            shape: self.shape.clone(),
        }
    }
}

/// Borrowed array over memory owned elsewhere (zero-copy).
///
/// Used for parsing from a byte buffer and for saving caller data without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyArrayView<'a> {
    shape: Vec<usize>,
    type_code: TypeCode,
    word_size: usize,
    layout: Layout,
    data: &'a [u8],
}

impl<'a> NpyArrayView<'a> {
    /// Wrap raw bytes; the length must match the shape
    pub fn new(
        shape: Vec<usize>,
        type_code: TypeCode,
        word_size: usize,
        layout: Layout,
        data: &'a [u8],
    ) -> Result<Self> {
        let expected = size_bytes_for(&shape, word_size)?;
        if data.len() != expected {
            return Err(NpyError::DataSizeMismatch {
                expected: expected as u64,
                actual: data.len() as u64,
            });
        }
        Ok(Self {
            shape,
            type_code,
            word_size,
            layout,
            data,
        })
    }

    /// Wrap a typed slice as a row-major view.
    ///
    /// An empty `shape` means a one-dimensional array of `values.len()` elements.
    pub fn from_slice<T: Element>(values: &'a [T], shape: Vec<usize>) -> Result<Self> {
        let shape = if shape.is_empty() {
            vec![values.len()]
        } else {
            shape
        };
        let type_code = T::KIND.type_code().ok_or(NpyError::UnsupportedTypeCode('?'))?;
        Self::new(
            shape,
            type_code,
            std::mem::size_of::<T>(),
            Layout::RowMajor,
            element::as_bytes(values),
        )
    }

    pub(crate) fn from_header(header: ArrayHeader, data: &'a [u8]) -> Result<Self> {
        Self::new(
            header.shape,
            header.type_code,
            header.word_size,
            header.layout,
            data,
        )
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn value_kind(&self) -> ValueKind {
        ValueKind::from_descr(self.type_code as u8, self.word_size)
    }

    /// Total number of elements
    pub fn num_values(&self) -> usize {
        num_values_saturating(&self.shape)
    }

    /// Payload size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Copy the payload out as typed values; `None` on kind mismatch
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if self.value_kind() != T::KIND || self.word_size != std::mem::size_of::<T>() {
            return None;
        }
        Some(element::decode_le(self.data))
    }

    /// Convert to owned NpyArray
    pub fn to_owned(&self) -> NpyArray {
        NpyArray {
            shape: self.shape.clone(),
            type_code: self.type_code,
            word_size: self.word_size,
            layout: self.layout,
            data: Some(self.data.to_vec()),
        }
    }

    pub(crate) fn header(&self) -> ArrayHeader {
        ArrayHeader {
            type_code: self.type_code,
            word_size: self.word_size,
            layout: self.layout,
            shape: self.shape.clone(),
        }
    }
}

fn size_bytes_for(shape: &[usize], word_size: usize) -> Result<usize> {
    checked_num_values(shape)
        .and_then(|count| count.checked_mul(word_size))
        .ok_or_else(|| NpyError::InvalidHeader(format!("shape {:?} overflows", shape).into()))
}

fn num_values_saturating(shape: &[usize]) -> usize {
    shape.iter().fold(1usize, |acc, &dim| acc.saturating_mul(dim))
}

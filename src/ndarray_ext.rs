//! ndarray integration for npy arrays
//!
//! Conversions between [`NpyArray`]/[`NpyArrayView`] and ndarray's dynamic-rank
//! arrays. Both C and Fortran contiguous arrays are accepted; the layout is kept
//! in the npy header instead of reordering the payload.
//!
//! Enable with the `ndarray` feature flag.

use crate::types::{Element, Layout, NpyArray, NpyArrayView, ValueKind, as_bytes};
use ndarray::{ArrayD, ArrayViewD, IxDyn, ShapeBuilder};

/// Error type for ndarray conversions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdarrayError {
    /// Element kind of the npy array differs from the requested Rust type
    DTypeMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },
    /// Shape doesn't match data length
    ShapeMismatch { shape: Vec<usize>, data_len: usize },
    /// Data is not properly aligned for the element type
    AlignmentError,
    /// Array is neither C nor Fortran contiguous
    NotContiguous,
    /// The npy array has no payload allocated
    Unallocated,
    /// Payload holds a byte that is not a valid bool
    InvalidBool,
}

impl std::fmt::Display for NdarrayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NdarrayError::DTypeMismatch { expected, actual } => {
                write!(
                    f,
                    "DType mismatch: expected {:?}, got {:?}",
                    expected, actual
                )
            }
            NdarrayError::ShapeMismatch { shape, data_len } => {
                write!(
                    f,
                    "Shape {:?} doesn't match data length {}",
                    shape, data_len
                )
            }
            NdarrayError::AlignmentError => {
                write!(f, "Data is not properly aligned for element type")
            }
            NdarrayError::NotContiguous => {
                write!(
                    f,
                    "Array is not contiguous; call .as_standard_layout().into_owned() first"
                )
            }
            NdarrayError::Unallocated => write!(f, "Array payload is not allocated"),
            NdarrayError::InvalidBool => write!(f, "Payload byte is not a valid bool"),
        }
    }
}

impl std::error::Error for NdarrayError {}

// =============================================================================
// From ndarray to npy
// =============================================================================

impl<'a> NpyArrayView<'a> {
    /// Borrow a contiguous ndarray as an npy view without copying.
    ///
    /// Fortran-ordered arrays produce a column-major view. Use
    /// `.as_standard_layout()` first for arrays with arbitrary strides.
    pub fn from_ndarray<T: Element>(arr: &'a ArrayD<T>) -> Result<Self, NdarrayError> {
        let layout = contiguous_layout(arr)?;
        let values = arr
            .as_slice_memory_order()
            .ok_or(NdarrayError::NotContiguous)?;
        let type_code = T::KIND.type_code().ok_or(NdarrayError::DTypeMismatch {
            expected: T::KIND,
            actual: ValueKind::Unknown,
        })?;
        NpyArrayView::new(
            arr.shape().to_vec(),
            type_code,
            std::mem::size_of::<T>(),
            layout,
            as_bytes(values),
        )
        .map_err(|_| NdarrayError::ShapeMismatch {
            shape: arr.shape().to_vec(),
            data_len: std::mem::size_of_val(values),
        })
    }

    /// Convert to an owned ndarray ArrayD
    pub fn to_ndarray<T: Element>(&self) -> Result<ArrayD<T>, NdarrayError> {
        check_kind::<T>(self.value_kind(), self.word_size())?;
        if T::KIND == ValueKind::Bool {
            check_bools(self.data())?;
        }
        let elements = self.to_vec::<T>().ok_or(NdarrayError::DTypeMismatch {
            expected: T::KIND,
            actual: self.value_kind(),
        })?;

        ArrayD::from_shape_vec(nd_shape(self.shape(), self.layout()), elements).map_err(|_| {
            NdarrayError::ShapeMismatch {
                shape: self.shape().to_vec(),
                data_len: self.size_bytes(),
            }
        })
    }

    /// Try to create a zero-copy ndarray view
    ///
    /// This will fail if the data is not properly aligned for the element type.
    pub fn try_as_ndarray<T: Element>(&self) -> Result<ArrayViewD<'a, T>, NdarrayError> {
        check_kind::<T>(self.value_kind(), self.word_size())?;
        let data = self.data();
        if T::KIND == ValueKind::Bool {
            check_bools(data)?;
        }
        if (data.as_ptr() as usize) % std::mem::align_of::<T>() != 0 {
            return Err(NdarrayError::AlignmentError);
        }

        let len = data.len() / std::mem::size_of::<T>();
        // SAFETY:
        // - Alignment is checked above before the cast
        // - word size equals size_of::<T>(), so len elements cover exactly data
        // - T is a sealed Element primitive; bool bytes were validated above
        // - Lifetime 'a of the borrowed payload is preserved in ArrayViewD<'a, T>
        let slice = unsafe { std::slice::from_raw_parts(data.as_ptr() as *const T, len) };

        ArrayViewD::from_shape(nd_shape(self.shape(), self.layout()), slice).map_err(|_| {
            NdarrayError::ShapeMismatch {
                shape: self.shape().to_vec(),
                data_len: data.len(),
            }
        })
    }
}

impl NpyArray {
    /// Create an npy array from a contiguous ndarray ArrayD
    pub fn from_ndarray<T: Element>(arr: &ArrayD<T>) -> Result<Self, NdarrayError> {
        NpyArrayView::from_ndarray(arr).map(|view| view.to_owned())
    }

    /// Convert to an ndarray ArrayD
    pub fn to_ndarray<T: Element>(&self) -> Result<ArrayD<T>, NdarrayError> {
        self.view().ok_or(NdarrayError::Unallocated)?.to_ndarray()
    }
}

fn contiguous_layout<T>(arr: &ArrayD<T>) -> Result<Layout, NdarrayError> {
    if arr.is_standard_layout() {
        Ok(Layout::RowMajor)
    } else if arr.t().is_standard_layout() {
        Ok(Layout::ColumnMajor)
    } else {
        Err(NdarrayError::NotContiguous)
    }
}

fn nd_shape(shape: &[usize], layout: Layout) -> ndarray::Shape<IxDyn> {
    IxDyn(shape).set_f(layout.is_column_major())
}

fn check_kind<T: Element>(actual: ValueKind, word_size: usize) -> Result<(), NdarrayError> {
    if actual != T::KIND || word_size != std::mem::size_of::<T>() {
        return Err(NdarrayError::DTypeMismatch {
            expected: T::KIND,
            actual,
        });
    }
    Ok(())
}

fn check_bools(data: &[u8]) -> Result<(), NdarrayError> {
    if data.iter().any(|&b| b > 1) {
        return Err(NdarrayError::InvalidBool);
    }
    Ok(())
}

//! Rust element types that map onto a [`ValueKind`]

use super::ValueKind;

mod sealed {
    pub trait Sealed {}
}

/// Primitive type that can be stored in an npy payload.
///
/// Sealed: implemented only for primitives whose every bit pattern of
/// `size_of::<Self>()` bytes is valid, so payload bytes can be reinterpreted.
pub trait Element: Copy + 'static + sealed::Sealed {
    const KIND: ValueKind;

    /// Decode one element from little-endian bytes of exactly `size_of::<Self>()`
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const KIND: ValueKind = ValueKind::$kind;

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Int128,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    u128 => UInt128,
    f32 => Float32,
    f64 => Float64,
}

impl sealed::Sealed for bool {}

impl Element for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Reinterpret a slice of elements as its raw bytes (zero-copy)
pub(crate) fn as_bytes<T: Element>(values: &[T]) -> &[u8] {
    // SAFETY:
    // - T is sealed to plain primitives with no padding bytes
    // - u8 has alignment 1, so any pointer is suitably aligned
    // - the byte length is exactly size_of_val(values) and the lifetime is tied to `values`
    unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, std::mem::size_of_val(values)) }
}

/// Decode a little-endian payload into typed values
pub(crate) fn decode_le<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(T::from_le_slice)
        .collect()
}

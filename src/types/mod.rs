//! Core types for npy arrays and npz archives

mod array;
mod dtype;
mod element;
mod header;
mod record;

pub use array::{Layout, NpyArray, NpyArrayView};
pub use dtype::{TypeCode, ValueKind};
pub use element::Element;
pub(crate) use element::as_bytes;
pub use header::{
    ArrayHeader, FORMAT_NAME, HEADER_ALIGNMENT, MAGIC, MAGIC_BYTE, NATIVE_BYTE_ORDER,
    PREAMBLE_SIZE, V1_MAX_HEADER_LEN, V1_PREFIX_SIZE, V2_PREFIX_SIZE, checked_num_values,
};
pub use record::{
    CENTRAL_HEADER_SIGNATURE, CENTRAL_HEADER_SIZE, CompressionMethod, END_OF_CENTRAL_DIR_SIGNATURE,
    END_OF_CENTRAL_DIR_SIZE, EndOfCentralDir, EntryRecord, LOCAL_HEADER_SIGNATURE,
    LOCAL_HEADER_SIZE, LocalHeader, NPY_SUFFIX, ZIP_VERSION, array_name_from_file_name,
    file_name_from_array_name,
};

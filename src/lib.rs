//! tinynpy - Read and write numpy `.npy` arrays and `.npz` archives
//!
//! An npy file is a small self-describing header (element type, memory order,
//! shape) followed by the raw element bytes. An npz file is a ZIP archive whose
//! entries are npy files named `<array>.npy`.
//!
//! # Features
//!
//! - Zero-copy parsing of npy buffers held in memory
//! - Appending to npy files along the first axis
//! - Adding entries to npz archives without rewriting existing entries
//! - Stored and deflate-compressed npz entries, with CRC-32 verification on read
//! - Optional ndarray conversions (`ndarray` feature)
//!
//! Only little-endian hosts are supported: payloads are written in native byte
//! order and read back as little-endian, and big-endian (`>`) files are rejected.
//!
//! # Example
//!
//! ```rust
//! use tinynpy::{NpyArrayView, parse_npy, writer};
//!
//! let values = [1i32, 2, 3, 4, 5, 6];
//! let view = NpyArrayView::from_slice(&values, vec![2, 3]).unwrap();
//!
//! // Write to bytes
//! let bytes = writer::to_bytes(&view).unwrap();
//!
//! // Parse back without copying the payload
//! let parsed = parse_npy(&bytes).unwrap();
//! assert_eq!(parsed.shape(), &[2, 3]);
//! assert_eq!(parsed.to_vec::<i32>().unwrap(), values);
//! ```

pub mod compression;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

#[cfg(feature = "ndarray")]
pub mod ndarray_ext;

// Re-export common types at crate root
pub use decoder::{
    NpyContents, NpzArrays, NpzEntry, load, load_npy, load_npz, load_npz_array, load_npz_index,
    read_npy, read_npz, read_npz_array, read_npz_entry, read_npz_index,
};
pub use encoder::{SaveOptions, append_npy, append_npz_entry, save_npy, save_npz, write_npz_entry};
pub use error::{ErrorKind, NpyError, Result};
pub use parser::parse_npy;
pub use types::{
    ArrayHeader, CompressionMethod, Element, EntryRecord, Layout, MAGIC, NpyArray, NpyArrayView,
    TypeCode, ValueKind,
};
pub use writer::write_npy;

#[cfg(feature = "ndarray")]
pub use ndarray_ext::NdarrayError;

//! Serialize structured data into segmented byte buffers.
//!
//! # Overview
//!
//! A recursive binary codec layered on [`reef_buffer::BufferList`]:
//! encoding appends to a list (reference-appending nested buffers instead of
//! copying them), decoding walks the list through an advancing [`Reader`]
//! cursor and takes zero-copy substring views for nested buffers.
//!
//! # Supported Types
//!
//! Natively supports:
//! - Fixed-width primitives: `u8`..`u64`, `i8`..`i64`, `f32`, `f64`, `bool`
//! - Sequences: `Vec<T>`, `VecDeque<T>`
//! - Sets and mappings: `BTreeSet<K>`, `BTreeMap<K, V>`, `HashMap<K, V>`
//! - `String`, tuples, `Duration`, `SystemTime`
//! - Nested [`View`](reef_buffer::View) and [`BufferList`](reef_buffer::BufferList)
//!
//! User-defined types implement [`Encode`] and [`Decode`].
//!
//! # Wire Format
//!
//! This is an in-process marshalling layer: multi-byte values are
//! host-native, container counts are 32-bit, strings carry a trailing NUL.
//! Wire compatibility across architectures is the caller's concern.
//!
//! # Example
//!
//! ```
//! use reef_codec::{Decode, Encode};
//!
//! let value: Vec<u32> = vec![1, 2, 3];
//! let encoded = value.encode();
//! assert_eq!(Vec::<u32>::decode(&encoded).unwrap(), value);
//! ```

pub mod codec;
pub mod error;
pub mod reader;
pub mod types;

pub use codec::{Codec, Decode, Encode};
pub use error::Error;
pub use reader::Reader;

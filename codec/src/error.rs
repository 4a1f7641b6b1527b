//! Error types for codec operations.

use thiserror::Error;

/// Error that may be encountered when decoding.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The buffer ended before the value was fully read.
    #[error("end of buffer")]
    EndOfBuffer,
    /// Bytes remained after decoding a complete value.
    #[error("extra data: {0} bytes left")]
    ExtraData(usize),
    /// The bytes are not a valid encoding of the type.
    #[error("invalid data: {0} ({1})")]
    Invalid(&'static str, &'static str),
    /// A length prefix is unacceptable.
    #[error("invalid length: {0}")]
    InvalidLength(usize),
}

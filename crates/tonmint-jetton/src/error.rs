//! Jetton error types.

use thiserror::Error;
use tonmint_cell::CellError;

/// Errors produced by the Jetton metadata and operation codecs.
#[derive(Debug, Error)]
pub enum JettonError {
    /// Content cell starts with an unknown layout prefix.
    #[error("Invalid content prefix: 0x{0:02x} (expected 0x00 onchain or 0x01 offchain)")]
    InvalidContentPrefix(u8),

    /// Snake-encoded data does not start with the expected 0x00 byte.
    #[error("Invalid snake format prefix: 0x{0:02x}")]
    InvalidSnakeFormat(u8),

    /// A snake cell carries more than one continuation reference.
    #[error("Malformed snake chain: cell has {0} references")]
    MalformedSnakeChain(usize),

    /// A metadata key is not part of the schema.
    #[error("Unknown metadata field: {key}")]
    UnsupportedField {
        /// The key as supplied by the caller.
        key: String,
    },

    /// A dictionary value is not valid for the field's declared encoding.
    #[error("Field {field} is not valid {encoding}")]
    InvalidValueEncoding {
        /// Schema field name.
        field: &'static str,
        /// Declared encoding name.
        encoding: &'static str,
    },

    /// An operation requires an internal address but got something else.
    #[error("Operation requires an internal address for {0}")]
    MissingAddress(&'static str),

    /// Fetching or decoding external metadata failed.
    #[error("Metadata fetch failed: {0}")]
    MetadataFetch(String),

    /// Underlying cell error.
    #[error(transparent)]
    Cell(#[from] CellError),
}

/// Result type for jetton operations.
pub type JettonResult<T> = Result<T, JettonError>;

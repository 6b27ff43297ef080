//! TON Cell and Bag of Cells (BoC) primitives for tonmint.
//!
//! This crate provides the binary container layer everything else in the
//! workspace is built on:
//!
//! - **Cell**: the basic unit of data storage (up to 1023 bits of data and
//!   up to 4 references to other cells)
//! - **CellBuilder**: writer for constructing cells
//! - **CellSlice**: reader for extracting data from cells
//! - **Dict**: 256-bit-keyed hashmap dictionary in the chain's trie format
//! - **BagOfCells**: flat serialization format for cell trees
//! - **MsgAddress**: TON address representation
//!
//! # Example
//!
//! ```
//! use tonmint_cell::{CellBuilder, CellSlice, BagOfCells};
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0x12345678).unwrap();
//! builder.store_coins(1_000_000_000).unwrap();
//! let cell = builder.build().unwrap();
//!
//! let mut slice = CellSlice::new(&cell);
//! assert_eq!(slice.load_u32().unwrap(), 0x12345678);
//! assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
//!
//! let base64 = BagOfCells::from_root(cell).serialize_to_base64().unwrap();
//! let restored = BagOfCells::deserialize_from_base64(&base64).unwrap();
//! assert_eq!(restored.root_count(), 1);
//! ```

use sha2::{Digest, Sha256};
use thiserror::Error;

mod address;
mod boc;
mod builder;
mod cell;
mod dict;
mod slice;

pub use address::MsgAddress;
pub use boc::BagOfCells;
pub use builder::CellBuilder;
pub use cell::{Cell, HASH_BYTES};
pub use dict::{Dict, DICT_KEY_BITS};
pub use slice::CellSlice;

/// Errors that can occur during cell operations.
#[derive(Debug, Error)]
pub enum CellError {
    /// The cell data exceeds the maximum of 1023 bits.
    #[error("Cell data too long: {0} bits (max 1023)")]
    DataTooLong(usize),

    /// The cell has too many references (max 4).
    #[error("Too many cell references: {0} (max 4)")]
    TooManyRefs(usize),

    /// The value does not fit in the requested bit width.
    #[error("Value {value} does not fit in {bits} bits")]
    IntOutOfRange { value: i128, bits: usize },

    /// Invalid bit width for an integer field.
    #[error("Invalid bit length: {0}")]
    InvalidBitLength(usize),

    /// Not enough bits available.
    #[error("Not enough bits: need {need}, have {have}")]
    NotEnoughBits { need: usize, have: usize },

    /// Not enough references available.
    #[error("Not enough refs: need {need}, have {have}")]
    NotEnoughRefs { need: usize, have: usize },

    /// Invalid address format.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Malformed dictionary trie.
    #[error("Invalid dictionary: {0}")]
    InvalidDictionary(String),

    /// Invalid BoC format.
    #[error("Invalid BoC format: {0}")]
    InvalidBoc(String),

    /// Cell not found in BoC.
    #[error("Cell not found: index {0}")]
    CellNotFound(usize),

    /// CRC32 checksum mismatch.
    #[error("CRC32 mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// Unexpected end of data.
    #[error("Unexpected end of data")]
    UnexpectedEof,

    /// Invalid base64 encoding.
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    /// Expected single root but found multiple or none.
    #[error("Expected single root, found {0}")]
    NotSingleRoot(usize),
}

/// Result type for cell operations.
pub type CellResult<T> = Result<T, CellError>;

/// Maximum number of bits in a cell's data.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have.
pub const MAX_CELL_REFS: usize = 4;

/// BoC magic number for generic BoC.
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// BoC magic number for indexed BoC.
pub const BOC_INDEXED_MAGIC: u32 = 0x68ff65f3;

/// BoC magic number for indexed CRC32 BoC.
pub const BOC_INDEXED_CRC32_MAGIC: u32 = 0xacc3a728;

/// Compute SHA256 hash of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute CRC32-C checksum (Castagnoli polynomial).
fn crc32c(data: &[u8]) -> u32 {
    const CRC32C: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);
    CRC32C.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_constants() {
        assert_eq!(MAX_CELL_BITS, 1023);
        assert_eq!(MAX_CELL_REFS, 4);
    }

    #[test]
    fn test_store_and_load_various_integers() {
        let mut builder = CellBuilder::new();
        builder.store_u8(0xFF).unwrap();
        builder.store_u16(0xABCD).unwrap();
        builder.store_u32(0x12345678).unwrap();
        builder.store_u64(0xDEADBEEFCAFEBABE).unwrap();
        builder.store_i8(-42).unwrap();
        builder.store_i32(-100000).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert_eq!(slice.load_u8().unwrap(), 0xFF);
        assert_eq!(slice.load_u16().unwrap(), 0xABCD);
        assert_eq!(slice.load_u32().unwrap(), 0x12345678);
        assert_eq!(slice.load_u64().unwrap(), 0xDEADBEEFCAFEBABE);
        assert_eq!(slice.load_i8().unwrap(), -42);
        assert_eq!(slice.load_i32().unwrap(), -100000);
    }

    #[test]
    fn test_store_and_load_coins() {
        let mut builder = CellBuilder::new();
        builder.store_coins(0).unwrap();
        builder.store_coins(1_000_000_000).unwrap();
        let large: u128 = 1_000_000_000_000_000_000;
        builder.store_coins(large).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert_eq!(slice.load_coins().unwrap(), 0);
        assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
        assert_eq!(slice.load_coins().unwrap(), large);
    }

    #[test]
    fn test_nested_cells_with_references() {
        let mut inner_builder = CellBuilder::new();
        inner_builder.store_u32(0xDEADBEEF).unwrap();
        let inner_cell = Arc::new(inner_builder.build().unwrap());

        let mut outer_builder = CellBuilder::new();
        outer_builder.store_u32(0xCAFEBABE).unwrap();
        outer_builder.store_ref(inner_cell).unwrap();
        let outer_cell = outer_builder.build().unwrap();

        let mut slice = CellSlice::new(&outer_cell);
        assert_eq!(slice.load_u32().unwrap(), 0xCAFEBABE);

        let inner_ref = slice.load_ref().unwrap();
        let mut inner_slice = CellSlice::new(inner_ref);
        assert_eq!(inner_slice.load_u32().unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_max_refs() {
        let inner = Arc::new(CellBuilder::new().build().unwrap());
        let mut builder = CellBuilder::new();
        for _ in 0..4 {
            builder.store_ref(inner.clone()).unwrap();
        }
        // Fifth ref must fail during store_ref
        assert!(matches!(
            builder.store_ref(inner.clone()),
            Err(CellError::TooManyRefs(_))
        ));
    }

    #[test]
    fn test_max_bits() {
        let mut builder = CellBuilder::new();
        for _ in 0..127 {
            builder.store_u8(0xFF).unwrap();
        }
        for _ in 0..7 {
            builder.store_bit(true).unwrap();
        }
        assert_eq!(builder.bits_left(), 0);
        assert!(builder.store_bit(true).is_err());
    }

    #[test]
    fn test_address_roundtrip() {
        let addr = MsgAddress::Internal {
            workchain: 0,
            address: [0xAB; 32],
        };
        let mut builder = CellBuilder::new();
        builder.store_address(&addr).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert_eq!(slice.load_address().unwrap(), addr);
    }

    #[test]
    fn test_cell_hash_deterministic() {
        let mut builder1 = CellBuilder::new();
        builder1.store_u32(0x12345678).unwrap();
        let cell1 = builder1.build().unwrap();

        let mut builder2 = CellBuilder::new();
        builder2.store_u32(0x12345678).unwrap();
        let cell2 = builder2.build().unwrap();

        assert_eq!(cell1.hash(), cell2.hash());
    }

    #[test]
    fn test_boc_base64_roundtrip() {
        let mut builder = CellBuilder::new();
        builder.store_u64(0xDEADBEEFCAFEBABE).unwrap();
        let cell = builder.build().unwrap();
        let original_hash = cell.hash();

        let boc = BagOfCells::from_root(cell);
        let base64_str = boc.serialize_to_base64().unwrap();

        let boc2 = BagOfCells::deserialize_from_base64(&base64_str).unwrap();
        let root = boc2.single_root().unwrap();
        assert_eq!(root.hash(), original_hash);
    }
}

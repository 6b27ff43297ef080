//! CellBuilder for constructing cells.
//!
//! The builder allows storing bits, integers, coin amounts, addresses,
//! bytes, dictionaries and references to other cells, then building the
//! final immutable Cell. `build()` consumes the builder, so an in-progress
//! builder can never alias a finished cell.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, CellSlice, Dict, MsgAddress, MAX_CELL_BITS, MAX_CELL_REFS};

/// Builder for constructing cells.
///
/// # Example
///
/// ```
/// use tonmint_cell::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// builder.store_bytes(&[1, 2, 3, 4]).unwrap();
/// let cell = builder.build().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    /// Data buffer.
    data: Vec<u8>,
    /// Current bit position within the buffer.
    bit_len: usize,
    /// References to other cells.
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Create a new empty CellBuilder.
    pub fn new() -> Self {
        CellBuilder {
            data: Vec::with_capacity(128),
            bit_len: 0,
            references: Vec::new(),
        }
    }

    /// Store a single bit.
    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        if self.bit_len >= MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + 1));
        }

        let byte_index = self.bit_len / 8;
        let bit_index = 7 - (self.bit_len % 8);

        if byte_index >= self.data.len() {
            self.data.push(0);
        }

        if bit {
            self.data[byte_index] |= 1 << bit_index;
        }

        self.bit_len += 1;
        Ok(self)
    }

    /// Store multiple bits.
    pub fn store_bits(&mut self, bits: &[bool]) -> CellResult<&mut Self> {
        for &bit in bits {
            self.store_bit(bit)?;
        }
        Ok(self)
    }

    /// Store an unsigned 8-bit integer.
    pub fn store_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 8)
    }

    /// Store an unsigned 16-bit integer (big-endian).
    pub fn store_u16(&mut self, value: u16) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 16)
    }

    /// Store an unsigned 32-bit integer (big-endian).
    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 32)
    }

    /// Store an unsigned 64-bit integer (big-endian).
    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_uint(value, 64)
    }

    /// Store a signed 8-bit integer.
    pub fn store_i8(&mut self, value: i8) -> CellResult<&mut Self> {
        self.store_int(value as i64, 8)
    }

    /// Store a signed 32-bit integer (big-endian).
    pub fn store_i32(&mut self, value: i32) -> CellResult<&mut Self> {
        self.store_int(value as i64, 32)
    }

    /// Store an unsigned integer with a specific bit width (big-endian).
    ///
    /// Fails with `IntOutOfRange` if the value does not fit in `bits` bits;
    /// values are never silently truncated.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits == 0 {
            return if value == 0 {
                Ok(self)
            } else {
                Err(CellError::IntOutOfRange {
                    value: value as i128,
                    bits,
                })
            };
        }

        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }

        if bits < 64 && (value >> bits) != 0 {
            return Err(CellError::IntOutOfRange {
                value: value as i128,
                bits,
            });
        }

        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + bits));
        }

        for i in (0..bits).rev() {
            let bit = ((value >> i) & 1) == 1;
            self.store_bit(bit)?;
        }

        Ok(self)
    }

    /// Store a signed integer with a specific bit width.
    ///
    /// Two's complement, big-endian. Fails with `IntOutOfRange` if the value
    /// is outside `[-2^(bits-1), 2^(bits-1))`.
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        if bits == 0 {
            return if value == 0 {
                Ok(self)
            } else {
                Err(CellError::IntOutOfRange {
                    value: value as i128,
                    bits,
                })
            };
        }

        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }

        if bits < 64 {
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(CellError::IntOutOfRange {
                    value: value as i128,
                    bits,
                });
            }
        }

        // Two's complement representation: mask to the requested width.
        let unsigned = if bits < 64 {
            (value as u64) & ((1u64 << bits) - 1)
        } else {
            value as u64
        };

        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + bits));
        }

        for i in (0..bits).rev() {
            let bit = ((unsigned >> i) & 1) == 1;
            self.store_bit(bit)?;
        }

        Ok(self)
    }

    /// Store a byte array.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        for &byte in bytes {
            self.store_u8(byte)?;
        }
        Ok(self)
    }

    /// Store the remaining contents of a CellSlice (bits and references).
    pub fn store_slice(&mut self, slice: &CellSlice) -> CellResult<&mut Self> {
        let bits_left = slice.bits_left();
        for i in 0..bits_left {
            let bit = slice.get_bit_at(slice.bit_offset + i);
            self.store_bit(bit)?;
        }

        for i in slice.ref_offset..slice.cell.reference_count() {
            if let Some(reference) = slice.cell.reference(i) {
                self.store_ref(reference.clone())?;
            }
        }

        Ok(self)
    }

    /// Store a reference to another cell.
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        if self.references.len() >= MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(self.references.len() + 1));
        }

        self.references.push(cell);
        Ok(self)
    }

    /// Store coins (VarUInteger 16).
    ///
    /// Format: 4-bit byte length, then the value in that many bytes,
    /// big-endian and minimal (zero is stored as length 0 with no bytes).
    pub fn store_coins(&mut self, amount: u128) -> CellResult<&mut Self> {
        if amount == 0 {
            return self.store_uint(0, 4);
        }

        let bytes_needed = ((128 - amount.leading_zeros()).div_ceil(8)).max(1) as usize;
        if bytes_needed > 15 {
            // Saturate when the amount itself exceeds i128
            return Err(CellError::IntOutOfRange {
                value: i128::try_from(amount).unwrap_or(i128::MAX),
                bits: 120,
            });
        }

        self.store_uint(bytes_needed as u64, 4)?;
        for i in (0..bytes_needed).rev() {
            self.store_u8((amount >> (i * 8)) as u8)?;
        }

        Ok(self)
    }

    /// Store a message address.
    ///
    /// `MsgAddress::Null` is the 2-bit `addr_none$00` tag; an internal
    /// address is `addr_std$10` with an anycast-absent bit, an 8-bit signed
    /// workchain and the 256-bit hash, a fixed 267 bits in total.
    pub fn store_address(&mut self, addr: &MsgAddress) -> CellResult<&mut Self> {
        match addr {
            MsgAddress::Null => self.store_uint(0b00, 2),
            MsgAddress::Internal { workchain, address } => {
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_int(*workchain as i64, 8)?;
                self.store_bytes(address)
            }
        }
    }

    /// Store a dictionary (HashmapE).
    ///
    /// Writes a maybe-bit: `0` for a missing or empty dictionary, otherwise
    /// `1` followed by a reference to the serialized trie root.
    pub fn store_dict(&mut self, dict: Option<&Dict>) -> CellResult<&mut Self> {
        match dict {
            None => self.store_bit(false),
            Some(d) if d.is_empty() => self.store_bit(false),
            Some(d) => {
                self.store_bit(true)?;
                let root = d.build_root()?;
                self.store_ref(Arc::new(root))
            }
        }
    }

    /// Get the number of bits that can still be stored.
    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    /// Get the number of references that can still be added.
    pub fn refs_left(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    /// Get the current number of bits stored.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Get the current number of references.
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Build the cell, consuming the builder.
    pub fn build(self) -> CellResult<Cell> {
        Ok(Cell::new(self.data, self.bit_len, self.references))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_bit() {
        let mut builder = CellBuilder::new();
        builder.store_bit(true).unwrap();
        builder.store_bit(false).unwrap();
        builder.store_bit(true).unwrap();
        assert_eq!(builder.bit_len(), 3);

        let cell = builder.build().unwrap();
        assert_eq!(cell.data(), &[0b10100000]);
    }

    #[test]
    fn test_store_uint() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b10101, 5).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.data(), &[0b10101000]);
    }

    #[test]
    fn test_store_uint_range_check() {
        let mut builder = CellBuilder::new();
        assert!(matches!(
            builder.store_uint(256, 8),
            Err(CellError::IntOutOfRange { .. })
        ));
        builder.store_uint(255, 8).unwrap();
    }

    #[test]
    fn test_store_int_range_check() {
        let mut builder = CellBuilder::new();
        builder.store_int(-128, 8).unwrap();
        builder.store_int(127, 8).unwrap();
        assert!(matches!(
            builder.store_int(128, 8),
            Err(CellError::IntOutOfRange { .. })
        ));
        assert!(matches!(
            builder.store_int(-129, 8),
            Err(CellError::IntOutOfRange { .. })
        ));
    }

    #[test]
    fn test_store_coins_minimal_encoding() {
        // Zero: 4-bit length field of 0, no payload bytes
        let mut builder = CellBuilder::new();
        builder.store_coins(0).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 4);
        assert_eq!(cell.data(), &[0x00]);

        // 256: length 2, bytes [0x01, 0x00]
        let mut builder = CellBuilder::new();
        builder.store_coins(256).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 4 + 16);
        let mut slice = CellSlice::new(&cell);
        assert_eq!(slice.load_uint(4).unwrap(), 2);
        assert_eq!(slice.load_u8().unwrap(), 0x01);
        assert_eq!(slice.load_u8().unwrap(), 0x00);
    }

    #[test]
    fn test_store_coins_overflow_reports_value() {
        let amount = 1u128 << 120;
        let mut builder = CellBuilder::new();
        match builder.store_coins(amount) {
            Err(CellError::IntOutOfRange { value, bits }) => {
                assert_eq!(value, amount as i128);
                assert_eq!(bits, 120);
            }
            other => panic!("expected IntOutOfRange, got {:?}", other),
        }

        // Beyond i128 the reported value saturates instead of wrapping
        match builder.store_coins(u128::MAX) {
            Err(CellError::IntOutOfRange { value, .. }) => assert_eq!(value, i128::MAX),
            other => panic!("expected IntOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_address_fixed_width() {
        for addr in [
            MsgAddress::Internal {
                workchain: 0,
                address: [0x00; 32],
            },
            MsgAddress::Internal {
                workchain: -1,
                address: [0xFF; 32],
            },
            MsgAddress::Internal {
                workchain: 127,
                address: [0x5A; 32],
            },
        ] {
            let mut builder = CellBuilder::new();
            builder.store_address(&addr).unwrap();
            assert_eq!(builder.bit_len(), 267);
        }

        let mut builder = CellBuilder::new();
        builder.store_address(&MsgAddress::Null).unwrap();
        assert_eq!(builder.bit_len(), 2);
    }

    #[test]
    fn test_store_workchain_out_of_range() {
        let addr = MsgAddress::Internal {
            workchain: 300,
            address: [0u8; 32],
        };
        let mut builder = CellBuilder::new();
        assert!(builder.store_address(&addr).is_err());
    }
}

//! Cell implementation.
//!
//! A Cell is the fundamental data unit, containing up to 1023 bits of data
//! and up to 4 references to other cells. Cells are immutable once built;
//! the hash and depth are computed at construction time.

use std::sync::Arc;

use crate::{sha256, MAX_CELL_BITS, MAX_CELL_REFS};

/// Hash size in bytes (SHA256).
pub const HASH_BYTES: usize = 32;

/// An ordinary TON cell.
///
/// Cells form a DAG where each cell can reference up to 4 other cells.
/// The cell hash uniquely identifies the cell and its entire subtree and is
/// computed over the standard representation: descriptor bytes, data with
/// completion tag, child depths, child hashes.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Raw data bytes (may contain a partial byte at the end).
    pub(crate) data: Vec<u8>,
    /// Number of bits stored in data.
    pub(crate) bit_len: usize,
    /// References to child cells.
    pub(crate) references: Vec<Arc<Cell>>,
    /// Cached SHA256 hash of the representation.
    hash: [u8; HASH_BYTES],
    /// Cached depth (0 for leaves, 1 + max child depth otherwise).
    depth: u16,
}

impl Cell {
    /// Create a new cell. Typically called by `CellBuilder::build()`.
    pub(crate) fn new(data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(references.len() <= MAX_CELL_REFS);

        let depth = references
            .iter()
            .map(|r| r.depth().saturating_add(1))
            .max()
            .unwrap_or(0);

        let mut cell = Cell {
            data,
            bit_len,
            references,
            hash: [0u8; HASH_BYTES],
            depth,
        };
        cell.hash = sha256(&cell.representation());
        cell
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    /// Get the SHA256 hash of this cell.
    pub fn hash(&self) -> [u8; HASH_BYTES] {
        self.hash
    }

    /// Get the depth of this cell.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Get the raw data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the number of bits in this cell.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Get the number of bytes needed to store the data (rounded up).
    pub fn byte_len(&self) -> usize {
        self.bit_len.div_ceil(8)
    }

    /// Get all references to child cells.
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// Get a reference by index.
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    /// Get the number of references.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Get the descriptor bytes (d1, d2).
    ///
    /// d1 = refs_count (ordinary cell, level 0),
    /// d2 = ceil(bit_len / 8) + floor(bit_len / 8).
    pub fn descriptors(&self) -> (u8, u8) {
        let d1 = self.references.len() as u8;
        let d2 = (self.bit_len.div_ceil(8) + self.bit_len / 8) as u8;
        (d1, d2)
    }

    /// Get data with completion tag.
    ///
    /// If bit_len is not byte-aligned, the bit after the last data bit is
    /// set to 1 and the remainder of the byte stays 0.
    pub fn data_with_completion_tag(&self) -> Vec<u8> {
        if self.bit_len == 0 {
            return Vec::new();
        }

        let remainder = self.bit_len % 8;
        if remainder == 0 {
            self.data.clone()
        } else {
            let mut result = self.data.clone();
            if let Some(last) = result.last_mut() {
                *last |= 1 << (7 - remainder);
            }
            result
        }
    }

    /// Get the cell representation used for hashing.
    pub fn representation(&self) -> Vec<u8> {
        let mut repr = Vec::with_capacity(2 + 128 + self.references.len() * (2 + HASH_BYTES));

        let (d1, d2) = self.descriptors();
        repr.push(d1);
        repr.push(d2);

        repr.extend_from_slice(&self.data_with_completion_tag());

        // For each reference: depth (2 bytes, big-endian)
        for reference in &self.references {
            repr.extend_from_slice(&reference.depth().to_be_bytes());
        }

        // For each reference: hash (32 bytes)
        for reference in &self.references {
            repr.extend_from_slice(&reference.hash());
        }

        repr
    }

    /// Get a specific bit from the cell data.
    ///
    /// Returns None if the index is out of bounds.
    pub fn get_bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }

        let byte_index = index / 8;
        let bit_index = 7 - (index % 8);

        Some((self.data[byte_index] >> bit_index) & 1 == 1)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell() {
        let cell = Cell::empty();
        assert_eq!(cell.bit_len(), 0);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(cell.depth(), 0);
    }

    #[test]
    fn test_cell_descriptors() {
        let cell = Cell::empty();
        let (d1, d2) = cell.descriptors();
        assert_eq!(d1, 0);
        assert_eq!(d2, 0);

        let cell = Cell::new(vec![0xFF], 8, vec![]);
        let (d1, d2) = cell.descriptors();
        assert_eq!(d1, 0);
        assert_eq!(d2, 2); // ceil(8/8) + floor(8/8) = 2

        let cell = Cell::new(vec![0b11111000], 5, vec![]);
        let (d1, d2) = cell.descriptors();
        assert_eq!(d1, 0);
        assert_eq!(d2, 1); // ceil(5/8) + floor(5/8) = 1
    }

    #[test]
    fn test_data_with_completion_tag() {
        let cell = Cell::new(vec![0xFF], 8, vec![]);
        assert_eq!(cell.data_with_completion_tag(), vec![0xFF]);

        // 5 bits of data (11111): tag appended -> 11111100
        let cell = Cell::new(vec![0b11111000], 5, vec![]);
        assert_eq!(cell.data_with_completion_tag(), vec![0b11111100]);
    }

    #[test]
    fn test_depth_calculation() {
        let cell0 = Cell::new(vec![], 0, vec![]);
        assert_eq!(cell0.depth(), 0);

        let cell1 = Cell::new(vec![], 0, vec![Arc::new(cell0)]);
        assert_eq!(cell1.depth(), 1);

        let cell2 = Cell::new(vec![], 0, vec![Arc::new(cell1)]);
        assert_eq!(cell2.depth(), 2);
    }

    #[test]
    fn test_hash_depends_on_refs() {
        let child_a = Arc::new(Cell::new(vec![0x01], 8, vec![]));
        let child_b = Arc::new(Cell::new(vec![0x02], 8, vec![]));

        let parent_a = Cell::new(vec![], 0, vec![child_a]);
        let parent_b = Cell::new(vec![], 0, vec![child_b]);
        assert_ne!(parent_a.hash(), parent_b.hash());
    }
}

//! Hashmap dictionary (HashmapE) with 256-bit keys.
//!
//! On-chain dictionaries are binary tries: each node carries a label
//! (a compressed run of key bits) and either a value or two branch
//! references. Keys here are fixed at 256 bits, which is what the Jetton
//! metadata dictionary uses (SHA256 of the field name).
//!
//! Label encodings, all three accepted on read, shortest chosen on write:
//!
//! - `hml_short$0`: unary length, then the label bits
//! - `hml_long$10`: binary length, then the label bits
//! - `hml_same$11`: one bit repeated a binary-encoded number of times
//!
//! Values are carried in a child reference of the leaf node (the layout
//! the Jetton deployer writes); on parse the whole leaf remainder (bits
//! and refs) is materialized as the value cell, so callers can also read
//! dictionaries whose values were inlined into the leaf.

use std::sync::Arc;

use crate::{Cell, CellBuilder, CellError, CellResult, CellSlice};

/// Key width of the metadata dictionary, in bits.
pub const DICT_KEY_BITS: usize = 256;

/// A dictionary with 256-bit keys and cell values.
///
/// Iteration follows insertion order; `set` on an existing key replaces the
/// value in place. The wire format is the canonical binary trie, so the
/// serialized form is independent of insertion order.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<([u8; 32], Arc<Cell>)>,
}

impl Dict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Dict {
            entries: Vec::new(),
        }
    }

    /// Insert or replace the value under a key.
    pub fn set(&mut self, key: [u8; 32], value: Arc<Cell>) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Get the value under a key.
    pub fn get(&self, key: &[u8; 32]) -> Option<&Arc<Cell>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8; 32], &Arc<Cell>)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Serialize the trie root node.
    ///
    /// The maybe-bit that distinguishes an empty dictionary lives in the
    /// enclosing cell (`CellBuilder::store_dict` writes it); an empty
    /// dictionary therefore has no root to build.
    pub fn build_root(&self) -> CellResult<Cell> {
        if self.entries.is_empty() {
            return Err(CellError::InvalidDictionary(
                "cannot serialize an empty dictionary root".to_string(),
            ));
        }

        let entries: Vec<(&[u8; 32], &Arc<Cell>)> =
            self.entries.iter().map(|(k, v)| (k, v)).collect();
        build_node(&entries, 0)
    }

    /// Parse a trie root node into a dictionary.
    pub fn parse_root(root: &Cell) -> CellResult<Dict> {
        let mut dict = Dict::new();
        let mut prefix = Vec::with_capacity(DICT_KEY_BITS);
        parse_node(root, &mut prefix, &mut dict)?;
        Ok(dict)
    }
}

/// Get bit `index` of a 256-bit key.
fn key_bit(key: &[u8; 32], index: usize) -> bool {
    (key[index / 8] >> (7 - (index % 8))) & 1 == 1
}

/// Bits needed to encode a length in `0..=n`.
fn len_bits(n: usize) -> usize {
    (usize::BITS - n.leading_zeros()) as usize
}

/// Build the trie node covering `entries`, whose keys agree on bits
/// `[0, from)`. All entries are distinct, so branches are never empty.
fn build_node(entries: &[(&[u8; 32], &Arc<Cell>)], from: usize) -> CellResult<Cell> {
    let n = DICT_KEY_BITS - from;
    let first_key = entries[0].0;

    // Longest common prefix of the remaining key bits.
    let mut label_len = 0;
    while label_len < n {
        let bit = key_bit(first_key, from + label_len);
        if entries
            .iter()
            .all(|(k, _)| key_bit(k, from + label_len) == bit)
        {
            label_len += 1;
        } else {
            break;
        }
    }

    let mut builder = CellBuilder::new();
    write_label(&mut builder, first_key, from, label_len, n)?;

    if label_len == n {
        debug_assert_eq!(entries.len(), 1);
        builder.store_ref(entries[0].1.clone())?;
    } else {
        let split = from + label_len;
        let left: Vec<_> = entries
            .iter()
            .filter(|(k, _)| !key_bit(k, split))
            .copied()
            .collect();
        let right: Vec<_> = entries
            .iter()
            .filter(|(k, _)| key_bit(k, split))
            .copied()
            .collect();

        builder.store_ref(Arc::new(build_node(&left, split + 1)?))?;
        builder.store_ref(Arc::new(build_node(&right, split + 1)?))?;
    }

    builder.build()
}

/// Write the label for bits `[from, from + label_len)` of `key`, choosing
/// the cheapest of the three encodings.
fn write_label(
    builder: &mut CellBuilder,
    key: &[u8; 32],
    from: usize,
    label_len: usize,
    n: usize,
) -> CellResult<()> {
    let width = len_bits(n);
    let short_cost = 2 * label_len + 2;
    let long_cost = 2 + width + label_len;
    let all_same = label_len > 0
        && (1..label_len).all(|i| key_bit(key, from + i) == key_bit(key, from));
    let same_cost = 3 + width;

    if all_same && same_cost < short_cost.min(long_cost) {
        // hml_same$11 v:Bit n:(#<= m)
        builder.store_bit(true)?;
        builder.store_bit(true)?;
        builder.store_bit(key_bit(key, from))?;
        builder.store_uint(label_len as u64, width)?;
    } else if long_cost < short_cost {
        // hml_long$10 n:(#<= m) s:(n * Bit)
        builder.store_bit(true)?;
        builder.store_bit(false)?;
        builder.store_uint(label_len as u64, width)?;
        for i in 0..label_len {
            builder.store_bit(key_bit(key, from + i))?;
        }
    } else {
        // hml_short$0 len:(Unary n) s:(n * Bit)
        builder.store_bit(false)?;
        for _ in 0..label_len {
            builder.store_bit(true)?;
        }
        builder.store_bit(false)?;
        for i in 0..label_len {
            builder.store_bit(key_bit(key, from + i))?;
        }
    }

    Ok(())
}

/// Read a label with at most `n` bits remaining in the key.
fn read_label(slice: &mut CellSlice, n: usize) -> CellResult<Vec<bool>> {
    let label = if !slice.load_bit()? {
        // hml_short: unary length, then the bits
        let mut count = 0;
        while slice.load_bit()? {
            count += 1;
        }
        let mut bits = Vec::with_capacity(count);
        for _ in 0..count {
            bits.push(slice.load_bit()?);
        }
        bits
    } else if !slice.load_bit()? {
        // hml_long: binary length, then the bits
        let count = slice.load_uint(len_bits(n))? as usize;
        let mut bits = Vec::with_capacity(count);
        for _ in 0..count {
            bits.push(slice.load_bit()?);
        }
        bits
    } else {
        // hml_same: one bit, repeated
        let bit = slice.load_bit()?;
        let count = slice.load_uint(len_bits(n))? as usize;
        vec![bit; count]
    };

    if label.len() > n {
        return Err(CellError::InvalidDictionary(format!(
            "label of {} bits exceeds remaining key length {}",
            label.len(),
            n
        )));
    }

    Ok(label)
}

fn parse_node(cell: &Cell, prefix: &mut Vec<bool>, dict: &mut Dict) -> CellResult<()> {
    let n = DICT_KEY_BITS - prefix.len();
    let mut slice = CellSlice::new(cell);

    let label = read_label(&mut slice, n)?;
    let label_len = label.len();
    prefix.extend(label);

    if prefix.len() == DICT_KEY_BITS {
        let mut key = [0u8; 32];
        for (i, bit) in prefix.iter().enumerate() {
            if *bit {
                key[i / 8] |= 1 << (7 - (i % 8));
            }
        }

        if dict.get(&key).is_some() {
            return Err(CellError::InvalidDictionary(
                "duplicate key in dictionary".to_string(),
            ));
        }

        // Materialize the leaf remainder so the caller decides whether the
        // value lives in a ref or inline.
        let mut value_builder = CellBuilder::new();
        value_builder.store_slice(&slice)?;
        dict.set(key, Arc::new(value_builder.build()?));
    } else {
        let left = slice.load_ref().map_err(|_| {
            CellError::InvalidDictionary("fork node missing left branch".to_string())
        })?;
        let right = slice.load_ref().map_err(|_| {
            CellError::InvalidDictionary("fork node missing right branch".to_string())
        })?;

        prefix.push(false);
        parse_node(left, prefix, dict)?;
        prefix.pop();

        prefix.push(true);
        parse_node(right, prefix, dict)?;
        prefix.pop();
    }

    prefix.truncate(prefix.len() - label_len);
    Ok(())
}

//! Bag of Cells (BoC) serialization format.
//!
//! BoC is the standard serialization format for cell trees: a flat list of
//! deduplicated cells in topological order, with an optional index and an
//! optional CRC32-C checksum. Base64 of the generic form is what wallets
//! and APIs pass around.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    crc32c, Cell, CellError, CellResult, BOC_GENERIC_MAGIC, BOC_INDEXED_CRC32_MAGIC,
    BOC_INDEXED_MAGIC,
};

/// A serialized collection of cells.
///
/// Supports multiple roots and deduplicates shared subtrees by cell hash.
/// Serialization always emits the generic format; all three magic values
/// are accepted on read. Exotic cells are rejected, this codec only deals
/// in ordinary cells.
#[derive(Debug, Clone)]
pub struct BagOfCells {
    roots: Vec<Arc<Cell>>,
}

impl BagOfCells {
    /// Create a new BoC with the given root cells.
    pub fn new(roots: Vec<Arc<Cell>>) -> Self {
        BagOfCells { roots }
    }

    /// Create a BoC with a single root cell.
    pub fn from_root(root: Cell) -> Self {
        BagOfCells {
            roots: vec![Arc::new(root)],
        }
    }

    /// Get all root cells.
    pub fn roots(&self) -> &[Arc<Cell>] {
        &self.roots
    }

    /// Get a single root cell (errors if not exactly one root).
    pub fn single_root(&self) -> CellResult<&Arc<Cell>> {
        if self.roots.len() != 1 {
            return Err(CellError::NotSingleRoot(self.roots.len()));
        }
        Ok(&self.roots[0])
    }

    /// Get the number of root cells.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Serialize to bytes in the generic format with CRC32 checksum.
    pub fn serialize(&self) -> CellResult<Vec<u8>> {
        self.serialize_with_options(true, false)
    }

    /// Serialize with options.
    ///
    /// # Arguments
    /// * `with_crc` - Include CRC32 checksum
    /// * `with_index` - Include cell offset index
    pub fn serialize_with_options(&self, with_crc: bool, with_index: bool) -> CellResult<Vec<u8>> {
        if self.roots.is_empty() {
            return Err(CellError::InvalidBoc("No root cells".to_string()));
        }

        // Children before parents, deduplicated by hash
        let cells = self.collect_cells_topological();
        let cell_count = cells.len();

        let hash_to_index: HashMap<[u8; 32], usize> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash(), i))
            .collect();

        let root_indices: Vec<usize> = self
            .roots
            .iter()
            .map(|r| hash_to_index[&r.hash()])
            .collect();

        let mut cell_data: Vec<Vec<u8>> = Vec::with_capacity(cell_count);
        let mut total_cells_size = 0usize;

        for cell in &cells {
            let serialized = Self::serialize_cell(cell, &hash_to_index)?;
            total_cells_size += serialized.len();
            cell_data.push(serialized);
        }

        let size_bytes = Self::bytes_needed(cell_count);
        let off_bytes = Self::bytes_needed(total_cells_size);

        let mut result = Vec::new();

        result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());

        // Flags byte: has_idx (bit 7) | has_crc (bit 6) | has_cache_bits
        // (bit 5) | flags (bits 4-3) | size_bytes (bits 2-0)
        let flags: u8 = (if with_index { 1 << 7 } else { 0 })
            | (if with_crc { 1 << 6 } else { 0 })
            | (size_bytes as u8);
        result.push(flags);
        result.push(off_bytes as u8);

        Self::write_uint(&mut result, cell_count as u64, size_bytes);
        Self::write_uint(&mut result, self.roots.len() as u64, size_bytes);
        // Absent count, always 0
        Self::write_uint(&mut result, 0, size_bytes);
        Self::write_uint(&mut result, total_cells_size as u64, off_bytes);

        for idx in &root_indices {
            Self::write_uint(&mut result, *idx as u64, size_bytes);
        }

        if with_index {
            let mut offset = 0usize;
            for data in &cell_data {
                Self::write_uint(&mut result, offset as u64, off_bytes);
                offset += data.len();
            }
        }

        for data in cell_data {
            result.extend_from_slice(&data);
        }

        if with_crc {
            let crc = crc32c(&result);
            result.extend_from_slice(&crc.to_le_bytes());
        }

        Ok(result)
    }

    /// Serialize to a standard base64 string.
    pub fn serialize_to_base64(&self) -> CellResult<String> {
        let bytes = self.serialize()?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            &bytes,
        ))
    }

    /// Deserialize from bytes.
    ///
    /// Accepts all three formats:
    /// - `0xb5ee9c72` - generic (serialized_boc)
    /// - `0x68ff65f3` - indexed (serialized_boc_idx)
    /// - `0xacc3a728` - indexed with CRC32C (serialized_boc_idx_crc32c)
    pub fn deserialize(data: &[u8]) -> CellResult<Self> {
        if data.len() < 5 {
            return Err(CellError::UnexpectedEof);
        }

        let mut offset = 0;

        let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        offset += 4;

        let (has_idx, has_crc, size_bytes) = match magic {
            BOC_GENERIC_MAGIC => {
                let flags = data[offset];
                offset += 1;
                let has_idx = (flags & 0x80) != 0;
                let has_crc = (flags & 0x40) != 0;
                let size_bytes = (flags & 0x07) as usize;
                (has_idx, has_crc, size_bytes)
            }
            BOC_INDEXED_MAGIC => {
                let size_bytes = data[offset] as usize;
                offset += 1;
                (true, false, size_bytes)
            }
            BOC_INDEXED_CRC32_MAGIC => {
                let size_bytes = data[offset] as usize;
                offset += 1;
                (true, true, size_bytes)
            }
            _ => {
                return Err(CellError::InvalidBoc(format!(
                    "Invalid magic: {:08x}, expected one of {:08x}, {:08x}, {:08x}",
                    magic, BOC_GENERIC_MAGIC, BOC_INDEXED_MAGIC, BOC_INDEXED_CRC32_MAGIC
                )));
            }
        };

        if offset >= data.len() {
            return Err(CellError::UnexpectedEof);
        }
        let off_bytes = data[offset] as usize;
        offset += 1;

        if size_bytes > 8 || off_bytes > 8 {
            return Err(CellError::InvalidBoc(format!(
                "Unreasonable size widths: size_bytes {}, off_bytes {}",
                size_bytes, off_bytes
            )));
        }

        let cells_count = Self::read_uint(data, &mut offset, size_bytes)? as usize;
        let roots_count = Self::read_uint(data, &mut offset, size_bytes)? as usize;
        let _absent_count = Self::read_uint(data, &mut offset, size_bytes)? as usize;
        let total_cells_size = Self::read_uint(data, &mut offset, off_bytes)? as usize;

        // Bound the declared counts by the actual input before trusting
        // them: every serialized cell takes at least its two descriptor
        // bytes.
        if total_cells_size > data.len() {
            return Err(CellError::UnexpectedEof);
        }
        if cells_count
            .checked_mul(2)
            .map_or(true, |min| min > total_cells_size)
        {
            return Err(CellError::InvalidBoc(format!(
                "Cell count {} does not fit in {} data bytes",
                cells_count, total_cells_size
            )));
        }
        if roots_count > cells_count {
            return Err(CellError::InvalidBoc(format!(
                "Root count {} exceeds cell count {}",
                roots_count, cells_count
            )));
        }

        let mut root_indices = Vec::with_capacity(roots_count);
        for _ in 0..roots_count {
            root_indices.push(Self::read_uint(data, &mut offset, size_bytes)? as usize);
        }

        if has_idx {
            let index_size = cells_count
                .checked_mul(off_bytes)
                .ok_or_else(|| CellError::InvalidBoc("Index size overflow".to_string()))?;
            offset = offset
                .checked_add(index_size)
                .ok_or_else(|| CellError::InvalidBoc("Index size overflow".to_string()))?;
        }

        let data_end = if has_crc {
            if data.len() < 4 {
                return Err(CellError::UnexpectedEof);
            }
            data.len() - 4
        } else {
            data.len()
        };

        if has_crc {
            let expected_crc = u32::from_le_bytes([
                data[data_end],
                data[data_end + 1],
                data[data_end + 2],
                data[data_end + 3],
            ]);
            let actual_crc = crc32c(&data[..data_end]);
            if expected_crc != actual_crc {
                return Err(CellError::CrcMismatch {
                    expected: expected_crc,
                    actual: actual_crc,
                });
            }
        }

        let cells_end = offset
            .checked_add(total_cells_size)
            .ok_or(CellError::UnexpectedEof)?;
        if cells_end > data_end {
            return Err(CellError::UnexpectedEof);
        }

        let cells_data = &data[offset..cells_end];
        let cells = Self::parse_cells(cells_data, cells_count, size_bytes)?;

        let roots: Vec<Arc<Cell>> = root_indices
            .iter()
            .map(|&idx| cells.get(idx).cloned().ok_or(CellError::CellNotFound(idx)))
            .collect::<CellResult<Vec<_>>>()?;

        Ok(BagOfCells { roots })
    }

    /// Deserialize from a base64 string (standard alphabet).
    pub fn deserialize_from_base64(base64_str: &str) -> CellResult<Self> {
        let bytes = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            base64_str.trim(),
        )
        .map_err(|e| CellError::InvalidBase64(e.to_string()))?;

        Self::deserialize(&bytes)
    }

    /// Deserialize from a hex string.
    pub fn deserialize_from_hex(hex_str: &str) -> CellResult<Self> {
        let hex_str = hex_str.trim();
        if hex_str.len() % 2 != 0 {
            return Err(CellError::InvalidBoc("invalid hex string".to_string()));
        }
        let bytes: Vec<u8> = (0..hex_str.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex_str[i..i + 2], 16)
                    .map_err(|_| CellError::InvalidBoc("invalid hex string".to_string()))
            })
            .collect::<CellResult<Vec<u8>>>()?;

        Self::deserialize(&bytes)
    }

    /// Collect all cells depth-first, children before parents.
    fn collect_cells_topological(&self) -> Vec<Arc<Cell>> {
        let mut cells: Vec<Arc<Cell>> = Vec::new();
        let mut visited: HashMap<[u8; 32], usize> = HashMap::new();

        for root in &self.roots {
            Self::collect_cell_recursive(root, &mut cells, &mut visited);
        }

        cells
    }

    fn collect_cell_recursive(
        cell: &Arc<Cell>,
        cells: &mut Vec<Arc<Cell>>,
        visited: &mut HashMap<[u8; 32], usize>,
    ) {
        let hash = cell.hash();
        if visited.contains_key(&hash) {
            return;
        }

        for reference in cell.references() {
            Self::collect_cell_recursive(reference, cells, visited);
        }

        let index = cells.len();
        visited.insert(hash, index);
        cells.push(cell.clone());
    }

    /// Serialize a single cell: descriptors, tagged data, reference indices.
    fn serialize_cell(
        cell: &Cell,
        hash_to_index: &HashMap<[u8; 32], usize>,
    ) -> CellResult<Vec<u8>> {
        let mut result = Vec::new();

        let (d1, d2) = cell.descriptors();
        result.push(d1);
        result.push(d2);

        result.extend_from_slice(&cell.data_with_completion_tag());

        let ref_size = Self::bytes_needed(hash_to_index.len());
        for reference in cell.references() {
            let idx = hash_to_index
                .get(&reference.hash())
                .ok_or_else(|| CellError::InvalidBoc("Reference not found".to_string()))?;
            Self::write_uint(&mut result, *idx as u64, ref_size);
        }

        Ok(result)
    }

    /// Parse the flat cell list and rebuild the DAG.
    fn parse_cells(
        data: &[u8],
        cell_count: usize,
        size_bytes: usize,
    ) -> CellResult<Vec<Arc<Cell>>> {
        let mut cells: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
        let mut offset = 0;

        // First pass: raw data and reference indices per cell
        let mut cell_infos: Vec<(Vec<u8>, usize, Vec<usize>)> = Vec::with_capacity(cell_count);

        for _ in 0..cell_count {
            if offset + 2 > data.len() {
                return Err(CellError::UnexpectedEof);
            }

            let d1 = data[offset];
            let d2 = data[offset + 1];
            offset += 2;

            let refs_count = (d1 & 0x07) as usize;
            if (d1 & 0x08) != 0 {
                return Err(CellError::InvalidBoc(
                    "Exotic cells are not supported".to_string(),
                ));
            }
            if refs_count > crate::MAX_CELL_REFS {
                return Err(CellError::InvalidBoc(format!(
                    "Cell has {} references",
                    refs_count
                )));
            }

            // d2 = ceil(bit_len / 8) + floor(bit_len / 8); odd d2 means a
            // partial byte terminated by a completion tag
            let data_len = (d2 as usize).div_ceil(2);

            if offset + data_len > data.len() {
                return Err(CellError::UnexpectedEof);
            }

            let cell_data = data[offset..offset + data_len].to_vec();
            offset += data_len;

            let mut ref_indices = Vec::with_capacity(refs_count);
            for _ in 0..refs_count {
                let ref_idx = Self::read_uint(data, &mut offset, size_bytes)? as usize;
                ref_indices.push(ref_idx);
            }

            let bit_len = if d2 % 2 == 0 {
                data_len * 8
            } else {
                Self::find_bit_len(&cell_data)
            };

            cell_infos.push((cell_data, bit_len, ref_indices));
        }

        // Some producers emit parents before children (refs point to higher
        // indices); detect the direction and build in dependency order.
        let refs_point_higher = cell_infos
            .iter()
            .enumerate()
            .find_map(|(i, (_, _, refs))| {
                if refs.is_empty() {
                    None
                } else {
                    Some(refs.iter().all(|&r| r > i))
                }
            })
            .unwrap_or(false);

        let iteration_order: Vec<usize> = if refs_point_higher {
            (0..cell_count).rev().collect()
        } else {
            (0..cell_count).collect()
        };

        for i in iteration_order {
            let (data, bit_len, ref_indices) = &cell_infos[i];

            let clean_data = Self::remove_completion_tag(data, *bit_len);

            let references: Vec<Arc<Cell>> = ref_indices
                .iter()
                .map(|&idx| cells.get(idx).and_then(|c| c.clone()).ok_or(CellError::CellNotFound(idx)))
                .collect::<CellResult<Vec<_>>>()?;

            if *bit_len > crate::MAX_CELL_BITS {
                return Err(CellError::InvalidBoc(format!(
                    "Cell data is {} bits",
                    bit_len
                )));
            }

            cells[i] = Some(Arc::new(Cell::new(clean_data, *bit_len, references)));
        }

        cells
            .into_iter()
            .enumerate()
            .map(|(i, c)| c.ok_or(CellError::CellNotFound(i)))
            .collect()
    }

    /// Find the bit length of tagged data.
    ///
    /// The completion tag is a '1' bit followed by zeros up to the byte
    /// boundary; scan from the end for the lowest set bit.
    fn find_bit_len(data: &[u8]) -> usize {
        for i in (0..data.len()).rev() {
            let byte = data[i];
            if byte != 0 {
                let trailing_zeros = byte.trailing_zeros() as usize;
                return (i + 1) * 8 - trailing_zeros - 1;
            }
        }

        0
    }

    /// Strip the completion tag, returning only whole data bytes.
    fn remove_completion_tag(data: &[u8], bit_len: usize) -> Vec<u8> {
        if data.is_empty() || bit_len == 0 {
            return Vec::new();
        }

        let byte_len = bit_len.div_ceil(8);
        let mut result = data[..byte_len].to_vec();

        let remainder = bit_len % 8;
        if remainder != 0 {
            let mask = !((1u8 << (8 - remainder)) - 1);
            if let Some(last) = result.last_mut() {
                *last &= mask;
            }
        }

        result
    }

    /// Bytes needed to represent a count.
    fn bytes_needed(n: usize) -> usize {
        if n == 0 {
            1
        } else {
            ((64 - (n as u64).leading_zeros()) + 7) as usize / 8
        }
    }

    fn write_uint(buf: &mut Vec<u8>, value: u64, bytes: usize) {
        for i in (0..bytes).rev() {
            buf.push((value >> (i * 8)) as u8);
        }
    }

    fn read_uint(data: &[u8], offset: &mut usize, bytes: usize) -> CellResult<u64> {
        if *offset + bytes > data.len() {
            return Err(CellError::UnexpectedEof);
        }

        let mut result: u64 = 0;
        for i in 0..bytes {
            result = (result << 8) | (data[*offset + i] as u64);
        }
        *offset += bytes;
        Ok(result)
    }
}

//! Snake format: arbitrary-length byte strings spread over a cell chain.
//!
//! The first cell starts with a 0x00 prefix byte followed by up to 126
//! bytes of payload; each continuation cell holds up to 126 more bytes and
//! at most one reference to the next link. Metadata field values and
//! offchain URIs are stored this way.

use std::sync::Arc;

use tonmint_cell::{Cell, CellBuilder, CellSlice};

use crate::{JettonError, JettonResult};

/// Prefix byte of snake-encoded data.
pub const SNAKE_PREFIX: u8 = 0x00;

/// Payload capacity per cell: (1023 - 8) / 8, rounded down.
pub const SNAKE_CHUNK_BYTES: usize = 126;

/// Encode bytes as a snake cell chain, prefix byte included.
pub fn write_snake_data(data: &[u8]) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u8(SNAKE_PREFIX)?;

    let head_len = data.len().min(SNAKE_CHUNK_BYTES);
    builder.store_bytes(&data[..head_len])?;

    if data.len() > head_len {
        builder.store_ref(Arc::new(write_chunk(&data[head_len..])?))?;
    }

    Ok(builder.build()?)
}

/// Encode a continuation chunk (no prefix byte).
fn write_chunk(data: &[u8]) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();

    let len = data.len().min(SNAKE_CHUNK_BYTES);
    builder.store_bytes(&data[..len])?;

    if data.len() > len {
        builder.store_ref(Arc::new(write_chunk(&data[len..])?))?;
    }

    Ok(builder.build()?)
}

/// Decode a snake cell chain, checking the 0x00 prefix.
pub fn read_snake_data(cell: &Cell) -> JettonResult<Vec<u8>> {
    let mut slice = CellSlice::new(cell);

    let prefix = slice.load_u8()?;
    if prefix != SNAKE_PREFIX {
        return Err(JettonError::InvalidSnakeFormat(prefix));
    }

    read_snake_tail(slice)
}

/// Decode a snake chain whose prefix byte has already been consumed.
pub fn read_snake_tail(mut slice: CellSlice) -> JettonResult<Vec<u8>> {
    let mut result = Vec::new();

    loop {
        result.extend_from_slice(&slice.load_remaining_bytes()?);

        match slice.refs_left() {
            0 => break,
            1 => {
                let next = slice.load_ref()?;
                slice = CellSlice::new(next);
            }
            n => return Err(JettonError::MalformedSnakeChain(n)),
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(len: usize) -> Vec<u8> {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let cell = write_snake_data(&data).unwrap();
        let decoded = read_snake_data(&cell).unwrap();
        assert_eq!(decoded, data);
        data
    }

    #[test]
    fn test_empty() {
        let cell = write_snake_data(&[]).unwrap();
        assert_eq!(cell.bit_len(), 8);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(read_snake_data(&cell).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_single_byte() {
        roundtrip(1);
    }

    #[test]
    fn test_exactly_one_cell() {
        // 126 payload bytes plus the prefix fill the head cell
        let data = roundtrip(SNAKE_CHUNK_BYTES);
        let cell = write_snake_data(&data).unwrap();
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(cell.bit_len(), (1 + SNAKE_CHUNK_BYTES) * 8);
    }

    #[test]
    fn test_one_byte_overflow() {
        let data = roundtrip(SNAKE_CHUNK_BYTES + 1);
        let cell = write_snake_data(&data).unwrap();
        assert_eq!(cell.reference_count(), 1);
        let next = cell.reference(0).unwrap();
        assert_eq!(next.bit_len(), 8);
        assert_eq!(next.reference_count(), 0);
    }

    #[test]
    fn test_long_chains() {
        roundtrip(1000);
        roundtrip(5000);
    }

    #[test]
    fn test_chain_length() {
        let data: Vec<u8> = vec![0xAB; 1000];
        let cell = write_snake_data(&data).unwrap();

        let mut links = 1;
        let mut current = cell.clone();
        while current.reference_count() == 1 {
            current = current.reference(0).unwrap().as_ref().clone();
            links += 1;
        }
        // 1 + 126 + 7 * 126 >= 1001 bytes total
        assert_eq!(links, 8);
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let mut builder = CellBuilder::new();
        builder.store_u8(0x01).unwrap();
        builder.store_bytes(b"data").unwrap();
        let cell = builder.build().unwrap();

        assert!(matches!(
            read_snake_data(&cell),
            Err(JettonError::InvalidSnakeFormat(0x01))
        ));
    }

    #[test]
    fn test_extra_refs_rejected() {
        let mut leaf = CellBuilder::new();
        leaf.store_bytes(b"x").unwrap();
        let leaf = Arc::new(leaf.build().unwrap());

        let mut builder = CellBuilder::new();
        builder.store_u8(SNAKE_PREFIX).unwrap();
        builder.store_ref(leaf.clone()).unwrap();
        builder.store_ref(leaf).unwrap();
        let cell = builder.build().unwrap();

        assert!(matches!(
            read_snake_data(&cell),
            Err(JettonError::MalformedSnakeChain(2))
        ));
    }
}

//! TON message address types.
//!
//! Only the two forms this codec produces are modeled: `addr_none$00`
//! and the standard internal address `addr_std$10`.

use base64::Engine;

use crate::{CellError, CellResult};

/// A TON message address.
///
/// # Example
///
/// ```
/// use tonmint_cell::MsgAddress;
///
/// let addr = MsgAddress::from_string(
///     "0:0000000000000000000000000000000000000000000000000000000000000000",
/// )
/// .unwrap();
/// assert_eq!(addr.workchain(), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MsgAddress {
    /// No address (addr_none$00).
    #[default]
    Null,

    /// Standard internal address (addr_std$10).
    Internal {
        /// Workchain ID (-1 for masterchain, 0 for basechain).
        workchain: i32,
        /// 256-bit account ID.
        address: [u8; 32],
    },
}

impl MsgAddress {
    /// Parse an address from a string.
    ///
    /// Supported formats:
    /// - Raw: "workchain:hex_address" (e.g., "0:abc123...")
    /// - User-friendly base64 (48 characters, standard or URL-safe alphabet)
    pub fn from_string(s: &str) -> CellResult<Self> {
        let s = s.trim();

        if s.is_empty() {
            return Ok(MsgAddress::Null);
        }

        if let Some(colon_pos) = s.find(':') {
            let workchain_str = &s[..colon_pos];
            let address_str = &s[colon_pos + 1..];

            let workchain: i32 = workchain_str.parse().map_err(|_| {
                CellError::InvalidAddress(format!("Invalid workchain: {}", workchain_str))
            })?;

            if address_str.len() != 64 {
                return Err(CellError::InvalidAddress(format!(
                    "Address hex must be 64 characters, got {}",
                    address_str.len()
                )));
            }

            let address_bytes = hex_decode(address_str)?;
            let mut address = [0u8; 32];
            address.copy_from_slice(&address_bytes);

            return Ok(MsgAddress::Internal { workchain, address });
        }

        if s.len() == 48 {
            return Self::from_user_friendly(s);
        }

        Err(CellError::InvalidAddress(format!(
            "Unrecognized address format: {}",
            s
        )))
    }

    /// Parse a user-friendly address (base64 format).
    ///
    /// Format: 1 byte tag + 1 byte workchain + 32 bytes address + 2 bytes CRC16.
    fn from_user_friendly(s: &str) -> CellResult<Self> {
        // Accept both alphabets by normalizing to standard base64.
        let standard_b64: String = s
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                c => c,
            })
            .collect();

        let bytes = base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(&standard_b64)
            .map_err(|e| CellError::InvalidBase64(e.to_string()))?;

        if bytes.len() != 36 {
            return Err(CellError::InvalidAddress(format!(
                "User-friendly address must be 36 bytes, got {}",
                bytes.len()
            )));
        }

        let data = &bytes[0..34];
        let expected_crc = ((bytes[34] as u16) << 8) | (bytes[35] as u16);
        let actual_crc = crc16_xmodem(data);

        if expected_crc != actual_crc {
            return Err(CellError::InvalidAddress(format!(
                "CRC16 mismatch: expected {:04x}, got {:04x}",
                expected_crc, actual_crc
            )));
        }

        // Tag byte carries the bounceable and testnet flags; both forms
        // resolve to the same account.
        let workchain = bytes[1] as i8 as i32;
        let mut address = [0u8; 32];
        address.copy_from_slice(&bytes[2..34]);

        Ok(MsgAddress::Internal { workchain, address })
    }

    /// Convert to the raw "workchain:hex_address" form.
    ///
    /// The null address formats as an empty string.
    pub fn to_raw_string(&self) -> String {
        match self {
            MsgAddress::Null => String::new(),
            MsgAddress::Internal { workchain, address } => {
                format!("{}:{}", workchain, hex_encode(address))
            }
        }
    }

    /// Convert to the user-friendly base64 form.
    ///
    /// Returns `None` for the null address.
    pub fn to_user_friendly(&self, bounceable: bool, testnet: bool) -> Option<String> {
        match self {
            MsgAddress::Internal { workchain, address } => {
                let mut data = Vec::with_capacity(36);

                let mut tag: u8 = if bounceable { 0x11 } else { 0x51 };
                if testnet {
                    tag |= 0x80;
                }
                data.push(tag);
                data.push(*workchain as i8 as u8);
                data.extend_from_slice(address);

                let crc = crc16_xmodem(&data);
                data.push((crc >> 8) as u8);
                data.push(crc as u8);

                Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&data))
            }
            MsgAddress::Null => None,
        }
    }

    /// Get the workchain ID (if internal address).
    pub fn workchain(&self) -> Option<i32> {
        match self {
            MsgAddress::Internal { workchain, .. } => Some(*workchain),
            MsgAddress::Null => None,
        }
    }

    /// Get the 256-bit account ID (if internal address).
    pub fn hash_part(&self) -> Option<&[u8; 32]> {
        match self {
            MsgAddress::Internal { address, .. } => Some(address),
            MsgAddress::Null => None,
        }
    }

    /// Check if this is a null address.
    pub fn is_null(&self) -> bool {
        matches!(self, MsgAddress::Null)
    }

    /// Check if this is an internal address.
    pub fn is_internal(&self) -> bool {
        matches!(self, MsgAddress::Internal { .. })
    }

    /// Check if this is a basechain address (workchain 0).
    pub fn is_basechain(&self) -> bool {
        matches!(self, MsgAddress::Internal { workchain: 0, .. })
    }
}

impl std::fmt::Display for MsgAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_raw_string())
    }
}

/// Decode hex string to bytes.
fn hex_decode(s: &str) -> CellResult<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(CellError::InvalidAddress(
            "Hex string must have even length".to_string(),
        ));
    }

    let mut result = Vec::with_capacity(s.len() / 2);
    for i in (0..s.len()).step_by(2) {
        let byte = u8::from_str_radix(&s[i..i + 2], 16)
            .map_err(|_| CellError::InvalidAddress(format!("Invalid hex: {}", &s[i..i + 2])))?;
        result.push(byte);
    }
    Ok(result)
}

/// Encode bytes to lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// CRC16-XMODEM checksum used by the user-friendly address form.
fn crc16_xmodem(data: &[u8]) -> u16 {
    const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
    CRC16.checksum(data)
}

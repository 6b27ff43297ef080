//! TEP-64 token content: building and parsing Jetton metadata cells.
//!
//! Metadata lives in a content cell discriminated by its first byte:
//! `0x00` for onchain content (a SHA256-keyed dictionary of snake-encoded
//! field values) and `0x01` for offchain content (an ASCII URI pointing at
//! a JSON document).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tonmint_cell::{sha256, Cell, CellBuilder, CellSlice, Dict};

use crate::fetch::MetadataFetcher;
use crate::snake::{read_snake_data, write_snake_data};
use crate::{JettonError, JettonResult};

/// Content cell prefix for onchain (dictionary) metadata.
pub const ONCHAIN_CONTENT_PREFIX: u8 = 0x00;

/// Content cell prefix for offchain (URI) metadata.
pub const OFFCHAIN_CONTENT_PREFIX: u8 = 0x01;

/// Text encoding declared for a metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Ascii,
}

impl Encoding {
    fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
        }
    }

    fn encode(self, field: &'static str, text: &str) -> JettonResult<Vec<u8>> {
        if self == Encoding::Ascii && !text.is_ascii() {
            return Err(JettonError::InvalidValueEncoding {
                field,
                encoding: self.name(),
            });
        }
        Ok(text.as_bytes().to_vec())
    }

    fn decode(self, field: &'static str, bytes: Vec<u8>) -> JettonResult<String> {
        let text = String::from_utf8(bytes).map_err(|_| JettonError::InvalidValueEncoding {
            field,
            encoding: self.name(),
        })?;
        if self == Encoding::Ascii && !text.is_ascii() {
            return Err(JettonError::InvalidValueEncoding {
                field,
                encoding: self.name(),
            });
        }
        Ok(text)
    }
}

/// The fixed set of metadata fields with their encodings, plus the key
/// aliases and excluded keys applied when building.
#[derive(Debug, Clone)]
pub struct MetadataSchema {
    fields: Vec<(&'static str, Encoding)>,
    aliases: Vec<(&'static str, &'static str)>,
    excluded: Vec<&'static str>,
}

impl Default for MetadataSchema {
    /// The standard Jetton field set plus the fee and deflationary
    /// extension fields this application stores onchain.
    fn default() -> Self {
        MetadataSchema {
            fields: vec![
                ("name", Encoding::Utf8),
                ("description", Encoding::Utf8),
                ("image", Encoding::Ascii),
                ("decimals", Encoding::Utf8),
                ("symbol", Encoding::Utf8),
                ("image_data", Encoding::Utf8),
                ("uri", Encoding::Ascii),
                ("transaction_fee_percentage", Encoding::Utf8),
                ("transaction_fee_buyback_percentage", Encoding::Utf8),
                ("transaction_fee_treasury_percentage", Encoding::Utf8),
                ("transaction_fee_distribution_type", Encoding::Utf8),
                ("deflationary_trigger_type", Encoding::Utf8),
                ("deflationary_threshold_amount", Encoding::Utf8),
                ("deflationary_time_period", Encoding::Utf8),
                ("deflationary_max_buyback_per_tx", Encoding::Utf8),
                ("deflationary_enable_auto_buyback", Encoding::Utf8),
                ("deflationary_enable_burn_on_buyback", Encoding::Utf8),
            ],
            aliases: vec![("imageUrl", "image")],
            excluded: vec!["totalSupply", "initialPrice"],
        }
    }
}

impl MetadataSchema {
    /// Iterate over fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Encoding)> + '_ {
        self.fields.iter().copied()
    }

    /// Keys skipped when building (stored elsewhere in contract state).
    fn is_excluded(&self, key: &str) -> bool {
        self.excluded.contains(&key)
    }

    /// Map an input key through the alias table to its canonical name.
    fn canonical<'a>(&self, key: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, canonical)| *canonical)
            .unwrap_or(key)
    }

    /// Look up a canonical field name.
    fn field(&self, name: &str) -> Option<(&'static str, Encoding)> {
        self.fields.iter().copied().find(|(f, _)| *f == name)
    }
}

/// A value supplied for a metadata field. Numbers are stringified before
/// encoding, matching how token configuration arrives from JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
}

impl MetadataValue {
    fn to_text(&self) -> String {
        match self {
            MetadataValue::Text(s) => s.clone(),
            MetadataValue::Number(n) => format!("{}", n),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Number(n)
    }
}

/// A decoded metadata record: field name to string value. Absent fields
/// are simply missing from the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JettonMetadata {
    fields: BTreeMap<String, String>,
}

impl JettonMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.as_str())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay another record on top of this one. Fields present in
    /// `other` win.
    pub fn merge_from(&mut self, other: &JettonMetadata) {
        for (k, v) in other.iter() {
            self.fields.insert(k.to_string(), v.to_string());
        }
    }
}

/// Where the authoritative metadata record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceType {
    Onchain,
    OffchainIpfs,
    OffchainPrivateDomain,
}

/// A parsed content cell, before any external fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedContent {
    Onchain {
        metadata: JettonMetadata,
        /// True when a dictionary value was inlined into the leaf instead
        /// of being carried in a reference. Some early deployers wrote
        /// this layout; it is read but never produced.
        faulty_layout: bool,
    },
    Offchain {
        uri: String,
    },
}

/// The full result of reading a contract's metadata, external content
/// resolved and merged.
#[derive(Debug, Clone, PartialEq)]
pub struct JettonMetadataResult {
    pub persistence: PersistenceType,
    pub metadata: JettonMetadata,
    pub faulty_layout: bool,
}

/// Builds and parses content cells against a [`MetadataSchema`].
#[derive(Debug, Clone, Default)]
pub struct MetadataCodec {
    schema: MetadataSchema,
}

impl MetadataCodec {
    pub fn new(schema: MetadataSchema) -> Self {
        MetadataCodec { schema }
    }

    pub fn schema(&self) -> &MetadataSchema {
        &self.schema
    }

    /// Build an onchain content cell from field entries.
    ///
    /// Excluded keys are silently dropped, aliases are mapped to their
    /// canonical names, unknown keys are an error, and entries with an
    /// empty value are omitted from the dictionary.
    pub fn build_onchain(&self, entries: &[(&str, MetadataValue)]) -> JettonResult<Cell> {
        let mut dict = Dict::new();

        for (key, value) in entries {
            if self.schema.is_excluded(key) {
                continue;
            }

            let canonical = self.schema.canonical(key);
            let (field, encoding) =
                self.schema
                    .field(canonical)
                    .ok_or_else(|| JettonError::UnsupportedField {
                        key: key.to_string(),
                    })?;

            let text = value.to_text();
            if text.is_empty() {
                continue;
            }

            let bytes = encoding.encode(field, &text)?;
            dict.set(
                sha256(field.as_bytes()),
                Arc::new(write_snake_data(&bytes)?),
            );
        }

        let mut builder = CellBuilder::new();
        builder.store_u8(ONCHAIN_CONTENT_PREFIX)?;
        builder.store_dict(Some(&dict))?;
        Ok(builder.build()?)
    }

    /// Build an offchain content cell pointing at an external URI.
    pub fn build_offchain(&self, uri: &str) -> JettonResult<Cell> {
        if !uri.is_ascii() {
            return Err(JettonError::InvalidValueEncoding {
                field: "uri",
                encoding: "ascii",
            });
        }

        let mut builder = CellBuilder::new();
        builder.store_u8(OFFCHAIN_CONTENT_PREFIX)?;
        builder.store_bytes(uri.as_bytes())?;
        Ok(builder.build()?)
    }

    /// Parse a content cell. Does not follow offchain URIs; see
    /// [`read_jetton_metadata`] for the fetching variant.
    pub fn parse(&self, cell: &Cell) -> JettonResult<ParsedContent> {
        let mut slice = CellSlice::new(cell);

        match slice.load_u8()? {
            ONCHAIN_CONTENT_PREFIX => {
                let dict = slice.load_dict()?;
                let mut metadata = JettonMetadata::new();
                let mut faulty_layout = false;

                for (field, encoding) in self.schema.fields() {
                    let key = sha256(field.as_bytes());
                    let Some(leaf) = dict.get(&key) else {
                        continue;
                    };

                    let bytes = if leaf.reference_count() == 0 {
                        faulty_layout = true;
                        read_snake_data(leaf)?
                    } else {
                        let mut leaf_slice = CellSlice::new(leaf);
                        read_snake_data(leaf_slice.load_ref()?)?
                    };

                    let value = encoding.decode(field, bytes)?;
                    if !value.is_empty() {
                        metadata.insert(field, value);
                    }
                }

                Ok(ParsedContent::Onchain {
                    metadata,
                    faulty_layout,
                })
            }
            OFFCHAIN_CONTENT_PREFIX => {
                let bytes = slice.load_remaining_bytes()?;
                let uri = Encoding::Ascii.decode("uri", bytes)?;
                Ok(ParsedContent::Offchain { uri })
            }
            prefix => Err(JettonError::InvalidContentPrefix(prefix)),
        }
    }
}

/// Read a content cell and resolve any external metadata.
///
/// Offchain content is fetched outright. Onchain content with a `uri`
/// field triggers a fetch too, with the external fields overlaid on the
/// onchain ones. A fetch failure fails the whole read.
pub async fn read_jetton_metadata(
    codec: &MetadataCodec,
    fetcher: &MetadataFetcher,
    cell: &Cell,
) -> JettonResult<JettonMetadataResult> {
    match codec.parse(cell)? {
        ParsedContent::Onchain {
            mut metadata,
            faulty_layout,
        } => {
            let persistence = if let Some(uri) = metadata.get("uri").map(str::to_string) {
                tracing::debug!(uri = %uri, "onchain metadata points at external uri");
                let fetched = fetcher.fetch(&uri).await?;
                metadata.merge_from(&fetched.metadata);
                if fetched.is_ipfs {
                    PersistenceType::OffchainIpfs
                } else {
                    PersistenceType::OffchainPrivateDomain
                }
            } else {
                PersistenceType::Onchain
            };

            Ok(JettonMetadataResult {
                persistence,
                metadata,
                faulty_layout,
            })
        }
        ParsedContent::Offchain { uri } => {
            tracing::debug!(uri = %uri, "offchain metadata content");
            let fetched = fetcher.fetch(&uri).await?;
            Ok(JettonMetadataResult {
                persistence: if fetched.is_ipfs {
                    PersistenceType::OffchainIpfs
                } else {
                    PersistenceType::OffchainPrivateDomain
                },
                metadata: fetched.metadata,
                faulty_layout: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> MetadataCodec {
        MetadataCodec::default()
    }

    fn text(s: &str) -> MetadataValue {
        MetadataValue::from(s)
    }

    #[test]
    fn test_onchain_roundtrip() {
        let cell = codec()
            .build_onchain(&[
                ("name", text("Test Token")),
                ("symbol", text("TST")),
                ("decimals", MetadataValue::Number(9.0)),
                ("description", text("A token for tests")),
            ])
            .unwrap();

        let ParsedContent::Onchain {
            metadata,
            faulty_layout,
        } = codec().parse(&cell).unwrap()
        else {
            panic!("expected onchain content");
        };

        assert!(!faulty_layout);
        assert_eq!(metadata.get("name"), Some("Test Token"));
        assert_eq!(metadata.get("symbol"), Some("TST"));
        assert_eq!(metadata.get("decimals"), Some("9"));
        assert_eq!(metadata.get("description"), Some("A token for tests"));
        assert_eq!(metadata.get("image"), None);
    }

    #[test]
    fn test_alias_maps_to_canonical_field() {
        let cell = codec()
            .build_onchain(&[
                ("name", text("T")),
                ("imageUrl", text("https://example.com/t.png")),
            ])
            .unwrap();

        let ParsedContent::Onchain { metadata, .. } = codec().parse(&cell).unwrap() else {
            panic!("expected onchain content");
        };
        assert_eq!(metadata.get("image"), Some("https://example.com/t.png"));
    }

    #[test]
    fn test_excluded_keys_skipped() {
        let cell = codec()
            .build_onchain(&[
                ("name", text("T")),
                ("totalSupply", text("1000000")),
                ("initialPrice", text("0.01")),
            ])
            .unwrap();

        let ParsedContent::Onchain { metadata, .. } = codec().parse(&cell).unwrap() else {
            panic!("expected onchain content");
        };
        assert_eq!(metadata.len(), 1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = codec()
            .build_onchain(&[("foobar", text("x"))])
            .unwrap_err();
        assert!(matches!(err, JettonError::UnsupportedField { key } if key == "foobar"));
    }

    #[test]
    fn test_unknown_key_rejected_even_when_empty() {
        assert!(codec().build_onchain(&[("foobar", text(""))]).is_err());
    }

    #[test]
    fn test_empty_values_omitted() {
        let cell = codec()
            .build_onchain(&[("name", text("T")), ("description", text(""))])
            .unwrap();

        let ParsedContent::Onchain { metadata, .. } = codec().parse(&cell).unwrap() else {
            panic!("expected onchain content");
        };
        assert_eq!(metadata.get("description"), None);
        assert_eq!(metadata.len(), 1);
    }

    #[test]
    fn test_non_ascii_image_rejected() {
        assert!(matches!(
            codec().build_onchain(&[("image", text("https://exämple.com"))]),
            Err(JettonError::InvalidValueEncoding {
                field: "image",
                ..
            })
        ));
    }

    #[test]
    fn test_long_description_snake_chained() {
        let long: String = "x".repeat(1000);
        let cell = codec()
            .build_onchain(&[("description", text(&long))])
            .unwrap();

        let ParsedContent::Onchain { metadata, .. } = codec().parse(&cell).unwrap() else {
            panic!("expected onchain content");
        };
        assert_eq!(metadata.get("description"), Some(long.as_str()));
    }

    #[test]
    fn test_offchain_roundtrip() {
        let uri = "https://example.com/token.json";
        let cell = codec().build_offchain(uri).unwrap();

        assert_eq!(
            codec().parse(&cell).unwrap(),
            ParsedContent::Offchain {
                uri: uri.to_string()
            }
        );
    }

    #[test]
    fn test_offchain_non_ascii_rejected() {
        assert!(codec().build_offchain("https://exämple.com/t.json").is_err());
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        let mut builder = CellBuilder::new();
        builder.store_u8(0x02).unwrap();
        let cell = builder.build().unwrap();

        assert!(matches!(
            codec().parse(&cell),
            Err(JettonError::InvalidContentPrefix(0x02))
        ));
    }

    #[test]
    fn test_faulty_inline_layout_detected() {
        // The dictionary writer always carries values in refs, so build
        // the trie node by hand with the value bytes inlined into the
        // leaf: hml_long label covering the whole key, then the snake
        // data directly.
        let key = sha256(b"name");
        let mut leaf = CellBuilder::new();
        leaf.store_bit(true).unwrap();
        leaf.store_bit(false).unwrap();
        leaf.store_uint(256, 9).unwrap();
        leaf.store_bytes(&key).unwrap();
        leaf.store_u8(crate::snake::SNAKE_PREFIX).unwrap();
        leaf.store_bytes(b"Inline Token").unwrap();

        let mut builder = CellBuilder::new();
        builder.store_u8(ONCHAIN_CONTENT_PREFIX).unwrap();
        builder.store_bit(true).unwrap();
        builder.store_ref(Arc::new(leaf.build().unwrap())).unwrap();
        let cell = builder.build().unwrap();

        let ParsedContent::Onchain {
            metadata,
            faulty_layout,
        } = codec().parse(&cell).unwrap()
        else {
            panic!("expected onchain content");
        };

        assert!(faulty_layout);
        assert_eq!(metadata.get("name"), Some("Inline Token"));
    }

    #[test]
    fn test_merge_from_overrides() {
        let mut onchain = JettonMetadata::new();
        onchain.insert("name", "Onchain Name");
        onchain.insert("symbol", "ONC");

        let mut external = JettonMetadata::new();
        external.insert("name", "External Name");
        external.insert("description", "from the json document");

        onchain.merge_from(&external);
        assert_eq!(onchain.get("name"), Some("External Name"));
        assert_eq!(onchain.get("symbol"), Some("ONC"));
        assert_eq!(onchain.get("description"), Some("from the json document"));
    }

    #[test]
    fn test_persistence_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PersistenceType::OffchainIpfs).unwrap(),
            "\"offchain_ipfs\""
        );
        assert_eq!(
            serde_json::to_string(&PersistenceType::Onchain).unwrap(),
            "\"onchain\""
        );
    }
}

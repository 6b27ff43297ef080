//! Jetton (fungible token) metadata and operation codecs for tonmint.
//!
//! Builds and parses the cells a Jetton minter deals in:
//!
//! - **metadata**: TEP-64 content cells, onchain dictionaries and offchain
//!   URIs, including resolving external JSON documents
//! - **snake**: the chunked byte-string encoding metadata values use
//! - **ops**: fixed-layout operation bodies (mint, transfer, burn,
//!   change-admin, replace-metadata) and the minter init data
//! - **deploy**: state-init cells, contract addresses, and wallet-connect
//!   transaction requests
//!
//! # Example
//!
//! ```
//! use tonmint_jetton::{MetadataCodec, MetadataValue, ParsedContent};
//!
//! let codec = MetadataCodec::default();
//! let content = codec
//!     .build_onchain(&[
//!         ("name", MetadataValue::from("My Token")),
//!         ("symbol", MetadataValue::from("MTK")),
//!         ("decimals", MetadataValue::from(9.0)),
//!     ])
//!     .unwrap();
//!
//! let ParsedContent::Onchain { metadata, .. } = codec.parse(&content).unwrap() else {
//!     unreachable!();
//! };
//! assert_eq!(metadata.get("symbol"), Some("MTK"));
//! ```

mod error;

pub mod deploy;
pub mod fetch;
pub mod metadata;
pub mod ops;
pub mod snake;

pub use error::{JettonError, JettonResult};
pub use fetch::{FetchedMetadata, MetadataFetcher};
pub use metadata::{
    read_jetton_metadata, Encoding, JettonMetadata, JettonMetadataResult, MetadataCodec,
    MetadataSchema, MetadataValue, ParsedContent, PersistenceType,
};

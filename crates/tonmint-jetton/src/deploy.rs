//! Deployment: state-init cells, contract addresses, and the
//! transaction-request objects handed to the wallet-connect layer.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tonmint_cell::{BagOfCells, Cell, CellBuilder, MsgAddress};

use crate::ops;
use crate::{JettonError, JettonResult};

/// TON attached to the minter deployment message: 0.25 TON.
pub const JETTON_DEPLOY_GAS: u128 = 250_000_000;

/// Forward TON for the mint embedded in a deployment: 0.2 TON.
pub const DEPLOY_MINT_FORWARD: u128 = 200_000_000;

/// TON attached to a standalone mint transaction: 0.04 TON.
pub const MINT_GAS: u128 = 40_000_000;

/// Forward TON for a standalone mint: 0.02 TON.
pub const MINT_FORWARD: u128 = 20_000_000;

/// TON attached to a transfer transaction: 0.05 TON.
pub const TRANSFER_GAS: u128 = 50_000_000;

/// TON attached to a burn transaction: 0.031 TON.
pub const BURN_GAS: u128 = 31_000_000;

/// TON attached to admin operations (change admin, replace metadata):
/// 0.01 TON.
pub const ADMIN_GAS: u128 = 10_000_000;

/// How long a transaction request stays valid.
pub const TRANSACTION_VALIDITY: Duration = Duration::from_secs(5 * 60);

/// One message inside a transaction request. `stateInit` and `payload`
/// are base64 BoC strings and are omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMessage {
    pub address: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_init: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// The transaction-request object the wallet-connect layer expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Unix timestamp in seconds after which the request expires.
    pub valid_until: u64,
    pub messages: Vec<TransactionMessage>,
}

impl TransactionRequest {
    fn single(message: TransactionMessage) -> Self {
        TransactionRequest {
            valid_until: valid_until(),
            messages: vec![message],
        }
    }
}

fn valid_until() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    (now + TRANSACTION_VALIDITY).as_secs()
}

/// The zero address, used to revoke admin rights.
pub fn zero_address() -> MsgAddress {
    MsgAddress::Internal {
        workchain: 0,
        address: [0u8; 32],
    }
}

/// Build a state-init cell from code and data.
///
/// Layout: no split depth, not special, code ref present, data ref
/// present, no library dictionary.
pub fn build_state_init(code: Cell, data: Cell) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_bit(false)?;
    builder.store_bit(false)?;
    builder.store_bit(true)?;
    builder.store_bit(true)?;
    builder.store_bit(false)?;
    builder.store_ref(Arc::new(code))?;
    builder.store_ref(Arc::new(data))?;
    Ok(builder.build()?)
}

/// Compute the basechain address a contract will deploy to.
pub fn contract_address(code: Cell, data: Cell) -> JettonResult<MsgAddress> {
    let state_init = build_state_init(code, data)?;
    Ok(MsgAddress::Internal {
        workchain: 0,
        address: state_init.hash(),
    })
}

fn friendly(address: &MsgAddress, what: &'static str) -> JettonResult<String> {
    address
        .to_user_friendly(true, false)
        .ok_or(JettonError::MissingAddress(what))
}

fn boc_base64(cell: Cell) -> JettonResult<String> {
    Ok(BagOfCells::from_root(cell).serialize_to_base64()?)
}

/// Build the deployment request for a minter contract.
///
/// The first message carries the state init; `payload` usually holds the
/// initial mint body built with [`ops::mint_body`] and
/// [`DEPLOY_MINT_FORWARD`].
pub fn deploy_request(
    code: Cell,
    data: Cell,
    payload: Option<Cell>,
) -> JettonResult<TransactionRequest> {
    let address = contract_address(code.clone(), data.clone())?;
    let state_init = build_state_init(code, data)?;

    Ok(TransactionRequest::single(TransactionMessage {
        address: friendly(&address, "contract")?,
        amount: JETTON_DEPLOY_GAS.to_string(),
        state_init: Some(boc_base64(state_init)?),
        payload: payload.map(boc_base64).transpose()?,
    }))
}

/// Build a mint request against a deployed minter.
pub fn mint_request(
    jetton_master: &MsgAddress,
    owner: &MsgAddress,
    jetton_amount: u128,
) -> JettonResult<TransactionRequest> {
    let body = ops::mint_body(owner, jetton_amount, MINT_FORWARD, 0)?;

    Ok(TransactionRequest::single(TransactionMessage {
        address: friendly(jetton_master, "jetton master")?,
        amount: MINT_GAS.to_string(),
        state_init: None,
        payload: Some(boc_base64(body)?),
    }))
}

/// Build a transfer request sent to the owner's jetton wallet.
pub fn transfer_request(
    owner_jetton_wallet: &MsgAddress,
    to: &MsgAddress,
    response: &MsgAddress,
    jetton_amount: u128,
) -> JettonResult<TransactionRequest> {
    let body = ops::transfer_body(to, response, jetton_amount)?;

    Ok(TransactionRequest::single(TransactionMessage {
        address: friendly(owner_jetton_wallet, "jetton wallet")?,
        amount: TRANSFER_GAS.to_string(),
        state_init: None,
        payload: Some(boc_base64(body)?),
    }))
}

/// Build a burn request sent to the owner's jetton wallet.
pub fn burn_request(
    owner_jetton_wallet: &MsgAddress,
    jetton_amount: u128,
    response: &MsgAddress,
) -> JettonResult<TransactionRequest> {
    let body = ops::burn_body(jetton_amount, response)?;

    Ok(TransactionRequest::single(TransactionMessage {
        address: friendly(owner_jetton_wallet, "jetton wallet")?,
        amount: BURN_GAS.to_string(),
        state_init: None,
        payload: Some(boc_base64(body)?),
    }))
}

/// Build a request that hands admin rights to the zero address.
pub fn revoke_admin_request(jetton_master: &MsgAddress) -> JettonResult<TransactionRequest> {
    let body = ops::change_admin_body(&zero_address())?;

    Ok(TransactionRequest::single(TransactionMessage {
        address: friendly(jetton_master, "jetton master")?,
        amount: ADMIN_GAS.to_string(),
        state_init: None,
        payload: Some(boc_base64(body)?),
    }))
}

/// Build a request that replaces the minter's content cell.
pub fn update_metadata_request(
    jetton_master: &MsgAddress,
    content: Cell,
) -> JettonResult<TransactionRequest> {
    let body = ops::update_metadata_body(content)?;

    Ok(TransactionRequest::single(TransactionMessage {
        address: friendly(jetton_master, "jetton master")?,
        amount: ADMIN_GAS.to_string(),
        state_init: None,
        payload: Some(boc_base64(body)?),
    }))
}

//! Fixed-layout operation bodies and the minter init data cell.
//!
//! Every layout here is part of the contract wire format; field order and
//! widths cannot change without breaking deployed contracts.

use std::sync::Arc;

use tonmint_cell::{Cell, CellBuilder, MsgAddress};

use crate::{JettonError, JettonResult};

/// Operation codes carried in the first 32 bits of a body.
pub mod opcodes {
    pub const CHANGE_ADMIN: u32 = 3;
    pub const REPLACE_METADATA: u32 = 4;
    pub const MINT: u32 = 21;
    pub const INTERNAL_TRANSFER: u32 = 0x178d4519;
    pub const TRANSFER: u32 = 0x0f8a7ea5;
    pub const BURN: u32 = 0x595f07bc;
}

/// Forward TON attached to transfer notifications: 0.001 TON.
pub const FORWARD_TON_AMOUNT: u128 = 1_000_000;

fn require_internal(addr: &MsgAddress, what: &'static str) -> JettonResult<()> {
    if addr.is_internal() {
        Ok(())
    } else {
        Err(JettonError::MissingAddress(what))
    }
}

/// Minter init data: zero supply, admin address, content ref, wallet code
/// ref.
pub fn init_data(
    admin: &MsgAddress,
    content: Cell,
    wallet_code: Cell,
) -> JettonResult<Cell> {
    require_internal(admin, "admin")?;

    let mut builder = CellBuilder::new();
    builder.store_coins(0)?;
    builder.store_address(admin)?;
    builder.store_ref(Arc::new(content))?;
    builder.store_ref(Arc::new(wallet_code))?;
    Ok(builder.build()?)
}

/// Mint body: the minter forwards the embedded internal-transfer to the
/// owner's jetton wallet.
pub fn mint_body(
    owner: &MsgAddress,
    jetton_amount: u128,
    forward_ton: u128,
    query_id: u64,
) -> JettonResult<Cell> {
    require_internal(owner, "owner")?;

    let mut builder = CellBuilder::new();
    builder.store_u32(opcodes::MINT)?;
    builder.store_u64(query_id)?;
    builder.store_address(owner)?;
    builder.store_coins(forward_ton)?;
    builder.store_ref(Arc::new(internal_transfer_body(owner, jetton_amount)?))?;
    Ok(builder.build()?)
}

/// Internal-transfer body embedded in a mint: no sender, response to the
/// owner, fixed forward amount, no forward payload.
pub fn internal_transfer_body(owner: &MsgAddress, jetton_amount: u128) -> JettonResult<Cell> {
    require_internal(owner, "owner")?;

    let mut builder = CellBuilder::new();
    builder.store_u32(opcodes::INTERNAL_TRANSFER)?;
    builder.store_u64(0)?;
    builder.store_coins(jetton_amount)?;
    builder.store_address(&MsgAddress::Null)?;
    builder.store_address(owner)?;
    builder.store_coins(FORWARD_TON_AMOUNT)?;
    builder.store_bit(false)?;
    Ok(builder.build()?)
}

/// Wallet-to-wallet transfer body. `response` receives excess TON.
pub fn transfer_body(
    to: &MsgAddress,
    response: &MsgAddress,
    jetton_amount: u128,
) -> JettonResult<Cell> {
    require_internal(to, "destination")?;
    require_internal(response, "response destination")?;

    let mut builder = CellBuilder::new();
    builder.store_u32(opcodes::TRANSFER)?;
    builder.store_u64(1)?;
    builder.store_coins(jetton_amount)?;
    builder.store_address(to)?;
    builder.store_address(response)?;
    builder.store_bit(false)?;
    builder.store_coins(FORWARD_TON_AMOUNT)?;
    builder.store_bit(false)?;
    Ok(builder.build()?)
}

/// Burn body: destroys jettons held by the sender's wallet.
pub fn burn_body(jetton_amount: u128, response: &MsgAddress) -> JettonResult<Cell> {
    require_internal(response, "response destination")?;

    let mut builder = CellBuilder::new();
    builder.store_u32(opcodes::BURN)?;
    builder.store_u64(1)?;
    builder.store_coins(jetton_amount)?;
    builder.store_address(response)?;
    builder.store_dict(None)?;
    Ok(builder.build()?)
}

/// Change-admin body. Revocation passes the zero address here.
pub fn change_admin_body(new_admin: &MsgAddress) -> JettonResult<Cell> {
    require_internal(new_admin, "new admin")?;

    let mut builder = CellBuilder::new();
    builder.store_u32(opcodes::CHANGE_ADMIN)?;
    builder.store_u64(0)?;
    builder.store_address(new_admin)?;
    Ok(builder.build()?)
}

/// Replace-metadata body: the new content cell rides in a ref.
pub fn update_metadata_body(content: Cell) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(opcodes::REPLACE_METADATA)?;
    builder.store_u64(0)?;
    builder.store_ref(Arc::new(content))?;
    Ok(builder.build()?)
}

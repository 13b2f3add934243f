//! Ledger-backed token balances.
//!
//! Balances live in `TokenAccount` records keyed by `(asset, owner)`. The
//! vault authority owns staked tokens; each inference's fee sits with its
//! own escrow authority.

use crate::context::balance_key;
use crate::errors::SolearnError;
use crate::ledger::Transaction;
use crate::state::{Asset, TokenAccount};
use anchor_lang::prelude::*;

/// Current balance of `owner`, zero when no account exists.
pub fn balance_of(tx: &mut Transaction<'_>, asset: Asset, owner: &Pubkey) -> Result<u64> {
    Ok(tx
        .load::<TokenAccount>(&balance_key(asset, owner))?
        .map(|account| account.amount)
        .unwrap_or(0))
}

fn set_balance(tx: &mut Transaction<'_>, asset: Asset, owner: &Pubkey, amount: u64) -> Result<()> {
    tx.store(
        &balance_key(asset, owner),
        &TokenAccount {
            owner: *owner,
            asset,
            amount,
        },
    )
}

/// Move `amount` of `asset` between two balances.
pub fn transfer(
    tx: &mut Transaction<'_>,
    asset: Asset,
    from: &Pubkey,
    to: &Pubkey,
    amount: u64,
) -> Result<()> {
    if amount == 0 || from == to {
        return Ok(());
    }

    let from_balance = balance_of(tx, asset, from)?
        .checked_sub(amount)
        .ok_or(SolearnError::InsufficientFunds)?;
    set_balance(tx, asset, from, from_balance)?;

    let to_balance = balance_of(tx, asset, to)?
        .checked_add(amount)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    set_balance(tx, asset, to, to_balance)
}

/// Create `amount` of `asset` in `to`'s balance.
pub fn mint_to(tx: &mut Transaction<'_>, asset: Asset, to: &Pubkey, amount: u64) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    let balance = balance_of(tx, asset, to)?
        .checked_add(amount)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    set_balance(tx, asset, to, balance)
}

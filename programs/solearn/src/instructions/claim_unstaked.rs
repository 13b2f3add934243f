//! Withdraw matured pending unstake

use crate::context::{vault_authority, InstructionContext};
use crate::errors::SolearnError;
use crate::events::UnstakeClaimed;
use crate::instructions::epoch_helpers::settle_epoch_reward;
use crate::instructions::token_helpers;
use crate::state::Asset;
use anchor_lang::prelude::*;

/// Returns the claimed amount.
pub fn handler(ctx: &mut InstructionContext<'_>) -> Result<u64> {
    let signer = ctx.signer;
    let mut miner = ctx.load_miner(&signer)?;

    let amount = miner.pending_unstake;
    require!(amount > 0, SolearnError::NothingToClaim);

    // Check unstake delay has passed
    require!(
        ctx.now >= miner.unstake_requested_at.saturating_add(ctx.config.unstake_delay),
        SolearnError::UnstakeNotMatured
    );

    token_helpers::transfer(
        &mut ctx.tx,
        Asset::StakeToken,
        &vault_authority(),
        &signer,
        amount,
    )?;

    let epoch = ctx.current_epoch();
    settle_epoch_reward(&mut miner, epoch, ctx.config.reward_per_epoch)?;
    miner.stake = miner
        .stake
        .checked_sub(amount)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    miner.pending_unstake = 0;
    if miner.stake == 0 {
        miner.is_active = false;
    }
    ctx.save_miner(&miner)?;

    ctx.emit(UnstakeClaimed {
        miner: signer,
        amount,
        remaining_stake: miner.stake,
        timestamp: ctx.now,
    });

    Ok(amount)
}

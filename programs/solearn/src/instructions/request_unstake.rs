//! Move stake into the pending unstake bucket

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::UnstakeRequested;
use anchor_lang::prelude::*;

/// Schedules `amount` for withdrawal. Every request restarts the unstake
/// delay for the whole pending bucket.
pub fn handler(ctx: &mut InstructionContext<'_>, amount: u64) -> Result<()> {
    require!(amount > 0, SolearnError::ZeroAmount);

    let signer = ctx.signer;
    let mut miner = ctx.load_miner(&signer)?;

    // Check sufficient balance not already pending
    require!(
        amount <= miner.effective_stake(),
        SolearnError::InsufficientBalance
    );

    miner.pending_unstake = miner
        .pending_unstake
        .checked_add(amount)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    miner.unstake_requested_at = ctx.now;
    ctx.save_miner(&miner)?;

    ctx.emit(UnstakeRequested {
        miner: signer,
        amount,
        pending_unstake: miner.pending_unstake,
        claimable_at: ctx.now.saturating_add(ctx.config.unstake_delay),
        timestamp: ctx.now,
    });

    Ok(())
}

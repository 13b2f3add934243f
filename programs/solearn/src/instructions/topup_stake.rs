//! Add stake to a registered miner

use crate::context::{vault_authority, InstructionContext};
use crate::errors::SolearnError;
use crate::events::StakeToppedUp;
use crate::instructions::epoch_helpers::settle_epoch_reward;
use crate::instructions::token_helpers;
use crate::state::Asset;
use anchor_lang::prelude::*;

pub fn handler(ctx: &mut InstructionContext<'_>, amount: u64) -> Result<()> {
    require!(amount > 0, SolearnError::ZeroAmount);

    let signer = ctx.signer;
    let mut miner = ctx.load_miner(&signer)?;
    let epoch = ctx.current_epoch();
    settle_epoch_reward(&mut miner, epoch, ctx.config.reward_per_epoch)?;

    token_helpers::transfer(
        &mut ctx.tx,
        Asset::StakeToken,
        &signer,
        &vault_authority(),
        amount,
    )?;

    miner.stake = miner
        .stake
        .checked_add(amount)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    miner.is_active = true;
    ctx.save_miner(&miner)?;

    ctx.emit(StakeToppedUp {
        miner: signer,
        amount,
        total_stake: miner.stake,
        timestamp: ctx.now,
    });

    Ok(())
}

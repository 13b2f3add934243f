//! Withdraw accrued block rewards

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::RewardClaimed;
use crate::instructions::epoch_helpers::settle_epoch_reward;
use crate::instructions::token_helpers;
use crate::state::Asset;
use anchor_lang::prelude::*;

/// Settles the signer's epochs and mints everything accrued as stake
/// tokens to its reward wallet. Returns the amount minted.
pub fn handler(ctx: &mut InstructionContext<'_>) -> Result<u64> {
    let signer = ctx.signer;
    let mut miner = ctx.load_miner(&signer)?;
    let epoch = ctx.current_epoch();
    settle_epoch_reward(&mut miner, epoch, ctx.config.reward_per_epoch)?;

    let amount = miner.accrued_reward;
    require!(amount > 0, SolearnError::NothingToClaim);

    token_helpers::mint_to(&mut ctx.tx, Asset::StakeToken, &miner.reward_wallet, amount)?;
    miner.accrued_reward = 0;
    ctx.save_miner(&miner)?;

    ctx.emit(RewardClaimed {
        miner: signer,
        wallet: miner.reward_wallet,
        amount,
        epoch,
        timestamp: ctx.now,
    });

    Ok(amount)
}

//! Join a model's miner pool

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::MinerJoinedModel;
use anchor_lang::prelude::*;

/// Adds the signer to `model`. Joining a model the miner already serves is
/// a no-op; returns whether membership changed.
pub fn handler(ctx: &mut InstructionContext<'_>, model: Pubkey) -> Result<bool> {
    let signer = ctx.signer;
    let mut miner = ctx.load_miner(&signer)?;

    require!(
        miner.effective_stake() >= ctx.config.miner_minimum_stake,
        SolearnError::InsufficientStake
    );
    require!(!miner.is_penalized(ctx.now), SolearnError::MinerPenalized);

    let mut model_info = ctx.load_model(&model)?;
    if model_info.miners.contains(&signer) {
        return Ok(false);
    }

    model_info.miners.push(signer);
    if !miner.joined_models.contains(&model) {
        miner.joined_models.push(model);
    }
    ctx.save_model(&model_info)?;
    ctx.save_miner(&miner)?;

    ctx.emit(MinerJoinedModel {
        miner: signer,
        model,
        model_miners: model_info.miners.len() as u32,
        timestamp: ctx.now,
    });

    Ok(true)
}

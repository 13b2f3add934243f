//! Leave a model's miner pool

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::MinerLeftModel;
use anchor_lang::prelude::*;

/// Removes the signer from `model`. Assignments already created for the
/// miner are unaffected.
pub fn handler(ctx: &mut InstructionContext<'_>, model: Pubkey) -> Result<()> {
    let signer = ctx.signer;
    let mut miner = ctx.load_miner(&signer)?;
    let mut model_info = ctx.load_model(&model)?;

    let position = model_info
        .miners
        .iter()
        .position(|m| *m == signer)
        .ok_or(SolearnError::NotJoined)?;
    model_info.miners.remove(position);
    miner.joined_models.retain(|m| *m != model);

    ctx.save_model(&model_info)?;
    ctx.save_miner(&miner)?;

    ctx.emit(MinerLeftModel {
        miner: signer,
        model,
        model_miners: model_info.miners.len() as u32,
        timestamp: ctx.now,
    });

    Ok(())
}

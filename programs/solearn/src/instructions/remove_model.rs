//! Withdraw a model from inference (admin only)

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::ModelRemoved;
use anchor_lang::prelude::*;
use tracing::debug;

/// Deletes the model record and drops it from every member's joined list.
/// Inferences already submitted against the model keep their assignments
/// and settle normally; new submissions fail with `ModelNotFound`.
pub fn handler(ctx: &mut InstructionContext<'_>, model: Pubkey) -> Result<()> {
    ctx.require_admin()?;
    let model_info = ctx.load_model(&model)?;

    for member in &model_info.miners {
        if let Some(mut miner) = ctx.try_load_miner(member)? {
            miner.joined_models.retain(|m| *m != model);
            ctx.save_miner(&miner)?;
        }
    }
    ctx.remove_model(&model)?;

    let mut state = ctx.load_state()?;
    state.total_models = state
        .total_models
        .checked_sub(1)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    ctx.save_state(&state)?;

    debug!(%model, miners = model_info.miners.len(), "model removed");

    ctx.emit(ModelRemoved {
        model,
        miners: model_info.miners.len() as u32,
        timestamp: ctx.now,
    });

    Ok(())
}

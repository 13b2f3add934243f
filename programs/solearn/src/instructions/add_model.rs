//! Approve a model for inference (admin only)

use crate::context::{model_key, InstructionContext};
use crate::errors::SolearnError;
use crate::events::ModelAdded;
use crate::state::ModelInfo;
use anchor_lang::prelude::*;

pub fn handler(ctx: &mut InstructionContext<'_>, model: Pubkey) -> Result<()> {
    ctx.require_admin()?;
    require!(model != Pubkey::default(), SolearnError::InvalidInput);
    require!(
        !ctx.tx.exists(&model_key(&model))?,
        SolearnError::ModelExists
    );

    ctx.save_model(&ModelInfo {
        model,
        miners: Vec::new(),
        added_at: ctx.now,
    })?;

    let mut state = ctx.load_state()?;
    state.total_models = state
        .total_models
        .checked_add(1)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    ctx.save_state(&state)?;

    ctx.emit(ModelAdded {
        model,
        timestamp: ctx.now,
    });

    Ok(())
}

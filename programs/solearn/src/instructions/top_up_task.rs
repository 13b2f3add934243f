//! Add to an inference's worker pool

use crate::context::{escrow_authority, InstructionContext};
use crate::errors::SolearnError;
use crate::events::InferenceToppedUp;
use crate::instructions::token_helpers;
use crate::state::{Asset, TaskStatus};
use anchor_lang::prelude::*;

pub fn handler(ctx: &mut InstructionContext<'_>, inference_id: u64, amount: u64) -> Result<()> {
    require!(amount > 0, SolearnError::ZeroAmount);

    let mut inference = ctx.load_inference(inference_id)?;
    require!(
        inference.status != TaskStatus::Resolved,
        SolearnError::TaskResolved
    );

    let signer = ctx.signer;
    token_helpers::transfer(
        &mut ctx.tx,
        Asset::Native,
        &signer,
        &escrow_authority(inference_id),
        amount,
    )?;

    inference.value = inference
        .value
        .checked_add(amount)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    ctx.save_inference(&inference)?;

    ctx.emit(InferenceToppedUp {
        inference_id,
        amount,
        value: inference.value,
        timestamp: ctx.now,
    });

    Ok(())
}

//! Materialize a planned assignment record

use crate::context::{assignment_key, InstructionContext};
use crate::errors::SolearnError;
use crate::events::AssignmentCreated;
use crate::state::{Assignment, AssignmentSlot};
use anchor_lang::prelude::*;

/// Writes the assignment record for `slot` unless it already exists.
/// Returns whether a record was created.
pub fn materialize(
    ctx: &mut InstructionContext<'_>,
    inference_id: u64,
    slot: &AssignmentSlot,
) -> Result<bool> {
    if ctx.tx.exists(&assignment_key(slot.id))? {
        return Ok(false);
    }

    ctx.save_assignment(&Assignment::new(slot, inference_id, ctx.now))?;
    ctx.emit(AssignmentCreated {
        assignment_id: slot.id,
        inference_id,
        worker: slot.worker,
        role: slot.role,
        timestamp: ctx.now,
    });
    Ok(true)
}

/// Idempotent: calling twice for the same assignment succeeds without
/// changes the second time.
pub fn handler(
    ctx: &mut InstructionContext<'_>,
    inference_id: u64,
    assignment_id: u64,
) -> Result<bool> {
    let inference = ctx.load_inference(inference_id)?;
    let slot = inference
        .slots
        .iter()
        .find(|slot| slot.id == assignment_id)
        .copied()
        .ok_or(SolearnError::AssignmentNotFound)?;

    materialize(ctx, inference_id, &slot)
}

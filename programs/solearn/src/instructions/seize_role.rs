//! Claim an assignment before its deadline

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::RoleSeized;
use crate::state::{AssignmentPhase, AssignmentRole, TaskStatus};
use anchor_lang::prelude::*;

/// The miner must seize before the submit deadline, validators before the
/// commit deadline.
pub fn handler(ctx: &mut InstructionContext<'_>, assignment_id: u64) -> Result<()> {
    let mut assignment = ctx.load_assignment(assignment_id)?;
    require_keys_eq!(
        ctx.signer,
        assignment.worker,
        SolearnError::NotAssignedWorker
    );

    let inference = ctx.load_inference(assignment.inference_id)?;
    require!(
        inference.status != TaskStatus::Resolved,
        SolearnError::TaskResolved
    );
    require!(
        assignment.phase == AssignmentPhase::Created,
        SolearnError::AlreadySeized
    );

    let deadline = match assignment.role {
        AssignmentRole::Miner => inference.submit_timeout,
        AssignmentRole::Validator => inference.commit_timeout,
    };
    require!(ctx.now <= deadline, SolearnError::DeadlineExceeded);

    assignment.phase = AssignmentPhase::Seized;
    ctx.save_assignment(&assignment)?;

    ctx.emit(RoleSeized {
        assignment_id,
        inference_id: assignment.inference_id,
        worker: assignment.worker,
        role: assignment.role,
        timestamp: ctx.now,
    });

    Ok(())
}

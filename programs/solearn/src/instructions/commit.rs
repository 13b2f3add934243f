//! Validator commits to a hidden solution

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::CommitmentSubmitted;
use crate::state::{AssignmentPhase, AssignmentRole, TaskStatus, HASH_SIZE};
use anchor_lang::prelude::*;

/// Stores `commitment = keccak256(nonce || validator || solution)` once the
/// miner has submitted and before the commit deadline.
pub fn handler(
    ctx: &mut InstructionContext<'_>,
    assignment_id: u64,
    commitment: [u8; HASH_SIZE],
) -> Result<()> {
    require!(commitment != [0u8; HASH_SIZE], SolearnError::InvalidInput);

    let mut assignment = ctx.load_assignment(assignment_id)?;
    require_keys_eq!(
        ctx.signer,
        assignment.worker,
        SolearnError::NotAssignedWorker
    );
    require!(
        assignment.role == AssignmentRole::Validator,
        SolearnError::WrongRole
    );

    let inference = ctx.load_inference(assignment.inference_id)?;
    require!(
        inference.status != TaskStatus::Resolved,
        SolearnError::TaskResolved
    );
    match assignment.phase {
        AssignmentPhase::Created => return err!(SolearnError::NotSeized),
        AssignmentPhase::Seized => {}
        _ => return err!(SolearnError::AlreadyCommitted),
    }
    require!(
        inference.miner_digest.is_some(),
        SolearnError::SolutionNotSubmitted
    );
    require!(
        ctx.now <= inference.commit_timeout,
        SolearnError::DeadlineExceeded
    );

    assignment.commitment = Some(commitment);
    assignment.phase = AssignmentPhase::Committed;
    ctx.save_assignment(&assignment)?;

    let mut voting = ctx.load_voting(inference.id)?;
    voting.total_commit = voting
        .total_commit
        .checked_add(1)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    ctx.save_voting(&voting)?;

    ctx.emit(CommitmentSubmitted {
        assignment_id,
        inference_id: inference.id,
        validator: assignment.worker,
        commitment,
        timestamp: ctx.now,
    });

    Ok(())
}

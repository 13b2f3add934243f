//! Validator opens its commitment

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::SolutionRevealed;
use crate::instructions::consensus_helpers::reveal_window_open;
use crate::state::{AssignmentPhase, AssignmentRole, TaskStatus};
use crate::utils::commitment::{commitment_hash, solution_digest};
use anchor_lang::prelude::*;

pub fn handler(
    ctx: &mut InstructionContext<'_>,
    assignment_id: u64,
    nonce: u64,
    solution: Vec<u8>,
) -> Result<()> {
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
        AssignmentPhase::Committed => {}
        AssignmentPhase::Revealed => return err!(SolearnError::AlreadyRevealed),
        _ => return err!(SolearnError::NotCommitted),
    }
    require!(
        ctx.now <= inference.reveal_timeout,
        SolearnError::DeadlineExceeded
    );

    let mut voting = ctx.load_voting(inference.id)?;
    require!(
        reveal_window_open(&inference, &voting, ctx.now),
        SolearnError::CommitPhaseActive
    );

    let expected = commitment_hash(nonce, &assignment.worker, &solution);
    require!(
        assignment.commitment == Some(expected),
        SolearnError::CommitmentMismatch
    );

    let digest = solution_digest(inference.id, &solution);
    assignment.output = solution;
    assignment.digest = Some(digest);
    assignment.reveal_nonce = Some(nonce);
    assignment.phase = AssignmentPhase::Revealed;
    ctx.save_assignment(&assignment)?;

    voting.total_reveal = voting
        .total_reveal
        .checked_add(1)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    ctx.save_voting(&voting)?;

    ctx.emit(SolutionRevealed {
        assignment_id,
        inference_id: inference.id,
        validator: assignment.worker,
        digest,
        timestamp: ctx.now,
    });

    Ok(())
}

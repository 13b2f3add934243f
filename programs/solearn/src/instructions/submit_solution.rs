//! Miner publishes its solution

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::SolutionSubmitted;
use crate::state::{AssignmentPhase, AssignmentRole, TaskStatus};
use crate::utils::commitment::solution_digest;
use crate::utils::validation::validate_payload;
use anchor_lang::prelude::*;

pub fn handler(
    ctx: &mut InstructionContext<'_>,
    assignment_id: u64,
    solution: Vec<u8>,
) -> Result<()> {
    validate_payload(&solution)?;

    let mut assignment = ctx.load_assignment(assignment_id)?;
    require_keys_eq!(
        ctx.signer,
        assignment.worker,
        SolearnError::NotAssignedWorker
    );
    require!(
        assignment.role == AssignmentRole::Miner,
        SolearnError::WrongRole
    );

    let mut inference = ctx.load_inference(assignment.inference_id)?;
    require!(
        inference.status != TaskStatus::Resolved,
        SolearnError::TaskResolved
    );
    match assignment.phase {
        AssignmentPhase::Created => return err!(SolearnError::NotSeized),
        AssignmentPhase::Seized => {}
        _ => return err!(SolearnError::AlreadySubmitted),
    }
    require!(
        ctx.now <= inference.submit_timeout,
        SolearnError::DeadlineExceeded
    );

    let digest = solution_digest(inference.id, &solution);
    assignment.output = solution;
    assignment.digest = Some(digest);
    assignment.phase = AssignmentPhase::Submitted;
    inference.miner_digest = Some(digest);

    ctx.save_assignment(&assignment)?;
    ctx.save_inference(&inference)?;

    ctx.emit(SolutionSubmitted {
        assignment_id,
        inference_id: inference.id,
        miner: assignment.worker,
        digest,
        timestamp: ctx.now,
    });

    Ok(())
}

//! Resolve an inference once its commit-reveal round is over
//!
//! Three outcomes:
//! - `MinerForfeited`: the miner missed the submit deadline. The requester
//!   is refunded in full and the miner is fined.
//! - `Accepted`: a digest reached the consensus threshold. Matching
//!   participants become payable, everyone else who was assigned is fined.
//! - `NoConsensus`: no digest reached the threshold. The requester is
//!   refunded and validators that never revealed are fined.

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::{slash_reason, InferenceResolved};
use crate::instructions::consensus_helpers::{
    consensus_threshold, most_voted_digest, resolution_ready,
};
use crate::instructions::settlement_helpers::{
    allocate_dao_reward, mint_dao_reward, release_from_escrow, split_worker_pool,
};
use crate::instructions::slash_helpers::slash_miner;
use crate::state::{
    Assignment, AssignmentPhase, AssignmentRole, Inference, Resolution, TaskStatus, Vote,
    VotingRecord, HASH_SIZE,
};
use crate::utils::commitment::mix_entropy;
use anchor_lang::prelude::*;
use tracing::debug;

/// Resolves `inference_id`, callable by anyone once the inference is ready.
pub fn handler(ctx: &mut InstructionContext<'_>, inference_id: u64) -> Result<Resolution> {
    let mut inference = ctx.load_inference(inference_id)?;
    require!(
        inference.status != TaskStatus::Resolved,
        SolearnError::AlreadyResolved
    );
    require!(
        inference.status.can_transition_to(TaskStatus::Resolved),
        SolearnError::InvalidStatusTransition
    );

    let mut voting = ctx.load_voting(inference_id)?;
    let mut assignments = Vec::with_capacity(inference.slots.len());
    for slot in &inference.slots {
        assignments.push(ctx.load_assignment(slot.id)?);
    }

    let refunded = match inference.miner_digest {
        None => {
            require!(
                ctx.now > inference.submit_timeout,
                SolearnError::ResolutionNotReady
            );
            voting.outcome = Resolution::MinerForfeited;
            forfeit(ctx, &inference, &mut assignments)?
        }
        Some(miner_digest) => {
            require!(
                resolution_ready(&inference, &voting, ctx.now),
                SolearnError::ResolutionNotReady
            );
            settle(ctx, &mut inference, &mut voting, &mut assignments, miner_digest)?
        }
    };

    // Close every assignment; those not awaiting payment leave the counter now
    let mut finalized = 0u64;
    for assignment in assignments.iter_mut() {
        require!(
            assignment.phase.can_transition_to(AssignmentPhase::Resolved),
            SolearnError::InvalidStatusTransition
        );
        assignment.phase = AssignmentPhase::Resolved;
        if assignment.vote != Vote::Approval {
            finalized += 1;
        }
        ctx.save_assignment(assignment)?;
    }

    let mut state = ctx.load_state()?;
    state.task_count = state
        .task_count
        .checked_sub(finalized)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    let material = voting
        .canonical_digest
        .unwrap_or_else(|| resolution_material(inference_id));
    state.entropy = mix_entropy(&state.entropy, &material);
    ctx.save_state(&state)?;

    inference.status = TaskStatus::Resolved;
    voting.resolved_at = ctx.now;
    ctx.save_inference(&inference)?;
    ctx.save_voting(&voting)?;

    debug!(
        inference_id,
        outcome = ?voting.outcome,
        agree_count = voting.agree_count,
        refunded,
        "inference resolved"
    );

    ctx.emit(InferenceResolved {
        inference_id,
        outcome: voting.outcome,
        canonical_digest: voting.canonical_digest,
        agree_count: voting.agree_count,
        refunded,
        timestamp: ctx.now,
    });

    Ok(voting.outcome)
}

fn resolution_material(inference_id: u64) -> [u8; HASH_SIZE] {
    let mut material = [0u8; HASH_SIZE];
    material[..8].copy_from_slice(&inference_id.to_le_bytes());
    material
}

/// Refunds the requester and fines the miner. Returns the refund.
fn forfeit(
    ctx: &mut InstructionContext<'_>,
    inference: &Inference,
    assignments: &mut [Assignment],
) -> Result<u64> {
    let refund = inference.refundable()?;
    release_from_escrow(ctx, &inference.creator, refund, inference.id)?;

    for assignment in assignments.iter_mut() {
        if assignment.role == AssignmentRole::Miner {
            assignment.vote = Vote::Absent;
            slash_miner(ctx, &assignment.worker, true, slash_reason::MISSED_SUBMISSION)?;
        }
    }
    Ok(refund)
}

/// Digest a participant stands behind, if any.
fn participant_digest(assignment: &Assignment) -> Option<[u8; HASH_SIZE]> {
    match (assignment.role, assignment.phase) {
        (AssignmentRole::Miner, AssignmentPhase::Submitted) => assignment.digest,
        (AssignmentRole::Validator, AssignmentPhase::Revealed) => assignment.digest,
        _ => None,
    }
}

/// Tallies revealed digests and distributes the inference budget.
/// Returns the amount refunded to the requester.
fn settle(
    ctx: &mut InstructionContext<'_>,
    inference: &mut Inference,
    voting: &mut VotingRecord,
    assignments: &mut [Assignment],
    miner_digest: [u8; HASH_SIZE],
) -> Result<u64> {
    let revealed: Vec<[u8; HASH_SIZE]> = assignments
        .iter()
        .filter(|a| a.role == AssignmentRole::Validator)
        .filter_map(participant_digest)
        .collect();
    let tally = most_voted_digest(&miner_digest, &revealed);

    if tally.count < consensus_threshold(inference.slots.len()) {
        voting.outcome = Resolution::NoConsensus;
        voting.agree_count = tally.count;

        let refund = inference.refundable()?;
        release_from_escrow(ctx, &inference.creator, refund, inference.id)?;

        for assignment in assignments.iter_mut() {
            if participant_digest(assignment).is_none() {
                assignment.vote = Vote::Absent;
                slash_miner(ctx, &assignment.worker, true, slash_reason::MISSED_REVEAL)?;
            }
        }
        return Ok(refund);
    }

    voting.outcome = Resolution::Accepted;
    voting.canonical_digest = Some(tally.digest);
    voting.agree_count = tally.count;

    let mut miner_agrees = false;
    let mut agreeing_validators = 0u8;
    for assignment in assignments.iter_mut() {
        assignment.vote = match participant_digest(assignment) {
            Some(digest) if digest == tally.digest => Vote::Approval,
            Some(_) => Vote::Disapproval,
            None => Vote::Absent,
        };
        if assignment.vote == Vote::Approval {
            match assignment.role {
                AssignmentRole::Miner => miner_agrees = true,
                AssignmentRole::Validator => agreeing_validators += 1,
            }
        }
    }

    // Split terms come from the inference; fee recipients from the live config
    let ratio = inference.fee_ratio_miner_validator;
    let native = split_worker_pool(inference.value, ratio, miner_agrees, agreeing_validators)?;
    let dao = allocate_dao_reward(
        inference.dao_token_reward,
        &inference.dao_token_percentage,
        inference.referrer.is_some(),
    )?;
    let dao_workers = split_worker_pool(dao.workers, ratio, miner_agrees, agreeing_validators)?;

    let mut payable = 0u8;
    for assignment in assignments.iter_mut() {
        match assignment.vote {
            Vote::Approval => {
                let (reward, dao_reward) = match assignment.role {
                    AssignmentRole::Miner => (native.miner, dao_workers.miner),
                    AssignmentRole::Validator => (native.per_validator, dao_workers.per_validator),
                };
                assignment.reward = reward;
                assignment.dao_reward = dao_reward;
                payable += 1;
            }
            Vote::Disapproval => {
                slash_miner(ctx, &assignment.worker, true, slash_reason::DISAGREEMENT)?;
            }
            Vote::Absent | Vote::Pending => {
                slash_miner(ctx, &assignment.worker, true, slash_reason::MISSED_REVEAL)?;
            }
        }
    }
    inference.pending_payouts = payable;

    // Protocol fees and rounding dust leave the vault immediately
    let l2_owner = ctx.config.l2_owner;
    let treasury = ctx.config.treasury;
    let treasury_share = inference
        .fee_treasury
        .checked_add(native.remainder)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    release_from_escrow(ctx, &l2_owner, inference.fee_l2, inference.id)?;
    release_from_escrow(ctx, &treasury, treasury_share, inference.id)?;

    mint_dao_reward(ctx, &l2_owner, dao.l2_owner, inference.id)?;
    if let Some(referrer) = inference.referrer {
        mint_dao_reward(ctx, &referrer, dao.referrer, inference.id)?;
        mint_dao_reward(ctx, &inference.creator, dao.referee, inference.id)?;
    }

    Ok(0)
}

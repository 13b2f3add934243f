//! Pay an approved assignment its share of the inference budget

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::MinerPaid;
use crate::instructions::settlement_helpers::{mint_dao_reward, release_from_escrow};
use crate::state::{TaskStatus, Vote};
use anchor_lang::prelude::*;

/// Pays the reward computed at resolution to the worker's reward wallet.
/// Callable by anyone, at most once per assignment. Returns the native
/// amount paid.
pub fn handler(ctx: &mut InstructionContext<'_>, assignment_id: u64) -> Result<u64> {
    let mut assignment = ctx.load_assignment(assignment_id)?;
    let mut inference = ctx.load_inference(assignment.inference_id)?;

    require!(
        inference.status == TaskStatus::Resolved,
        SolearnError::NotResolved
    );
    require!(!assignment.paid, SolearnError::AlreadyPaid);
    require!(assignment.vote == Vote::Approval, SolearnError::NotEligible);

    let wallet = ctx
        .try_load_miner(&assignment.worker)?
        .map(|miner| miner.reward_wallet)
        .unwrap_or(assignment.worker);

    release_from_escrow(ctx, &wallet, assignment.reward, inference.id)?;
    mint_dao_reward(ctx, &wallet, assignment.dao_reward, inference.id)?;

    assignment.paid = true;
    ctx.save_assignment(&assignment)?;

    inference.pending_payouts = inference
        .pending_payouts
        .checked_sub(1)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    ctx.save_inference(&inference)?;

    // Closed out in a shard, not in ProtocolState
    let mut shard = ctx.load_payout_shard(inference.id)?;
    shard.settled = shard
        .settled
        .checked_add(1)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    ctx.save_payout_shard(&shard)?;

    ctx.emit(MinerPaid {
        assignment_id,
        inference_id: inference.id,
        worker: assignment.worker,
        wallet,
        amount: assignment.reward,
        dao_amount: assignment.dao_reward,
        timestamp: ctx.now,
    });

    Ok(assignment.reward)
}

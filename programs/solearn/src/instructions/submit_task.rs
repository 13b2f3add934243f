//! Submit an inference and assign workers to it

use crate::context::{escrow_authority, InstructionContext};
use crate::errors::SolearnError;
use crate::events::InferenceSubmitted;
use crate::instructions::create_assignment::materialize;
use crate::instructions::selection::{select_workers, selection_seed};
use crate::instructions::settlement_helpers::split_inference_fee;
use crate::instructions::token_helpers;
use crate::state::{
    Asset, AssignmentRole, AssignmentSlot, Inference, TaskStatus, VotingRecord,
};
use crate::utils::commitment::mix_entropy;
use crate::utils::validation::validate_payload;
use anchor_lang::prelude::*;
use tracing::debug;

/// Escrows `fee`, selects `miner_requirement` distinct eligible workers of
/// `model`, and creates one assignment per worker. Returns the inference id.
pub fn handler(
    ctx: &mut InstructionContext<'_>,
    model: Pubkey,
    input: Vec<u8>,
    fee: u64,
) -> Result<u64> {
    validate_payload(&input)?;
    require!(fee >= ctx.config.min_fee_to_use, SolearnError::FeeTooLow);

    let model_info = ctx.load_model(&model)?;
    let required = ctx.config.miner_requirement as usize;

    let mut eligible = Vec::with_capacity(model_info.miners.len());
    for candidate in &model_info.miners {
        if let Some(miner) = ctx.try_load_miner(candidate)? {
            if miner.is_eligible(ctx.config.miner_minimum_stake, ctx.now) {
                eligible.push(*candidate);
            }
        }
    }
    require!(eligible.len() >= required, SolearnError::ModelUnderStaffed);

    let signer = ctx.signer;
    let split = split_inference_fee(
        fee,
        ctx.config.fee_l2_percentage,
        ctx.config.fee_treasury_percentage,
    )?;

    let mut state = ctx.load_state()?;
    let inference_id = state.next_inference_id;
    state.next_inference_id = inference_id
        .checked_add(1)
        .ok_or(SolearnError::ArithmeticOverflow)?;

    token_helpers::transfer(
        &mut ctx.tx,
        Asset::Native,
        &signer,
        &escrow_authority(inference_id),
        fee,
    )?;

    let seed = selection_seed(inference_id, &model, &state.entropy, ctx.now);
    let selected = select_workers(&eligible, required, &seed);

    let mut slots = Vec::with_capacity(selected.len());
    for (index, worker) in selected.into_iter().enumerate() {
        let id = state.next_assignment_id;
        state.next_assignment_id = id
            .checked_add(1)
            .ok_or(SolearnError::ArithmeticOverflow)?;
        slots.push(AssignmentSlot {
            id,
            worker,
            role: if index == 0 {
                AssignmentRole::Miner
            } else {
                AssignmentRole::Validator
            },
        });
    }

    state.task_count = state
        .task_count
        .checked_add(slots.len() as u64)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    state.entropy = mix_entropy(&state.entropy, &seed);
    ctx.save_state(&state)?;

    let submit_timeout = ctx
        .now
        .checked_add(ctx.config.submit_duration)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    let commit_timeout = submit_timeout
        .checked_add(ctx.config.commit_duration)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    let reveal_timeout = commit_timeout
        .checked_add(ctx.config.reveal_duration)
        .ok_or(SolearnError::ArithmeticOverflow)?;

    let referrer = ctx.load_referral(&signer)?.map(|r| r.referrer);

    let mut inference = Inference {
        id: inference_id,
        creator: signer,
        model,
        input,
        value: split.value,
        fee_l2: split.fee_l2,
        fee_treasury: split.fee_treasury,
        referrer,
        created_at: ctx.now,
        submit_timeout,
        commit_timeout,
        reveal_timeout,
        status: TaskStatus::Open,
        slots,
        miner_digest: None,
        pending_payouts: 0,
        fee_ratio_miner_validator: ctx.config.fee_ratio_miner_validator,
        dao_token_reward: ctx.config.dao_token_reward,
        dao_token_percentage: ctx.config.dao_token_percentage,
    };

    ctx.emit(InferenceSubmitted {
        inference_id,
        creator: signer,
        model,
        value: split.value,
        fee_l2: split.fee_l2,
        fee_treasury: split.fee_treasury,
        submit_timeout,
        commit_timeout,
        reveal_timeout,
        timestamp: ctx.now,
    });

    for slot in inference.slots.clone() {
        materialize(ctx, inference_id, &slot)?;
    }

    require!(
        inference.status.can_transition_to(TaskStatus::Assigned),
        SolearnError::InvalidStatusTransition
    );
    inference.status = TaskStatus::Assigned;
    ctx.save_inference(&inference)?;
    ctx.save_voting(&VotingRecord {
        inference_id,
        ..Default::default()
    })?;

    debug!(
        inference_id,
        %model,
        assignments = inference.slots.len(),
        "inference submitted"
    );

    Ok(inference_id)
}

//! Register a miner by staking into the vault

use crate::context::{vault_authority, InstructionContext};
use crate::errors::SolearnError;
use crate::events::MinerRegistered;
use crate::instructions::epoch_helpers::settle_epoch_reward;
use crate::instructions::token_helpers;
use crate::state::{Asset, MinerInfo};
use anchor_lang::prelude::*;

/// Stakes `amount` for the signer, creating the miner record on first use.
/// Re-registering adds to the existing stake.
pub fn handler(ctx: &mut InstructionContext<'_>, amount: u64) -> Result<()> {
    require!(
        amount >= ctx.config.miner_minimum_stake,
        SolearnError::InsufficientStake
    );

    let signer = ctx.signer;
    token_helpers::transfer(
        &mut ctx.tx,
        Asset::StakeToken,
        &signer,
        &vault_authority(),
        amount,
    )?;

    let epoch = ctx.current_epoch();
    let mut miner = match ctx.try_load_miner(&signer)? {
        Some(mut miner) => {
            settle_epoch_reward(&mut miner, epoch, ctx.config.reward_per_epoch)?;
            miner
        }
        None => {
            let mut state = ctx.load_state()?;
            state.total_miners = state
                .total_miners
                .checked_add(1)
                .ok_or(SolearnError::ArithmeticOverflow)?;
            ctx.save_state(&state)?;
            let mut miner = MinerInfo::new(signer, ctx.now);
            miner.last_epoch = epoch;
            miner
        }
    };

    miner.stake = miner
        .stake
        .checked_add(amount)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    miner.is_active = true;
    ctx.save_miner(&miner)?;

    ctx.emit(MinerRegistered {
        miner: signer,
        amount,
        total_stake: miner.stake,
        timestamp: ctx.now,
    });

    Ok(())
}

//! Shared helper functions for miner penalties.
//!
//! Used by `slash_miner` (admin) and `resolve_inference` (forfeiture,
//! disagreement and missed reveals).

use crate::context::{vault_authority, InstructionContext};
use crate::errors::SolearnError;
use crate::events::MinerSlashed;
use crate::instructions::epoch_helpers::settle_epoch_reward;
use crate::instructions::settlement_helpers::bps_of;
use crate::instructions::token_helpers;
use crate::state::Asset;
use anchor_lang::prelude::*;

/// Fine for a miner holding `stake`, capped so stake never goes negative.
pub fn calculate_fine(stake: u64, fine_percentage: u16) -> Result<u64> {
    Ok(bps_of(stake, fine_percentage)?.min(stake))
}

/// Penalizes a miner: removes it from every joined model, bars it from
/// joining or selection for `penalty_duration`, and when `fined` moves
/// `fine_percentage` of its stake from the vault to the treasury.
///
/// Returns the fine charged.
pub fn slash_miner(
    ctx: &mut InstructionContext<'_>,
    miner_key: &Pubkey,
    fined: bool,
    reason: u8,
) -> Result<u64> {
    let Some(mut miner) = ctx.try_load_miner(miner_key)? else {
        // Unregistered workers cannot be assigned; nothing to penalize
        return Ok(0);
    };

    for model_key in std::mem::take(&mut miner.joined_models) {
        if let Some(mut model) = ctx.try_load_model(&model_key)? {
            model.miners.retain(|m| m != miner_key);
            ctx.save_model(&model)?;
        }
    }

    miner.active_time = ctx
        .now
        .checked_add(ctx.config.penalty_duration)
        .ok_or(SolearnError::ArithmeticOverflow)?;

    let fine = if fined {
        calculate_fine(miner.stake, ctx.config.fine_percentage)?
    } else {
        0
    };

    if fine > 0 {
        let epoch = ctx.current_epoch();
        settle_epoch_reward(&mut miner, epoch, ctx.config.reward_per_epoch)?;
        miner.stake = miner
            .stake
            .checked_sub(fine)
            .ok_or(SolearnError::ArithmeticOverflow)?;
        // Keep pending within the remaining stake
        miner.pending_unstake = miner.pending_unstake.min(miner.stake);
        if miner.stake == 0 {
            miner.is_active = false;
        }

        let treasury = ctx.config.treasury;
        token_helpers::transfer(
            &mut ctx.tx,
            Asset::StakeToken,
            &vault_authority(),
            &treasury,
            fine,
        )?;
    }

    ctx.save_miner(&miner)?;
    ctx.emit(MinerSlashed {
        miner: *miner_key,
        fine,
        remaining_stake: miner.stake,
        active_time: miner.active_time,
        reason,
        timestamp: ctx.now,
    });

    Ok(fine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fine_ten_percent() {
        assert_eq!(calculate_fine(25_000, 1_000).unwrap(), 2_500);
    }

    #[test]
    fn test_fine_rounds_down() {
        assert_eq!(calculate_fine(9, 1_000).unwrap(), 0);
    }

    #[test]
    fn test_fine_full_stake() {
        assert_eq!(calculate_fine(1_234, 10_000).unwrap(), 1_234);
    }

    #[test]
    fn test_fine_capped_at_stake() {
        // Out-of-range percentages are rejected by config validation, but
        // the cap still holds
        assert_eq!(calculate_fine(100, u16::MAX).unwrap(), 100);
    }

    #[test]
    fn test_fine_on_empty_stake() {
        assert_eq!(calculate_fine(0, 5_000).unwrap(), 0);
    }
}

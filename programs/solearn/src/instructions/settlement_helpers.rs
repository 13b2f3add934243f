//! Shared helper functions for fee and reward settlement.
//!
//! Used by `submit_task` (fee split), `resolve_inference` (reward and DAO
//! allocation, refunds) and `pay_miner` (payout). Native funds move out of
//! the per-inference escrow, so settling one inference never touches
//! another's balances.

use crate::context::{escrow_authority, InstructionContext};
use crate::errors::SolearnError;
use crate::events::FundsReleased;
use crate::instructions::constants::BASIS_POINTS_DIVISOR;
use crate::instructions::token_helpers;
use crate::state::{Asset, DaoTokenPercentage};
use anchor_lang::prelude::*;

/// `amount * bps / 10000`, rounded down.
pub fn bps_of(amount: u64, bps: u16) -> Result<u64> {
    let share = (amount as u128)
        .checked_mul(bps as u128)
        .ok_or(SolearnError::ArithmeticOverflow)?
        / BASIS_POINTS_DIVISOR as u128;
    u64::try_from(share).map_err(|_| SolearnError::ArithmeticOverflow.into())
}

/// Inference fee broken into the worker pool and protocol fees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSplit {
    pub value: u64,
    pub fee_l2: u64,
    pub fee_treasury: u64,
}

/// Split a submitted fee. The worker pool receives whatever the fees leave.
pub fn split_inference_fee(fee: u64, fee_l2_bps: u16, fee_treasury_bps: u16) -> Result<FeeSplit> {
    let fee_l2 = bps_of(fee, fee_l2_bps)?;
    let fee_treasury = bps_of(fee, fee_treasury_bps)?;
    let value = fee
        .checked_sub(fee_l2)
        .and_then(|v| v.checked_sub(fee_treasury))
        .ok_or(SolearnError::ArithmeticOverflow)?;
    Ok(FeeSplit {
        value,
        fee_l2,
        fee_treasury,
    })
}

/// Division of a pool among the agreeing participants of an inference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardSplit {
    pub miner: u64,
    pub per_validator: u64,
    /// Rounding dust, or the whole pool when nobody is rewarded
    pub remainder: u64,
}

/// Split `pool` between the miner and agreeing validators.
///
/// - Miner agrees with validators: miner takes `ratio_bps`, validators share the rest.
/// - Miner agrees alone: miner takes the pool.
/// - Miner outvoted: agreeing validators share the pool equally.
pub fn split_worker_pool(
    pool: u64,
    ratio_bps: u16,
    miner_agrees: bool,
    agreeing_validators: u8,
) -> Result<RewardSplit> {
    let validators = agreeing_validators as u64;
    let (miner, validator_pool) = match (miner_agrees, validators) {
        (true, 0) => (pool, 0),
        (true, _) => {
            let miner = bps_of(pool, ratio_bps)?;
            let rest = pool
                .checked_sub(miner)
                .ok_or(SolearnError::ArithmeticOverflow)?;
            (miner, rest)
        }
        (false, _) => (0, pool),
    };

    let per_validator = if validators == 0 {
        0
    } else {
        validator_pool / validators
    };

    let remainder = pool
        .checked_sub(miner)
        .and_then(|v| v.checked_sub(per_validator * validators))
        .ok_or(SolearnError::ArithmeticOverflow)?;

    Ok(RewardSplit {
        miner,
        per_validator,
        remainder,
    })
}

/// DAO tokens minted for one accepted inference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DaoAllocation {
    /// Split among agreeing workers like the native pool
    pub workers: u64,
    pub l2_owner: u64,
    pub referrer: u64,
    pub referee: u64,
}

pub fn allocate_dao_reward(
    reward: u64,
    percentage: &DaoTokenPercentage,
    has_referrer: bool,
) -> Result<DaoAllocation> {
    let mut allocation = DaoAllocation {
        workers: bps_of(reward, percentage.miner)?,
        l2_owner: bps_of(reward, percentage.l2_owner)?,
        ..Default::default()
    };
    if has_referrer {
        allocation.referrer = bps_of(reward, percentage.referrer)?;
        allocation.referee = bps_of(reward, percentage.referee)?;
    }
    Ok(allocation)
}

/// Pay `amount` of native currency out of an inference's escrow.
pub fn release_from_escrow(
    ctx: &mut InstructionContext<'_>,
    recipient: &Pubkey,
    amount: u64,
    inference_id: u64,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    token_helpers::transfer(
        &mut ctx.tx,
        Asset::Native,
        &escrow_authority(inference_id),
        recipient,
        amount,
    )?;
    ctx.emit(FundsReleased {
        asset: Asset::Native,
        recipient: *recipient,
        amount,
        inference_id,
        timestamp: ctx.now,
    });
    Ok(())
}

/// Mint DAO tokens to `recipient`.
pub fn mint_dao_reward(
    ctx: &mut InstructionContext<'_>,
    recipient: &Pubkey,
    amount: u64,
    inference_id: u64,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    token_helpers::mint_to(&mut ctx.tx, Asset::DaoToken, recipient, amount)?;
    ctx.emit(FundsReleased {
        asset: Asset::DaoToken,
        recipient: *recipient,
        amount,
        inference_id,
        timestamp: ctx.now,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod split_inference_fee_tests {
        use super::*;

        #[test]
        fn test_no_fees() {
            let split = split_inference_fee(1000, 0, 0).unwrap();
            assert_eq!(
                split,
                FeeSplit {
                    value: 1000,
                    fee_l2: 0,
                    fee_treasury: 0
                }
            );
        }

        #[test]
        fn test_treasury_ten_percent() {
            let split = split_inference_fee(100_000, 0, 1000).unwrap();
            assert_eq!(split.fee_treasury, 10_000);
            assert_eq!(split.value, 90_000);
        }

        #[test]
        fn test_fees_round_down_in_pool_favour() {
            // 1% of 99 rounds to 0 on both sides
            let split = split_inference_fee(99, 100, 100).unwrap();
            assert_eq!(split.value, 99);
        }

        #[test]
        fn test_whole_fee_to_treasury() {
            let split = split_inference_fee(5_000, 0, 10_000).unwrap();
            assert_eq!(split.value, 0);
            assert_eq!(split.fee_treasury, 5_000);
        }

        #[test]
        fn test_large_fee_no_overflow() {
            let split = split_inference_fee(u64::MAX, 5_000, 5_000).unwrap();
            assert_eq!(
                split.value + split.fee_l2 + split.fee_treasury,
                u64::MAX
            );
        }
    }

    mod split_worker_pool_tests {
        use super::*;

        #[test]
        fn test_miner_and_two_validators() {
            // 50% to miner, 45_000 split between two validators
            let split = split_worker_pool(90_000, 5_000, true, 2).unwrap();
            assert_eq!(split.miner, 45_000);
            assert_eq!(split.per_validator, 22_500);
            assert_eq!(split.remainder, 0);
        }

        #[test]
        fn test_remainder_is_dust() {
            let split = split_worker_pool(1001, 5_000, true, 2).unwrap();
            assert_eq!(split.miner, 500);
            assert_eq!(split.per_validator, 250);
            assert_eq!(split.remainder, 1);
        }

        #[test]
        fn test_miner_outvoted() {
            let split = split_worker_pool(1000, 5_000, false, 3).unwrap();
            assert_eq!(split.miner, 0);
            assert_eq!(split.per_validator, 333);
            assert_eq!(split.remainder, 1);
        }

        #[test]
        fn test_miner_alone() {
            let split = split_worker_pool(1000, 5_000, true, 0).unwrap();
            assert_eq!(split.miner, 1000);
            assert_eq!(split.remainder, 0);
        }

        #[test]
        fn test_nobody_rewarded() {
            let split = split_worker_pool(1000, 5_000, false, 0).unwrap();
            assert_eq!(split.remainder, 1000);
        }

        #[test]
        fn test_full_ratio_leaves_validators_nothing() {
            let split = split_worker_pool(1000, 10_000, true, 2).unwrap();
            assert_eq!(split.miner, 1000);
            assert_eq!(split.per_validator, 0);
            assert_eq!(split.remainder, 0);
        }

        #[test]
        fn test_conservation() {
            for pool in [0u64, 1, 7, 999, 1_000_003, u64::MAX / 2] {
                for validators in 0..5u8 {
                    for miner_agrees in [true, false] {
                        let s = split_worker_pool(pool, 3_333, miner_agrees, validators).unwrap();
                        let paid = s.miner + s.per_validator * validators as u64 + s.remainder;
                        assert_eq!(paid, pool);
                    }
                }
            }
        }
    }

    mod allocate_dao_reward_tests {
        use super::*;

        #[test]
        fn test_without_referrer() {
            let allocation =
                allocate_dao_reward(1_000_000, &DaoTokenPercentage::default(), false).unwrap();
            assert_eq!(allocation.workers, 500_000);
            assert_eq!(allocation.l2_owner, 100_000);
            assert_eq!(allocation.referrer, 0);
            assert_eq!(allocation.referee, 0);
        }

        #[test]
        fn test_with_referrer() {
            let allocation =
                allocate_dao_reward(1_000_000, &DaoTokenPercentage::default(), true).unwrap();
            assert_eq!(allocation.referrer, 50_000);
            assert_eq!(allocation.referee, 50_000);
        }

        #[test]
        fn test_zero_reward() {
            let allocation =
                allocate_dao_reward(0, &DaoTokenPercentage::default(), true).unwrap();
            assert_eq!(allocation, DaoAllocation::default());
        }
    }
}

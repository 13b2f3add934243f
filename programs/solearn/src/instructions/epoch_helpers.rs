//! Block reward accrual for staked miners.
//!
//! Every active miner earns `reward_per_epoch` for each epoch boundary it
//! stays active across. Accrual is settled lazily: any instruction that
//! flips `is_active` or pays out must call [`settle_epoch_reward`] first.

use crate::errors::SolearnError;
use crate::state::MinerInfo;
use anchor_lang::prelude::*;

/// Credit `miner` for the epochs between its cursor and `epoch`, then move
/// the cursor. Returns the amount credited. Inactive miners only move the
/// cursor.
pub fn settle_epoch_reward(miner: &mut MinerInfo, epoch: u64, reward_per_epoch: u64) -> Result<u64> {
    if epoch <= miner.last_epoch {
        return Ok(0);
    }

    let earned = if miner.is_active {
        (epoch - miner.last_epoch)
            .checked_mul(reward_per_epoch)
            .ok_or(SolearnError::ArithmeticOverflow)?
    } else {
        0
    };
    miner.accrued_reward = miner
        .accrued_reward
        .checked_add(earned)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    miner.last_epoch = epoch;
    Ok(earned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner() -> MinerInfo {
        MinerInfo::new(Pubkey::new_from_array([4; 32]), 0)
    }

    #[test]
    fn test_active_miner_accrues_per_epoch() {
        let mut m = miner();
        assert_eq!(settle_epoch_reward(&mut m, 3, 10).unwrap(), 30);
        assert_eq!(m.accrued_reward, 30);
        assert_eq!(m.last_epoch, 3);

        // Same epoch again is a no-op
        assert_eq!(settle_epoch_reward(&mut m, 3, 10).unwrap(), 0);
        assert_eq!(m.accrued_reward, 30);
    }

    #[test]
    fn test_inactive_miner_only_moves_cursor() {
        let mut m = miner();
        m.is_active = false;
        assert_eq!(settle_epoch_reward(&mut m, 5, 10).unwrap(), 0);
        assert_eq!(m.last_epoch, 5);

        m.is_active = true;
        assert_eq!(settle_epoch_reward(&mut m, 6, 10).unwrap(), 10);
    }

    #[test]
    fn test_cursor_never_moves_back() {
        let mut m = miner();
        m.last_epoch = 8;
        assert_eq!(settle_epoch_reward(&mut m, 2, 10).unwrap(), 0);
        assert_eq!(m.last_epoch, 8);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut m = miner();
        let err = settle_epoch_reward(&mut m, 2, u64::MAX).unwrap_err();
        assert_eq!(err, SolearnError::ArithmeticOverflow.into());
    }
}

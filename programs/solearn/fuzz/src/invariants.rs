//! Protocol invariant checking for fuzz testing

use solearn::state::{MinerInfo, Resolution};

/// Stake invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeInvariantResult {
    Valid,
    PendingExceedsStake { pending: u64, stake: u64 },
    VaultMismatch { vault: u64, staked: u64 },
    SupplyNotConserved { expected: u64, actual: u64 },
    ActiveWithoutStake,
    ClaimedEarly { now: u64, claimable_at: u64 },
}

/// Settlement invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementInvariantResult {
    Valid,
    VaultNotDrained { remaining: u64 },
    FeeNotConserved { fee: u64, accounted: u64 },
    DoublePayment { assignment_id: u64 },
    OpenTasksRemain { task_count: u64 },
}

/// Consensus invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusInvariantResult {
    Valid,
    AcceptedBelowThreshold { agree_count: u8, threshold: u8 },
    MoreRevealsThanCommits { commits: u8, reveals: u8 },
    RefundMismatch { outcome: Resolution, refunded: u64, expected: u64 },
    TamperedRevealAccepted,
}

// ============================================================================
// Stake Invariants
// ============================================================================

/// Pending unstake never exceeds stake, and a miner with no stake is inactive.
pub fn check_miner_record(miner: &MinerInfo) -> StakeInvariantResult {
    if miner.pending_unstake > miner.stake {
        return StakeInvariantResult::PendingExceedsStake {
            pending: miner.pending_unstake,
            stake: miner.stake,
        };
    }
    if miner.stake == 0 && miner.is_active {
        return StakeInvariantResult::ActiveWithoutStake;
    }
    StakeInvariantResult::Valid
}

/// The vault's stake token balance equals the sum of all miners' stake.
pub fn check_stake_vault(vault: u64, miners: &[MinerInfo]) -> StakeInvariantResult {
    let staked = miners.iter().map(|m| m.stake as u128).sum::<u128>();
    if vault as u128 != staked {
        StakeInvariantResult::VaultMismatch {
            vault,
            staked: staked.min(u64::MAX as u128) as u64,
        }
    } else {
        StakeInvariantResult::Valid
    }
}

/// Stake tokens are only moved, never created or destroyed.
pub fn check_stake_supply(minted: u64, balances: &[u64]) -> StakeInvariantResult {
    let actual = balances.iter().map(|b| *b as u128).sum::<u128>();
    if actual != minted as u128 {
        StakeInvariantResult::SupplyNotConserved {
            expected: minted,
            actual: actual.min(u64::MAX as u128) as u64,
        }
    } else {
        StakeInvariantResult::Valid
    }
}

/// A successful claim happened no earlier than the unstake delay allows.
pub fn check_claim_timing(now: u64, requested_at: u64, delay: u64) -> StakeInvariantResult {
    let claimable_at = requested_at.saturating_add(delay);
    if now < claimable_at {
        StakeInvariantResult::ClaimedEarly { now, claimable_at }
    } else {
        StakeInvariantResult::Valid
    }
}

// ============================================================================
// Settlement Invariants
// ============================================================================

/// Once every payable assignment is paid the vault holds no native funds.
pub fn check_vault_drained(remaining: u64) -> SettlementInvariantResult {
    if remaining != 0 {
        SettlementInvariantResult::VaultNotDrained { remaining }
    } else {
        SettlementInvariantResult::Valid
    }
}

/// Every unit of the fee ends up with a worker, a fee recipient, or back
/// with the requester.
pub fn check_fee_conservation(fee: u64, destinations: &[u64]) -> SettlementInvariantResult {
    let accounted = destinations.iter().map(|d| *d as u128).sum::<u128>();
    if accounted != fee as u128 {
        SettlementInvariantResult::FeeNotConserved {
            fee,
            accounted: accounted.min(u64::MAX as u128) as u64,
        }
    } else {
        SettlementInvariantResult::Valid
    }
}

/// A repeated payout must be rejected.
pub fn check_single_payout(assignment_id: u64, repeat_succeeded: bool) -> SettlementInvariantResult {
    if repeat_succeeded {
        SettlementInvariantResult::DoublePayment { assignment_id }
    } else {
        SettlementInvariantResult::Valid
    }
}

/// Every assignment is closed once its inference settles.
pub fn check_task_count_settled(task_count: u64) -> SettlementInvariantResult {
    if task_count != 0 {
        SettlementInvariantResult::OpenTasksRemain { task_count }
    } else {
        SettlementInvariantResult::Valid
    }
}

// ============================================================================
// Consensus Invariants
// ============================================================================

pub fn check_accepted_threshold(
    outcome: Resolution,
    agree_count: u8,
    threshold: u8,
) -> ConsensusInvariantResult {
    if outcome == Resolution::Accepted && agree_count < threshold {
        ConsensusInvariantResult::AcceptedBelowThreshold {
            agree_count,
            threshold,
        }
    } else {
        ConsensusInvariantResult::Valid
    }
}

pub fn check_reveals_within_commits(commits: u8, reveals: u8) -> ConsensusInvariantResult {
    if reveals > commits {
        ConsensusInvariantResult::MoreRevealsThanCommits { commits, reveals }
    } else {
        ConsensusInvariantResult::Valid
    }
}

/// Failed rounds refund the whole fee; accepted rounds refund nothing.
pub fn check_refund(outcome: Resolution, refunded: u64, fee: u64) -> ConsensusInvariantResult {
    let expected = match outcome {
        Resolution::MinerForfeited | Resolution::NoConsensus => fee,
        Resolution::Accepted | Resolution::Pending => 0,
    };
    if refunded != expected {
        ConsensusInvariantResult::RefundMismatch {
            outcome,
            refunded,
            expected,
        }
    } else {
        ConsensusInvariantResult::Valid
    }
}

pub fn check_tampered_reveal_rejected(accepted: bool) -> ConsensusInvariantResult {
    if accepted {
        ConsensusInvariantResult::TamperedRevealAccepted
    } else {
        ConsensusInvariantResult::Valid
    }
}

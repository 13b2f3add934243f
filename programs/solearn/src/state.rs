//! Ledger record structures for the Solearn protocol core

use crate::errors::SolearnError;
use crate::instructions::constants::{BASIS_POINTS_DIVISOR, MAX_USER_SCORE};
use crate::utils::validation::{validate_bps, validate_bps_group};
use anchor_lang::prelude::*;

/// Size of keccak-256 digests and commitments
pub const HASH_SIZE: usize = 32;

/// Token denomination used by the default configuration (9 decimals).
pub const DENOMINATION: u64 = 1_000_000_000;

// ============================================================================
// Configuration
// ============================================================================

/// Default minimum stake for a miner (25 000 tokens)
pub const DEFAULT_MINER_MINIMUM_STAKE: u64 = 25_000 * DENOMINATION;
/// Default minimum fee to submit an inference (0.1 token)
pub const DEFAULT_MIN_FEE_TO_USE: u64 = DENOMINATION / 10;
/// Default number of workers per inference (one miner, two validators)
pub const DEFAULT_MINER_REQUIREMENT: u8 = 3;
/// Default phase window length in slots
pub const DEFAULT_PHASE_DURATION: u64 = 300;
/// Default unstake delay in slots (21 days of 400ms slots)
pub const DEFAULT_UNSTAKE_DELAY: u64 = 1_814_400;
/// Default penalty window in slots
pub const DEFAULT_PENALTY_DURATION: u64 = 1_200;
/// Default fine (10%)
pub const DEFAULT_FINE_PERCENTAGE: u16 = 10_00;
/// Default treasury fee (10%)
pub const DEFAULT_FEE_TREASURY_PERCENTAGE: u16 = 10_00;
/// Default miner share of the worker pool (50%)
pub const DEFAULT_FEE_RATIO_MINER_VALIDATOR: u16 = 50_00;
/// Default epoch length in slots (one day of 400ms slots)
pub const DEFAULT_EPOCH_DURATION: u64 = 216_000;

/// Split of the per-inference DAO token reward, in basis points.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaoTokenPercentage {
    pub miner: u16,
    pub user: u16,
    pub referrer: u16,
    pub referee: u16,
    pub l2_owner: u16,
}

impl Default for DaoTokenPercentage {
    fn default() -> Self {
        Self {
            miner: 50_00,
            user: 30_00,
            referrer: 5_00,
            referee: 5_00,
            l2_owner: 10_00,
        }
    }
}

/// Economic and timing parameters of the protocol.
///
/// A validated snapshot is shared by every instruction; it changes only
/// through `update_config`, which bumps `ProtocolState::config_version`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Identity allowed to run admin instructions
    pub admin: Pubkey,
    /// Receives treasury fees, fines and rounding dust
    pub treasury: Pubkey,
    /// Receives the L2 owner fee and DAO share
    pub l2_owner: Pubkey,
    pub miner_minimum_stake: u64,
    pub min_fee_to_use: u64,
    /// Workers assigned per inference, including the miner
    pub miner_requirement: u8,
    pub submit_duration: u64,
    pub commit_duration: u64,
    pub reveal_duration: u64,
    pub unstake_delay: u64,
    pub penalty_duration: u64,
    pub fine_percentage: u16,
    pub fee_l2_percentage: u16,
    pub fee_treasury_percentage: u16,
    pub fee_ratio_miner_validator: u16,
    /// DAO tokens minted per accepted inference
    pub dao_token_reward: u64,
    pub dao_token_percentage: DaoTokenPercentage,
    /// Slots per reward epoch. Fixed for the lifetime of the protocol.
    pub epoch_duration: u64,
    /// Stake tokens each active miner earns per epoch
    pub reward_per_epoch: u64,
}

impl ProtocolConfig {
    /// Default parameters with the given privileged identities.
    pub fn with_admin(admin: Pubkey, treasury: Pubkey, l2_owner: Pubkey) -> Self {
        Self {
            admin,
            treasury,
            l2_owner,
            miner_minimum_stake: DEFAULT_MINER_MINIMUM_STAKE,
            min_fee_to_use: DEFAULT_MIN_FEE_TO_USE,
            miner_requirement: DEFAULT_MINER_REQUIREMENT,
            submit_duration: DEFAULT_PHASE_DURATION,
            commit_duration: DEFAULT_PHASE_DURATION,
            reveal_duration: DEFAULT_PHASE_DURATION,
            unstake_delay: DEFAULT_UNSTAKE_DELAY,
            penalty_duration: DEFAULT_PENALTY_DURATION,
            fine_percentage: DEFAULT_FINE_PERCENTAGE,
            fee_l2_percentage: 0,
            fee_treasury_percentage: DEFAULT_FEE_TREASURY_PERCENTAGE,
            fee_ratio_miner_validator: DEFAULT_FEE_RATIO_MINER_VALIDATOR,
            dao_token_reward: 0,
            dao_token_percentage: DaoTokenPercentage::default(),
            epoch_duration: DEFAULT_EPOCH_DURATION,
            reward_per_epoch: 0,
        }
    }

    /// Rejects out-of-range parameters.
    ///
    /// Every percentage is in basis points and each split group
    /// (inference fees, DAO token shares) sums to at most 10000.
    pub fn validate(&self) -> Result<()> {
        validate_bps(self.fine_percentage)?;
        validate_bps(self.fee_ratio_miner_validator)?;
        validate_bps_group(&[self.fee_l2_percentage, self.fee_treasury_percentage])?;
        let dao = &self.dao_token_percentage;
        validate_bps_group(&[dao.miner, dao.user, dao.referrer, dao.referee, dao.l2_owner])?;

        require!(self.miner_requirement >= 1, SolearnError::ConfigInvalid);
        require!(self.miner_minimum_stake > 0, SolearnError::ConfigInvalid);
        require!(
            self.submit_duration > 0 && self.commit_duration > 0 && self.reveal_duration > 0,
            SolearnError::ConfigInvalid
        );
        require!(self.epoch_duration > 0, SolearnError::ConfigInvalid);
        Ok(())
    }

    /// Reward epoch containing `slot`.
    pub fn epoch_at(&self, slot: u64) -> u64 {
        slot.checked_div(self.epoch_duration).unwrap_or(0)
    }

    /// DAO tokens a requester receives for rating an inference `score` out of 10.
    pub fn user_dao_token_reward(&self, score: u8) -> Result<u64> {
        require!(
            (1..=MAX_USER_SCORE).contains(&score),
            SolearnError::InvalidInput
        );
        let reward = (self.dao_token_percentage.user as u128)
            .checked_mul(score as u128)
            .and_then(|v| v.checked_mul(self.dao_token_reward as u128))
            .ok_or(SolearnError::ArithmeticOverflow)?
            / MAX_USER_SCORE as u128
            / BASIS_POINTS_DIVISOR as u128;
        u64::try_from(reward).map_err(|_| SolearnError::ArithmeticOverflow.into())
    }
}

// ============================================================================
// Protocol state
// ============================================================================

/// Global counters shared by every instruction.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProtocolState {
    pub next_inference_id: u64,
    pub next_assignment_id: u64,
    /// Assignments not yet closed at resolution. Payouts are tallied in
    /// `PayoutShard` records; the open task count is this minus their sum.
    pub task_count: u64,
    pub total_miners: u64,
    pub total_models: u64,
    /// Rolling selection seed, mixed on every submission and resolution
    pub entropy: [u8; HASH_SIZE],
    pub config_version: u64,
    pub initialized_at: u64,
    /// Last reward epoch recorded by `update_epoch`
    pub current_epoch: u64,
}

/// Count of payouts made for inferences whose id falls in this shard.
///
/// Payouts for different inferences usually land in different shards, so
/// they commit without contending on `ProtocolState`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PayoutShard {
    pub shard: u64,
    pub settled: u64,
}

// ============================================================================
// Stake registry
// ============================================================================

/// A staked worker.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct MinerInfo {
    pub miner: Pubkey,
    pub reward_wallet: Pubkey,
    /// Staked tokens held by the vault, pending unstake included
    pub stake: u64,
    pub pending_unstake: u64,
    pub unstake_requested_at: u64,
    pub joined_models: Vec<Pubkey>,
    pub is_active: bool,
    /// Slot before which the miner cannot join models or be assigned
    pub active_time: u64,
    pub registered_at: u64,
    /// Epoch up to which block rewards have been accrued
    pub last_epoch: u64,
    /// Block rewards accrued but not yet claimed
    pub accrued_reward: u64,
}

impl MinerInfo {
    pub fn new(miner: Pubkey, now: u64) -> Self {
        Self {
            miner,
            reward_wallet: miner,
            stake: 0,
            pending_unstake: 0,
            unstake_requested_at: 0,
            joined_models: Vec::new(),
            is_active: true,
            active_time: 0,
            registered_at: now,
            last_epoch: 0,
            accrued_reward: 0,
        }
    }

    /// Stake not already scheduled for withdrawal.
    pub fn effective_stake(&self) -> u64 {
        self.stake.saturating_sub(self.pending_unstake)
    }

    pub fn is_penalized(&self, now: u64) -> bool {
        now < self.active_time
    }

    /// Whether the scheduler may assign this miner.
    pub fn is_eligible(&self, minimum_stake: u64, now: u64) -> bool {
        self.is_active && !self.is_penalized(now) && self.effective_stake() >= minimum_stake
    }
}

// ============================================================================
// Model registry
// ============================================================================

/// An approved model and the miners serving it, in join order.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub model: Pubkey,
    pub miners: Vec<Pubkey>,
    pub added_at: u64,
}

/// Referee to referrer link used for DAO token splits.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReferralInfo {
    pub referee: Pubkey,
    pub referrer: Pubkey,
    pub set_at: u64,
}

// ============================================================================
// Inferences
// ============================================================================

/// Inference status
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Open,
    Assigned,
    Resolved,
}

impl TaskStatus {
    /// Valid transitions:
    /// - Open → Assigned (all assignments materialized)
    /// - Assigned → Resolved (consensus reached, forfeited or abandoned)
    ///
    /// Resolved is terminal.
    pub fn can_transition_to(&self, new_status: TaskStatus) -> bool {
        matches!(
            (self, new_status),
            (TaskStatus::Open, TaskStatus::Assigned) | (TaskStatus::Assigned, TaskStatus::Resolved)
        )
    }
}

/// Role of a worker within an inference
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignmentRole {
    /// Lead compute, submits the solution in the clear
    Miner,
    /// Corroborates the miner via commit-reveal
    Validator,
}

/// A planned assignment, fixed at submission.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssignmentSlot {
    pub id: u64,
    pub worker: Pubkey,
    pub role: AssignmentRole,
}

/// An inference request and its escrowed budget.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Inference {
    pub id: u64,
    pub creator: Pubkey,
    pub model: Pubkey,
    pub input: Vec<u8>,
    /// Worker pool, topped up by `top_up_task`
    pub value: u64,
    pub fee_l2: u64,
    pub fee_treasury: u64,
    pub referrer: Option<Pubkey>,
    pub created_at: u64,
    pub submit_timeout: u64,
    pub commit_timeout: u64,
    pub reveal_timeout: u64,
    pub status: TaskStatus,
    pub slots: Vec<AssignmentSlot>,
    pub miner_digest: Option<[u8; HASH_SIZE]>,
    /// Approved assignments still waiting for `pay_miner`
    pub pending_payouts: u8,
    /// Reward terms fixed at submission
    pub fee_ratio_miner_validator: u16,
    pub dao_token_reward: u64,
    pub dao_token_percentage: DaoTokenPercentage,
}

impl Inference {
    pub fn miner_slot(&self) -> Option<&AssignmentSlot> {
        self.slots
            .iter()
            .find(|slot| slot.role == AssignmentRole::Miner)
    }

    pub fn validator_count(&self) -> u8 {
        self.slots
            .iter()
            .filter(|slot| slot.role == AssignmentRole::Validator)
            .count() as u8
    }

    /// Escrow returned to the creator on forfeiture or failed consensus.
    pub fn refundable(&self) -> Result<u64> {
        self.value
            .checked_add(self.fee_l2)
            .and_then(|v| v.checked_add(self.fee_treasury))
            .ok_or(SolearnError::ArithmeticOverflow.into())
    }
}

// ============================================================================
// Assignments
// ============================================================================

/// Assignment phase
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AssignmentPhase {
    #[default]
    Created,
    Seized,
    /// Miner only
    Submitted,
    /// Validator only
    Committed,
    /// Validator only
    Revealed,
    Resolved,
}

impl AssignmentPhase {
    /// Valid transitions:
    /// - Created → Seized
    /// - Seized → Submitted (miner) or Committed (validator)
    /// - Committed → Revealed
    /// - any non-terminal phase → Resolved
    pub fn can_transition_to(&self, new_phase: AssignmentPhase) -> bool {
        use AssignmentPhase::*;
        match (self, new_phase) {
            (Created, Seized) => true,
            (Seized, Submitted) | (Seized, Committed) => true,
            (Committed, Revealed) => true,
            (Resolved, _) => false,
            (_, Resolved) => true,
            _ => false,
        }
    }
}

/// Resolution verdict for one assignment
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Vote {
    #[default]
    Pending,
    /// Matched the canonical digest
    Approval,
    /// Submitted or revealed a different digest
    Disapproval,
    /// Never submitted or revealed
    Absent,
}

/// One worker's obligation within an inference.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub id: u64,
    pub inference_id: u64,
    pub worker: Pubkey,
    pub role: AssignmentRole,
    pub phase: AssignmentPhase,
    pub output: Vec<u8>,
    pub digest: Option<[u8; HASH_SIZE]>,
    pub commitment: Option<[u8; HASH_SIZE]>,
    pub reveal_nonce: Option<u64>,
    pub vote: Vote,
    /// Native reward owed once resolved
    pub reward: u64,
    pub dao_reward: u64,
    pub paid: bool,
    pub created_at: u64,
}

impl Assignment {
    pub fn new(slot: &AssignmentSlot, inference_id: u64, now: u64) -> Self {
        Self {
            id: slot.id,
            inference_id,
            worker: slot.worker,
            role: slot.role,
            phase: AssignmentPhase::Created,
            output: Vec::new(),
            digest: None,
            commitment: None,
            reveal_nonce: None,
            vote: Vote::Pending,
            reward: 0,
            dao_reward: 0,
            paid: false,
            created_at: now,
        }
    }

    pub fn is_payable(&self) -> bool {
        self.phase == AssignmentPhase::Resolved && self.vote == Vote::Approval && !self.paid
    }
}

// ============================================================================
// Voting
// ============================================================================

/// Outcome of an inference
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Pending,
    /// Canonical digest reached the threshold
    Accepted,
    /// Miner missed the submit deadline
    MinerForfeited,
    /// No digest reached the threshold
    NoConsensus,
}

/// Per-inference commit-reveal tally.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VotingRecord {
    pub inference_id: u64,
    pub total_commit: u8,
    pub total_reveal: u8,
    pub canonical_digest: Option<[u8; HASH_SIZE]>,
    pub agree_count: u8,
    pub outcome: Resolution,
    pub resolved_at: u64,
}

// ============================================================================
// Balances
// ============================================================================

/// Assets tracked by the ledger
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Asset {
    /// Token staked by miners
    StakeToken,
    /// Currency inference fees are paid in
    Native,
    /// Governance token minted as a participation reward
    DaoToken,
}

impl Asset {
    pub fn seed(&self) -> &'static [u8] {
        match self {
            Asset::StakeToken => b"stake_token",
            Asset::Native => b"native",
            Asset::DaoToken => b"dao_token",
        }
    }
}

/// Balance of one asset held by one owner.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenAccount {
    pub owner: Pubkey,
    pub asset: Asset,
    pub amount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProtocolConfig {
        ProtocolConfig::with_admin(
            Pubkey::new_from_array([1; 32]),
            Pubkey::new_from_array([2; 32]),
            Pubkey::new_from_array([3; 32]),
        )
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_fee_group_over_limit_rejected() {
        let mut cfg = config();
        cfg.fee_l2_percentage = 5_000;
        cfg.fee_treasury_percentage = 5_001;
        assert_eq!(cfg.validate().unwrap_err(), SolearnError::ConfigInvalid.into());
    }

    #[test]
    fn test_dao_group_over_limit_rejected() {
        let mut cfg = config();
        cfg.dao_token_percentage.referee = 5_01;
        assert_eq!(cfg.validate().unwrap_err(), SolearnError::ConfigInvalid.into());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut cfg = config();
        cfg.reveal_duration = 0;
        assert!(cfg.validate().is_err());
        let mut cfg = config();
        cfg.miner_requirement = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_epoch_at() {
        let mut cfg = config();
        cfg.epoch_duration = 100;
        assert_eq!(cfg.epoch_at(0), 0);
        assert_eq!(cfg.epoch_at(99), 0);
        assert_eq!(cfg.epoch_at(100), 1);
        assert_eq!(cfg.epoch_at(1_050), 10);
        cfg.epoch_duration = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_user_dao_token_reward() {
        let mut cfg = config();
        cfg.dao_token_reward = 1_000_000;
        // 30% of reward scaled by score / 10
        assert_eq!(cfg.user_dao_token_reward(10).unwrap(), 300_000);
        assert_eq!(cfg.user_dao_token_reward(5).unwrap(), 150_000);
        assert!(cfg.user_dao_token_reward(0).is_err());
        assert!(cfg.user_dao_token_reward(11).is_err());
    }

    #[test]
    fn test_task_status_transitions() {
        assert!(TaskStatus::Open.can_transition_to(TaskStatus::Assigned));
        assert!(TaskStatus::Assigned.can_transition_to(TaskStatus::Resolved));
        assert!(!TaskStatus::Open.can_transition_to(TaskStatus::Resolved));
        assert!(!TaskStatus::Resolved.can_transition_to(TaskStatus::Assigned));
    }

    #[test]
    fn test_assignment_phase_transitions() {
        use AssignmentPhase::*;
        assert!(Created.can_transition_to(Seized));
        assert!(Seized.can_transition_to(Submitted));
        assert!(Seized.can_transition_to(Committed));
        assert!(Committed.can_transition_to(Revealed));
        assert!(Revealed.can_transition_to(Resolved));
        assert!(Created.can_transition_to(Resolved));
        assert!(!Created.can_transition_to(Committed));
        assert!(!Submitted.can_transition_to(Revealed));
        assert!(!Resolved.can_transition_to(Resolved));
    }

    #[test]
    fn test_effective_stake_and_eligibility() {
        let mut miner = MinerInfo::new(Pubkey::new_from_array([9; 32]), 0);
        miner.stake = 100;
        miner.pending_unstake = 30;
        assert_eq!(miner.effective_stake(), 70);
        assert!(miner.is_eligible(70, 0));
        assert!(!miner.is_eligible(71, 0));
        miner.active_time = 10;
        assert!(!miner.is_eligible(70, 9));
        assert!(miner.is_eligible(70, 10));
    }
}

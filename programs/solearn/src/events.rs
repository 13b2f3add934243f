//! Events emitted by the Solearn protocol core
//!
//! Events are buffered per instruction and published only when the
//! instruction's transaction commits.

use crate::state::{Asset, AssignmentRole, ProtocolConfig, Resolution, HASH_SIZE};
use anchor_lang::prelude::*;

/// Emitted when the protocol state is created
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolInitialized {
    pub admin: Pubkey,
    pub treasury: Pubkey,
    pub miner_requirement: u8,
    pub timestamp: u64,
}

/// Emitted when the admin replaces the configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigUpdated {
    pub updater: Pubkey,
    pub config_version: u64,
    pub config: ProtocolConfig,
    pub timestamp: u64,
}

/// Emitted when a miner registers or re-registers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerRegistered {
    pub miner: Pubkey,
    pub amount: u64,
    pub total_stake: u64,
    pub timestamp: u64,
}

/// Emitted when a miner adds stake
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeToppedUp {
    pub miner: Pubkey,
    pub amount: u64,
    pub total_stake: u64,
    pub timestamp: u64,
}

/// Emitted when stake moves into the pending unstake bucket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnstakeRequested {
    pub miner: Pubkey,
    pub amount: u64,
    pub pending_unstake: u64,
    pub claimable_at: u64,
    pub timestamp: u64,
}

/// Emitted when matured unstake is returned to the miner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnstakeClaimed {
    pub miner: Pubkey,
    pub amount: u64,
    pub remaining_stake: u64,
    pub timestamp: u64,
}

/// Emitted when a miner is penalized, with or without a fine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerSlashed {
    pub miner: Pubkey,
    pub fine: u64,
    pub remaining_stake: u64,
    pub active_time: u64,
    pub reason: u8,
    pub timestamp: u64,
}

/// Slash reasons carried by `MinerSlashed`
pub mod slash_reason {
    pub const ADMIN: u8 = 0;
    pub const MISSED_SUBMISSION: u8 = 1;
    pub const DISAGREEMENT: u8 = 2;
    pub const MISSED_REVEAL: u8 = 3;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardWalletUpdated {
    pub miner: Pubkey,
    pub wallet: Pubkey,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelAdded {
    pub model: Pubkey,
    pub timestamp: u64,
}

/// Emitted when the admin withdraws a model. `miners` were dropped from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRemoved {
    pub model: Pubkey,
    pub miners: u32,
    pub timestamp: u64,
}

/// Emitted when the protocol epoch cursor moves forward
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpochAdvanced {
    pub previous_epoch: u64,
    pub epoch: u64,
    pub timestamp: u64,
}

/// Emitted when a miner withdraws accrued block rewards
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardClaimed {
    pub miner: Pubkey,
    pub wallet: Pubkey,
    pub amount: u64,
    pub epoch: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerJoinedModel {
    pub miner: Pubkey,
    pub model: Pubkey,
    pub model_miners: u32,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerLeftModel {
    pub miner: Pubkey,
    pub model: Pubkey,
    pub model_miners: u32,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferrerSet {
    pub referee: Pubkey,
    pub referrer: Pubkey,
    pub timestamp: u64,
}

/// Emitted when a requester submits an inference
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferenceSubmitted {
    pub inference_id: u64,
    pub creator: Pubkey,
    pub model: Pubkey,
    pub value: u64,
    pub fee_l2: u64,
    pub fee_treasury: u64,
    pub submit_timeout: u64,
    pub commit_timeout: u64,
    pub reveal_timeout: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentCreated {
    pub assignment_id: u64,
    pub inference_id: u64,
    pub worker: Pubkey,
    pub role: AssignmentRole,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferenceToppedUp {
    pub inference_id: u64,
    pub amount: u64,
    pub value: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSeized {
    pub assignment_id: u64,
    pub inference_id: u64,
    pub worker: Pubkey,
    pub role: AssignmentRole,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolutionSubmitted {
    pub assignment_id: u64,
    pub inference_id: u64,
    pub miner: Pubkey,
    pub digest: [u8; HASH_SIZE],
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentSubmitted {
    pub assignment_id: u64,
    pub inference_id: u64,
    pub validator: Pubkey,
    pub commitment: [u8; HASH_SIZE],
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolutionRevealed {
    pub assignment_id: u64,
    pub inference_id: u64,
    pub validator: Pubkey,
    pub digest: [u8; HASH_SIZE],
    pub timestamp: u64,
}

/// Emitted once per inference when it leaves the Assigned state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferenceResolved {
    pub inference_id: u64,
    pub outcome: Resolution,
    pub canonical_digest: Option<[u8; HASH_SIZE]>,
    pub agree_count: u8,
    pub refunded: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerPaid {
    pub assignment_id: u64,
    pub inference_id: u64,
    pub worker: Pubkey,
    pub wallet: Pubkey,
    pub amount: u64,
    pub dao_amount: u64,
    pub timestamp: u64,
}

/// Emitted for every fee, refund or reward leaving an inference escrow, and for DAO mints
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundsReleased {
    pub asset: Asset,
    pub recipient: Pubkey,
    pub amount: u64,
    pub inference_id: u64,
    pub timestamp: u64,
}

macro_rules! protocol_events {
    ($($variant:ident),* $(,)?) => {
        /// Any event the protocol can emit.
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum ProtocolEvent {
            $($variant($variant),)*
        }

        $(
            impl From<$variant> for ProtocolEvent {
                fn from(event: $variant) -> Self {
                    ProtocolEvent::$variant(event)
                }
            }
        )*

        impl ProtocolEvent {
            pub fn name(&self) -> &'static str {
                match self {
                    $(ProtocolEvent::$variant(_) => stringify!($variant),)*
                }
            }
        }
    };
}

protocol_events!(
    ProtocolInitialized,
    ConfigUpdated,
    MinerRegistered,
    StakeToppedUp,
    UnstakeRequested,
    UnstakeClaimed,
    MinerSlashed,
    RewardWalletUpdated,
    ModelAdded,
    ModelRemoved,
    EpochAdvanced,
    RewardClaimed,
    MinerJoinedModel,
    MinerLeftModel,
    ReferrerSet,
    InferenceSubmitted,
    AssignmentCreated,
    InferenceToppedUp,
    RoleSeized,
    SolutionSubmitted,
    CommitmentSubmitted,
    SolutionRevealed,
    InferenceResolved,
    MinerPaid,
    FundsReleased,
);

//! Per-instruction execution context and typed record access.

use crate::errors::SolearnError;
use crate::events::ProtocolEvent;
use crate::instructions::constants::*;
use crate::ledger::{derive_key, ChangeSet, LedgerStore, RecordId, Transaction};
use crate::state::{
    Assignment, Asset, Inference, MinerInfo, ModelInfo, PayoutShard, ProtocolConfig,
    ProtocolState, ReferralInfo, VotingRecord,
};
use anchor_lang::prelude::*;

pub fn protocol_state_key() -> RecordId {
    derive_key(PROTOCOL_STATE_SEED, &[])
}

pub fn protocol_config_key() -> RecordId {
    derive_key(PROTOCOL_CONFIG_SEED, &[])
}

/// Identity holding staked tokens.
pub fn vault_authority() -> Pubkey {
    derive_key(VAULT_SEED, &[])
}

/// Identity holding one inference's escrowed fee until it is paid out.
pub fn escrow_authority(inference_id: u64) -> Pubkey {
    derive_key(ESCROW_SEED, &[&inference_id.to_le_bytes()])
}

pub fn miner_key(miner: &Pubkey) -> RecordId {
    derive_key(MINER_SEED, &[&miner.to_bytes()])
}

pub fn model_key(model: &Pubkey) -> RecordId {
    derive_key(MODEL_SEED, &[&model.to_bytes()])
}

pub fn inference_key(inference_id: u64) -> RecordId {
    derive_key(INFERENCE_SEED, &[&inference_id.to_le_bytes()])
}

pub fn assignment_key(assignment_id: u64) -> RecordId {
    derive_key(ASSIGNMENT_SEED, &[&assignment_id.to_le_bytes()])
}

pub fn voting_key(inference_id: u64) -> RecordId {
    derive_key(VOTING_SEED, &[&inference_id.to_le_bytes()])
}

pub fn referral_key(referee: &Pubkey) -> RecordId {
    derive_key(REFERRAL_SEED, &[&referee.to_bytes()])
}

pub fn balance_key(asset: Asset, owner: &Pubkey) -> RecordId {
    derive_key(BALANCE_SEED, &[asset.seed(), &owner.to_bytes()])
}

pub fn payout_shard_key(shard: u64) -> RecordId {
    derive_key(PAYOUT_SHARD_SEED, &[&shard.to_le_bytes()])
}

/// Everything a handler may touch: the config snapshot, the signer, the
/// current slot, and one ledger transaction.
pub struct InstructionContext<'a> {
    pub config: &'a ProtocolConfig,
    pub signer: Pubkey,
    pub now: u64,
    pub tx: Transaction<'a>,
    events: Vec<ProtocolEvent>,
}

impl<'a> InstructionContext<'a> {
    pub fn new(
        config: &'a ProtocolConfig,
        signer: Pubkey,
        now: u64,
        store: &'a dyn LedgerStore,
    ) -> Self {
        Self {
            config,
            signer,
            now,
            tx: Transaction::new(store),
            events: Vec::new(),
        }
    }

    /// Buffers an event until the transaction commits.
    pub fn emit(&mut self, event: impl Into<ProtocolEvent>) {
        self.events.push(event.into());
    }

    pub fn into_parts(self) -> (ChangeSet, Vec<ProtocolEvent>) {
        (self.tx.into_change_set(), self.events)
    }

    pub fn require_admin(&self) -> Result<()> {
        require_keys_eq!(self.signer, self.config.admin, SolearnError::Unauthorized);
        Ok(())
    }

    /// Reward epoch of the current slot.
    pub fn current_epoch(&self) -> u64 {
        self.config.epoch_at(self.now)
    }

    pub fn load_state(&mut self) -> Result<ProtocolState> {
        self.tx
            .load_required(&protocol_state_key(), SolearnError::NotInitialized)
    }

    pub fn save_state(&mut self, state: &ProtocolState) -> Result<()> {
        self.tx.store(&protocol_state_key(), state)
    }

    pub fn try_load_miner(&mut self, miner: &Pubkey) -> Result<Option<MinerInfo>> {
        self.tx.load(&miner_key(miner))
    }

    pub fn load_miner(&mut self, miner: &Pubkey) -> Result<MinerInfo> {
        self.tx
            .load_required(&miner_key(miner), SolearnError::MinerNotRegistered)
    }

    pub fn save_miner(&mut self, miner: &MinerInfo) -> Result<()> {
        self.tx.store(&miner_key(&miner.miner), miner)
    }

    pub fn try_load_model(&mut self, model: &Pubkey) -> Result<Option<ModelInfo>> {
        self.tx.load(&model_key(model))
    }

    pub fn load_model(&mut self, model: &Pubkey) -> Result<ModelInfo> {
        self.tx
            .load_required(&model_key(model), SolearnError::ModelNotFound)
    }

    pub fn save_model(&mut self, model: &ModelInfo) -> Result<()> {
        self.tx.store(&model_key(&model.model), model)
    }

    pub fn remove_model(&mut self, model: &Pubkey) -> Result<()> {
        self.tx.remove(&model_key(model))
    }

    pub fn load_inference(&mut self, inference_id: u64) -> Result<Inference> {
        self.tx
            .load_required(&inference_key(inference_id), SolearnError::TaskNotFound)
    }

    pub fn save_inference(&mut self, inference: &Inference) -> Result<()> {
        self.tx.store(&inference_key(inference.id), inference)
    }

    pub fn load_assignment(&mut self, assignment_id: u64) -> Result<Assignment> {
        self.tx.load_required(
            &assignment_key(assignment_id),
            SolearnError::AssignmentNotFound,
        )
    }

    pub fn save_assignment(&mut self, assignment: &Assignment) -> Result<()> {
        self.tx.store(&assignment_key(assignment.id), assignment)
    }

    pub fn load_voting(&mut self, inference_id: u64) -> Result<VotingRecord> {
        self.tx
            .load_required(&voting_key(inference_id), SolearnError::TaskNotFound)
    }

    pub fn save_voting(&mut self, voting: &VotingRecord) -> Result<()> {
        self.tx.store(&voting_key(voting.inference_id), voting)
    }

    pub fn load_referral(&mut self, referee: &Pubkey) -> Result<Option<ReferralInfo>> {
        self.tx.load(&referral_key(referee))
    }

    pub fn save_referral(&mut self, referral: &ReferralInfo) -> Result<()> {
        self.tx.store(&referral_key(&referral.referee), referral)
    }

    /// Payout shard for `inference_id`, created empty on first use.
    pub fn load_payout_shard(&mut self, inference_id: u64) -> Result<PayoutShard> {
        let shard = inference_id % PAYOUT_SHARDS;
        Ok(self
            .tx
            .load(&payout_shard_key(shard))?
            .unwrap_or(PayoutShard { shard, settled: 0 }))
    }

    pub fn save_payout_shard(&mut self, shard: &PayoutShard) -> Result<()> {
        self.tx.store(&payout_shard_key(shard.shard), shard)
    }
}

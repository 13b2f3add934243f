//! Shared fixture for the protocol integration tests.

#![allow(dead_code)]

use anchor_lang::prelude::Pubkey;
use solearn::clock::ManualClock;
use solearn::ledger::MemoryLedger;
use solearn::state::{Asset, AssignmentRole, AssignmentSlot, ProtocolConfig, DENOMINATION};
use solearn::utils::commitment::commitment_hash;
use solearn::Solearn;
use std::sync::Arc;

pub type Protocol = Solearn<MemoryLedger, Arc<ManualClock>>;

pub const STAKE: u64 = 25_000 * DENOMINATION;
pub const FEE: u64 = 100_000;
pub const START_SLOT: u64 = 1_000;

pub fn key(byte: u8) -> Pubkey {
    Pubkey::new_from_array([byte; 32])
}

pub struct Harness {
    pub protocol: Protocol,
    pub clock: Arc<ManualClock>,
    pub admin: Pubkey,
    pub treasury: Pubkey,
    pub l2_owner: Pubkey,
    pub model: Pubkey,
    pub requester: Pubkey,
    pub miners: Vec<Pubkey>,
}

pub fn test_config() -> ProtocolConfig {
    let mut config = ProtocolConfig::with_admin(key(1), key(2), key(3));
    config.min_fee_to_use = 1_000;
    config
}

impl Harness {
    /// Initialized protocol with one model served by `miner_count` staked miners.
    pub fn new(miner_count: u8) -> Self {
        Self::with_config(test_config(), miner_count)
    }

    pub fn with_config(config: ProtocolConfig, miner_count: u8) -> Self {
        let clock = Arc::new(ManualClock::new(START_SLOT));
        let admin = config.admin;
        let treasury = config.treasury;
        let l2_owner = config.l2_owner;
        let protocol =
            Solearn::initialize(MemoryLedger::new(), Arc::clone(&clock), admin, config).unwrap();

        let model = key(10);
        protocol.add_model(admin, model).unwrap();

        let miners: Vec<Pubkey> = (0..miner_count).map(|i| key(100 + i)).collect();
        for miner in &miners {
            protocol
                .credit_wallet(admin, Asset::StakeToken, *miner, STAKE)
                .unwrap();
            protocol.register(*miner, STAKE).unwrap();
            assert!(protocol.join(*miner, model).unwrap());
        }

        let requester = key(50);
        protocol
            .credit_wallet(admin, Asset::Native, requester, FEE * 10)
            .unwrap();

        Self {
            protocol,
            clock,
            admin,
            treasury,
            l2_owner,
            model,
            requester,
            miners,
        }
    }

    pub fn submit(&self) -> u64 {
        self.protocol
            .submit_task(self.requester, self.model, b"prompt".to_vec(), FEE)
            .unwrap()
    }

    pub fn miner_slot(&self, inference_id: u64) -> AssignmentSlot {
        *self
            .protocol
            .inference(inference_id)
            .unwrap()
            .unwrap()
            .miner_slot()
            .unwrap()
    }

    pub fn validator_slots(&self, inference_id: u64) -> Vec<AssignmentSlot> {
        self.protocol
            .inference(inference_id)
            .unwrap()
            .unwrap()
            .slots
            .into_iter()
            .filter(|slot| slot.role == AssignmentRole::Validator)
            .collect()
    }

    /// Seize and submit the miner's solution.
    pub fn mine(&self, inference_id: u64, solution: &[u8]) -> AssignmentSlot {
        let slot = self.miner_slot(inference_id);
        self.protocol.seize_role(slot.worker, slot.id).unwrap();
        self.protocol
            .submit_solution(slot.worker, slot.id, solution.to_vec())
            .unwrap();
        slot
    }

    /// Seize and commit to `solution`. Returns the nonce used.
    pub fn commit(&self, slot: &AssignmentSlot, solution: &[u8]) -> u64 {
        let nonce = slot.id * 7 + 13;
        self.protocol.seize_role(slot.worker, slot.id).unwrap();
        self.protocol
            .commit(slot.worker, slot.id, commitment_hash(nonce, &slot.worker, solution))
            .unwrap();
        nonce
    }

    pub fn reveal(&self, slot: &AssignmentSlot, nonce: u64, solution: &[u8]) {
        self.protocol
            .reveal(slot.worker, slot.id, nonce, solution.to_vec())
            .unwrap();
    }

    /// Run a full round where validator `i` reveals `answers[i]`.
    pub fn round(&self, miner_answer: &[u8], answers: &[&[u8]]) -> u64 {
        let inference_id = self.submit();
        self.mine(inference_id, miner_answer);
        let validators = self.validator_slots(inference_id);
        let nonces: Vec<u64> = validators
            .iter()
            .zip(answers)
            .map(|(slot, answer)| self.commit(slot, answer))
            .collect();
        for ((slot, nonce), answer) in validators.iter().zip(nonces).zip(answers) {
            self.reveal(slot, nonce, answer);
        }
        inference_id
    }

    /// Deposit tokens from outside the protocol.
    pub fn credit(&self, asset: Asset, owner: Pubkey, amount: u64) {
        self.protocol
            .credit_wallet(self.admin, asset, owner, amount)
            .unwrap();
    }

    pub fn native(&self, owner: &Pubkey) -> u64 {
        self.protocol.balance(Asset::Native, owner).unwrap()
    }

    pub fn stake_of(&self, miner: &Pubkey) -> u64 {
        self.protocol.miner(miner).unwrap().unwrap().stake
    }
}

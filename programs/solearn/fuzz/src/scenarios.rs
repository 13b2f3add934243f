//! Fuzz testing scenarios that drive the protocol over an in-memory ledger
//!
//! Each scenario builds a fresh protocol instance, runs a sequence of
//! instructions against it, and checks invariants on the resulting ledger.

use crate::arbitrary::*;
use crate::invariants::*;
use anchor_lang::error::Error;
use anchor_lang::prelude::Pubkey;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use solearn::clock::{ManualClock, SlotClock};
use solearn::errors::SolearnError;
use solearn::instructions::consensus_helpers::consensus_threshold;
use solearn::ledger::MemoryLedger;
use solearn::state::{
    Asset, AssignmentRole, AssignmentSlot, MinerInfo, ProtocolConfig, DENOMINATION,
};
use solearn::utils::commitment::commitment_hash;
use solearn::Solearn;
use std::sync::Arc;
use tracing::debug;

pub type FuzzProtocol = Solearn<MemoryLedger, Arc<ManualClock>>;

/// Default miner minimum stake
pub const MINER_STAKE: u64 = 25_000 * DENOMINATION;

/// Deterministic identity: `tag` fills the key, `index` tells siblings apart.
pub fn key(tag: u8, index: u8) -> Pubkey {
    let mut bytes = [tag; 32];
    bytes[31] = index;
    Pubkey::new_from_array(bytes)
}

pub fn is_error(err: &Error, expected: SolearnError) -> bool {
    *err == Error::from(expected)
}

/// Fuzz configuration: default economics, cheap inferences.
pub fn fuzz_config() -> ProtocolConfig {
    let mut config = ProtocolConfig::with_admin(key(1, 0), key(2, 0), key(3, 0));
    config.min_fee_to_use = 1;
    config
}

/// Result of a simulated scenario
#[derive(Debug, Clone)]
pub enum SimulationResult {
    Success,
    Error(String),
    InvariantViolation(String),
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SimulationResult::Success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SimulationResult::Error(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SimulationResult::InvariantViolation(_))
    }
}

macro_rules! violation {
    ($($arg:tt)*) => {
        return SimulationResult::InvariantViolation(format!($($arg)*))
    };
}

macro_rules! ensure_valid {
    ($check:expr, $valid:path) => {
        let result = $check;
        if result != $valid {
            violation!("{:?}", result);
        }
    };
}

/// A protocol instance with one model served by freshly staked miners.
pub struct Scenario {
    pub protocol: FuzzProtocol,
    pub clock: Arc<ManualClock>,
    pub config: ProtocolConfig,
    pub model: Pubkey,
    pub miners: Vec<Pubkey>,
    /// Stake tokens credited from outside the protocol
    pub stake_minted: u64,
}

impl Scenario {
    pub fn new(config: ProtocolConfig, miner_count: u8, stake: u64) -> Result<Self, String> {
        let clock = Arc::new(ManualClock::new(1));
        let protocol = Solearn::initialize(
            MemoryLedger::new(),
            Arc::clone(&clock),
            config.admin,
            config.clone(),
        )
        .map_err(|e| e.to_string())?;

        let model = key(0x10, 0);
        protocol
            .add_model(config.admin, model)
            .map_err(|e| e.to_string())?;

        let mut scenario = Self {
            protocol,
            clock,
            config,
            model,
            miners: Vec::new(),
            stake_minted: 0,
        };
        for index in 0..miner_count {
            let miner = key(0x20, index);
            scenario.mint_stake(miner, stake)?;
            scenario
                .protocol
                .register(miner, stake)
                .map_err(|e| e.to_string())?;
            scenario
                .protocol
                .join(miner, model)
                .map_err(|e| e.to_string())?;
            scenario.miners.push(miner);
        }
        Ok(scenario)
    }

    pub fn mint_stake(&mut self, owner: Pubkey, amount: u64) -> Result<(), String> {
        self.protocol
            .credit_wallet(self.config.admin, Asset::StakeToken, owner, amount)
            .map_err(|e| e.to_string())?;
        self.stake_minted = self
            .stake_minted
            .checked_add(amount)
            .ok_or_else(|| "stake supply overflow".to_string())?;
        Ok(())
    }

    pub fn miner(&self, miner: &Pubkey) -> Option<MinerInfo> {
        self.protocol.miner(miner).ok().flatten()
    }

    fn balance(&self, asset: Asset, owner: &Pubkey) -> u64 {
        self.protocol.balance(asset, owner).unwrap_or(0)
    }

    /// Stake invariants across every miner, the vault and the treasury.
    pub fn check_stake(&self) -> Option<String> {
        let records: Vec<MinerInfo> = self.miners.iter().filter_map(|m| self.miner(m)).collect();
        for record in &records {
            let result = check_miner_record(record);
            if result != StakeInvariantResult::Valid {
                return Some(format!("{:?} for {}", result, record.miner));
            }
        }

        let vault = self.protocol.vault_balance(Asset::StakeToken).unwrap_or(0);
        let result = check_stake_vault(vault, &records);
        if result != StakeInvariantResult::Valid {
            return Some(format!("{:?}", result));
        }

        let mut balances = vec![vault, self.balance(Asset::StakeToken, &self.config.treasury)];
        balances.extend(
            self.miners
                .iter()
                .map(|m| self.balance(Asset::StakeToken, m)),
        );
        let result = check_stake_supply(self.stake_minted, &balances);
        if result != StakeInvariantResult::Valid {
            return Some(format!("{:?}", result));
        }
        None
    }
}

// ============================================================================
// Stake Lifecycle
// ============================================================================

/// Run a sequence of stake operations for one miner, checking stake
/// invariants after every step.
pub fn simulate_stake_lifecycle(input: &StakeLifecycleInput) -> SimulationResult {
    let mut config = fuzz_config();
    config.fine_percentage = input.fine_percentage;
    config.miner_requirement = 1;
    let delay = config.unstake_delay;
    let admin = config.admin;

    let mut scenario = match Scenario::new(config, 1, input.initial_stake) {
        Ok(scenario) => scenario,
        Err(e) => return SimulationResult::Error(e),
    };
    let miner = scenario.miners[0];

    for op in &input.ops {
        match op {
            StakeOp::TopUp(amount) => {
                if let Err(e) = scenario.mint_stake(miner, *amount) {
                    return SimulationResult::Error(e);
                }
                let _ = scenario.protocol.top_up(miner, *amount);
            }
            StakeOp::RequestUnstake(amount) => {
                let _ = scenario.protocol.request_unstake(miner, *amount);
            }
            StakeOp::Claim => {
                let Some(before) = scenario.miner(&miner) else {
                    violation!("registered miner record disappeared");
                };
                let now = scenario.clock.now();
                if let Ok(claimed) = scenario.protocol.claim_unstaked(miner) {
                    ensure_valid!(
                        check_claim_timing(now, before.unstake_requested_at, delay),
                        StakeInvariantResult::Valid
                    );
                    if claimed != before.pending_unstake {
                        violation!(
                            "claimed {} but {} was pending",
                            claimed,
                            before.pending_unstake
                        );
                    }
                }
            }
            StakeOp::Advance(slots) => {
                scenario.clock.advance(*slots);
            }
            StakeOp::AdminSlash { fined } => {
                if let Err(e) = scenario.protocol.slash_miner_by_admin(admin, miner, *fined) {
                    violation!("admin slash rejected: {}", e);
                }
            }
            StakeOp::Rejoin => {
                if let Ok(true) = scenario.protocol.join(miner, scenario.model) {
                    let Some(record) = scenario.miner(&miner) else {
                        violation!("registered miner record disappeared");
                    };
                    if !record.is_eligible(scenario.config.miner_minimum_stake, scenario.clock.now())
                    {
                        violation!("ineligible miner joined a model: {:?}", record);
                    }
                }
            }
        }

        if let Some(violation) = scenario.check_stake() {
            debug!(?op, %violation, "stake invariant violated");
            return SimulationResult::InvariantViolation(violation);
        }
    }

    SimulationResult::Success
}

// ============================================================================
// Inference Round
// ============================================================================

/// Run one inference from submission to payout with arbitrary participant
/// behavior, then check consensus and settlement invariants.
pub fn simulate_inference_round(input: &InferenceRoundInput) -> SimulationResult {
    let mut config = fuzz_config();
    config.miner_requirement = input.miner_requirement;
    config.fee_l2_percentage = input.fee_l2_percentage;
    config.fee_treasury_percentage = input.fee_treasury_percentage;
    config.fee_ratio_miner_validator = input.fee_ratio_miner_validator;
    config.dao_token_reward = input.dao_token_reward;
    if let Err(e) = config.validate() {
        return SimulationResult::Error(e.to_string());
    }

    let scenario = match Scenario::new(config, input.miner_count, MINER_STAKE) {
        Ok(scenario) => scenario,
        Err(e) => return SimulationResult::Error(e),
    };
    let protocol = &scenario.protocol;
    let requester = key(0x30, 0);
    if let Err(e) =
        protocol.credit_wallet(scenario.config.admin, Asset::Native, requester, input.fee)
    {
        return SimulationResult::Error(e.to_string());
    }
    if input.with_referrer {
        if let Err(e) = protocol.set_referrer(requester, key(0x31, 0)) {
            violation!("set_referrer rejected: {}", e);
        }
    }

    let inference_id = match protocol.submit_task(requester, scenario.model, b"fuzz".to_vec(), input.fee)
    {
        Ok(id) => id,
        Err(e) => return SimulationResult::Error(e.to_string()),
    };
    let Ok(Some(inference)) = protocol.inference(inference_id) else {
        violation!("submitted inference {} not stored", inference_id);
    };
    if inference.slots.len() != input.miner_requirement as usize {
        violation!(
            "{} assignments for a requirement of {}",
            inference.slots.len(),
            input.miner_requirement
        );
    }
    let threshold = consensus_threshold(inference.slots.len());

    let Some(miner_slot) = inference.miner_slot().copied() else {
        violation!("inference {} has no miner", inference_id);
    };
    let mut validators: Vec<AssignmentSlot> = inference
        .slots
        .iter()
        .filter(|s| s.role == AssignmentRole::Validator)
        .copied()
        .collect();
    validators.shuffle(&mut StdRng::seed_from_u64(input.order_seed));

    if input.miner_submits {
        let output = if input.miner_dissents {
            &input.alternative
        } else {
            &input.solution
        };
        if let Err(e) = protocol
            .seize_role(miner_slot.worker, miner_slot.id)
            .and_then(|_| protocol.submit_solution(miner_slot.worker, miner_slot.id, output.clone()))
        {
            violation!("in-time miner submission rejected: {}", e);
        }

        let mut committed = Vec::new();
        for (index, slot) in validators.iter().enumerate() {
            let behavior = input.validators[index % input.validators.len()];
            let answer = match behavior {
                ValidatorBehavior::Silent => continue,
                ValidatorBehavior::Dissent => &input.alternative,
                ValidatorBehavior::Honest | ValidatorBehavior::CommitOnly => &input.solution,
            };
            let nonce = input.order_seed.wrapping_add(slot.id);
            let commitment = commitment_hash(nonce, &slot.worker, answer);
            if let Err(e) = protocol
                .seize_role(slot.worker, slot.id)
                .and_then(|_| protocol.commit(slot.worker, slot.id, commitment))
            {
                violation!("in-time commitment rejected: {}", e);
            }
            committed.push((*slot, nonce, answer, behavior));
        }

        if committed.len() < validators.len() {
            scenario.clock.set(inference.commit_timeout + 1);
        }
        for (slot, nonce, answer, behavior) in committed {
            if behavior == ValidatorBehavior::CommitOnly {
                continue;
            }
            if let Err(e) = protocol.reveal(slot.worker, slot.id, nonce, answer.clone()) {
                violation!("valid reveal rejected: {}", e);
            }
        }
    }

    scenario.clock.set(inference.reveal_timeout + 1);
    let outcome = match protocol.resolve(requester, inference_id) {
        Ok(outcome) => outcome,
        Err(e) => violation!("resolution after every deadline rejected: {}", e),
    };
    let Ok(Some(voting)) = protocol.voting(inference_id) else {
        violation!("voting record for {} missing", inference_id);
    };
    ensure_valid!(
        check_reveals_within_commits(voting.total_commit, voting.total_reveal),
        ConsensusInvariantResult::Valid
    );
    ensure_valid!(
        check_accepted_threshold(outcome, voting.agree_count, threshold),
        ConsensusInvariantResult::Valid
    );

    for slot in &inference.slots {
        if protocol.pay_miner(requester, slot.id).is_ok() {
            let repeat = protocol.pay_miner(requester, slot.id);
            ensure_valid!(
                check_single_payout(slot.id, repeat.is_ok()),
                SettlementInvariantResult::Valid
            );
        }
    }

    let native = |owner: &Pubkey| protocol.balance(Asset::Native, owner).unwrap_or(0);
    let refunded = native(&requester);
    ensure_valid!(
        check_refund(outcome, refunded, input.fee),
        ConsensusInvariantResult::Valid
    );
    ensure_valid!(
        check_vault_drained(protocol.vault_balance(Asset::Native).unwrap_or(0)),
        SettlementInvariantResult::Valid
    );

    let mut destinations = vec![
        refunded,
        native(&scenario.config.treasury),
        native(&scenario.config.l2_owner),
    ];
    destinations.extend(scenario.miners.iter().map(|m| native(m)));
    ensure_valid!(
        check_fee_conservation(input.fee, &destinations),
        SettlementInvariantResult::Valid
    );
    ensure_valid!(
        check_task_count_settled(protocol.task_count().unwrap_or(u64::MAX)),
        SettlementInvariantResult::Valid
    );

    if let Some(violation) = scenario.check_stake() {
        return SimulationResult::InvariantViolation(violation);
    }

    debug!(inference_id, ?outcome, agree_count = voting.agree_count, "round settled");
    SimulationResult::Success
}

// ============================================================================
// Reveal Tampering
// ============================================================================

/// A reveal that differs from the commitment in a single bit of either the
/// nonce or the solution must be rejected; the untouched reveal must pass.
pub fn simulate_tampered_reveal(input: &TamperedRevealInput) -> SimulationResult {
    let scenario = match Scenario::new(fuzz_config(), 3, MINER_STAKE) {
        Ok(scenario) => scenario,
        Err(e) => return SimulationResult::Error(e),
    };
    let protocol = &scenario.protocol;
    let requester = key(0x30, 0);
    let fee = 1_000;

    let setup = protocol
        .credit_wallet(scenario.config.admin, Asset::Native, requester, fee)
        .and_then(|_| protocol.submit_task(requester, scenario.model, b"fuzz".to_vec(), fee));
    let inference_id = match setup {
        Ok(id) => id,
        Err(e) => return SimulationResult::Error(e.to_string()),
    };
    let Ok(Some(inference)) = protocol.inference(inference_id) else {
        violation!("submitted inference {} not stored", inference_id);
    };
    let Some(miner) = inference.miner_slot().copied() else {
        violation!("inference {} has no miner", inference_id);
    };
    let validators: Vec<AssignmentSlot> = inference
        .slots
        .iter()
        .filter(|s| s.role == AssignmentRole::Validator)
        .copied()
        .collect();

    let committed = protocol
        .seize_role(miner.worker, miner.id)
        .and_then(|_| protocol.submit_solution(miner.worker, miner.id, input.solution.clone()))
        .and_then(|_| {
            validators.iter().try_for_each(|slot| {
                protocol.seize_role(slot.worker, slot.id)?;
                protocol.commit(
                    slot.worker,
                    slot.id,
                    commitment_hash(input.nonce, &slot.worker, &input.solution),
                )
            })
        });
    if let Err(e) = committed {
        violation!("honest commit round rejected: {}", e);
    }

    let target = validators[0];
    let (nonce, solution) = if input.tamper_nonce {
        (input.nonce ^ (1u64 << (input.bit % 64)), input.solution.clone())
    } else {
        let bit = input.bit as usize % (input.solution.len() * 8);
        let mut solution = input.solution.clone();
        solution[bit / 8] ^= 1 << (bit % 8);
        (input.nonce, solution)
    };

    let tampered = protocol.reveal(target.worker, target.id, nonce, solution);
    ensure_valid!(
        check_tampered_reveal_rejected(tampered.is_ok()),
        ConsensusInvariantResult::Valid
    );
    if let Err(e) = &tampered {
        if !is_error(e, SolearnError::CommitmentMismatch) {
            violation!("tampered reveal failed with {} instead of a mismatch", e);
        }
    }

    if let Err(e) = protocol.reveal(target.worker, target.id, input.nonce, input.solution.clone()) {
        violation!("untampered reveal rejected after a failed attempt: {}", e);
    }
    SimulationResult::Success
}

// ============================================================================
// Concurrency
// ============================================================================

/// Several threads race to seize the same assignment. Exactly one wins and
/// the rest see either the seized phase or an optimistic conflict.
pub fn simulate_concurrent_seizure(threads: usize) -> SimulationResult {
    let scenario = match Scenario::new(fuzz_config(), 3, MINER_STAKE) {
        Ok(scenario) => scenario,
        Err(e) => return SimulationResult::Error(e),
    };
    let protocol = &scenario.protocol;
    let requester = key(0x30, 0);
    let setup = protocol
        .credit_wallet(scenario.config.admin, Asset::Native, requester, 1_000)
        .and_then(|_| protocol.submit_task(requester, scenario.model, b"race".to_vec(), 1_000));
    let inference_id = match setup {
        Ok(id) => id,
        Err(e) => return SimulationResult::Error(e.to_string()),
    };
    let Some(slot) = protocol
        .inference(inference_id)
        .ok()
        .flatten()
        .and_then(|inference| inference.miner_slot().copied())
    else {
        violation!("inference {} has no miner", inference_id);
    };

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| scope.spawn(|| protocol.seize_role(slot.worker, slot.id)))
            .collect();
        handles.into_iter().filter_map(|h| h.join().ok()).collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    if winners != 1 {
        violation!("{} threads seized the same assignment", winners);
    }
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        if !is_error(err, SolearnError::AlreadySeized) && !is_error(err, SolearnError::Conflict) {
            violation!("unexpected race error: {}", err);
        }
    }
    SimulationResult::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_succeeds() {
        let input = InferenceRoundInput {
            miner_count: 3,
            miner_requirement: 3,
            fee: 100_000,
            fee_l2_percentage: 0,
            fee_treasury_percentage: 1_000,
            fee_ratio_miner_validator: 5_000,
            dao_token_reward: 0,
            with_referrer: false,
            miner_submits: true,
            miner_dissents: false,
            validators: vec![ValidatorBehavior::Honest; 6],
            solution: b"answer".to_vec(),
            alternative: b"other".to_vec(),
            order_seed: 7,
        };
        let result = simulate_inference_round(&input);
        assert!(result.is_success(), "{:?}", result);
    }

    #[test]
    fn test_under_staffed_round_is_error() {
        let input = InferenceRoundInput {
            miner_count: 2,
            miner_requirement: 3,
            fee: 100_000,
            fee_l2_percentage: 0,
            fee_treasury_percentage: 0,
            fee_ratio_miner_validator: 5_000,
            dao_token_reward: 0,
            with_referrer: false,
            miner_submits: true,
            miner_dissents: false,
            validators: vec![ValidatorBehavior::Honest; 6],
            solution: b"answer".to_vec(),
            alternative: b"other".to_vec(),
            order_seed: 0,
        };
        assert!(simulate_inference_round(&input).is_error());
    }

    #[test]
    fn test_single_bit_reveal_tampering() {
        for tamper_nonce in [true, false] {
            let input = TamperedRevealInput {
                solution: b"answer".to_vec(),
                nonce: 42,
                bit: 3,
                tamper_nonce,
            };
            let result = simulate_tampered_reveal(&input);
            assert!(result.is_success(), "{:?}", result);
        }
    }

    #[test]
    fn test_concurrent_seizure() {
        let result = simulate_concurrent_seizure(8);
        assert!(result.is_success(), "{:?}", result);
    }
}

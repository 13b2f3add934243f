#![allow(unexpected_cfgs)]
//! Solearn Inference Marketplace Protocol
//!
//! Matches inference requests against a pool of staked miners, assigns one
//! lead miner and a set of validators per request, and settles payment once
//! the validators corroborate the miner's solution through commit-reveal.
//!
//! Every public method on [`Solearn`] is one instruction: it runs against a
//! snapshot of the [`ProtocolConfig`], reads and writes the ledger through a
//! single optimistic transaction, and publishes its events only if that
//! transaction commits.

use anchor_lang::prelude::*;

declare_id!("7MHr6ZPGTWZkRk6m52GfEWoMxSV7EoDjYyoXAYf3MBwS");

pub mod clock;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod ledger;
pub mod state;
pub mod utils;

use crate::clock::SlotClock;
use crate::context::{protocol_config_key, InstructionContext};
use crate::errors::SolearnError;
use crate::events::ProtocolEvent;
use crate::instructions::constants::PAYOUT_SHARDS;
use crate::instructions::epoch_helpers::settle_epoch_reward;
use crate::instructions::token_helpers;
use crate::ledger::{LedgerStore, Transaction};
use crate::state::{
    Asset, Assignment, Inference, MinerInfo, ModelInfo, PayoutShard, ProtocolConfig,
    ProtocolState, Resolution, VotingRecord, HASH_SIZE,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info};

/// Protocol facade over a ledger and a slot clock.
pub struct Solearn<S: LedgerStore, C: SlotClock> {
    store: S,
    clock: C,
    config: RwLock<Arc<ProtocolConfig>>,
    events: Mutex<Vec<ProtocolEvent>>,
}

impl<S: LedgerStore, C: SlotClock> Solearn<S, C> {
    /// Create the protocol state in an empty ledger.
    /// `admin` must match `config.admin`.
    pub fn initialize(store: S, clock: C, admin: Pubkey, config: ProtocolConfig) -> Result<Self> {
        let protocol = Self {
            store,
            clock,
            config: RwLock::new(Arc::new(config)),
            events: Mutex::new(Vec::new()),
        };
        protocol.execute(admin, "initialize", instructions::initialize_protocol::handler)?;
        Ok(protocol)
    }

    /// Open a ledger that was already initialized, loading its stored
    /// configuration.
    pub fn attach(store: S, clock: C) -> Result<Self> {
        let config: ProtocolConfig = Transaction::new(&store)
            .load_required(&protocol_config_key(), SolearnError::NotInitialized)?;
        Ok(Self {
            store,
            clock,
            config: RwLock::new(Arc::new(config)),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Runs `handler` as one transaction and publishes its events on commit.
    fn execute<T>(
        &self,
        signer: Pubkey,
        instruction: &'static str,
        handler: impl FnOnce(&mut InstructionContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let config: Arc<ProtocolConfig> = Arc::clone(&*self.config.read());
        self.run(&config, signer, instruction, handler)
    }

    fn run<T>(
        &self,
        config: &ProtocolConfig,
        signer: Pubkey,
        instruction: &'static str,
        handler: impl FnOnce(&mut InstructionContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let now = self.clock.now();
        debug!(instruction, %signer, slot = now, "executing instruction");

        let mut ctx = InstructionContext::new(config, signer, now, &self.store);
        let output = handler(&mut ctx).map_err(|e| {
            debug!(instruction, %signer, error = %e, "instruction rejected");
            e
        })?;

        let (changes, events) = ctx.into_parts();
        self.store.commit(changes).map_err(|e| {
            debug!(instruction, %signer, error = %e, "commit failed");
            e
        })?;
        self.publish(events);
        Ok(output)
    }

    fn publish(&self, events: Vec<ProtocolEvent>) {
        for event in &events {
            info!(event = event.name(), details = ?event, "protocol event");
        }
        self.events.lock().extend(events);
    }

    fn query<T>(&self, read: impl FnOnce(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut tx = Transaction::new(&self.store);
        read(&mut tx)
    }

    // ========================================================================
    // Admin
    // ========================================================================

    /// Replace the configuration. The new config is validated, stored, and
    /// audited by bumping `ProtocolState::config_version`. Returns the new
    /// version.
    pub fn update_config(&self, admin: Pubkey, new_config: ProtocolConfig) -> Result<u64> {
        let mut current = self.config.write();
        let snapshot: Arc<ProtocolConfig> = Arc::clone(&*current);
        let version = self.run(&snapshot, admin, "update_config", |ctx| {
            instructions::update_config::handler(ctx, &new_config)
        })?;
        *current = Arc::new(new_config);
        Ok(version)
    }

    /// Approve a model id for inference.
    pub fn add_model(&self, admin: Pubkey, model: Pubkey) -> Result<()> {
        self.execute(admin, "add_model", |ctx| {
            instructions::add_model::handler(ctx, model)
        })
    }

    /// Withdraw a model. In-flight inferences still settle.
    pub fn remove_model(&self, admin: Pubkey, model: Pubkey) -> Result<()> {
        self.execute(admin, "remove_model", |ctx| {
            instructions::remove_model::handler(ctx, model)
        })
    }

    /// Penalize a miner out of band, optionally fining it. Returns the fine.
    pub fn slash_miner_by_admin(&self, admin: Pubkey, miner: Pubkey, is_fined: bool) -> Result<u64> {
        self.execute(admin, "slash_miner", |ctx| {
            instructions::slash_miner::handler(ctx, miner, is_fined)
        })
    }

    /// Credit an external wallet, as the host does when tokens are
    /// deposited from outside the protocol. Admin only.
    pub fn credit_wallet(
        &self,
        admin: Pubkey,
        asset: Asset,
        owner: Pubkey,
        amount: u64,
    ) -> Result<()> {
        self.execute(admin, "credit_wallet", |ctx| {
            ctx.require_admin()?;
            token_helpers::mint_to(&mut ctx.tx, asset, &owner, amount)
        })
    }

    // ========================================================================
    // Stake registry
    // ========================================================================

    /// Stake at least the miner minimum and register (or re-register).
    pub fn register(&self, miner: Pubkey, amount: u64) -> Result<()> {
        self.execute(miner, "register", |ctx| {
            instructions::register_miner::handler(ctx, amount)
        })
    }

    pub fn top_up(&self, miner: Pubkey, amount: u64) -> Result<()> {
        self.execute(miner, "top_up", |ctx| {
            instructions::topup_stake::handler(ctx, amount)
        })
    }

    pub fn request_unstake(&self, miner: Pubkey, amount: u64) -> Result<()> {
        self.execute(miner, "request_unstake", |ctx| {
            instructions::request_unstake::handler(ctx, amount)
        })
    }

    /// Withdraw the pending bucket once the unstake delay has passed.
    pub fn claim_unstaked(&self, miner: Pubkey) -> Result<u64> {
        self.execute(miner, "claim_unstaked", instructions::claim_unstaked::handler)
    }

    pub fn set_reward_wallet(&self, miner: Pubkey, wallet: Pubkey) -> Result<()> {
        self.execute(miner, "set_reward_wallet", |ctx| {
            instructions::set_reward_wallet::handler(ctx, wallet)
        })
    }

    // ========================================================================
    // Block rewards
    // ========================================================================

    /// Move the epoch cursor to the current slot's epoch. Permissionless.
    pub fn update_epoch(&self, caller: Pubkey) -> Result<u64> {
        self.execute(caller, "update_epoch", instructions::update_epoch::handler)
    }

    /// Mint accrued block rewards to the miner's reward wallet.
    pub fn claim_reward(&self, miner: Pubkey) -> Result<u64> {
        self.execute(miner, "claim_reward", instructions::claim_reward::handler)
    }

    // ========================================================================
    // Model registry
    // ========================================================================

    /// Join a model's miner pool. Returns false if already a member.
    pub fn join(&self, miner: Pubkey, model: Pubkey) -> Result<bool> {
        self.execute(miner, "join", |ctx| {
            instructions::join_model::handler(ctx, model)
        })
    }

    pub fn leave(&self, miner: Pubkey, model: Pubkey) -> Result<()> {
        self.execute(miner, "leave", |ctx| {
            instructions::leave_model::handler(ctx, model)
        })
    }

    pub fn set_referrer(&self, user: Pubkey, referrer: Pubkey) -> Result<()> {
        self.execute(user, "set_referrer", |ctx| {
            instructions::set_referrer::handler(ctx, referrer)
        })
    }

    // ========================================================================
    // Task scheduler
    // ========================================================================

    /// Submit an inference request. Returns the new inference id.
    pub fn submit_task(
        &self,
        requester: Pubkey,
        model: Pubkey,
        input: Vec<u8>,
        fee: u64,
    ) -> Result<u64> {
        self.execute(requester, "submit_task", |ctx| {
            instructions::submit_task::handler(ctx, model, input, fee)
        })
    }

    pub fn top_up_task(&self, payer: Pubkey, inference_id: u64, amount: u64) -> Result<()> {
        self.execute(payer, "top_up_task", |ctx| {
            instructions::top_up_task::handler(ctx, inference_id, amount)
        })
    }

    /// Materialize a planned assignment. Returns false when it already exists.
    pub fn create_assignment(
        &self,
        signer: Pubkey,
        inference_id: u64,
        assignment_id: u64,
    ) -> Result<bool> {
        self.execute(signer, "create_assignment", |ctx| {
            instructions::create_assignment::handler(ctx, inference_id, assignment_id)
        })
    }

    // ========================================================================
    // Consensus
    // ========================================================================

    pub fn seize_role(&self, worker: Pubkey, assignment_id: u64) -> Result<()> {
        self.execute(worker, "seize_role", |ctx| {
            instructions::seize_role::handler(ctx, assignment_id)
        })
    }

    pub fn submit_solution(&self, miner: Pubkey, assignment_id: u64, solution: Vec<u8>) -> Result<()> {
        self.execute(miner, "submit_solution", |ctx| {
            instructions::submit_solution::handler(ctx, assignment_id, solution)
        })
    }

    pub fn commit(
        &self,
        validator: Pubkey,
        assignment_id: u64,
        commitment: [u8; HASH_SIZE],
    ) -> Result<()> {
        self.execute(validator, "commit", |ctx| {
            instructions::commit::handler(ctx, assignment_id, commitment)
        })
    }

    pub fn reveal(
        &self,
        validator: Pubkey,
        assignment_id: u64,
        nonce: u64,
        solution: Vec<u8>,
    ) -> Result<()> {
        self.execute(validator, "reveal", |ctx| {
            instructions::reveal::handler(ctx, assignment_id, nonce, solution)
        })
    }

    /// Resolve an inference. Permissionless once the inference is ready.
    pub fn resolve(&self, caller: Pubkey, inference_id: u64) -> Result<Resolution> {
        self.execute(caller, "resolve", |ctx| {
            instructions::resolve_inference::handler(ctx, inference_id)
        })
    }

    // ========================================================================
    // Settlement
    // ========================================================================

    /// Pay an approved assignment. Returns the native amount paid.
    pub fn pay_miner(&self, caller: Pubkey, assignment_id: u64) -> Result<u64> {
        self.execute(caller, "pay_miner", |ctx| {
            instructions::pay_miner::handler(ctx, assignment_id)
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> Arc<ProtocolConfig> {
        Arc::clone(&*self.config.read())
    }

    pub fn protocol_state(&self) -> Result<ProtocolState> {
        self.query(|tx| {
            tx.load_required(&context::protocol_state_key(), SolearnError::NotInitialized)
        })
    }

    /// Assignments not yet paid or closed without payment.
    pub fn task_count(&self) -> Result<u64> {
        self.query(|tx| {
            let state: ProtocolState =
                tx.load_required(&context::protocol_state_key(), SolearnError::NotInitialized)?;
            let mut open = state.task_count;
            for shard in 0..PAYOUT_SHARDS {
                let settled = tx
                    .load::<PayoutShard>(&context::payout_shard_key(shard))?
                    .map(|s| s.settled)
                    .unwrap_or(0);
                open = open
                    .checked_sub(settled)
                    .ok_or(SolearnError::ArithmeticOverflow)?;
            }
            Ok(open)
        })
    }

    pub fn next_inference_id(&self) -> Result<u64> {
        Ok(self.protocol_state()?.next_inference_id)
    }

    pub fn next_assignment_id(&self) -> Result<u64> {
        Ok(self.protocol_state()?.next_assignment_id)
    }

    /// Epoch the cursor was last advanced to.
    pub fn next_epoch_id(&self) -> Result<u64> {
        Ok(self.protocol_state()?.current_epoch)
    }

    /// Block rewards `miner` could claim at the current slot.
    pub fn pending_reward(&self, miner: &Pubkey) -> Result<u64> {
        let config = self.config();
        let epoch = config.epoch_at(self.clock.now());
        self.query(|tx| {
            let mut info: MinerInfo =
                tx.load_required(&context::miner_key(miner), SolearnError::MinerNotRegistered)?;
            settle_epoch_reward(&mut info, epoch, config.reward_per_epoch)?;
            Ok(info.accrued_reward)
        })
    }

    pub fn miner(&self, miner: &Pubkey) -> Result<Option<MinerInfo>> {
        self.query(|tx| tx.load(&context::miner_key(miner)))
    }

    pub fn model(&self, model: &Pubkey) -> Result<Option<ModelInfo>> {
        self.query(|tx| tx.load(&context::model_key(model)))
    }

    pub fn inference(&self, inference_id: u64) -> Result<Option<Inference>> {
        self.query(|tx| tx.load(&context::inference_key(inference_id)))
    }

    pub fn assignment(&self, assignment_id: u64) -> Result<Option<Assignment>> {
        self.query(|tx| tx.load(&context::assignment_key(assignment_id)))
    }

    pub fn voting(&self, inference_id: u64) -> Result<Option<VotingRecord>> {
        self.query(|tx| tx.load(&context::voting_key(inference_id)))
    }

    pub fn balance(&self, asset: Asset, owner: &Pubkey) -> Result<u64> {
        self.query(|tx| token_helpers::balance_of(tx, asset, owner))
    }

    /// Protocol holdings of `asset`: staked tokens for `StakeToken`, the
    /// sum of every inference escrow for `Native`.
    pub fn vault_balance(&self, asset: Asset) -> Result<u64> {
        match asset {
            Asset::Native => {
                let next = self.next_inference_id()?;
                let mut total: u64 = 0;
                for inference_id in 1..next {
                    total = total
                        .checked_add(self.escrow_balance(inference_id)?)
                        .ok_or(SolearnError::ArithmeticOverflow)?;
                }
                Ok(total)
            }
            _ => self.balance(asset, &context::vault_authority()),
        }
    }

    /// Native funds still escrowed for one inference.
    pub fn escrow_balance(&self, inference_id: u64) -> Result<u64> {
        self.balance(Asset::Native, &context::escrow_authority(inference_id))
    }

    /// DAO tokens a requester receives for rating an inference 1 to 10.
    pub fn user_dao_token_reward(&self, score: u8) -> Result<u64> {
        self.config().user_dao_token_reward(score)
    }

    /// Events published so far, oldest first.
    pub fn events(&self) -> Vec<ProtocolEvent> {
        self.events.lock().clone()
    }

    pub fn drain_events(&self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

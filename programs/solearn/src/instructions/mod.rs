//! Instruction handlers for the Solearn protocol core
//!
//! Each handler runs against an `InstructionContext` and touches the ledger
//! only through its transaction; nothing is visible until the facade
//! commits.

pub mod consensus_helpers;
pub mod constants;
pub mod epoch_helpers;
pub mod selection;
pub mod settlement_helpers;
pub mod slash_helpers;
pub mod token_helpers;

pub mod add_model;
pub mod claim_reward;
pub mod claim_unstaked;
pub mod commit;
pub mod create_assignment;
pub mod initialize_protocol;
pub mod join_model;
pub mod leave_model;
pub mod pay_miner;
pub mod register_miner;
pub mod remove_model;
pub mod request_unstake;
pub mod resolve_inference;
pub mod reveal;
pub mod seize_role;
pub mod set_referrer;
pub mod set_reward_wallet;
pub mod slash_miner;
pub mod submit_solution;
pub mod submit_task;
pub mod top_up_task;
pub mod topup_stake;
pub mod update_config;
pub mod update_epoch;

//! Shared constants for instruction handlers

/// Divisor for basis points calculations (100% = 10000 bps)
pub const BASIS_POINTS_DIVISOR: u64 = 10000;

/// Highest score a requester can give an inference
pub const MAX_USER_SCORE: u8 = 10;

/// Domain separator for worker selection seeds
pub const SELECTION_DOMAIN: &[u8] = b"solearn-select";

/// Number of payout counter shards
pub const PAYOUT_SHARDS: u64 = 16;

// ============================================================================
// Record namespaces
// ============================================================================

pub const PROTOCOL_STATE_SEED: &[u8] = b"protocol_state";
pub const PROTOCOL_CONFIG_SEED: &[u8] = b"protocol_config";
pub const VAULT_SEED: &[u8] = b"vault";
pub const ESCROW_SEED: &[u8] = b"escrow";
pub const MINER_SEED: &[u8] = b"miner";
pub const MODEL_SEED: &[u8] = b"model";
pub const INFERENCE_SEED: &[u8] = b"inference";
pub const ASSIGNMENT_SEED: &[u8] = b"assignment";
pub const VOTING_SEED: &[u8] = b"voting";
pub const REFERRAL_SEED: &[u8] = b"referrer";
pub const BALANCE_SEED: &[u8] = b"balance";
pub const PAYOUT_SHARD_SEED: &[u8] = b"payout_shard";

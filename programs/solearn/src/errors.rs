//! Error codes for the Solearn protocol core

use anchor_lang::prelude::*;

#[error_code]
pub enum SolearnError {
    // Protocol errors (6000-6099)
    #[msg("Signer is not authorized for this action")]
    Unauthorized,

    #[msg("Protocol is already initialized")]
    AlreadyInitialized,

    #[msg("Protocol has not been initialized")]
    NotInitialized,

    #[msg("Invalid protocol configuration")]
    ConfigInvalid,

    // Stake errors (6100-6199)
    #[msg("Stake is below the miner minimum")]
    InsufficientStake,

    #[msg("Amount exceeds stake not already pending unstake")]
    InsufficientBalance,

    #[msg("Token balance too low for transfer")]
    InsufficientFunds,

    #[msg("Miner is not registered")]
    MinerNotRegistered,

    #[msg("Amount must be greater than zero")]
    ZeroAmount,

    #[msg("Unstake delay has not elapsed")]
    UnstakeNotMatured,

    #[msg("Nothing to claim")]
    NothingToClaim,

    #[msg("Miner is serving a penalty")]
    MinerPenalized,

    #[msg("Epoch cursor is already at the current epoch")]
    EpochRewardUpToDate,

    // Model errors (6200-6299)
    #[msg("Model is already registered")]
    ModelExists,

    #[msg("Model not found")]
    ModelNotFound,

    #[msg("Model has too few eligible miners")]
    ModelUnderStaffed,

    #[msg("Miner has not joined this model")]
    NotJoined,

    #[msg("Referrer cannot be set to this address")]
    InvalidReferrer,

    // Inference errors (6300-6399)
    #[msg("Invalid input")]
    InvalidInput,

    #[msg("Fee is below the minimum fee to use")]
    FeeTooLow,

    #[msg("Inference not found")]
    TaskNotFound,

    #[msg("Inference is already resolved")]
    TaskResolved,

    #[msg("Invalid status transition")]
    InvalidStatusTransition,

    // Assignment errors (6400-6499)
    #[msg("Assignment not found")]
    AssignmentNotFound,

    #[msg("Signer is not the assigned worker")]
    NotAssignedWorker,

    #[msg("Assignment role already seized")]
    AlreadySeized,

    #[msg("Assignment role has not been seized")]
    NotSeized,

    #[msg("Phase deadline has passed")]
    DeadlineExceeded,

    #[msg("Action not permitted for this assignment role")]
    WrongRole,

    // Consensus errors (6500-6599)
    #[msg("Miner has not submitted a solution")]
    SolutionNotSubmitted,

    #[msg("Solution already submitted")]
    AlreadySubmitted,

    #[msg("Commitment already submitted")]
    AlreadyCommitted,

    #[msg("No commitment to reveal")]
    NotCommitted,

    #[msg("Commit phase is still active")]
    CommitPhaseActive,

    #[msg("Solution already revealed")]
    AlreadyRevealed,

    #[msg("Revealed data does not match commitment")]
    CommitmentMismatch,

    #[msg("Inference cannot be resolved yet")]
    ResolutionNotReady,

    #[msg("Inference is already resolved")]
    AlreadyResolved,

    // Settlement errors (6600-6699)
    #[msg("Assignment has already been paid")]
    AlreadyPaid,

    #[msg("Inference has not been resolved")]
    NotResolved,

    #[msg("Assignment is not eligible for payment")]
    NotEligible,

    // General errors (6700-6799)
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,

    #[msg("Concurrent transaction modified a record, retry")]
    Conflict,

    #[msg("Stored record could not be decoded")]
    CorruptRecord,
}

//! Penalize a miner outside the consensus flow (admin only)

use crate::context::InstructionContext;
use crate::events::slash_reason;
use crate::instructions::slash_helpers;
use anchor_lang::prelude::*;

/// Returns the fine charged; zero when `is_fined` is false.
pub fn handler(ctx: &mut InstructionContext<'_>, miner: Pubkey, is_fined: bool) -> Result<u64> {
    ctx.require_admin()?;
    // Fails with MinerNotRegistered for unknown miners
    ctx.load_miner(&miner)?;
    slash_helpers::slash_miner(ctx, &miner, is_fined, slash_reason::ADMIN)
}

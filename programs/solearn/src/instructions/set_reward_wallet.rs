//! Redirect a miner's payouts

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::RewardWalletUpdated;
use anchor_lang::prelude::*;

pub fn handler(ctx: &mut InstructionContext<'_>, wallet: Pubkey) -> Result<()> {
    require!(wallet != Pubkey::default(), SolearnError::InvalidInput);

    let signer = ctx.signer;
    let mut miner = ctx.load_miner(&signer)?;
    miner.reward_wallet = wallet;
    ctx.save_miner(&miner)?;

    ctx.emit(RewardWalletUpdated {
        miner: signer,
        wallet,
        timestamp: ctx.now,
    });

    Ok(())
}

//! Record who referred a requester

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::ReferrerSet;
use crate::state::ReferralInfo;
use anchor_lang::prelude::*;

/// Links the signer to `referrer`. A requester can be referred once.
pub fn handler(ctx: &mut InstructionContext<'_>, referrer: Pubkey) -> Result<()> {
    let signer = ctx.signer;
    require!(
        referrer != Pubkey::default() && referrer != signer,
        SolearnError::InvalidReferrer
    );
    require!(
        ctx.load_referral(&signer)?.is_none(),
        SolearnError::InvalidReferrer
    );

    ctx.save_referral(&ReferralInfo {
        referee: signer,
        referrer,
        set_at: ctx.now,
    })?;

    ctx.emit(ReferrerSet {
        referee: signer,
        referrer,
        timestamp: ctx.now,
    });

    Ok(())
}

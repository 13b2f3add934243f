//! Replace the protocol configuration (admin only)

use crate::context::{protocol_config_key, InstructionContext};
use crate::errors::SolearnError;
use crate::events::ConfigUpdated;
use crate::state::ProtocolConfig;
use anchor_lang::prelude::*;

/// Validates and stores `new_config`, returning the new config version.
///
/// The signer must be the admin of the configuration being replaced, so a
/// handover to a new admin is a single update.
pub fn handler(ctx: &mut InstructionContext<'_>, new_config: &ProtocolConfig) -> Result<u64> {
    ctx.require_admin()?;
    new_config.validate()?;
    // Epoch numbering is derived from the slot; a new length would renumber history
    require!(
        new_config.epoch_duration == ctx.config.epoch_duration,
        SolearnError::ConfigInvalid
    );

    let mut state = ctx.load_state()?;
    state.config_version = state
        .config_version
        .checked_add(1)
        .ok_or(SolearnError::ArithmeticOverflow)?;
    ctx.save_state(&state)?;
    ctx.tx.store(&protocol_config_key(), new_config)?;

    ctx.emit(ConfigUpdated {
        updater: ctx.signer,
        config_version: state.config_version,
        config: new_config.clone(),
        timestamp: ctx.now,
    });

    Ok(state.config_version)
}

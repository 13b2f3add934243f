//! Advance the protocol epoch cursor

use crate::context::InstructionContext;
use crate::errors::SolearnError;
use crate::events::EpochAdvanced;
use anchor_lang::prelude::*;

/// Permissionless. Moves `ProtocolState::current_epoch` to the epoch of the
/// current slot and returns it.
pub fn handler(ctx: &mut InstructionContext<'_>) -> Result<u64> {
    let epoch = ctx.current_epoch();
    let mut state = ctx.load_state()?;
    require!(epoch > state.current_epoch, SolearnError::EpochRewardUpToDate);

    let previous_epoch = state.current_epoch;
    state.current_epoch = epoch;
    ctx.save_state(&state)?;

    ctx.emit(EpochAdvanced {
        previous_epoch,
        epoch,
        timestamp: ctx.now,
    });

    Ok(epoch)
}

//! Initialize protocol state and configuration

use crate::context::{protocol_config_key, protocol_state_key, InstructionContext};
use crate::errors::SolearnError;
use crate::events::ProtocolInitialized;
use crate::state::ProtocolState;
use crate::utils::commitment::mix_entropy;
use anchor_lang::prelude::*;
use tracing::debug;

pub fn handler(ctx: &mut InstructionContext<'_>) -> Result<()> {
    // Validate parameters BEFORE writing any state
    ctx.config.validate()?;
    ctx.require_admin()?;
    require!(
        !ctx.tx.exists(&protocol_state_key())?,
        SolearnError::AlreadyInitialized
    );

    let state = ProtocolState {
        next_inference_id: 1,
        next_assignment_id: 1,
        entropy: mix_entropy(&[0u8; 32], &ctx.signer.to_bytes()),
        initialized_at: ctx.now,
        current_epoch: ctx.current_epoch(),
        ..Default::default()
    };
    ctx.save_state(&state)?;
    let config = ctx.config.clone();
    ctx.tx.store(&protocol_config_key(), &config)?;

    debug!(admin = %config.admin, treasury = %config.treasury, "protocol initialized");

    ctx.emit(ProtocolInitialized {
        admin: config.admin,
        treasury: config.treasury,
        miner_requirement: config.miner_requirement,
        timestamp: ctx.now,
    });

    Ok(())
}

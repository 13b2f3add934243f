//! Deterministic worker selection for new inferences.
//!
//! The seed commits to the inference id, the model, the protocol's rolling
//! entropy and the submission slot, so anyone can recompute an assignment
//! set after the fact but nobody can aim for a specific one before the
//! previous resolution lands.

use crate::instructions::constants::SELECTION_DOMAIN;
use crate::state::HASH_SIZE;
use anchor_lang::prelude::*;
use sha3::{Digest, Keccak256};

pub fn selection_seed(
    inference_id: u64,
    model: &Pubkey,
    entropy: &[u8; HASH_SIZE],
    slot: u64,
) -> [u8; HASH_SIZE] {
    let mut hasher = Keccak256::new();
    hasher.update(SELECTION_DOMAIN);
    hasher.update(inference_id.to_le_bytes());
    hasher.update(model.to_bytes());
    hasher.update(entropy);
    hasher.update(slot.to_le_bytes());
    hasher.finalize().into()
}

fn draw(seed: &[u8; HASH_SIZE], round: u64) -> u64 {
    let mut hasher = Keccak256::new();
    hasher.update(seed);
    hasher.update(round.to_le_bytes());
    let digest: [u8; HASH_SIZE] = hasher.finalize().into();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(word)
}

/// Picks `count` distinct candidates with a seeded partial Fisher-Yates
/// shuffle. The first returned worker leads as miner.
///
/// Returns fewer than `count` workers only when there are fewer candidates.
pub fn select_workers(candidates: &[Pubkey], count: usize, seed: &[u8; HASH_SIZE]) -> Vec<Pubkey> {
    let mut pool = candidates.to_vec();
    let picks = count.min(pool.len());
    for i in 0..picks {
        let remaining = (pool.len() - i) as u64;
        let j = i + (draw(seed, i as u64) % remaining) as usize;
        pool.swap(i, j);
    }
    pool.truncate(picks);
    pool
}

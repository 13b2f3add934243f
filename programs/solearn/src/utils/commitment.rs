//! Keccak-256 commitments and solution digests.
//!
//! Byte layouts are fixed so that off-chain workers can compute the same
//! values:
//!
//! - commitment: `keccak256(nonce_le_u64 || worker_pubkey || solution)`
//! - digest: `keccak256(inference_id_le_u64 || solution)`

use crate::state::HASH_SIZE;
use anchor_lang::prelude::*;
use sha3::{Digest, Keccak256};

/// Hash a validator commits to before the reveal window.
pub fn commitment_hash(nonce: u64, worker: &Pubkey, solution: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Keccak256::new();
    hasher.update(nonce.to_le_bytes());
    hasher.update(worker.to_bytes());
    hasher.update(solution);
    hasher.finalize().into()
}

/// Digest used to compare solutions within one inference.
pub fn solution_digest(inference_id: u64, solution: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Keccak256::new();
    hasher.update(inference_id.to_le_bytes());
    hasher.update(solution);
    hasher.finalize().into()
}

/// Folds new material into the rolling selection entropy.
pub fn mix_entropy(entropy: &[u8; HASH_SIZE], material: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Keccak256::new();
    hasher.update(entropy);
    hasher.update(material);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> Pubkey {
        Pubkey::new_from_array([7u8; 32])
    }

    #[test]
    fn test_commitment_is_deterministic() {
        let a = commitment_hash(42, &worker(), b"solution");
        let b = commitment_hash(42, &worker(), b"solution");
        assert_eq!(a, b);
    }

    #[test]
    fn test_commitment_layout() {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&42u64.to_le_bytes());
        preimage.extend_from_slice(&[7u8; 32]);
        preimage.extend_from_slice(b"solution");
        let expected: [u8; 32] = Keccak256::digest(&preimage).into();
        assert_eq!(commitment_hash(42, &worker(), b"solution"), expected);
    }

    #[test]
    fn test_single_bit_changes_alter_commitment() {
        let base = commitment_hash(42, &worker(), b"solution");
        for bit in 0..64 {
            assert_ne!(commitment_hash(42 ^ (1 << bit), &worker(), b"solution"), base);
        }
        let mut solution = b"solution".to_vec();
        for i in 0..solution.len() * 8 {
            solution[i / 8] ^= 1 << (i % 8);
            assert_ne!(commitment_hash(42, &worker(), &solution), base);
            solution[i / 8] ^= 1 << (i % 8);
        }
    }

    #[test]
    fn test_commitment_binds_worker() {
        let other = Pubkey::new_from_array([8u8; 32]);
        assert_ne!(
            commitment_hash(1, &worker(), b"s"),
            commitment_hash(1, &other, b"s")
        );
    }

    #[test]
    fn test_digest_scoped_to_inference() {
        assert_eq!(solution_digest(1, b"out"), solution_digest(1, b"out"));
        assert_ne!(solution_digest(1, b"out"), solution_digest(2, b"out"));
        assert_ne!(solution_digest(1, b"out"), solution_digest(1, b"out2"));
    }

    #[test]
    fn test_mix_entropy_changes_seed() {
        let seed = [0u8; 32];
        let mixed = mix_entropy(&seed, b"digest");
        assert_ne!(mixed, seed);
        assert_eq!(mixed, mix_entropy(&seed, b"digest"));
    }
}

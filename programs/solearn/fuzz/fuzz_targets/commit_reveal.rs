//! Fuzz target for commit-reveal
//!
//! Tests invariants:
//! - A reveal differing from its commitment in one bit is rejected
//! - Commitments bind the validator identity
//! - Concurrent seizures of one assignment admit a single winner
//!
//! Run with: cargo test --release -p solearn-fuzz commit_reveal

use crate::*;
use proptest::prelude::*;
use solearn::utils::commitment::{commitment_hash, solution_digest};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Single-bit tampering of nonce or solution is always caught
    #[test]
    fn fuzz_tampered_reveal(input in any::<TamperedRevealInput>()) {
        let result = simulate_tampered_reveal(&input);
        prop_assert!(result.is_success(), "{:?}\nInput: {:?}", result, input);
    }

    /// One validator cannot replay another's commitment
    #[test]
    fn fuzz_commitment_binds_worker(
        a in arb_id(),
        b in arb_id(),
        nonce in arb_nonce(),
        solution in arb_payload(),
    ) {
        prop_assume!(a != b);
        let first = commitment_hash(nonce, &anchor_lang::prelude::Pubkey::new_from_array(a), &solution);
        let second = commitment_hash(nonce, &anchor_lang::prelude::Pubkey::new_from_array(b), &solution);
        prop_assert_ne!(first, second);
    }

    /// Digests are scoped to their inference
    #[test]
    fn fuzz_digest_scoped_to_inference(
        first in any::<u64>(),
        second in any::<u64>(),
        solution in arb_payload(),
    ) {
        prop_assume!(first != second);
        prop_assert_ne!(solution_digest(first, &solution), solution_digest(second, &solution));
    }
}

#[test]
fn test_concurrent_seizure_single_winner() {
    for threads in [2, 4, 8, 16] {
        let result = simulate_concurrent_seizure(threads);
        assert!(result.is_success(), "{} threads: {:?}", threads, result);
    }
}

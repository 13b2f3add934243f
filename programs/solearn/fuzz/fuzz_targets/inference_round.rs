//! Fuzz target for full inference rounds
//!
//! Tests invariants:
//! - Accepted outcomes reached the consensus threshold
//! - Reveals never outnumber commitments
//! - Failed rounds refund the requester in full
//!
//! Run with: cargo test --release -p solearn-fuzz inference_round

use crate::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Arbitrary participant behavior never breaks consensus or settlement
    #[test]
    fn fuzz_inference_round(input in any::<InferenceRoundInput>()) {
        let result = simulate_inference_round(&input);
        prop_assert!(!result.is_invariant_violation(),
            "Invariant violation: {:?}\nInput: {:?}", result, input);
    }

    /// With every validator honest the round is always accepted and settles
    #[test]
    fn fuzz_honest_round(
        mut input in any::<InferenceRoundInput>(),
    ) {
        input.miner_submits = true;
        input.miner_dissents = false;
        input.validators = vec![ValidatorBehavior::Honest; 6];
        let result = simulate_inference_round(&input);
        prop_assert!(result.is_success(), "{:?}\nInput: {:?}", result, input);
    }

    /// A miner that never submits always forfeits
    #[test]
    fn fuzz_missing_miner(mut input in any::<InferenceRoundInput>()) {
        input.miner_submits = false;
        let result = simulate_inference_round(&input);
        prop_assert!(result.is_success(), "{:?}\nInput: {:?}", result, input);
    }
}

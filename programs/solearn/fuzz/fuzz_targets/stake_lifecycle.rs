//! Fuzz target for the stake registry
//!
//! Tests invariants:
//! - Pending unstake never exceeds stake
//! - Vault stake balance equals the sum of miner stakes
//! - Stake tokens are conserved across wallets, vault and treasury
//! - Claims only succeed after the unstake delay
//!
//! Run with: cargo test --release -p solearn-fuzz stake_lifecycle

use crate::*;
use proptest::prelude::*;
use solearn::instructions::slash_helpers::calculate_fine;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Arbitrary sequences of stake operations never break stake accounting
    #[test]
    fn fuzz_stake_lifecycle(input in any::<StakeLifecycleInput>()) {
        let result = simulate_stake_lifecycle(&input);
        prop_assert!(!result.is_invariant_violation(),
            "Invariant violation: {:?}\nInput: {:?}", result, input);
    }

    /// Fines never exceed the stake they are charged against
    #[test]
    fn fuzz_fine_bounded(stake in any::<u64>(), fine_percentage in arb_bps()) {
        let fine = calculate_fine(stake, fine_percentage).unwrap();
        prop_assert!(fine <= stake);
        if fine_percentage == 10_000 {
            prop_assert_eq!(fine, stake);
        }
    }

    /// A miner that unstakes everything and waits out the delay gets its
    /// whole stake back
    #[test]
    fn fuzz_full_exit(stake in 25_000 * solearn::state::DENOMINATION..1_000_000 * solearn::state::DENOMINATION) {
        let input = StakeLifecycleInput {
            initial_stake: stake,
            fine_percentage: 0,
            ops: vec![
                StakeOp::RequestUnstake(stake),
                StakeOp::Claim,
                StakeOp::Advance(1_814_400),
                StakeOp::Claim,
            ],
        };
        let result = simulate_stake_lifecycle(&input);
        prop_assert!(result.is_success(), "{:?}", result);
    }
}

#[test]
fn test_slash_then_rejoin_waits_for_penalty() {
    let input = StakeLifecycleInput {
        initial_stake: 30_000 * solearn::state::DENOMINATION,
        fine_percentage: 1_000,
        ops: vec![
            StakeOp::AdminSlash { fined: true },
            StakeOp::Rejoin,
            StakeOp::Advance(1_200),
            StakeOp::Rejoin,
        ],
    };
    let result = simulate_stake_lifecycle(&input);
    assert!(result.is_success(), "{:?}", result);
}

//! Fuzz target for fee and reward settlement
//!
//! Tests invariants:
//! - Fee splits and reward splits conserve every unit
//! - The vault drains once every payable assignment is paid
//! - Each assignment is paid at most once
//!
//! Run with: cargo test --release -p solearn-fuzz settlement

use crate::*;
use proptest::prelude::*;
use solearn::instructions::settlement_helpers::{split_inference_fee, split_worker_pool};
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn fuzz_fee_split_conserves(fee in arb_fee(), (l2, treasury) in arb_bps_pair()) {
        let split = split_inference_fee(fee, l2, treasury).unwrap();
        prop_assert_eq!(
            split.value as u128 + split.fee_l2 as u128 + split.fee_treasury as u128,
            fee as u128
        );
    }

    #[test]
    fn fuzz_worker_pool_conserves(
        pool in arb_fee(),
        ratio in arb_bps(),
        miner_agrees in any::<bool>(),
        validators in 0u8..=6u8,
    ) {
        let split = split_worker_pool(pool, ratio, miner_agrees, validators).unwrap();
        let paid = split.miner as u128
            + split.per_validator as u128 * validators as u128
            + split.remainder as u128;
        prop_assert_eq!(paid, pool as u128);
        if !miner_agrees {
            prop_assert_eq!(split.miner, 0);
        }
    }

    /// Dust-sized fees still settle exactly
    #[test]
    fn fuzz_dust_fee_round(mut input in any::<InferenceRoundInput>(), fee in 1u64..16u64) {
        input.fee = fee;
        let result = simulate_inference_round(&input);
        prop_assert!(!result.is_invariant_violation(),
            "Invariant violation: {:?}\nInput: {:?}", result, input);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_payouts_pay_once() {
    let mut config = fuzz_config();
    config.miner_requirement = 1;
    let scenario = Arc::new(Scenario::new(config, 1, MINER_STAKE).unwrap());
    let protocol = &scenario.protocol;
    let requester = key(0x30, 0);
    protocol
        .credit_wallet(
            scenario.config.admin,
            solearn::state::Asset::Native,
            requester,
            100_000,
        )
        .unwrap();
    let inference_id = protocol
        .submit_task(requester, scenario.model, b"race".to_vec(), 100_000)
        .unwrap();
    let inference = protocol.inference(inference_id).unwrap().unwrap();
    let miner = *inference.miner_slot().unwrap();
    protocol.seize_role(miner.worker, miner.id).unwrap();
    protocol
        .submit_solution(miner.worker, miner.id, b"out".to_vec())
        .unwrap();
    assert_eq!(
        protocol.resolve(requester, inference_id).unwrap(),
        solearn::state::Resolution::Accepted
    );

    let mut handles = Vec::new();
    for _ in 0..8 {
        let scenario = Arc::clone(&scenario);
        handles.push(tokio::task::spawn_blocking(move || {
            scenario.protocol.pay_miner(requester, miner.id)
        }));
    }
    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(
        check_vault_drained(
            scenario
                .protocol
                .vault_balance(solearn::state::Asset::Native)
                .unwrap()
        ),
        SettlementInvariantResult::Valid
    );
}

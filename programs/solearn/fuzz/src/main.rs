//! Fuzz test runner for the Solearn protocol core
//!
//! Run with: cargo run --release
//! Or: cargo test (for property-based tests)

use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::TestRunner;
use solearn_fuzz::*;
use std::fmt::Debug;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== Solearn Protocol Fuzz Testing ===");

    let start = Instant::now();
    let mut passed = 0;
    let mut failed = 0;

    let suites: [(&str, fn(usize) -> (usize, usize), usize); 4] = [
        ("stake_lifecycle", run_stake_lifecycle_fuzz, 200),
        ("inference_round", run_inference_round_fuzz, 200),
        ("tampered_reveal", run_tampered_reveal_fuzz, 200),
        ("concurrent_seizure", run_race_condition_tests, 50),
    ];

    for (name, suite, iterations) in suites {
        info!(suite = name, iterations, "running fuzz suite");
        let (p, f) = suite(iterations);
        passed += p;
        failed += f;
    }

    info!("=== Fuzz Testing Complete ===");
    info!(
        total = passed + failed,
        passed,
        failed,
        duration = ?start.elapsed(),
        "summary"
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

/// Generate `iterations` inputs of `T` and run `simulate` on each.
fn run_generated<T, F>(name: &str, iterations: usize, simulate: F) -> (usize, usize)
where
    T: Arbitrary + Debug,
    F: Fn(&T) -> SimulationResult,
{
    let mut passed = 0;
    let mut failed = 0;
    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let input = match any::<T>().new_tree(&mut runner) {
            Ok(tree) => tree.current(),
            Err(reason) => {
                warn!(suite = name, %reason, "input generation failed");
                continue;
            }
        };

        match simulate(&input) {
            SimulationResult::InvariantViolation(violation) => {
                error!(suite = name, iteration = i, %violation, ?input, "invariant violated");
                failed += 1;
            }
            SimulationResult::Success | SimulationResult::Error(_) => passed += 1,
        }
    }

    (passed, failed)
}

fn run_stake_lifecycle_fuzz(iterations: usize) -> (usize, usize) {
    run_generated::<StakeLifecycleInput, _>("stake_lifecycle", iterations, simulate_stake_lifecycle)
}

fn run_inference_round_fuzz(iterations: usize) -> (usize, usize) {
    run_generated::<InferenceRoundInput, _>("inference_round", iterations, simulate_inference_round)
}

fn run_tampered_reveal_fuzz(iterations: usize) -> (usize, usize) {
    run_generated::<TamperedRevealInput, _>("tampered_reveal", iterations, |input| {
        // Setup never fails for a well-formed payload
        match simulate_tampered_reveal(input) {
            SimulationResult::Error(reason) => SimulationResult::InvariantViolation(reason),
            other => other,
        }
    })
}

fn run_race_condition_tests(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    for i in 0..iterations {
        let threads = 2 + i % 15;
        match simulate_concurrent_seizure(threads) {
            SimulationResult::Success => passed += 1,
            other => {
                error!(iteration = i, threads, result = ?other, "race condition test failed");
                failed += 1;
            }
        }
    }

    (passed, failed)
}

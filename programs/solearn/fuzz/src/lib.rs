//! Property-based fuzz testing library for the Solearn protocol core
//!
//! Scenarios drive the real protocol over an in-memory ledger and check
//! stake, consensus and settlement invariants after every step.
//!
//! # Usage
//!
//! ```bash
//! # Run all property-based tests
//! cargo test --release
//!
//! # Run the fuzz test runner
//! RUST_LOG=solearn=debug cargo run --release
//!
//! # Run with more iterations
//! PROPTEST_CASES=10000 cargo test --release
//! ```

pub mod arbitrary;
pub mod invariants;
pub mod scenarios;

pub use arbitrary::*;
pub use invariants::*;
pub use scenarios::*;

// Include fuzz targets as test modules
#[cfg(test)]
#[path = "../fuzz_targets/stake_lifecycle.rs"]
mod stake_lifecycle_tests;

#[cfg(test)]
#[path = "../fuzz_targets/inference_round.rs"]
mod inference_round_tests;

#[cfg(test)]
#[path = "../fuzz_targets/commit_reveal.rs"]
mod commit_reveal_tests;

#[cfg(test)]
#[path = "../fuzz_targets/settlement.rs"]
mod settlement_tests;

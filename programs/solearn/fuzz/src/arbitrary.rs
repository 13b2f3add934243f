//! Arbitrary input generators for fuzz testing
//!
//! Generates random but well-formed inputs for driving protocol instructions.

use proptest::prelude::*;
use solearn::state::DENOMINATION;

/// Arbitrary 32-byte identifier
pub fn arb_id() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Arbitrary solution or input payload (never empty)
pub fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        // Single byte edge case
        prop::collection::vec(any::<u8>(), 1..=1),
        // Typical model outputs
        prop::collection::vec(any::<u8>(), 1..64),
        // Larger outputs
        prop::collection::vec(any::<u8>(), 64..512),
    ]
}

/// Arbitrary reveal nonce with edge cases
pub fn arb_nonce() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), Just(1u64), Just(u64::MAX), any::<u64>()]
}

/// Arbitrary inference fee in native units
/// Tests: dust, typical, very large
pub fn arb_fee() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(1u64),
        Just(3u64),
        1u64..1_000u64,
        1_000u64..1_000_000_000u64,
        1_000_000_000u64..u64::MAX / 4,
    ]
}

/// Arbitrary percentage in basis points (0-10000)
pub fn arb_bps() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(0u16),
        Just(1u16),
        Just(5_000u16),
        Just(9_999u16),
        Just(10_000u16),
        0u16..=10_000u16,
    ]
}

/// Two basis-point values whose sum stays within 10000
pub fn arb_bps_pair() -> impl Strategy<Value = (u16, u16)> {
    (0u16..=10_000u16).prop_flat_map(|a| (Just(a), 0u16..=(10_000 - a)))
}

/// Arbitrary token amount around the miner minimum
pub fn arb_stake_amount() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(1u64),
        Just(25_000 * DENOMINATION - 1),
        Just(25_000 * DENOMINATION),
        1u64..25_000 * DENOMINATION,
        25_000 * DENOMINATION..200_000 * DENOMINATION,
    ]
}

/// Arbitrary slot advance, from a single slot past the unstake delay
pub fn arb_slot_advance() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(1u64),
        Just(1_200u64),
        Just(1_814_400u64),
        1u64..10_000u64,
        1_000_000u64..3_000_000u64,
    ]
}

/// One step of a miner's stake lifecycle
#[derive(Debug, Clone)]
pub enum StakeOp {
    TopUp(u64),
    RequestUnstake(u64),
    Claim,
    Advance(u64),
    AdminSlash { fined: bool },
    Rejoin,
}

pub fn arb_stake_op() -> impl Strategy<Value = StakeOp> {
    prop_oneof![
        arb_stake_amount().prop_map(StakeOp::TopUp),
        arb_stake_amount().prop_map(StakeOp::RequestUnstake),
        Just(StakeOp::Claim),
        arb_slot_advance().prop_map(StakeOp::Advance),
        any::<bool>().prop_map(|fined| StakeOp::AdminSlash { fined }),
        Just(StakeOp::Rejoin),
    ]
}

/// Input for stake lifecycle fuzz testing
#[derive(Debug, Clone)]
pub struct StakeLifecycleInput {
    pub initial_stake: u64,
    pub fine_percentage: u16,
    pub ops: Vec<StakeOp>,
}

impl Arbitrary for StakeLifecycleInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            25_000 * DENOMINATION..100_000 * DENOMINATION,
            arb_bps(),
            prop::collection::vec(arb_stake_op(), 1..24),
        )
            .prop_map(|(initial_stake, fine_percentage, ops)| StakeLifecycleInput {
                initial_stake,
                fine_percentage,
                ops,
            })
            .boxed()
    }
}

/// How a validator behaves during commit-reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorBehavior {
    /// Commits and reveals the miner's solution
    Honest,
    /// Commits and reveals a different solution
    Dissent,
    /// Commits but never reveals
    CommitOnly,
    /// Never seizes its role
    Silent,
}

pub fn arb_validator_behavior() -> impl Strategy<Value = ValidatorBehavior> {
    prop_oneof![
        4 => Just(ValidatorBehavior::Honest),
        2 => Just(ValidatorBehavior::Dissent),
        1 => Just(ValidatorBehavior::CommitOnly),
        1 => Just(ValidatorBehavior::Silent),
    ]
}

/// Input for a full inference round
#[derive(Debug, Clone)]
pub struct InferenceRoundInput {
    pub miner_count: u8,
    pub miner_requirement: u8,
    pub fee: u64,
    pub fee_l2_percentage: u16,
    pub fee_treasury_percentage: u16,
    pub fee_ratio_miner_validator: u16,
    pub dao_token_reward: u64,
    pub with_referrer: bool,
    pub miner_submits: bool,
    pub miner_dissents: bool,
    pub validators: Vec<ValidatorBehavior>,
    pub solution: Vec<u8>,
    pub alternative: Vec<u8>,
    /// Seeds the order validators act in
    pub order_seed: u64,
}

impl Arbitrary for InferenceRoundInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            (1u8..=7u8, 1u8..=7u8),
            arb_fee(),
            arb_bps_pair(),
            arb_bps(),
            prop_oneof![Just(0u64), 1u64..1_000_000_000u64],
            (any::<bool>(), prop::bool::weighted(0.9), prop::bool::weighted(0.15)),
            prop::collection::vec(arb_validator_behavior(), 6..=6),
            (arb_payload(), arb_payload(), any::<u64>()),
        )
            .prop_map(
                |(
                    (miner_count, requirement),
                    fee,
                    (fee_l2_percentage, fee_treasury_percentage),
                    fee_ratio_miner_validator,
                    dao_token_reward,
                    (with_referrer, miner_submits, miner_dissents),
                    validators,
                    (solution, mut alternative, order_seed),
                )| {
                    if alternative == solution {
                        alternative.push(0xff);
                    }
                    InferenceRoundInput {
                        miner_count,
                        miner_requirement: requirement.min(miner_count),
                        fee,
                        fee_l2_percentage,
                        fee_treasury_percentage,
                        fee_ratio_miner_validator,
                        dao_token_reward,
                        with_referrer,
                        miner_submits,
                        miner_dissents,
                        validators,
                        solution,
                        alternative,
                        order_seed,
                    }
                },
            )
            .boxed()
    }
}

/// Input for reveal tampering
#[derive(Debug, Clone)]
pub struct TamperedRevealInput {
    pub solution: Vec<u8>,
    pub nonce: u64,
    /// Bit to flip, reduced modulo the tampered field's width
    pub bit: u16,
    pub tamper_nonce: bool,
}

impl Arbitrary for TamperedRevealInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (arb_payload(), arb_nonce(), any::<u16>(), any::<bool>())
            .prop_map(|(solution, nonce, bit, tamper_nonce)| TamperedRevealInput {
                solution,
                nonce,
                bit,
                tamper_nonce,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_bps_pair_within_limit() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let (a, b) = arb_bps_pair().new_tree(&mut runner).unwrap().current();
            assert!(a as u32 + b as u32 <= 10_000);
        }
    }

    #[test]
    fn test_round_input_solutions_differ() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let input = any::<InferenceRoundInput>()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert_ne!(input.solution, input.alternative);
            assert!(input.miner_requirement <= input.miner_count);
        }
    }
}

//! Shared helper functions for commit-reveal consensus.

use crate::state::{Inference, VotingRecord, HASH_SIZE};

/// Matching digests needed to accept a solution among `participants`
/// workers: ceil(2n/3).
pub fn consensus_threshold(participants: usize) -> u8 {
    let n = participants.min(u8::MAX as usize) as u16;
    let threshold = (2 * n) / 3 + u16::from(n % 3 != 0);
    threshold as u8
}

/// Winning digest of an inference and how many participants produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tally {
    pub digest: [u8; HASH_SIZE],
    pub count: u8,
}

/// Most produced digest among the miner's and the revealed validator
/// digests. Ties go to the miner's digest, then to the earliest revealer.
pub fn most_voted_digest(miner_digest: &[u8; HASH_SIZE], revealed: &[[u8; HASH_SIZE]]) -> Tally {
    let count_of = |digest: &[u8; HASH_SIZE]| {
        1 + revealed.iter().filter(|d| *d == digest).count() as u8
            - u8::from(digest != miner_digest)
    };

    let mut best = Tally {
        digest: *miner_digest,
        count: count_of(miner_digest),
    };
    for digest in revealed {
        let count = count_of(digest);
        if count > best.count {
            best = Tally {
                digest: *digest,
                count,
            };
        }
    }
    best
}

/// Reveals open once every validator has committed or the commit window
/// has closed.
pub fn reveal_window_open(inference: &Inference, voting: &VotingRecord, now: u64) -> bool {
    voting.total_commit >= inference.validator_count() || now > inference.commit_timeout
}

/// A submitted inference can be resolved once every validator revealed,
/// once the reveal window closed, or once the commit window closed and
/// every committed validator already revealed.
pub fn resolution_ready(inference: &Inference, voting: &VotingRecord, now: u64) -> bool {
    voting.total_reveal >= inference.validator_count()
        || now > inference.reveal_timeout
        || (now > inference.commit_timeout && voting.total_reveal == voting.total_commit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AssignmentRole, AssignmentSlot, DaoTokenPercentage, TaskStatus};
    use anchor_lang::prelude::Pubkey;

    const A: [u8; 32] = [0xaa; 32];
    const B: [u8; 32] = [0xbb; 32];
    const C: [u8; 32] = [0xcc; 32];

    fn inference(validators: u8) -> Inference {
        let mut slots = vec![AssignmentSlot {
            id: 1,
            worker: Pubkey::new_from_array([1; 32]),
            role: AssignmentRole::Miner,
        }];
        for i in 0..validators {
            slots.push(AssignmentSlot {
                id: 2 + i as u64,
                worker: Pubkey::new_from_array([2 + i; 32]),
                role: AssignmentRole::Validator,
            });
        }
        Inference {
            id: 1,
            creator: Pubkey::default(),
            model: Pubkey::default(),
            input: vec![1],
            value: 0,
            fee_l2: 0,
            fee_treasury: 0,
            referrer: None,
            created_at: 0,
            submit_timeout: 10,
            commit_timeout: 20,
            reveal_timeout: 30,
            status: TaskStatus::Assigned,
            slots,
            miner_digest: Some(A),
            pending_payouts: 0,
            fee_ratio_miner_validator: 5_000,
            dao_token_reward: 0,
            dao_token_percentage: DaoTokenPercentage::default(),
        }
    }

    fn voting(commits: u8, reveals: u8) -> VotingRecord {
        VotingRecord {
            inference_id: 1,
            total_commit: commits,
            total_reveal: reveals,
            ..Default::default()
        }
    }

    #[test]
    fn test_consensus_threshold_is_two_thirds_rounded_up() {
        let expected = [(1usize, 1u8), (2, 2), (3, 2), (4, 3), (5, 4), (6, 4), (7, 5)];
        for (n, threshold) in expected {
            assert_eq!(consensus_threshold(n), threshold, "n = {}", n);
        }
    }

    mod most_voted_digest_tests {
        use super::*;

        #[test]
        fn test_unanimous() {
            assert_eq!(most_voted_digest(&A, &[A, A]), Tally { digest: A, count: 3 });
        }

        #[test]
        fn test_one_dissenter() {
            assert_eq!(most_voted_digest(&A, &[A, B]), Tally { digest: A, count: 2 });
        }

        #[test]
        fn test_miner_outvoted() {
            assert_eq!(most_voted_digest(&A, &[B, B]), Tally { digest: B, count: 2 });
        }

        #[test]
        fn test_tie_goes_to_miner() {
            assert_eq!(most_voted_digest(&A, &[B]), Tally { digest: A, count: 1 });
            assert_eq!(
                most_voted_digest(&A, &[B, B, A]),
                Tally { digest: A, count: 2 }
            );
        }

        #[test]
        fn test_all_different() {
            assert_eq!(most_voted_digest(&A, &[B, C]), Tally { digest: A, count: 1 });
        }

        #[test]
        fn test_no_reveals() {
            assert_eq!(most_voted_digest(&A, &[]), Tally { digest: A, count: 1 });
        }
    }

    mod readiness_tests {
        use super::*;

        #[test]
        fn test_reveal_window() {
            let inf = inference(2);
            assert!(!reveal_window_open(&inf, &voting(1, 0), 15));
            assert!(reveal_window_open(&inf, &voting(2, 0), 15));
            assert!(reveal_window_open(&inf, &voting(1, 0), 21));
        }

        #[test]
        fn test_all_revealed_is_ready() {
            assert!(resolution_ready(&inference(2), &voting(2, 2), 15));
        }

        #[test]
        fn test_waiting_for_reveals() {
            assert!(!resolution_ready(&inference(2), &voting(2, 1), 25));
        }

        #[test]
        fn test_commit_window_closed_and_committers_revealed() {
            assert!(!resolution_ready(&inference(2), &voting(1, 1), 20));
            assert!(resolution_ready(&inference(2), &voting(1, 1), 21));
        }

        #[test]
        fn test_reveal_window_closed() {
            assert!(!resolution_ready(&inference(2), &voting(2, 1), 30));
            assert!(resolution_ready(&inference(2), &voting(2, 1), 31));
        }

        #[test]
        fn test_single_worker_inference() {
            assert!(resolution_ready(&inference(0), &voting(0, 0), 0));
        }
    }
}

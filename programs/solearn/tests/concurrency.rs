//! Concurrent instructions against a shared protocol instance.

mod common;

use common::*;
use solearn::clock::SlotClock;
use solearn::context::InstructionContext;
use solearn::errors::SolearnError;
use solearn::instructions;
use solearn::ledger::LedgerStore;
use solearn::state::{Asset, Resolution};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_seizures_admit_one_winner() {
    let h = Arc::new(Harness::new(3));
    let inference_id = h.submit();
    let slot = h.miner_slot(inference_id);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        handles.push(tokio::task::spawn_blocking(move || {
            h.protocol.seize_role(slot.worker, slot.id)
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => winners += 1,
            Err(err) => assert!(
                err == SolearnError::AlreadySeized.into() || err == SolearnError::Conflict.into(),
                "unexpected error: {err}"
            ),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_payouts_pay_once() {
    let h = Arc::new(Harness::new(3));
    let inference_id = h.round(b"output", &[b"output", b"output"]);
    assert_eq!(
        h.protocol.resolve(h.requester, inference_id).unwrap(),
        Resolution::Accepted
    );
    let slot = h.miner_slot(inference_id);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        handles.push(tokio::task::spawn_blocking(move || {
            h.protocol.pay_miner(h.requester, slot.id)
        }));
    }

    let mut paid = 0;
    for handle in handles {
        if let Ok(amount) = handle.await.unwrap() {
            paid += amount;
        }
    }
    assert_eq!(paid, 45_000);
    assert_eq!(h.native(&slot.worker), 45_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_inferences_progress_in_parallel() {
    let h = Arc::new(Harness::new(3));
    let ids: Vec<u64> = (0..4).map(|_| h.submit()).collect();

    let mut handles = Vec::new();
    for inference_id in ids.clone() {
        let h = Arc::clone(&h);
        handles.push(tokio::task::spawn_blocking(move || {
            let slot = h.miner_slot(inference_id);
            // Retry on optimistic conflicts with the other inferences
            loop {
                match h.protocol.seize_role(slot.worker, slot.id) {
                    Err(err) if err == SolearnError::Conflict.into() => continue,
                    other => return other,
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.protocol.task_count().unwrap(), 12);
    assert_eq!(
        h.protocol.vault_balance(Asset::Native).unwrap(),
        FEE * ids.len() as u64
    );
}

#[test]
fn test_payouts_for_different_inferences_commit_side_by_side() {
    let h = Harness::new(3);
    let first = h.round(b"output", &[b"output", b"output"]);
    let second = h.round(b"output", &[b"output", b"output"]);
    for inference_id in [first, second] {
        h.protocol.resolve(h.requester, inference_id).unwrap();
    }
    assert_eq!(h.protocol.task_count().unwrap(), 6);

    // Pick two different workers so their balances are distinct records
    let a = h.miner_slot(first);
    let b = h.validator_slots(second)
        .into_iter()
        .find(|slot| slot.worker != a.worker)
        .unwrap();

    // Both transactions read before either commits
    let config = h.protocol.config();
    let now = h.clock.now();
    let mut pay_a = InstructionContext::new(&config, h.requester, now, h.protocol.store());
    let mut pay_b = InstructionContext::new(&config, h.requester, now, h.protocol.store());
    assert_eq!(instructions::pay_miner::handler(&mut pay_a, a.id).unwrap(), 45_000);
    assert_eq!(instructions::pay_miner::handler(&mut pay_b, b.id).unwrap(), 22_500);

    h.protocol.store().commit(pay_a.into_parts().0).unwrap();
    h.protocol.store().commit(pay_b.into_parts().0).unwrap();

    assert_eq!(h.native(&a.worker), 45_000);
    assert_eq!(h.native(&b.worker), 22_500);
    assert_eq!(h.protocol.task_count().unwrap(), 4);
    assert_eq!(h.protocol.escrow_balance(first).unwrap(), FEE - 10_000 - 45_000);
    assert_eq!(h.protocol.escrow_balance(second).unwrap(), FEE - 10_000 - 22_500);
}

#[test]
fn test_same_assignment_paid_twice_conflicts() {
    let h = Harness::new(3);
    let inference_id = h.round(b"output", &[b"output", b"output"]);
    h.protocol.resolve(h.requester, inference_id).unwrap();
    let slot = h.miner_slot(inference_id);

    let config = h.protocol.config();
    let now = h.clock.now();
    let mut first = InstructionContext::new(&config, h.requester, now, h.protocol.store());
    let mut second = InstructionContext::new(&config, h.requester, now, h.protocol.store());
    instructions::pay_miner::handler(&mut first, slot.id).unwrap();
    instructions::pay_miner::handler(&mut second, slot.id).unwrap();

    h.protocol.store().commit(first.into_parts().0).unwrap();
    let err = h.protocol.store().commit(second.into_parts().0).unwrap_err();
    assert_eq!(err, SolearnError::Conflict.into());
    assert_eq!(h.native(&slot.worker), 45_000);
}

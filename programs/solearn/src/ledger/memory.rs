//! In-memory ledger used by tests and embedded deployments.

use super::{ChangeSet, LedgerStore, RecordId, StoredRecord};
use crate::errors::SolearnError;
use anchor_lang::prelude::*;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

#[derive(Default)]
struct Records {
    live: HashMap<RecordId, StoredRecord>,
    /// Last version of removed records
    retired: HashMap<RecordId, u64>,
}

/// Versioned record map guarded by a single lock.
pub struct MemoryLedger {
    records: RwLock<Records>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Records::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().live.is_empty()
    }
}

impl LedgerStore for MemoryLedger {
    fn read(&self, key: &RecordId) -> Result<Option<StoredRecord>> {
        Ok(self.records.read().live.get(key).cloned())
    }

    fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut records = self.records.write();

        for (key, observed) in &changes.reads {
            let current = records.live.get(key).map(|r| r.version);
            if current != *observed {
                trace!(%key, ?observed, ?current, "ledger version conflict");
                return Err(SolearnError::Conflict.into());
            }
        }

        for (key, data) in changes.writes {
            let Some(data) = data else {
                if let Some(removed) = records.live.remove(&key) {
                    records.retired.insert(key, removed.version);
                }
                continue;
            };
            let last = match records.live.get(&key) {
                Some(record) => record.version,
                None => records.retired.remove(&key).unwrap_or(0),
            };
            let version = last
                .checked_add(1)
                .ok_or(SolearnError::ArithmeticOverflow)?;
            records.live.insert(key, StoredRecord { version, data });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{derive_key, Transaction};

    #[test]
    fn test_versions_increment() {
        let ledger = MemoryLedger::new();
        let key = derive_key(b"k", &[]);
        for expected in 1..=3u64 {
            let mut tx = Transaction::new(&ledger);
            tx.store(&key, &expected).unwrap();
            ledger.commit(tx.into_change_set()).unwrap();
            assert_eq!(ledger.read(&key).unwrap().unwrap().version, expected);
        }
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_stale_read_conflicts() {
        let ledger = MemoryLedger::new();
        let key = derive_key(b"k", &[]);

        let mut first = Transaction::new(&ledger);
        let mut second = Transaction::new(&ledger);
        assert_eq!(first.load::<u64>(&key).unwrap(), None);
        assert_eq!(second.load::<u64>(&key).unwrap(), None);
        first.store(&key, &1u64).unwrap();
        second.store(&key, &2u64).unwrap();

        ledger.commit(first.into_change_set()).unwrap();
        let err = ledger.commit(second.into_change_set()).unwrap_err();
        assert_eq!(err, SolearnError::Conflict.into());

        let mut check = Transaction::new(&ledger);
        assert_eq!(check.load::<u64>(&key).unwrap(), Some(1));
    }

    #[test]
    fn test_conflict_applies_no_writes() {
        let ledger = MemoryLedger::new();
        let a = derive_key(b"a", &[]);
        let b = derive_key(b"b", &[]);

        let mut stale = Transaction::new(&ledger);
        stale.load::<u64>(&a).unwrap();
        stale.store(&a, &10u64).unwrap();
        stale.store(&b, &20u64).unwrap();

        let mut winner = Transaction::new(&ledger);
        winner.store(&a, &1u64).unwrap();
        ledger.commit(winner.into_change_set()).unwrap();

        assert!(ledger.commit(stale.into_change_set()).is_err());
        assert!(ledger.read(&b).unwrap().is_none());
    }

    #[test]
    fn test_disjoint_transactions_both_commit() {
        let ledger = MemoryLedger::new();
        let mut first = Transaction::new(&ledger);
        let mut second = Transaction::new(&ledger);
        first.store(&derive_key(b"a", &[]), &1u64).unwrap();
        second.store(&derive_key(b"b", &[]), &2u64).unwrap();
        ledger.commit(first.into_change_set()).unwrap();
        ledger.commit(second.into_change_set()).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_recreated_record_keeps_counting_versions() {
        let ledger = MemoryLedger::new();
        let key = derive_key(b"k", &[]);

        let mut tx = Transaction::new(&ledger);
        tx.store(&key, &1u64).unwrap();
        ledger.commit(tx.into_change_set()).unwrap();

        // Observed at version 1, then removed and recreated underneath
        let mut stale = Transaction::new(&ledger);
        assert_eq!(stale.load::<u64>(&key).unwrap(), Some(1));
        stale.store(&key, &9u64).unwrap();

        let mut tx = Transaction::new(&ledger);
        tx.remove(&key).unwrap();
        ledger.commit(tx.into_change_set()).unwrap();
        assert!(ledger.is_empty());

        let mut tx = Transaction::new(&ledger);
        tx.store(&key, &2u64).unwrap();
        ledger.commit(tx.into_change_set()).unwrap();
        assert_eq!(ledger.read(&key).unwrap().unwrap().version, 2);

        let err = ledger.commit(stale.into_change_set()).unwrap_err();
        assert_eq!(err, SolearnError::Conflict.into());
    }
}

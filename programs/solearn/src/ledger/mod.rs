//! Transactional record storage.
//!
//! Every instruction runs inside one [`Transaction`]: reads record the
//! version they observed, writes and removals are buffered, and
//! [`LedgerStore::commit`]
//! applies the whole change set atomically or rejects it with
//! `SolearnError::Conflict` when any observed record moved underneath it.

pub mod memory;

pub use memory::MemoryLedger;

use crate::errors::SolearnError;
use crate::state::HASH_SIZE;
use anchor_lang::prelude::*;
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

/// Address of a record in the ledger.
pub type RecordId = Pubkey;

/// Derives a record address from a namespace and parent identifiers.
///
/// Parents are length-prefixed so distinct seed lists never collide.
pub fn derive_key(namespace: &[u8], parents: &[&[u8]]) -> RecordId {
    let mut hasher = Keccak256::new();
    hasher.update(crate::ID.to_bytes());
    hasher.update((namespace.len() as u32).to_le_bytes());
    hasher.update(namespace);
    for parent in parents {
        hasher.update((parent.len() as u32).to_le_bytes());
        hasher.update(parent);
    }
    let digest: [u8; HASH_SIZE] = hasher.finalize().into();
    Pubkey::new_from_array(digest)
}

/// A serialized record and its version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRecord {
    /// Starts at 1 and increments on every committed write
    pub version: u64,
    pub data: Vec<u8>,
}

/// Reads observed and writes produced by one transaction.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    /// Version observed per record, `None` when the record was absent
    pub reads: Vec<(RecordId, Option<u64>)>,
    /// New record data, `None` removes the record
    pub writes: Vec<(RecordId, Option<Vec<u8>>)>,
}

/// Key-addressed storage with atomic multi-record commits.
pub trait LedgerStore: Send + Sync {
    fn read(&self, key: &RecordId) -> Result<Option<StoredRecord>>;

    /// Applies `changes.writes` iff every entry in `changes.reads` still
    /// has the observed version. A removed record that is written again
    /// continues from its last version.
    fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Read-your-writes view over a [`LedgerStore`].
pub struct Transaction<'a> {
    store: &'a dyn LedgerStore,
    reads: BTreeMap<RecordId, Option<u64>>,
    writes: BTreeMap<RecordId, Option<Vec<u8>>>,
}

impl<'a> Transaction<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    fn fetch(&mut self, key: &RecordId) -> Result<Option<Vec<u8>>> {
        if let Some(pending) = self.writes.get(key) {
            return Ok(pending.clone());
        }
        let record = self.store.read(key)?;
        self.reads
            .entry(*key)
            .or_insert_with(|| record.as_ref().map(|r| r.version));
        Ok(record.map(|r| r.data))
    }

    /// Loads and decodes a record, `None` if absent.
    pub fn load<T: AnchorDeserialize>(&mut self, key: &RecordId) -> Result<Option<T>> {
        match self.fetch(key)? {
            Some(data) => {
                let value = T::deserialize(&mut data.as_slice())
                    .map_err(|_| SolearnError::CorruptRecord)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Loads a record that must exist, failing with `missing` otherwise.
    pub fn load_required<T: AnchorDeserialize>(
        &mut self,
        key: &RecordId,
        missing: SolearnError,
    ) -> Result<T> {
        self.load(key)?.ok_or_else(|| missing.into())
    }

    pub fn exists(&mut self, key: &RecordId) -> Result<bool> {
        Ok(self.fetch(key)?.is_some())
    }

    /// Buffers a write. The record's current version is observed first so a
    /// concurrent creation or update of the same key conflicts.
    pub fn store<T: AnchorSerialize>(&mut self, key: &RecordId, value: &T) -> Result<()> {
        self.observe(key)?;
        let mut data = Vec::new();
        value
            .serialize(&mut data)
            .map_err(|_| SolearnError::CorruptRecord)?;
        self.writes.insert(*key, Some(data));
        Ok(())
    }

    /// Buffers the removal of a record. Removing an absent record is a no-op
    /// at commit.
    pub fn remove(&mut self, key: &RecordId) -> Result<()> {
        self.observe(key)?;
        self.writes.insert(*key, None);
        Ok(())
    }

    fn observe(&mut self, key: &RecordId) -> Result<()> {
        if !self.reads.contains_key(key) && !self.writes.contains_key(key) {
            let version = self.store.read(key)?.map(|r| r.version);
            self.reads.insert(*key, version);
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }

    pub fn into_change_set(self) -> ChangeSet {
        ChangeSet {
            reads: self.reads.into_iter().collect(),
            writes: self.writes.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_is_deterministic() {
        let owner = Pubkey::new_from_array([4; 32]);
        assert_eq!(
            derive_key(b"miner", &[&owner.to_bytes()]),
            derive_key(b"miner", &[&owner.to_bytes()])
        );
    }

    #[test]
    fn test_derive_key_separates_namespaces_and_parents() {
        let id = 7u64.to_le_bytes();
        assert_ne!(derive_key(b"inference", &[&id]), derive_key(b"assignment", &[&id]));
        assert_ne!(derive_key(b"ab", &[b"c"]), derive_key(b"a", &[b"bc"]));
        assert_ne!(derive_key(b"x", &[b"ab", b"c"]), derive_key(b"x", &[b"a", b"bc"]));
    }

    #[test]
    fn test_transaction_reads_own_writes() {
        let ledger = MemoryLedger::new();
        let key = derive_key(b"counter", &[]);
        let mut tx = Transaction::new(&ledger);
        assert_eq!(tx.load::<u64>(&key).unwrap(), None);
        tx.store(&key, &5u64).unwrap();
        assert_eq!(tx.load::<u64>(&key).unwrap(), Some(5));
        assert!(tx.exists(&key).unwrap());
        // Nothing visible before commit
        assert!(ledger.read(&key).unwrap().is_none());
        ledger.commit(tx.into_change_set()).unwrap();
        assert_eq!(ledger.read(&key).unwrap().unwrap().version, 1);
    }

    #[test]
    fn test_removed_record_reads_as_absent() {
        let ledger = MemoryLedger::new();
        let key = derive_key(b"model", &[b"m"]);
        let mut tx = Transaction::new(&ledger);
        tx.store(&key, &1u64).unwrap();
        ledger.commit(tx.into_change_set()).unwrap();

        let mut tx = Transaction::new(&ledger);
        tx.remove(&key).unwrap();
        assert!(!tx.exists(&key).unwrap());
        ledger.commit(tx.into_change_set()).unwrap();
        assert!(ledger.read(&key).unwrap().is_none());
    }

    #[test]
    fn test_load_required_missing() {
        let ledger = MemoryLedger::new();
        let mut tx = Transaction::new(&ledger);
        let err = tx
            .load_required::<u64>(&derive_key(b"nope", &[]), SolearnError::TaskNotFound)
            .unwrap_err();
        assert_eq!(err, SolearnError::TaskNotFound.into());
    }

    #[test]
    fn test_corrupt_record() {
        let ledger = MemoryLedger::new();
        let key = derive_key(b"short", &[]);
        ledger
            .commit(ChangeSet {
                reads: vec![],
                writes: vec![(key, Some(vec![1, 2]))],
            })
            .unwrap();
        let mut tx = Transaction::new(&ledger);
        assert_eq!(
            tx.load::<u64>(&key).unwrap_err(),
            SolearnError::CorruptRecord.into()
        );
    }
}

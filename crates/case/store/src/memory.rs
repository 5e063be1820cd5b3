//! In-memory reference implementation of [`EntityStore`].
//!
//! Deterministic and test-friendly. Each commit takes the single write lock,
//! validates every operation against the current rows and only then applies
//! them, standing in for the row-level transaction of a real backend.

use crate::model::{CommitReceipt, RowFilter, RowKey, StoreStats, StoredRow, WriteBatch, WriteOp};
use crate::traits::EntityStore;
use case_types::{CaseError, CaseResult, EntityKind};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Rows {
    next_seq: u64,
    by_key: HashMap<RowKey, (u64, StoredRow)>,
}

/// In-memory entity store.
#[derive(Default)]
pub struct InMemoryEntityStore {
    rows: RwLock<Rows>,
    stats: RwLock<StoreStats>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows of one kind.
    pub fn count(&self, kind: EntityKind) -> CaseResult<usize> {
        let guard = self
            .rows
            .read()
            .map_err(|_| CaseError::backend("count", "rows lock poisoned"))?;
        Ok(guard.by_key.keys().filter(|(k, _)| *k == kind).count())
    }

    fn record(&self, accepted: Option<usize>) -> CaseResult<()> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| CaseError::backend("commit", "stats lock poisoned"))?;
        match accepted {
            Some(writes) => {
                stats.commits += 1;
                stats.rows_written += writes as u64;
            }
            None => stats.rejected_commits += 1,
        }
        Ok(())
    }
}

fn check(rows: &Rows, op: &WriteOp) -> CaseResult<()> {
    let key = op.key();
    let current = rows.by_key.get(&key).map(|(_, row)| row.revision);
    match op {
        WriteOp::Insert(row) => {
            if current.is_some() {
                return Err(CaseError::backend(
                    "insert",
                    format!("duplicate key {} {}", row.kind, row.id),
                ));
            }
        }
        WriteOp::Update {
            row,
            expected_revision,
        } => {
            if current != Some(*expected_revision) {
                return Err(CaseError::OptimisticLock {
                    kind: row.kind,
                    entity_id: row.id.clone(),
                    operation: "update".to_string(),
                    expected: *expected_revision,
                    actual: current,
                });
            }
        }
        WriteOp::Delete {
            kind,
            id,
            expected_revision,
        } => {
            if current != Some(*expected_revision) {
                return Err(CaseError::OptimisticLock {
                    kind: *kind,
                    entity_id: id.clone(),
                    operation: "delete".to_string(),
                    expected: *expected_revision,
                    actual: current,
                });
            }
        }
    }
    Ok(())
}

impl EntityStore for InMemoryEntityStore {
    fn fetch(&self, kind: EntityKind, id: &str) -> CaseResult<Option<StoredRow>> {
        let guard = self
            .rows
            .read()
            .map_err(|_| CaseError::backend("fetch", "rows lock poisoned"))?;
        Ok(guard
            .by_key
            .get(&(kind, id.to_string()))
            .map(|(_, row)| row.clone()))
    }

    fn find(&self, kind: EntityKind, filter: &RowFilter) -> CaseResult<Vec<StoredRow>> {
        let guard = self
            .rows
            .read()
            .map_err(|_| CaseError::backend("find", "rows lock poisoned"))?;
        let mut hits: Vec<&(u64, StoredRow)> = guard
            .by_key
            .values()
            .filter(|(_, row)| row.kind == kind && filter.matches(&row.state))
            .collect();
        hits.sort_by_key(|(seq, _)| *seq);
        Ok(hits.into_iter().map(|(_, row)| row.clone()).collect())
    }

    fn commit(&self, batch: WriteBatch) -> CaseResult<CommitReceipt> {
        let mut guard = self
            .rows
            .write()
            .map_err(|_| CaseError::backend("commit", "rows lock poisoned"))?;

        if let Some(err) = batch.ops.iter().find_map(|op| check(&guard, op).err()) {
            drop(guard);
            self.record(None)?;
            debug!(error = %err, "Commit rejected");
            return Err(err);
        }

        let mut receipt = CommitReceipt::default();
        for op in batch.ops {
            match op {
                WriteOp::Insert(row) => {
                    let seq = guard.next_seq;
                    guard.next_seq += 1;
                    guard.by_key.insert(row.key(), (seq, row));
                    receipt.inserted += 1;
                }
                WriteOp::Update {
                    mut row,
                    expected_revision,
                } => {
                    row.revision = expected_revision + 1;
                    let key = row.key();
                    if let Some(slot) = guard.by_key.get_mut(&key) {
                        slot.1 = row;
                    }
                    receipt.updated += 1;
                }
                WriteOp::Delete { kind, id, .. } => {
                    guard.by_key.remove(&(kind, id));
                    receipt.deleted += 1;
                }
            }
        }
        drop(guard);

        self.record(Some(receipt.writes()))?;
        debug!(
            inserted = receipt.inserted,
            updated = receipt.updated,
            deleted = receipt.deleted,
            "Commit applied"
        );
        Ok(receipt)
    }

    fn stats(&self) -> CaseResult<StoreStats> {
        let stats = self
            .stats
            .read()
            .map_err(|_| CaseError::backend("stats", "stats lock poisoned"))?;
        Ok(*stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: &str, revision: u32, state: serde_json::Value) -> StoredRow {
        StoredRow {
            kind: EntityKind::Task,
            id: id.to_string(),
            revision,
            state,
        }
    }

    fn insert(store: &InMemoryEntityStore, id: &str) {
        store
            .commit(WriteBatch {
                ops: vec![WriteOp::Insert(row(id, 1, json!({"name": id})))],
            })
            .unwrap();
    }

    #[test]
    fn test_update_bumps_revision_by_one() {
        let store = InMemoryEntityStore::new();
        insert(&store, "t1");

        store
            .commit(WriteBatch {
                ops: vec![WriteOp::Update {
                    row: row("t1", 0, json!({"name": "renamed"})),
                    expected_revision: 1,
                }],
            })
            .unwrap();

        let stored = store.fetch(EntityKind::Task, "t1").unwrap().unwrap();
        assert_eq!(stored.revision, 2);
        assert_eq!(stored.state["name"], "renamed");
    }

    #[test]
    fn test_stale_update_rejects_whole_batch() {
        let store = InMemoryEntityStore::new();
        insert(&store, "t1");

        let err = store
            .commit(WriteBatch {
                ops: vec![
                    WriteOp::Insert(row("t2", 1, json!({}))),
                    WriteOp::Update {
                        row: row("t1", 0, json!({"name": "x"})),
                        expected_revision: 7,
                    },
                ],
            })
            .unwrap_err();

        assert!(err.is_optimistic_lock());
        assert!(store.fetch(EntityKind::Task, "t2").unwrap().is_none());
        let stats = store.stats().unwrap();
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.rejected_commits, 1);
    }

    #[test]
    fn test_delete_of_missing_row_is_lock_failure() {
        let store = InMemoryEntityStore::new();
        let err = store
            .commit(WriteBatch {
                ops: vec![WriteOp::Delete {
                    kind: EntityKind::Task,
                    id: "ghost".into(),
                    expected_revision: 1,
                }],
            })
            .unwrap_err();
        match err {
            CaseError::OptimisticLock { actual, .. } => assert_eq!(actual, None),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_keeps_insertion_order() {
        let store = InMemoryEntityStore::new();
        for id in ["c", "a", "b"] {
            insert(&store, id);
        }
        let ids: Vec<String> = store
            .find(EntityKind::Task, &RowFilter::new())
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(store.count(EntityKind::Task).unwrap(), 3);
        assert_eq!(store.stats().unwrap().rows_written, 3);
    }
}

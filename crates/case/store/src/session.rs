//! The unit of work of one command
//!
//! Writes are buffered and coalesced per row; reads overlay the pending
//! writes; the whole buffer is committed in one batch by [`DbSession::flush`].

use crate::model::{CommitReceipt, RowFilter, RowKey, StoredRow, WriteBatch, WriteOp};
use crate::traits::EntityStore;
use case_types::{CaseError, CaseResult, PersistentEntity};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// What a flush did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub receipt: CommitReceipt,
    /// Updates dropped by the dirty check
    pub skipped_updates: usize,
}

pub struct DbSession {
    store: Arc<dyn EntityStore>,
    /// Persistent state as last loaded or last scheduled, per row
    snapshots: HashMap<RowKey, serde_json::Value>,
    pending: Vec<Option<WriteOp>>,
    index: HashMap<RowKey, usize>,
    skipped_updates: usize,
}

impl DbSession {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            snapshots: HashMap::new(),
            pending: Vec::new(),
            index: HashMap::new(),
            skipped_updates: 0,
        }
    }

    /// Number of row writes the next flush would send
    pub fn pending_writes(&self) -> usize {
        self.pending.iter().flatten().count()
    }

    pub fn is_deleted<E: PersistentEntity>(&self, id: &str) -> bool {
        matches!(
            self.pending_op(&(E::KIND, id.to_string())),
            Some(WriteOp::Delete { .. })
        )
    }

    fn pending_op(&self, key: &RowKey) -> Option<&WriteOp> {
        self.index
            .get(key)
            .and_then(|slot| self.pending.get(*slot))
            .and_then(Option::as_ref)
    }

    fn schedule(&mut self, op: WriteOp) {
        let key = op.key();
        match self.index.get(&key) {
            Some(slot) => self.pending[*slot] = Some(op),
            None => {
                self.index.insert(key, self.pending.len());
                self.pending.push(Some(op));
            }
        }
    }

    fn cancel(&mut self, key: &RowKey) {
        if let Some(slot) = self.index.remove(key) {
            self.pending[slot] = None;
        }
    }

    pub fn insert<E: PersistentEntity>(&mut self, entity: &E) -> CaseResult<()> {
        let row = StoredRow::from_entity(entity, 1)?;
        let key = row.key();
        let state = row.state.clone();
        let op = match self.pending_op(&key) {
            None => WriteOp::Insert(row),
            // Re-inserting a row deleted earlier in this command overwrites it.
            Some(WriteOp::Delete {
                expected_revision, ..
            }) => WriteOp::Update {
                row,
                expected_revision: *expected_revision,
            },
            Some(_) => {
                return Err(CaseError::illegal_state(
                    entity.id(),
                    "insert",
                    format!("{} is already scheduled for writing", E::KIND),
                ))
            }
        };
        self.schedule(op);
        self.snapshots.insert(key, state);
        Ok(())
    }

    /// Schedule an update. Returns false when the dirty check found nothing
    /// to write.
    pub fn update<E: PersistentEntity>(&mut self, entity: &E) -> CaseResult<bool> {
        let state = entity.persistent_state()?;
        let key: RowKey = (E::KIND, entity.id().to_string());

        if self.snapshots.get(&key) == Some(&state) {
            self.skipped_updates += 1;
            debug!(kind = %E::KIND, id = entity.id(), "Dirty check: unchanged, no write");
            return Ok(false);
        }

        let op = match self.pending_op(&key).cloned() {
            Some(WriteOp::Insert(mut row)) => {
                row.state = state.clone();
                WriteOp::Insert(row)
            }
            Some(WriteOp::Update {
                mut row,
                expected_revision,
            }) => {
                row.state = state.clone();
                WriteOp::Update {
                    row,
                    expected_revision,
                }
            }
            Some(WriteOp::Delete { .. }) => {
                return Err(CaseError::illegal_state(
                    entity.id(),
                    "update",
                    format!("{} was deleted in this command", E::KIND),
                ))
            }
            None => {
                if entity.revision() == 0 {
                    return Err(CaseError::illegal_state(
                        entity.id(),
                        "update",
                        format!("{} has never been inserted", E::KIND),
                    ));
                }
                WriteOp::Update {
                    row: StoredRow::from_entity(entity, entity.revision_next())?,
                    expected_revision: entity.revision(),
                }
            }
        };
        self.schedule(op);
        self.snapshots.insert(key, state);
        Ok(true)
    }

    pub fn delete<E: PersistentEntity>(&mut self, entity: &E) -> CaseResult<()> {
        let key: RowKey = (E::KIND, entity.id().to_string());
        self.snapshots.remove(&key);
        match self.pending_op(&key).cloned() {
            Some(WriteOp::Insert(_)) => self.cancel(&key),
            Some(WriteOp::Update {
                expected_revision, ..
            }) => self.schedule(WriteOp::Delete {
                kind: E::KIND,
                id: entity.id().to_string(),
                expected_revision,
            }),
            Some(WriteOp::Delete { .. }) => {}
            None => self.schedule(WriteOp::Delete {
                kind: E::KIND,
                id: entity.id().to_string(),
                expected_revision: entity.revision(),
            }),
        }
        Ok(())
    }

    fn decode_pending<E: PersistentEntity>(op: &WriteOp) -> CaseResult<Option<E>> {
        match op {
            WriteOp::Insert(row) => row.decode().map(Some),
            WriteOp::Update {
                row,
                expected_revision,
            } => E::from_persistent_state(&row.id, *expected_revision, row.state.clone()).map(Some),
            WriteOp::Delete { .. } => Ok(None),
        }
    }

    pub fn select_by_id<E: PersistentEntity>(&mut self, id: &str) -> CaseResult<Option<E>> {
        let key: RowKey = (E::KIND, id.to_string());
        if let Some(op) = self.pending_op(&key) {
            return Self::decode_pending(op);
        }
        match self.store.fetch(E::KIND, id)? {
            Some(row) => {
                let entity = row.decode()?;
                self.snapshots.insert(key, row.state);
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    pub fn select_list<E: PersistentEntity>(&mut self, filter: &RowFilter) -> CaseResult<Vec<E>> {
        let rows = self.store.find(E::KIND, filter)?;
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(rows.len());

        for row in rows {
            let key = row.key();
            seen.insert(key.clone());
            match self.pending_op(&key).cloned() {
                Some(op) => {
                    if op_matches(&op, filter) {
                        if let Some(entity) = Self::decode_pending(&op)? {
                            out.push(entity);
                        }
                    }
                }
                None => {
                    out.push(row.decode()?);
                    self.snapshots.insert(key, row.state);
                }
            }
        }

        for op in self.pending.iter().flatten() {
            if op.kind() == E::KIND && !seen.contains(&op.key()) && op_matches(op, filter) {
                if let Some(entity) = Self::decode_pending(op)? {
                    out.push(entity);
                }
            }
        }
        Ok(out)
    }

    /// Commit every pending write in one batch. An empty buffer never
    /// reaches the store.
    pub fn flush(self) -> CaseResult<FlushSummary> {
        let ops: Vec<WriteOp> = self.pending.into_iter().flatten().collect();
        if ops.is_empty() {
            debug!(skipped_updates = self.skipped_updates, "Nothing to flush");
            return Ok(FlushSummary {
                receipt: CommitReceipt::default(),
                skipped_updates: self.skipped_updates,
            });
        }
        debug!(writes = ops.len(), "Flushing session");
        let receipt = self.store.commit(WriteBatch { ops })?;
        Ok(FlushSummary {
            receipt,
            skipped_updates: self.skipped_updates,
        })
    }
}

fn op_matches(op: &WriteOp, filter: &RowFilter) -> bool {
    match op {
        WriteOp::Insert(row) | WriteOp::Update { row, .. } => filter.matches(&row.state),
        WriteOp::Delete { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryEntityStore;
    use case_types::{EntityKind, Task};
    use chrono::Utc;

    fn store() -> Arc<InMemoryEntityStore> {
        Arc::new(InMemoryEntityStore::new())
    }

    fn persisted_task(store: &Arc<InMemoryEntityStore>) -> Task {
        let task = Task::create(Utc::now()).with_name("Review");
        let mut session = DbSession::new(store.clone());
        session.insert(&task).unwrap();
        session.flush().unwrap();
        task
    }

    #[test]
    fn test_unchanged_update_writes_nothing() {
        let store = store();
        let task = persisted_task(&store);
        let writes_before = store.stats().unwrap().rows_written;

        let mut session = DbSession::new(store.clone());
        let loaded: Task = session.select_by_id(task.id.as_str()).unwrap().unwrap();
        assert!(!session.update(&loaded).unwrap());
        assert_eq!(session.pending_writes(), 0);
        let summary = session.flush().unwrap();

        assert_eq!(summary.skipped_updates, 1);
        assert_eq!(summary.receipt.writes(), 0);
        assert_eq!(store.stats().unwrap().rows_written, writes_before);
        assert_eq!(store.stats().unwrap().commits, 1);
    }

    #[test]
    fn test_repeated_updates_coalesce() {
        let store = store();
        let task = persisted_task(&store);

        let mut session = DbSession::new(store.clone());
        let mut loaded: Task = session.select_by_id(task.id.as_str()).unwrap().unwrap();
        loaded.name = Some("One".into());
        session.update(&loaded).unwrap();
        loaded.name = Some("Two".into());
        session.update(&loaded).unwrap();
        assert_eq!(session.pending_writes(), 1);
        session.flush().unwrap();

        let row = store.fetch(EntityKind::Task, task.id.as_str()).unwrap().unwrap();
        assert_eq!(row.revision, 2);
        assert_eq!(row.state["name"], "Two");
    }

    #[test]
    fn test_delete_cancels_pending_insert() {
        let store = store();
        let task = Task::create(Utc::now());
        let mut session = DbSession::new(store.clone());
        session.insert(&task).unwrap();
        session.delete(&task).unwrap();
        assert_eq!(session.pending_writes(), 0);
        session.flush().unwrap();
        assert_eq!(store.stats().unwrap().commits, 0);
        assert!(store.fetch(EntityKind::Task, task.id.as_str()).unwrap().is_none());
    }

    #[test]
    fn test_reads_overlay_pending_writes() {
        let store = store();
        let existing = persisted_task(&store);
        let fresh = Task::create(Utc::now()).with_name("Review");

        let mut session = DbSession::new(store.clone());
        session.insert(&fresh).unwrap();
        let loaded: Task = session.select_by_id(existing.id.as_str()).unwrap().unwrap();
        session.delete(&loaded).unwrap();

        let filter = RowFilter::new().field_eq("name", "Review");
        let visible: Vec<Task> = session.select_list(&filter).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, fresh.id);
        assert!(session
            .select_by_id::<Task>(existing.id.as_str())
            .unwrap()
            .is_none());
        assert!(session.is_deleted::<Task>(existing.id.as_str()));
    }

    #[test]
    fn test_stale_session_fails_on_flush() {
        let store = store();
        let task = persisted_task(&store);

        let mut first = DbSession::new(store.clone());
        let mut second = DbSession::new(store.clone());
        let mut a: Task = first.select_by_id(task.id.as_str()).unwrap().unwrap();
        let mut b: Task = second.select_by_id(task.id.as_str()).unwrap().unwrap();
        a.priority = 10;
        b.priority = 90;
        first.update(&a).unwrap();
        second.update(&b).unwrap();

        first.flush().unwrap();
        let err = second.flush().unwrap_err();
        assert!(err.is_optimistic_lock());

        let row = store.fetch(EntityKind::Task, task.id.as_str()).unwrap().unwrap();
        assert_eq!(row.revision, 2);
        assert_eq!(row.state["priority"], 10);
    }

    #[test]
    fn test_update_of_never_inserted_entity_rejected() {
        let mut session = DbSession::new(store());
        let task = Task::create(Utc::now());
        assert!(session.update(&task).is_err());
    }
}

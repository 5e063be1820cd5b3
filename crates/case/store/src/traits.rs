use crate::model::{CommitReceipt, RowFilter, StoreStats, StoredRow, WriteBatch};
use case_types::{CaseResult, EntityKind};

/// Row storage with revision-checked, all-or-nothing commits.
pub trait EntityStore: Send + Sync {
    fn fetch(&self, kind: EntityKind, id: &str) -> CaseResult<Option<StoredRow>>;

    /// Rows of one kind matching the filter, in insertion order.
    fn find(&self, kind: EntityKind, filter: &RowFilter) -> CaseResult<Vec<StoredRow>>;

    /// Apply a batch atomically. Any insert over an existing row, or any
    /// update/delete whose expected revision differs from the stored one,
    /// rejects the whole batch.
    fn commit(&self, batch: WriteBatch) -> CaseResult<CommitReceipt>;

    fn stats(&self) -> CaseResult<StoreStats>;
}

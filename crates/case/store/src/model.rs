//! Rows, write operations and filters exchanged with an entity store

use case_types::{CaseError, CaseResult, EntityKind, PersistentEntity};
use serde::Serialize;

/// Primary key of a stored row
pub type RowKey = (EntityKind, String);

/// One stored entity: identity, revision and persistent state
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRow {
    pub kind: EntityKind,
    pub id: String,
    pub revision: u32,
    pub state: serde_json::Value,
}

impl StoredRow {
    pub fn from_entity<E: PersistentEntity>(entity: &E, revision: u32) -> CaseResult<Self> {
        Ok(Self {
            kind: E::KIND,
            id: entity.id().to_string(),
            revision,
            state: entity.persistent_state()?,
        })
    }

    pub fn key(&self) -> RowKey {
        (self.kind, self.id.clone())
    }

    pub fn decode<E: PersistentEntity>(&self) -> CaseResult<E> {
        if self.kind != E::KIND {
            return Err(CaseError::backend(
                "decode",
                format!("row {} is a {}, not a {}", self.id, self.kind, E::KIND),
            ));
        }
        E::from_persistent_state(&self.id, self.revision, self.state.clone())
    }
}

/// A buffered write
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    Insert(StoredRow),
    Update {
        row: StoredRow,
        expected_revision: u32,
    },
    Delete {
        kind: EntityKind,
        id: String,
        expected_revision: u32,
    },
}

impl WriteOp {
    pub fn key(&self) -> RowKey {
        match self {
            Self::Insert(row) | Self::Update { row, .. } => row.key(),
            Self::Delete { kind, id, .. } => (*kind, id.clone()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Insert(row) | Self::Update { row, .. } => row.kind,
            Self::Delete { kind, .. } => *kind,
        }
    }
}

/// All writes of one command, applied atomically
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Outcome of a successful commit
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl CommitReceipt {
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Store counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub commits: u64,
    pub rejected_commits: u64,
    pub rows_written: u64,
}

/// Conjunction of top-level field equalities over a row's state.
/// A missing field compares equal to `null`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowFilter {
    equals: Vec<(String, serde_json::Value)>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    /// Equality against the serialized form of `value`.
    pub fn field_eq_serialized<T: Serialize>(self, field: &str, value: &T) -> CaseResult<Self> {
        let json = serde_json::to_value(value).map_err(|e| CaseError::serialization(field, e))?;
        Ok(self.field_eq(field, json))
    }

    pub fn matches(&self, state: &serde_json::Value) -> bool {
        self.equals.iter().all(|(field, expected)| {
            state.get(field).unwrap_or(&serde_json::Value::Null) == expected
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_types::{ScopeRef, TaskId};
    use serde_json::json;

    #[test]
    fn test_filter_matches_fields_and_missing_as_null() {
        let state = json!({"name": "x", "scope": {"kind": "task", "id": "t1"}});
        let filter = RowFilter::new()
            .field_eq("name", "x")
            .field_eq_serialized("scope", &ScopeRef::Task(TaskId::new("t1")))
            .unwrap();
        assert!(filter.matches(&state));
        assert!(RowFilter::new().field_eq("owner", serde_json::Value::Null).matches(&state));
        assert!(!RowFilter::new().field_eq("name", "y").matches(&state));
    }

    #[test]
    fn test_write_op_keys() {
        let op = WriteOp::Delete {
            kind: EntityKind::Task,
            id: "t1".into(),
            expected_revision: 1,
        };
        assert_eq!(op.key(), (EntityKind::Task, "t1".to_string()));
        assert_eq!(op.kind(), EntityKind::Task);
    }
}

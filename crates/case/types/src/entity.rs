//! The persistent-entity contract shared by everything the store keeps

use crate::{CaseError, CaseResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The stored entity families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Execution,
    VariableInstance,
    IdentityLink,
    HistoryEntry,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Execution => "execution",
            Self::VariableInstance => "variable_instance",
            Self::IdentityLink => "identity_link",
            Self::HistoryEntry => "history_entry",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract for entities persisted by the entity store.
///
/// The serialized form of an entity is its persistent state. Fields that
/// must not reach the store (revision, lazily loaded associations, transient
/// bookkeeping) are `#[serde(skip)]`; the store tracks the revision next to
/// the state.
pub trait PersistentEntity: Clone + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Revision as last read from (or written to) the store. Zero means the
    /// entity has never been persisted.
    fn revision(&self) -> u32;

    fn set_revision(&mut self, revision: u32);

    fn revision_next(&self) -> u32 {
        self.revision() + 1
    }

    /// Snapshot of the persistable fields, compared by the dirty check.
    fn persistent_state(&self) -> CaseResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| CaseError::serialization(self.id(), e))
    }

    /// Rebuild an entity from stored state.
    fn from_persistent_state(
        id: &str,
        revision: u32,
        state: serde_json::Value,
    ) -> CaseResult<Self> {
        let mut entity: Self =
            serde_json::from_value(state).map_err(|e| CaseError::serialization(id, e))?;
        entity.set_revision(revision);
        entity.after_load();
        Ok(entity)
    }

    /// Hook run after the entity has been read back from the store.
    fn after_load(&mut self) {}
}

//! Audit history entries

use crate::{
    EntityKind, HistoryEntryId, IdentityLinkType, LinkOwner, PersistentEntity, Principal,
    ScopeRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How much history the engine keeps. Levels are ordered.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HistoryLevel {
    None,
    Activity,
    #[default]
    Audit,
    Full,
}

impl HistoryLevel {
    pub fn is_at_least(self, other: HistoryLevel) -> bool {
        self >= other
    }
}

/// Mutable task fields with their own history entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    Name,
    Description,
    Assignee,
    Owner,
    DueDate,
    Priority,
    Category,
    ParentTaskId,
    FormKey,
    DelegationState,
    ExecutionId,
    TaskDefinitionKey,
    SuspensionState,
}

impl std::fmt::Display for TaskField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Assignee => "assignee",
            Self::Owner => "owner",
            Self::DueDate => "due_date",
            Self::Priority => "priority",
            Self::Category => "category",
            Self::ParentTaskId => "parent_task_id",
            Self::FormKey => "form_key",
            Self::DelegationState => "delegation_state",
            Self::ExecutionId => "execution_id",
            Self::TaskDefinitionKey => "task_definition_key",
            Self::SuspensionState => "suspension_state",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableChange {
    Created,
    Updated,
    Deleted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    TaskCreated {
        execution_id: Option<String>,
    },
    TaskFieldChanged {
        field: TaskField,
        value: serde_json::Value,
    },
    TaskEnded {
        reason: String,
    },
    VariableChanged {
        name: String,
        value: serde_json::Value,
        scope: ScopeRef,
        change: VariableChange,
    },
    IdentityLinkChanged {
        principal: Principal,
        link_type: IdentityLinkType,
        owner: LinkOwner,
        added: bool,
    },
}

impl HistoryEvent {
    /// Lowest level at which the entry is kept
    pub fn required_level(&self) -> HistoryLevel {
        match self {
            Self::TaskCreated { .. } | Self::TaskEnded { .. } => HistoryLevel::Activity,
            Self::TaskFieldChanged { .. } | Self::IdentityLinkChanged { .. } => HistoryLevel::Audit,
            Self::VariableChanged { .. } => HistoryLevel::Full,
        }
    }
}

/// One persisted audit row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    #[serde(skip)]
    pub revision: u32,
    pub entity_id: String,
    pub event: HistoryEvent,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(entity_id: impl Into<String>, event: HistoryEvent, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: HistoryEntryId::generate(),
            revision: 0,
            entity_id: entity_id.into(),
            event,
            recorded_at,
        }
    }

    pub fn field(&self) -> Option<TaskField> {
        match &self.event {
            HistoryEvent::TaskFieldChanged { field, .. } => Some(*field),
            _ => None,
        }
    }
}

impl PersistentEntity for HistoryEntry {
    const KIND: EntityKind = EntityKind::HistoryEntry;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(HistoryLevel::Full.is_at_least(HistoryLevel::Audit));
        assert!(HistoryLevel::Audit.is_at_least(HistoryLevel::Audit));
        assert!(!HistoryLevel::Activity.is_at_least(HistoryLevel::Audit));
        assert!(!HistoryLevel::None.is_at_least(HistoryLevel::Activity));
    }

    #[test]
    fn test_required_levels() {
        let field = HistoryEvent::TaskFieldChanged {
            field: TaskField::Assignee,
            value: serde_json::json!("bob"),
        };
        assert_eq!(field.required_level(), HistoryLevel::Audit);
        let ended = HistoryEvent::TaskEnded {
            reason: "completed".into(),
        };
        assert_eq!(ended.required_level(), HistoryLevel::Activity);
    }

    #[test]
    fn test_entry_field_accessor() {
        let entry = HistoryEntry::new(
            "t1",
            HistoryEvent::TaskFieldChanged {
                field: TaskField::Priority,
                value: serde_json::json!(70),
            },
            Utc::now(),
        );
        assert_eq!(entry.field(), Some(TaskField::Priority));
        assert_eq!(TaskField::DueDate.to_string(), "due_date");
    }
}

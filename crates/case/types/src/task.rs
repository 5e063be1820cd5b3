//! The task entity
//!
//! Plain data plus the capability traits. The cascading operations
//! (history, events, listeners, participant links) live in the engine and
//! run inside a command.

use crate::{
    Assignable, CaseResult, Delegable, EntityKind, ExecutionId, IdentityLink, Lazy,
    PersistentEntity, ScopeRef, Scoped, TaskId, VariableContext, VariableScope,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRIORITY: i32 = 50;

pub const DELETE_REASON_COMPLETED: &str = "completed";
pub const DELETE_REASON_DELETED: &str = "deleted";

/// Delegation sub-state of a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelegationState {
    /// Delegated; the delegate must resolve before the owner completes
    Pending,
    /// Handed back to the owner
    Resolved,
}

impl std::fmt::Display for DelegationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuspensionState {
    #[default]
    Active,
    Suspended,
}

/// A unit of human work
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(skip)]
    pub revision: u32,
    pub name: Option<String>,
    #[serde(skip)]
    pub localized_name: Option<String>,
    pub description: Option<String>,
    #[serde(skip)]
    pub localized_description: Option<String>,
    pub owner: Option<String>,
    pub assignee: Option<String>,
    /// Assignee value the assignment listener last fired for
    #[serde(skip)]
    pub last_fired_assignee: Option<String>,
    pub delegation_state: Option<DelegationState>,
    pub priority: i32,
    pub create_time: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub suspension_state: SuspensionState,
    pub parent_task_id: Option<TaskId>,
    pub execution_id: Option<ExecutionId>,
    pub process_instance_id: Option<ExecutionId>,
    pub process_definition_id: Option<String>,
    pub task_definition_key: Option<String>,
    pub form_key: Option<String>,
    pub tenant_id: Option<String>,
    #[serde(skip)]
    pub identity_links: Lazy<Vec<IdentityLink>>,
    #[serde(skip)]
    pub variables: VariableScope,
}

impl Task {
    /// Factory for a new, not yet inserted task. Its identity links and
    /// variables start out loaded and empty.
    pub fn create(create_time: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::generate(),
            revision: 0,
            name: None,
            localized_name: None,
            description: None,
            localized_description: None,
            owner: None,
            assignee: None,
            last_fired_assignee: None,
            delegation_state: None,
            priority: DEFAULT_PRIORITY,
            create_time,
            due_date: None,
            category: None,
            suspension_state: SuspensionState::Active,
            parent_task_id: None,
            execution_id: None,
            process_instance_id: None,
            process_definition_id: None,
            task_definition_key: None,
            form_key: None,
            tenant_id: None,
            identity_links: Lazy::fresh(Vec::new()),
            variables: VariableScope::transient(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_task_definition_key(mut self, key: impl Into<String>) -> Self {
        self.task_definition_key = Some(key.into());
        self
    }

    pub fn with_execution(mut self, execution_id: ExecutionId, process_instance_id: ExecutionId) -> Self {
        self.execution_id = Some(execution_id);
        self.process_instance_id = Some(process_instance_id);
        self
    }

    /// Localized name when one is set, otherwise the stored name.
    pub fn display_name(&self) -> Option<&str> {
        match self.localized_name.as_deref() {
            Some(localized) if !localized.is_empty() => Some(localized),
            _ => self.name.as_deref(),
        }
    }

    pub fn display_description(&self) -> Option<&str> {
        match self.localized_description.as_deref() {
            Some(localized) if !localized.is_empty() => Some(localized),
            _ => self.description.as_deref(),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension_state == SuspensionState::Suspended
    }

    /// Identity links from the loaded cache
    pub fn cached_identity_links(&self) -> CaseResult<&Vec<IdentityLink>> {
        self.identity_links.get(self.id.as_str(), "identity_links")
    }
}

impl PersistentEntity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }

    fn after_load(&mut self) {
        self.last_fired_assignee = self.assignee.clone();
    }
}

impl Assignable for Task {
    fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

impl Delegable for Task {
    fn delegation_state(&self) -> Option<DelegationState> {
        self.delegation_state
    }
}

impl Scoped for Task {
    fn scope_ref(&self) -> ScopeRef {
        ScopeRef::Task(self.id.clone())
    }

    fn variable_context(&self) -> VariableContext {
        VariableContext {
            task_id: Some(self.id.clone()),
            execution_id: self.execution_id.clone(),
            process_instance_id: self.process_instance_id.clone(),
        }
    }

    fn parent_execution_id(&self) -> Option<&ExecutionId> {
        self.execution_id.as_ref()
    }

    fn variable_scope(&self) -> &VariableScope {
        &self.variables
    }

    fn variable_scope_mut(&mut self) -> &mut VariableScope {
        &mut self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults() {
        let task = Task::create(Utc::now());
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert_eq!(task.revision, 0);
        assert_eq!(task.suspension_state, SuspensionState::Active);
        assert!(task.cached_identity_links().unwrap().is_empty());
        assert!(task.cached_variable_local("x").unwrap().is_none());
    }

    #[test]
    fn test_display_name_prefers_localized() {
        let mut task = Task::create(Utc::now()).with_name("Review");
        assert_eq!(task.display_name(), Some("Review"));
        task.localized_name = Some(String::new());
        assert_eq!(task.display_name(), Some("Review"));
        task.localized_name = Some("Prüfen".into());
        assert_eq!(task.display_name(), Some("Prüfen"));
    }

    #[test]
    fn test_load_resets_transient_state() {
        let mut task = Task::create(Utc::now());
        task.assignee = Some("kermit".into());
        let state = task.persistent_state().unwrap();
        assert!(state.get("revision").is_none());
        assert!(state.get("last_fired_assignee").is_none());

        let loaded = Task::from_persistent_state(task.id(), 2, state).unwrap();
        assert_eq!(loaded.revision, 2);
        assert_eq!(loaded.last_fired_assignee.as_deref(), Some("kermit"));
        assert!(loaded.cached_identity_links().is_err());
        assert!(loaded.cached_variable_local("x").is_err());
    }

    #[test]
    fn test_delegation_state_wire_form() {
        assert_eq!(
            serde_json::to_value(DelegationState::Pending).unwrap(),
            serde_json::json!("PENDING")
        );
    }
}

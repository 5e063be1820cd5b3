//! History recording
//!
//! [`HistoryManager`] exposes one call per recorded change and drops entries
//! below the configured level. The [`HistoryRecorder`] behind it decides
//! where entries go; the default writes them through the command's session so
//! they commit or roll back with the mutation that produced them.

use case_store::DbSession;
use case_types::{
    CaseResult, HistoryEntry, HistoryEvent, HistoryLevel, IdentityLink, ScopeRef, Task, TaskField,
    TaskId, VariableChange, VariableInstance,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

/// Sink for history entries
pub trait HistoryRecorder: Send + Sync {
    fn record(&self, session: &mut DbSession, entry: HistoryEntry) -> CaseResult<()>;
}

/// Persists entries as `HistoryEntry` rows in the command's unit of work
#[derive(Debug, Default)]
pub struct StoreHistoryRecorder;

impl HistoryRecorder for StoreHistoryRecorder {
    fn record(&self, session: &mut DbSession, entry: HistoryEntry) -> CaseResult<()> {
        trace!(entity_id = %entry.entity_id, event = ?entry.event, "History entry");
        session.insert(&entry)
    }
}

/// Per-command view of the history recorder
pub struct HistoryManager<'a> {
    pub(crate) session: &'a mut DbSession,
    pub(crate) recorder: &'a dyn HistoryRecorder,
    pub(crate) level: HistoryLevel,
    pub(crate) now: DateTime<Utc>,
}

impl HistoryManager<'_> {
    fn record(&mut self, entity_id: &str, event: HistoryEvent) -> CaseResult<()> {
        if !self.level.is_at_least(event.required_level()) {
            return Ok(());
        }
        let entry = HistoryEntry::new(entity_id, event, self.now);
        self.recorder.record(self.session, entry)
    }

    fn field_change<T: Serialize>(&mut self, task_id: &TaskId, field: TaskField, value: T) -> CaseResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| case_types::CaseError::serialization(task_id.as_str(), e))?;
        self.record(task_id.as_str(), HistoryEvent::TaskFieldChanged { field, value })
    }

    pub fn record_task_created(&mut self, task: &Task) -> CaseResult<()> {
        self.record(
            task.id.as_str(),
            HistoryEvent::TaskCreated {
                execution_id: task.execution_id.as_ref().map(|id| id.to_string()),
            },
        )
    }

    pub fn record_task_ended(&mut self, task_id: &TaskId, reason: &str) -> CaseResult<()> {
        self.record(
            task_id.as_str(),
            HistoryEvent::TaskEnded {
                reason: reason.to_string(),
            },
        )
    }

    pub fn record_task_name_change(&mut self, task_id: &TaskId, name: Option<&str>) -> CaseResult<()> {
        self.field_change(task_id, TaskField::Name, name)
    }

    pub fn record_task_description_change(
        &mut self,
        task_id: &TaskId,
        description: Option<&str>,
    ) -> CaseResult<()> {
        self.field_change(task_id, TaskField::Description, description)
    }

    pub fn record_task_assignee_change(
        &mut self,
        task_id: &TaskId,
        assignee: Option<&str>,
    ) -> CaseResult<()> {
        self.field_change(task_id, TaskField::Assignee, assignee)
    }

    pub fn record_task_owner_change(&mut self, task_id: &TaskId, owner: Option<&str>) -> CaseResult<()> {
        self.field_change(task_id, TaskField::Owner, owner)
    }

    pub fn record_task_due_date_change(
        &mut self,
        task_id: &TaskId,
        due_date: Option<DateTime<Utc>>,
    ) -> CaseResult<()> {
        self.field_change(task_id, TaskField::DueDate, due_date)
    }

    pub fn record_task_priority_change(&mut self, task_id: &TaskId, priority: i32) -> CaseResult<()> {
        self.field_change(task_id, TaskField::Priority, priority)
    }

    pub fn record_task_category_change(
        &mut self,
        task_id: &TaskId,
        category: Option<&str>,
    ) -> CaseResult<()> {
        self.field_change(task_id, TaskField::Category, category)
    }

    pub fn record_task_parent_task_id_change(
        &mut self,
        task_id: &TaskId,
        parent_task_id: Option<&TaskId>,
    ) -> CaseResult<()> {
        self.field_change(task_id, TaskField::ParentTaskId, parent_task_id)
    }

    pub fn record_task_form_key_change(
        &mut self,
        task_id: &TaskId,
        form_key: Option<&str>,
    ) -> CaseResult<()> {
        self.field_change(task_id, TaskField::FormKey, form_key)
    }

    pub fn record_task_definition_key_change(
        &mut self,
        task_id: &TaskId,
        key: Option<&str>,
    ) -> CaseResult<()> {
        self.field_change(task_id, TaskField::TaskDefinitionKey, key)
    }

    pub fn record_task_delegation_state_change(&mut self, task: &Task) -> CaseResult<()> {
        self.field_change(&task.id, TaskField::DelegationState, task.delegation_state)
    }

    pub fn record_task_suspension_state_change(&mut self, task: &Task) -> CaseResult<()> {
        self.field_change(&task.id, TaskField::SuspensionState, task.suspension_state)
    }

    pub fn record_task_execution_id_change(&mut self, task: &Task) -> CaseResult<()> {
        self.field_change(&task.id, TaskField::ExecutionId, task.execution_id.as_ref())
    }

    pub fn record_variable_change(
        &mut self,
        variable: &VariableInstance,
        change: VariableChange,
    ) -> CaseResult<()> {
        let scope: &ScopeRef = &variable.scope;
        self.record(
            scope.id(),
            HistoryEvent::VariableChanged {
                name: variable.name.clone(),
                value: variable.value.clone(),
                scope: scope.clone(),
                change,
            },
        )
    }

    pub fn record_identity_link_change(&mut self, link: &IdentityLink, added: bool) -> CaseResult<()> {
        self.record(
            link.owner.id(),
            HistoryEvent::IdentityLinkChanged {
                principal: link.principal.clone(),
                link_type: link.link_type.clone(),
                owner: link.owner.clone(),
                added,
            },
        )
    }
}

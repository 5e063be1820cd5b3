//! The runtime execution a task is bound to

use crate::{
    EntityKind, ExecutionId, PersistentEntity, ScopeRef, Scoped, TaskId, VariableContext,
    VariableScope,
};
use serde::{Deserialize, Serialize};

/// A path of execution. The root execution of a process instance has
/// `id == process_instance_id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    #[serde(skip)]
    pub revision: u32,
    pub process_instance_id: ExecutionId,
    pub process_definition_id: Option<String>,
    pub activity_id: Option<String>,
    pub tenant_id: Option<String>,
    /// Open tasks bound to this execution
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
    pub waiting: bool,
    pub signal_count: u32,
    #[serde(skip)]
    pub variables: VariableScope,
}

impl Execution {
    pub fn new_process_instance(process_definition_id: Option<String>) -> Self {
        let id = ExecutionId::generate();
        Self {
            process_instance_id: id.clone(),
            id,
            revision: 0,
            process_definition_id,
            activity_id: None,
            tenant_id: None,
            task_ids: Vec::new(),
            waiting: false,
            signal_count: 0,
            variables: VariableScope::transient(),
        }
    }

    pub fn new_child(parent: &Execution) -> Self {
        Self {
            id: ExecutionId::generate(),
            revision: 0,
            process_instance_id: parent.process_instance_id.clone(),
            process_definition_id: parent.process_definition_id.clone(),
            activity_id: None,
            tenant_id: parent.tenant_id.clone(),
            task_ids: Vec::new(),
            waiting: false,
            signal_count: 0,
            variables: VariableScope::transient(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_activity(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn is_process_instance(&self) -> bool {
        self.id == self.process_instance_id
    }

    /// Bind a task; the execution now waits for it.
    pub fn add_task(&mut self, task_id: TaskId) {
        if !self.task_ids.contains(&task_id) {
            self.task_ids.push(task_id);
        }
        self.waiting = true;
    }

    pub fn remove_task(&mut self, task_id: &TaskId) -> bool {
        let before = self.task_ids.len();
        self.task_ids.retain(|id| id != task_id);
        before != self.task_ids.len()
    }

    /// Continue past the wait state.
    pub fn signal(&mut self) {
        self.waiting = false;
        self.signal_count += 1;
    }
}

impl PersistentEntity for Execution {
    const KIND: EntityKind = EntityKind::Execution;

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

impl Scoped for Execution {
    fn scope_ref(&self) -> ScopeRef {
        ScopeRef::for_execution(&self.id, &self.process_instance_id)
    }

    fn variable_context(&self) -> VariableContext {
        VariableContext {
            task_id: None,
            execution_id: Some(self.id.clone()),
            process_instance_id: Some(self.process_instance_id.clone()),
        }
    }

    fn parent_execution_id(&self) -> Option<&ExecutionId> {
        None
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
    fn test_process_instance_is_its_own_root() {
        let pi = Execution::new_process_instance(Some("order:1".into()));
        assert!(pi.is_process_instance());
        assert_eq!(pi.scope_ref(), ScopeRef::ProcessInstance(pi.id.clone()));

        let child = Execution::new_child(&pi);
        assert!(!child.is_process_instance());
        assert_eq!(child.process_instance_id, pi.id);
    }

    #[test]
    fn test_task_binding_and_signal() {
        let mut ex = Execution::new_process_instance(None);
        let t = TaskId::new("t1");
        ex.add_task(t.clone());
        ex.add_task(t.clone());
        assert_eq!(ex.task_ids.len(), 1);
        assert!(ex.waiting);

        assert!(ex.remove_task(&t));
        assert!(!ex.remove_task(&t));
        ex.signal();
        assert!(!ex.waiting);
        assert_eq!(ex.signal_count, 1);
    }
}

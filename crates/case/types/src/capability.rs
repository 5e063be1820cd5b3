//! Capability traits composed onto entities

use crate::{CaseResult, DelegationState, ExecutionId, ScopeRef, VariableContext, VariableScope};

/// Something that has an assignee and an owner
pub trait Assignable {
    fn assignee(&self) -> Option<&str>;
    fn owner(&self) -> Option<&str>;
}

/// Something whose work can be handed to another user and handed back
pub trait Delegable: Assignable {
    fn delegation_state(&self) -> Option<DelegationState>;

    fn is_delegation_pending(&self) -> bool {
        self.delegation_state() == Some(DelegationState::Pending)
    }
}

/// Something that owns a variable scope
pub trait Scoped {
    fn scope_ref(&self) -> ScopeRef;

    /// Triple stamped on variables created in this scope
    fn variable_context(&self) -> VariableContext;

    /// Execution whose scope is consulted when a name is not found locally
    fn parent_execution_id(&self) -> Option<&ExecutionId>;

    fn variable_scope(&self) -> &VariableScope;

    fn variable_scope_mut(&mut self) -> &mut VariableScope;

    /// Read a local variable from the loaded cache without touching the store.
    fn cached_variable_local(&self, name: &str) -> CaseResult<Option<&serde_json::Value>> {
        let scope = self.scope_ref();
        Ok(self
            .variable_scope()
            .instances(scope.id(), "get_variable_local")?
            .get(name)
            .map(|v| &v.value))
    }
}

//! The command context
//!
//! One value per running command, passed explicitly to every operation. It
//! owns the unit of work and the command token; lazily loaded associations
//! are bound to that token and become unreadable once the context is gone.

use crate::config::EngineConfig;
use crate::dispatcher::EventDispatcher;
use crate::history::{HistoryManager, HistoryRecorder};
use crate::listeners::{TaskEvent, TaskListenerRegistry};
use case_store::{DbSession, EntityStore, FlushSummary};
use case_types::{
    CaseError, CaseResult, CommandToken, EngineEvent, EntityKind, Execution, ExecutionId, Scoped,
    Task, TaskId, VariableInstance,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

/// Deactivates the command token however the context ends
struct TokenGuard(Arc<CommandToken>);

impl Drop for TokenGuard {
    fn drop(&mut self) {
        self.0.deactivate();
    }
}

pub struct CommandContext<'e> {
    guard: TokenGuard,
    session: DbSession,
    dispatcher: &'e EventDispatcher,
    recorder: &'e dyn HistoryRecorder,
    listeners: &'e TaskListenerRegistry,
    config: &'e EngineConfig,
    authenticated_user: Option<String>,
    /// Executions resolved as parent variable scopes, keeping their loaded
    /// variables for the rest of the command
    parent_scopes: HashMap<ExecutionId, Execution>,
}

impl<'e> CommandContext<'e> {
    pub fn new(
        store: Arc<dyn EntityStore>,
        dispatcher: &'e EventDispatcher,
        recorder: &'e dyn HistoryRecorder,
        listeners: &'e TaskListenerRegistry,
        config: &'e EngineConfig,
        authenticated_user: Option<String>,
    ) -> Self {
        Self {
            guard: TokenGuard(CommandToken::new()),
            session: DbSession::new(store),
            dispatcher,
            recorder,
            listeners,
            config,
            authenticated_user,
            parent_scopes: HashMap::new(),
        }
    }

    pub fn token(&self) -> &Arc<CommandToken> {
        &self.guard.0
    }

    pub fn command_id(&self) -> u64 {
        self.guard.0.id()
    }

    pub fn ensure_active(&self, entity_id: &str, operation: &str) -> CaseResult<()> {
        if self.guard.0.is_active() {
            Ok(())
        } else {
            Err(CaseError::context(entity_id, operation))
        }
    }

    pub fn session(&mut self) -> &mut DbSession {
        &mut self.session
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn authenticated_user(&self) -> Option<&str> {
        self.authenticated_user.as_deref()
    }

    pub fn is_event_dispatch_enabled(&self) -> bool {
        self.dispatcher.is_enabled()
    }

    /// Build and dispatch an event. The builder only runs when dispatch is
    /// enabled.
    pub fn dispatch_event<F>(&self, build: F) -> CaseResult<()>
    where
        F: FnOnce() -> CaseResult<EngineEvent>,
    {
        if !self.dispatcher.is_enabled() {
            return Ok(());
        }
        let event = build()?;
        self.dispatcher.dispatch(&event)
    }

    pub fn history(&mut self) -> HistoryManager<'_> {
        HistoryManager {
            session: &mut self.session,
            recorder: self.recorder,
            level: self.config.history_level,
            now: Utc::now(),
        }
    }

    pub fn fire_task_listeners(&self, event: TaskEvent, task: &Task) -> CaseResult<()> {
        self.listeners.fire(event, task)
    }

    pub fn find_task(&mut self, task_id: &TaskId, operation: &str) -> CaseResult<Task> {
        self.session
            .select_by_id::<Task>(task_id.as_str())?
            .ok_or_else(|| CaseError::not_found(EntityKind::Task.as_str(), task_id.as_str(), operation))
    }

    pub fn find_execution(&mut self, execution_id: &ExecutionId, operation: &str) -> CaseResult<Execution> {
        self.session
            .select_by_id::<Execution>(execution_id.as_str())?
            .ok_or_else(|| {
                CaseError::not_found(EntityKind::Execution.as_str(), execution_id.as_str(), operation)
            })
    }

    /// Take the parent scope `execution_id` out of the command's cache,
    /// loading it on first use. Hand it back with
    /// [`return_parent_scope`](Self::return_parent_scope).
    pub(crate) fn take_parent_scope(
        &mut self,
        execution_id: &ExecutionId,
        operation: &str,
    ) -> CaseResult<Execution> {
        match self.parent_scopes.remove(execution_id) {
            Some(execution) => Ok(execution),
            None => self.find_execution(execution_id, operation),
        }
    }

    pub(crate) fn return_parent_scope(&mut self, execution: Execution) {
        self.parent_scopes.insert(execution.id.clone(), execution);
    }

    /// Mirror a variable write made through another handle into the cached
    /// parent scope owning it.
    pub(crate) fn sync_parent_scope(&mut self, variable: &VariableInstance, removed: bool) {
        let token = Arc::clone(&self.guard.0);
        let scope_id = variable.scope.id();
        let Some(execution) = self
            .parent_scopes
            .values_mut()
            .find(|execution| execution.id.as_str() == scope_id)
        else {
            return;
        };
        if !execution.variable_scope().is_initialized_in(&token) {
            return;
        }
        if let Ok(instances) = execution
            .variable_scope_mut()
            .instances_mut(scope_id, "sync_parent_scope")
        {
            if removed {
                instances.remove(&variable.name);
            } else {
                instances.insert(variable.name.clone(), variable.clone());
            }
        }
    }

    /// End the command: commit the unit of work, then deactivate the token.
    /// The token reports the command committed only if the flush succeeded.
    pub fn close(self) -> CaseResult<FlushSummary> {
        let CommandContext { guard, session, .. } = self;
        let summary = session.flush()?;
        guard.0.mark_committed();
        Ok(summary)
    }
}

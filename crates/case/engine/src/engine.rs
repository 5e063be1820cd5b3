//! The engine facade
//!
//! [`CaseEngine`] owns the store, the dispatcher, the history recorder, the
//! task listeners and the configuration. Every public operation runs as one
//! command: a fresh [`CommandContext`] is opened, the closure runs, and the
//! unit of work is flushed on success or discarded on error.

use crate::config::EngineConfig;
use crate::context::CommandContext;
use crate::dispatcher::EventDispatcher;
use crate::history::{HistoryRecorder, StoreHistoryRecorder};
use crate::identity_links;
use crate::listeners::TaskListenerRegistry;
use crate::tasks;
use crate::variables;
use case_store::{EntityStore, InMemoryEntityStore, RowFilter};
use case_types::{
    CaseError, CaseResult, EntityKind, Execution, ExecutionId, HistoryEntry, IdentityLink,
    PersistentEntity, Task, TaskId,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

type Value = serde_json::Value;

pub struct CaseEngine {
    store: Arc<dyn EntityStore>,
    dispatcher: EventDispatcher,
    history: Arc<dyn HistoryRecorder>,
    listeners: TaskListenerRegistry,
    config: EngineConfig,
}

impl CaseEngine {
    pub fn new(store: Arc<dyn EntityStore>, config: EngineConfig) -> Self {
        Self {
            store,
            dispatcher: EventDispatcher::new(config.event_dispatcher_enabled),
            history: Arc::new(StoreHistoryRecorder),
            listeners: TaskListenerRegistry::new(),
            config,
        }
    }

    /// Engine over a fresh [`InMemoryEntityStore`] with default configuration.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryEntityStore::new()), EngineConfig::default())
    }

    pub fn with_history_recorder(mut self, recorder: Arc<dyn HistoryRecorder>) -> Self {
        self.history = recorder;
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    pub fn listeners_mut(&mut self) -> &mut TaskListenerRegistry {
        &mut self.listeners
    }

    // ── Command execution ────────────────────────────────────────────

    /// Run `command` as one unit of work without an authenticated user.
    pub fn execute<T, F>(&self, command: F) -> CaseResult<T>
    where
        F: FnOnce(&mut CommandContext<'_>) -> CaseResult<T>,
    {
        self.execute_as(None, command)
    }

    /// Run `command` as one unit of work on behalf of `user`.
    pub fn execute_as<T, F>(&self, user: Option<&str>, command: F) -> CaseResult<T>
    where
        F: FnOnce(&mut CommandContext<'_>) -> CaseResult<T>,
    {
        let mut ctx = CommandContext::new(
            Arc::clone(&self.store),
            &self.dispatcher,
            self.history.as_ref(),
            &self.listeners,
            &self.config,
            user.map(str::to_string),
        );
        let command_id = ctx.command_id();

        let value = match command(&mut ctx) {
            Ok(value) => value,
            Err(err) => {
                warn!(command_id, error = %err, "Command aborted");
                return Err(err);
            }
        };

        match ctx.close() {
            Ok(summary) => {
                info!(
                    command_id,
                    writes = summary.receipt.writes(),
                    skipped_updates = summary.skipped_updates,
                    "Command committed"
                );
                Ok(value)
            }
            Err(err) => {
                warn!(command_id, error = %err, "Command commit failed");
                Err(err)
            }
        }
    }

    fn with_task<T, F>(&self, user: Option<&str>, task_id: &TaskId, operation: &str, command: F) -> CaseResult<T>
    where
        F: FnOnce(&mut CommandContext<'_>, &mut Task) -> CaseResult<T>,
    {
        self.execute_as(user, |ctx| {
            let mut task = ctx.find_task(task_id, operation)?;
            command(ctx, &mut task)
        })
    }

    // ── Executions ───────────────────────────────────────────────────

    pub fn start_process_instance(&self, process_definition_id: Option<&str>) -> CaseResult<Execution> {
        let mut execution = Execution::new_process_instance(process_definition_id.map(str::to_string));
        if let Some(tenant_id) = &self.config.default_tenant_id {
            execution = execution.with_tenant(tenant_id.clone());
        }
        self.execute(|ctx| ctx.session().insert(&execution))?;
        execution.set_revision(1);
        info!(process_instance_id = %execution.id, "Process instance started");
        Ok(execution)
    }

    pub fn get_execution(&self, execution_id: &ExecutionId) -> CaseResult<Option<Execution>> {
        self.execute(|ctx| ctx.session().select_by_id::<Execution>(execution_id.as_str()))
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// A new, unsaved task.
    pub fn new_task(&self) -> Task {
        Task::create(Utc::now())
    }

    /// Insert a new task or write the changed fields of a loaded one. The
    /// task is reloaded from the store afterwards.
    pub fn save_task(&self, task: &mut Task) -> CaseResult<()> {
        let inserting = task.revision == 0;
        self.execute(|ctx| {
            if inserting {
                tasks::insert_task(ctx, task)
            } else {
                tasks::update_task(ctx, task)
            }
        })?;
        *task = self
            .get_task(&task.id)?
            .ok_or_else(|| CaseError::not_found(EntityKind::Task.as_str(), task.id.as_str(), "save_task"))?;
        Ok(())
    }

    pub fn get_task(&self, task_id: &TaskId) -> CaseResult<Option<Task>> {
        self.execute(|ctx| ctx.session().select_by_id::<Task>(task_id.as_str()))
    }

    pub fn set_assignee(&self, task_id: &TaskId, assignee: Option<&str>) -> CaseResult<()> {
        self.with_task(None, task_id, "set_assignee", |ctx, task| {
            tasks::set_assignee(ctx, task, assignee, true, true)
        })
    }

    pub fn set_owner(&self, task_id: &TaskId, owner: Option<&str>) -> CaseResult<()> {
        self.with_task(None, task_id, "set_owner", |ctx, task| {
            tasks::set_owner(ctx, task, owner, true)
        })
    }

    pub fn set_priority(&self, task_id: &TaskId, priority: i32) -> CaseResult<()> {
        self.with_task(None, task_id, "set_priority", |ctx, task| {
            tasks::set_priority(ctx, task, priority, true)
        })
    }

    pub fn delegate_task(&self, task_id: &TaskId, user_id: &str) -> CaseResult<()> {
        self.with_task(None, task_id, "delegate", |ctx, task| tasks::delegate(ctx, task, user_id))
    }

    pub fn resolve_task(&self, task_id: &TaskId) -> CaseResult<()> {
        self.with_task(None, task_id, "resolve", tasks::resolve)
    }

    pub fn suspend_task(&self, task_id: &TaskId) -> CaseResult<()> {
        self.with_task(None, task_id, "suspend", tasks::suspend)
    }

    pub fn activate_task(&self, task_id: &TaskId) -> CaseResult<()> {
        self.with_task(None, task_id, "activate", tasks::activate)
    }

    pub fn complete_task(
        &self,
        task_id: &TaskId,
        variables: Option<BTreeMap<String, Value>>,
    ) -> CaseResult<()> {
        self.with_task(None, task_id, "complete", |ctx, task| {
            tasks::complete(ctx, task, variables, false)
        })
    }

    /// Complete on behalf of `user`, who becomes a participant of the
    /// owning process.
    pub fn complete_task_as(
        &self,
        user: &str,
        task_id: &TaskId,
        variables: Option<BTreeMap<String, Value>>,
    ) -> CaseResult<()> {
        self.with_task(Some(user), task_id, "complete", |ctx, task| {
            tasks::complete(ctx, task, variables, false)
        })
    }

    pub fn delete_task(&self, task_id: &TaskId, reason: Option<&str>) -> CaseResult<()> {
        self.with_task(None, task_id, "delete_task", |ctx, task| {
            tasks::delete_task(ctx, task, reason)
        })
    }

    // ── Variables ────────────────────────────────────────────────────

    pub fn set_task_variable(&self, task_id: &TaskId, name: &str, value: Value) -> CaseResult<()> {
        self.with_task(None, task_id, "set_variable", |ctx, task| {
            variables::set_variable(ctx, task, name, value)
        })
    }

    pub fn set_task_variable_local(&self, task_id: &TaskId, name: &str, value: Value) -> CaseResult<()> {
        self.with_task(None, task_id, "set_variable_local", |ctx, task| {
            variables::set_variable_local(ctx, task, name, value)
        })
    }

    /// Visible variables of the task, local values shadowing inherited ones.
    pub fn task_variables(&self, task_id: &TaskId) -> CaseResult<BTreeMap<String, Value>> {
        self.with_task(None, task_id, "get_variables", variables::get_variables::<Task>)
    }

    pub fn set_execution_variable(&self, execution_id: &ExecutionId, name: &str, value: Value) -> CaseResult<()> {
        self.execute(|ctx| {
            let mut execution = ctx.find_execution(execution_id, "set_variable")?;
            variables::set_variable_local(ctx, &mut execution, name, value)
        })
    }

    // ── Identity links ───────────────────────────────────────────────

    pub fn add_candidate_user(&self, task_id: &TaskId, user_id: &str) -> CaseResult<IdentityLink> {
        self.with_task(None, task_id, "add_candidate_user", |ctx, task| {
            identity_links::add_candidate_user(ctx, task, user_id)
        })
    }

    pub fn add_candidate_group(&self, task_id: &TaskId, group_id: &str) -> CaseResult<IdentityLink> {
        self.with_task(None, task_id, "add_candidate_group", |ctx, task| {
            identity_links::add_candidate_group(ctx, task, group_id)
        })
    }

    pub fn delete_candidate_user(&self, task_id: &TaskId, user_id: &str) -> CaseResult<usize> {
        self.with_task(None, task_id, "delete_candidate_user", |ctx, task| {
            identity_links::delete_candidate_user(ctx, task, user_id)
        })
    }

    pub fn task_identity_links(&self, task_id: &TaskId) -> CaseResult<Vec<IdentityLink>> {
        self.with_task(None, task_id, "identity_links", identity_links::identity_links)
    }

    pub fn process_identity_links(&self, process_instance_id: &ExecutionId) -> CaseResult<Vec<IdentityLink>> {
        self.execute(|ctx| identity_links::process_identity_links(ctx, process_instance_id))
    }

    // ── History ──────────────────────────────────────────────────────

    /// Committed history of one entity in recording order.
    pub fn history_for(&self, entity_id: &str) -> CaseResult<Vec<HistoryEntry>> {
        self.store
            .find(
                EntityKind::HistoryEntry,
                &RowFilter::new().field_eq("entity_id", entity_id),
            )?
            .iter()
            .map(|row| row.decode::<HistoryEntry>())
            .collect()
    }
}

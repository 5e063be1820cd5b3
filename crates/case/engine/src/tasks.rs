//! Task lifecycle
//!
//! ```text
//! CREATED → (ASSIGNED)* → [DELEGATED: PENDING → RESOLVED] → COMPLETED | DELETED
//!                      ACTIVE ↔ SUSPENDED (orthogonal)
//! ```
//!
//! Every operation persists through the command's session, records its
//! field-scoped history entry and dispatches events as documented. Operations
//! other than `insert_task` act on tasks that are persisted or pending insert
//! in the same command. A suspended task rejects every mutation except
//! `activate`.

use crate::context::CommandContext;
use crate::identity_links::{delete_identity_links, involve_user};
use crate::listeners::TaskEvent;
use crate::variables::{remove_variables_local, set_variables, set_variables_local};
use case_types::{
    CaseError, CaseResult, DelegationState, EngineEvent, EntitySnapshot, Execution,
    IdentityLinkType, Task, TaskId, DELETE_REASON_COMPLETED, DELETE_REASON_DELETED,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

// ── Helpers ──────────────────────────────────────────────────────────

fn ensure_active(task: &Task, operation: &str) -> CaseResult<()> {
    if task.is_suspended() {
        return Err(CaseError::illegal_state(
            task.id.as_str(),
            operation,
            "task is suspended",
        ));
    }
    Ok(())
}

fn persist(ctx: &mut CommandContext<'_>, task: &Task) -> CaseResult<bool> {
    ctx.session().update(task)
}

fn dispatch_updated(ctx: &CommandContext<'_>, task: &Task) -> CaseResult<()> {
    ctx.dispatch_event(|| Ok(EngineEvent::EntityUpdated(EntitySnapshot::of(task)?)))
}

fn involve_participant(ctx: &mut CommandContext<'_>, task: &Task, user_id: &str) -> CaseResult<()> {
    if let Some(process_instance_id) = task.process_instance_id.clone() {
        involve_user(ctx, &process_instance_id, user_id, IdentityLinkType::Participant)?;
    }
    Ok(())
}

// ── Creation and plain updates ───────────────────────────────────────

/// Insert a task built with [`Task::create`].
///
/// A task bound to an execution inherits its tenant, process instance and
/// process definition and is appended to the execution's open tasks. An
/// unbound task without tenant gets the configured default tenant.
pub fn insert_task(ctx: &mut CommandContext<'_>, task: &mut Task) -> CaseResult<()> {
    if task.revision != 0 {
        return Err(CaseError::illegal_state(
            task.id.as_str(),
            "insert_task",
            "task is already persisted",
        ));
    }

    match task.execution_id.clone() {
        Some(execution_id) => {
            let mut execution = ctx.find_execution(&execution_id, "insert_task")?;
            if let Some(tenant_id) = &execution.tenant_id {
                task.tenant_id = Some(tenant_id.clone());
            }
            task.process_instance_id = Some(execution.process_instance_id.clone());
            if task.process_definition_id.is_none() {
                task.process_definition_id = execution.process_definition_id.clone();
            }
            execution.add_task(task.id.clone());
            ctx.session().update(&execution)?;
        }
        None => {
            if task.tenant_id.is_none() {
                task.tenant_id = ctx.config().default_tenant_id.clone();
            }
        }
    }

    ctx.session().insert(&*task)?;
    let token = ctx.token().clone();
    task.identity_links.bind(&token);
    task.variables.bind(&token);

    ctx.history().record_task_created(task)?;
    ctx.fire_task_listeners(TaskEvent::Create, task)?;
    ctx.dispatch_event(|| Ok(EngineEvent::EntityCreated(EntitySnapshot::of(&*task)?)))?;
    ctx.dispatch_event(|| Ok(EngineEvent::EntityInitialized(EntitySnapshot::of(&*task)?)))?;

    info!(task_id = %task.id, execution_id = ?task.execution_id, "Task created");
    Ok(())
}

/// Persist direct field edits of a loaded task.
pub fn update_task(ctx: &mut CommandContext<'_>, task: &Task) -> CaseResult<()> {
    if persist(ctx, task)? {
        dispatch_updated(ctx, task)?;
    }
    Ok(())
}

// ── Assignment ───────────────────────────────────────────────────────

/// Set or clear the assignee.
///
/// When both the old and the new value are unset only the history entry is
/// recorded. Otherwise the assignee becomes a participant of the bound
/// process, the assignment listener fires if the value differs from the one
/// it last fired for, and the assigned/updated events go out per flag.
pub fn set_assignee(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    assignee: Option<&str>,
    dispatch_assignment: bool,
    dispatch_update: bool,
) -> CaseResult<()> {
    ensure_active(task, "set_assignee")?;

    if assignee.is_none() && task.assignee.is_none() {
        ctx.history().record_task_assignee_change(&task.id, None)?;
        return Ok(());
    }

    task.assignee = assignee.map(str::to_string);
    persist(ctx, task)?;
    ctx.history().record_task_assignee_change(&task.id, assignee)?;

    if let Some(user_id) = assignee {
        involve_participant(ctx, task, user_id)?;
    }

    if task.assignee != task.last_fired_assignee {
        ctx.fire_task_listeners(TaskEvent::Assignment, task)?;
        task.last_fired_assignee = task.assignee.clone();
    }

    if dispatch_assignment {
        ctx.dispatch_event(|| Ok(EngineEvent::TaskAssigned(EntitySnapshot::of(&*task)?)))?;
    }
    if dispatch_update {
        dispatch_updated(ctx, task)?;
    }
    debug!(task_id = %task.id, assignee = ?task.assignee, "Assignee set");
    Ok(())
}

/// Set or clear the owner. No-op when both old and new are unset.
pub fn set_owner(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    owner: Option<&str>,
    dispatch_update: bool,
) -> CaseResult<()> {
    ensure_active(task, "set_owner")?;

    if owner.is_none() && task.owner.is_none() {
        return Ok(());
    }

    task.owner = owner.map(str::to_string);
    persist(ctx, task)?;
    ctx.history().record_task_owner_change(&task.id, owner)?;

    if let Some(user_id) = owner {
        involve_participant(ctx, task, user_id)?;
    }
    if dispatch_update {
        dispatch_updated(ctx, task)?;
    }
    Ok(())
}

// ── Delegation ───────────────────────────────────────────────────────

pub fn set_delegation_state(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    state: Option<DelegationState>,
) -> CaseResult<()> {
    ensure_active(task, "set_delegation_state")?;
    task.delegation_state = state;
    persist(ctx, task)?;
    ctx.history().record_task_delegation_state_change(task)
}

/// Hand the task to `user_id` while the current assignee stays owner.
pub fn delegate(ctx: &mut CommandContext<'_>, task: &mut Task, user_id: &str) -> CaseResult<()> {
    ensure_active(task, "delegate")?;
    if task.delegation_state == Some(DelegationState::Pending) {
        return Err(CaseError::illegal_state(
            task.id.as_str(),
            "delegate",
            "task is already delegated and must be resolved first",
        ));
    }

    set_delegation_state(ctx, task, Some(DelegationState::Pending))?;
    if task.owner.is_none() {
        let assignee = task.assignee.clone();
        set_owner(ctx, task, assignee.as_deref(), false)?;
    }
    set_assignee(ctx, task, Some(user_id), true, true)?;

    info!(task_id = %task.id, delegate = user_id, owner = ?task.owner, "Task delegated");
    Ok(())
}

/// Hand a delegated task back to its owner.
pub fn resolve(ctx: &mut CommandContext<'_>, task: &mut Task) -> CaseResult<()> {
    ensure_active(task, "resolve")?;
    if task.delegation_state != Some(DelegationState::Pending) {
        return Err(CaseError::illegal_state(
            task.id.as_str(),
            "resolve",
            "only a delegated task can be resolved",
        ));
    }

    set_delegation_state(ctx, task, Some(DelegationState::Resolved))?;
    let owner = task.owner.clone();
    set_assignee(ctx, task, owner.as_deref(), true, true)?;

    info!(task_id = %task.id, assignee = ?task.assignee, "Task resolved");
    Ok(())
}

// ── Field setters ────────────────────────────────────────────────────

pub fn set_name(ctx: &mut CommandContext<'_>, task: &mut Task, name: Option<&str>) -> CaseResult<()> {
    ensure_active(task, "set_name")?;
    task.name = name.map(str::to_string);
    persist(ctx, task)?;
    ctx.history().record_task_name_change(&task.id, name)
}

pub fn set_description(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    description: Option<&str>,
) -> CaseResult<()> {
    ensure_active(task, "set_description")?;
    task.description = description.map(str::to_string);
    persist(ctx, task)?;
    ctx.history().record_task_description_change(&task.id, description)
}

pub fn set_category(ctx: &mut CommandContext<'_>, task: &mut Task, category: Option<&str>) -> CaseResult<()> {
    ensure_active(task, "set_category")?;
    task.category = category.map(str::to_string);
    persist(ctx, task)?;
    ctx.history().record_task_category_change(&task.id, category)
}

pub fn set_form_key(ctx: &mut CommandContext<'_>, task: &mut Task, form_key: Option<&str>) -> CaseResult<()> {
    ensure_active(task, "set_form_key")?;
    task.form_key = form_key.map(str::to_string);
    persist(ctx, task)?;
    ctx.history().record_task_form_key_change(&task.id, form_key)
}

pub fn set_parent_task_id(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    parent_task_id: Option<TaskId>,
) -> CaseResult<()> {
    ensure_active(task, "set_parent_task_id")?;
    task.parent_task_id = parent_task_id;
    persist(ctx, task)?;
    ctx.history()
        .record_task_parent_task_id_change(&task.id, task.parent_task_id.as_ref())
}

pub fn set_task_definition_key(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    key: Option<&str>,
) -> CaseResult<()> {
    ensure_active(task, "set_task_definition_key")?;
    task.task_definition_key = key.map(str::to_string);
    persist(ctx, task)?;
    ctx.history().record_task_definition_key_change(&task.id, key)
}

pub fn set_due_date(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    due_date: Option<DateTime<Utc>>,
    dispatch_update: bool,
) -> CaseResult<()> {
    ensure_active(task, "set_due_date")?;
    task.due_date = due_date;
    persist(ctx, task)?;
    ctx.history().record_task_due_date_change(&task.id, due_date)?;
    if dispatch_update {
        dispatch_updated(ctx, task)?;
    }
    Ok(())
}

pub fn set_priority(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    priority: i32,
    dispatch_update: bool,
) -> CaseResult<()> {
    ensure_active(task, "set_priority")?;
    task.priority = priority;
    persist(ctx, task)?;
    ctx.history().record_task_priority_change(&task.id, priority)?;
    if dispatch_update {
        dispatch_updated(ctx, task)?;
    }
    Ok(())
}

/// Bind the task to an execution, or unbind it with `None`.
pub fn set_execution(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    execution: Option<&mut Execution>,
) -> CaseResult<()> {
    ensure_active(task, "set_execution")?;
    match execution {
        Some(execution) => {
            task.execution_id = Some(execution.id.clone());
            task.process_instance_id = Some(execution.process_instance_id.clone());
            task.process_definition_id = execution.process_definition_id.clone();
            execution.add_task(task.id.clone());
            ctx.session().update(&*execution)?;
        }
        None => {
            task.execution_id = None;
            task.process_instance_id = None;
            task.process_definition_id = None;
        }
    }
    persist(ctx, task)?;
    ctx.history().record_task_execution_id_change(task)
}

// ── Suspension ───────────────────────────────────────────────────────

pub fn suspend(ctx: &mut CommandContext<'_>, task: &mut Task) -> CaseResult<()> {
    if task.is_suspended() {
        return Err(CaseError::illegal_state(
            task.id.as_str(),
            "suspend",
            "task is already suspended",
        ));
    }
    task.suspension_state = case_types::SuspensionState::Suspended;
    persist(ctx, task)?;
    ctx.history().record_task_suspension_state_change(task)?;
    ctx.dispatch_event(|| Ok(EngineEvent::EntitySuspended(EntitySnapshot::of(&*task)?)))
}

pub fn activate(ctx: &mut CommandContext<'_>, task: &mut Task) -> CaseResult<()> {
    if !task.is_suspended() {
        return Err(CaseError::illegal_state(
            task.id.as_str(),
            "activate",
            "task is not suspended",
        ));
    }
    task.suspension_state = case_types::SuspensionState::Active;
    persist(ctx, task)?;
    ctx.history().record_task_suspension_state_change(task)?;
    ctx.dispatch_event(|| Ok(EngineEvent::EntityActivated(EntitySnapshot::of(&*task)?)))
}

// ── Completion and deletion ──────────────────────────────────────────

/// Remove the task row with its links and local variables, and detach it
/// from its execution. Returns the execution it was bound to.
fn end_task(ctx: &mut CommandContext<'_>, task: &mut Task, reason: &str) -> CaseResult<Option<Execution>> {
    delete_identity_links(ctx, task)?;
    remove_variables_local(ctx, task)?;

    ctx.history().record_task_ended(&task.id, reason)?;
    ctx.session().delete(&*task)?;
    ctx.dispatch_event(|| Ok(EngineEvent::EntityDeleted(EntitySnapshot::of(&*task)?)))?;

    match task.execution_id.clone() {
        Some(execution_id) => {
            let mut execution = ctx.find_execution(&execution_id, "end_task")?;
            execution.remove_task(&task.id);
            ctx.session().update(&execution)?;
            Ok(Some(execution))
        }
        None => Ok(None),
    }
}

/// Complete the task.
///
/// Rejected while delegation is pending, before anything changes. Otherwise
/// stores the given variables, fires the complete listener, makes the acting
/// user a participant of the process, dispatches the completion event,
/// deletes the task with reason `completed` and signals its execution.
pub fn complete(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    variables: Option<BTreeMap<String, serde_json::Value>>,
    local_scope: bool,
) -> CaseResult<()> {
    if task.delegation_state == Some(DelegationState::Pending) {
        return Err(CaseError::illegal_state(
            task.id.as_str(),
            "complete",
            "A delegated task cannot be completed, but should be resolved instead.",
        ));
    }
    ensure_active(task, "complete")?;

    let variables = variables.unwrap_or_default();
    if local_scope {
        set_variables_local(ctx, task, variables.clone())?;
    } else {
        set_variables(ctx, task, variables.clone())?;
    }

    ctx.fire_task_listeners(TaskEvent::Complete, task)?;

    if let Some(user_id) = ctx.authenticated_user().map(str::to_string) {
        involve_participant(ctx, task, &user_id)?;
    }

    ctx.dispatch_event(|| {
        Ok(EngineEvent::TaskCompleted {
            task: EntitySnapshot::of(&*task)?,
            variables: variables.clone(),
            local_scope,
        })
    })?;

    if let Some(mut execution) = end_task(ctx, task, DELETE_REASON_COMPLETED)? {
        execution.signal();
        ctx.session().update(&execution)?;
        let task_id = task.id.clone();
        ctx.dispatch_event(|| {
            Ok(EngineEvent::ExecutionSignaled {
                execution_id: execution.id.clone(),
                task_id: Some(task_id),
            })
        })?;
    }

    info!(task_id = %task.id, "Task completed");
    Ok(())
}

/// Delete a task that will not be completed.
pub fn delete_task(ctx: &mut CommandContext<'_>, task: &mut Task, reason: Option<&str>) -> CaseResult<()> {
    ensure_active(task, "delete_task")?;
    ctx.fire_task_listeners(TaskEvent::Delete, task)?;
    let reason = reason.unwrap_or(DELETE_REASON_DELETED);
    end_task(ctx, task, reason)?;
    info!(task_id = %task.id, reason, "Task deleted");
    Ok(())
}

//! Variable scope operations
//!
//! A scope resolves a name locally first and then through its parent
//! execution. Local rows are loaded at most once per command and scope;
//! parent executions are kept by the command context, so repeated lookups
//! through a task reuse the parent's loaded variables.

use crate::context::CommandContext;
use case_store::RowFilter;
use case_types::{
    CaseResult, EngineEvent, Execution, ExecutionId, Scoped, VariableChange, VariableEvent,
    VariableInstance,
};
use std::collections::BTreeMap;
use tracing::debug;

type Value = serde_json::Value;

fn scope_filter<S: Scoped>(scope: &S) -> CaseResult<RowFilter> {
    RowFilter::new().field_eq_serialized("scope", &scope.scope_ref())
}

fn variable_event(variable: &VariableInstance) -> VariableEvent {
    VariableEvent {
        variable_id: variable.id.clone(),
        name: variable.name.clone(),
        value: variable.value.clone(),
        type_name: variable.type_name.clone(),
        context: variable.context.clone(),
    }
}

/// Run `op` against the parent execution scope, cached for the command.
fn with_parent_scope<T>(
    ctx: &mut CommandContext<'_>,
    parent_id: &ExecutionId,
    operation: &str,
    op: impl FnOnce(&mut CommandContext<'_>, &mut Execution) -> CaseResult<T>,
) -> CaseResult<T> {
    let mut parent = ctx.take_parent_scope(parent_id, operation)?;
    let result = op(ctx, &mut parent);
    ctx.return_parent_scope(parent);
    result
}

/// Load the scope's local variables unless already loaded in this command.
pub fn ensure_variables_initialized<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
) -> CaseResult<()> {
    if scope.variable_scope().is_initialized_in(ctx.token()) {
        return Ok(());
    }
    let filter = scope_filter(scope)?;
    let rows = ctx.session().select_list::<VariableInstance>(&filter)?;
    debug!(scope = %scope.scope_ref(), count = rows.len(), "Variables loaded");
    let token = ctx.token().clone();
    scope.variable_scope_mut().initialize(&token, rows);
    Ok(())
}

fn local_instances<'s, S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &'s mut S,
    operation: &str,
) -> CaseResult<&'s mut BTreeMap<String, VariableInstance>> {
    ensure_variables_initialized(ctx, scope)?;
    let scope_ref = scope.scope_ref();
    scope.variable_scope_mut().instances_mut(scope_ref.id(), operation)
}

pub fn get_variable_local<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    name: &str,
) -> CaseResult<Option<Value>> {
    let instances = local_instances(ctx, scope, "get_variable_local")?;
    Ok(instances.get(name).map(|v| v.value.clone()))
}

pub fn has_variable_local<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    name: &str,
) -> CaseResult<bool> {
    let instances = local_instances(ctx, scope, "has_variable_local")?;
    Ok(instances.contains_key(name))
}

/// Local value, else the parent chain's value.
pub fn get_variable<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    name: &str,
) -> CaseResult<Option<Value>> {
    if let Some(value) = get_variable_local(ctx, scope, name)? {
        return Ok(Some(value));
    }
    match scope.parent_execution_id().cloned() {
        Some(parent_id) => with_parent_scope(ctx, &parent_id, "get_variable", |ctx, parent| {
            get_variable(ctx, parent, name)
        }),
        None => Ok(None),
    }
}

pub fn has_variable<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    name: &str,
) -> CaseResult<bool> {
    Ok(get_variable(ctx, scope, name)?.is_some())
}

pub fn get_variables_local<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
) -> CaseResult<BTreeMap<String, Value>> {
    let instances = local_instances(ctx, scope, "get_variables_local")?;
    Ok(instances
        .iter()
        .map(|(name, v)| (name.clone(), v.value.clone()))
        .collect())
}

/// Parent values overlaid with local ones.
pub fn get_variables<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
) -> CaseResult<BTreeMap<String, Value>> {
    let mut merged = match scope.parent_execution_id().cloned() {
        Some(parent_id) => with_parent_scope(ctx, &parent_id, "get_variables", |ctx, parent| {
            get_variables(ctx, parent)
        })?,
        None => BTreeMap::new(),
    };
    merged.extend(get_variables_local(ctx, scope)?);
    Ok(merged)
}

/// Create or update a variable on this exact scope.
pub fn set_variable_local<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    name: &str,
    value: Value,
) -> CaseResult<()> {
    let scope_ref = scope.scope_ref();
    let context = scope.variable_context();
    let existing = local_instances(ctx, scope, "set_variable_local")?
        .get(name)
        .cloned();

    let variable = match existing {
        Some(mut variable) => {
            variable.context = context;
            variable.set_value(value);
            update_variable_instance(ctx, &variable)?;
            variable
        }
        None => {
            let variable = VariableInstance::new(name, value, scope_ref.clone(), context);
            create_variable_instance(ctx, &variable)?;
            variable
        }
    };
    scope
        .variable_scope_mut()
        .instances_mut(scope_ref.id(), "set_variable_local")?
        .insert(name.to_string(), variable);
    Ok(())
}

/// Update the variable where it is defined; create it on the top-most scope
/// when it is defined nowhere.
pub fn set_variable<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    name: &str,
    value: Value,
) -> CaseResult<()> {
    if has_variable_local(ctx, scope, name)? {
        return set_variable_local(ctx, scope, name, value);
    }
    match scope.parent_execution_id().cloned() {
        Some(parent_id) => with_parent_scope(ctx, &parent_id, "set_variable", |ctx, parent| {
            set_variable(ctx, parent, name, value)
        }),
        None => set_variable_local(ctx, scope, name, value),
    }
}

pub fn set_variables<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    variables: BTreeMap<String, Value>,
) -> CaseResult<()> {
    for (name, value) in variables {
        set_variable(ctx, scope, &name, value)?;
    }
    Ok(())
}

pub fn set_variables_local<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    variables: BTreeMap<String, Value>,
) -> CaseResult<()> {
    for (name, value) in variables {
        set_variable_local(ctx, scope, &name, value)?;
    }
    Ok(())
}

/// Delete a local variable. Returns false when the scope had none by that name.
pub fn remove_variable_local<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
    name: &str,
) -> CaseResult<bool> {
    let context = scope.variable_context();
    let removed = local_instances(ctx, scope, "remove_variable_local")?.remove(name);
    match removed {
        Some(mut variable) => {
            variable.context = context;
            delete_variable_instance(ctx, &variable)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Delete every local variable of the scope.
pub fn remove_variables_local<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &mut S,
) -> CaseResult<usize> {
    let context = scope.variable_context();
    let removed = std::mem::take(local_instances(ctx, scope, "remove_variables_local")?);
    let count = removed.len();
    for mut variable in removed.into_values() {
        variable.context = context.clone();
        delete_variable_instance(ctx, &variable)?;
    }
    Ok(count)
}

/// Fetch one stored variable without loading the whole scope.
pub fn get_specific_variable<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &S,
    name: &str,
) -> CaseResult<Option<VariableInstance>> {
    let scope_ref = scope.scope_ref();
    ctx.ensure_active(scope_ref.id(), "get_specific_variable")?;
    let filter = scope_filter(scope)?.field_eq("name", name);
    Ok(ctx
        .session()
        .select_list::<VariableInstance>(&filter)?
        .into_iter()
        .next())
}

/// Fetch the named stored variables without loading the whole scope.
pub fn get_specific_variables<S: Scoped>(
    ctx: &mut CommandContext<'_>,
    scope: &S,
    names: &[&str],
) -> CaseResult<Vec<VariableInstance>> {
    let scope_ref = scope.scope_ref();
    ctx.ensure_active(scope_ref.id(), "get_specific_variables")?;
    let mut found = Vec::with_capacity(names.len());
    for name in names {
        if let Some(variable) = get_specific_variable(ctx, scope, name)? {
            found.push(variable);
        }
    }
    Ok(found)
}

fn create_variable_instance(ctx: &mut CommandContext<'_>, variable: &VariableInstance) -> CaseResult<()> {
    ctx.session().insert(variable)?;
    ctx.sync_parent_scope(variable, false);
    ctx.history()
        .record_variable_change(variable, VariableChange::Created)?;
    ctx.dispatch_event(|| Ok(EngineEvent::VariableCreated(variable_event(variable))))
}

fn update_variable_instance(ctx: &mut CommandContext<'_>, variable: &VariableInstance) -> CaseResult<()> {
    ctx.session().update(variable)?;
    ctx.sync_parent_scope(variable, false);
    ctx.history()
        .record_variable_change(variable, VariableChange::Updated)?;
    ctx.dispatch_event(|| Ok(EngineEvent::VariableUpdated(variable_event(variable))))
}

fn delete_variable_instance(ctx: &mut CommandContext<'_>, variable: &VariableInstance) -> CaseResult<()> {
    ctx.session().delete(variable)?;
    ctx.sync_parent_scope(variable, true);
    ctx.history()
        .record_variable_change(variable, VariableChange::Deleted)?;
    ctx.dispatch_event(|| Ok(EngineEvent::VariableDeleted(variable_event(variable))))
}

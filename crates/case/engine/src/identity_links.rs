//! Identity link management for tasks and process instances

use crate::context::CommandContext;
use case_store::RowFilter;
use case_types::{
    CaseResult, EngineEvent, EntitySnapshot, ExecutionId, IdentityLink, IdentityLinkType,
    LinkOwner, Principal, Task,
};
use tracing::debug;

fn owner_filter(owner: &LinkOwner) -> CaseResult<RowFilter> {
    RowFilter::new().field_eq_serialized("owner", owner)
}

/// Load the task's links unless already loaded in this command.
pub fn ensure_identity_links_initialized(ctx: &mut CommandContext<'_>, task: &mut Task) -> CaseResult<()> {
    if task.identity_links.is_loaded_in(ctx.token()) {
        return Ok(());
    }
    let filter = owner_filter(&LinkOwner::Task(task.id.clone()))?;
    let links = ctx.session().select_list::<IdentityLink>(&filter)?;
    let token = ctx.token().clone();
    task.identity_links.load(&token, links);
    Ok(())
}

pub fn identity_links(ctx: &mut CommandContext<'_>, task: &mut Task) -> CaseResult<Vec<IdentityLink>> {
    ensure_identity_links_initialized(ctx, task)?;
    Ok(task.cached_identity_links()?.clone())
}

pub fn candidates(ctx: &mut CommandContext<'_>, task: &mut Task) -> CaseResult<Vec<IdentityLink>> {
    Ok(identity_links(ctx, task)?
        .into_iter()
        .filter(|link| link.link_type == IdentityLinkType::Candidate)
        .collect())
}

fn insert_link(ctx: &mut CommandContext<'_>, link: &IdentityLink) -> CaseResult<()> {
    ctx.session().insert(link)?;
    ctx.history().record_identity_link_change(link, true)?;
    ctx.dispatch_event(|| Ok(EngineEvent::EntityCreated(EntitySnapshot::of(link)?)))
}

fn delete_link(ctx: &mut CommandContext<'_>, link: &IdentityLink) -> CaseResult<()> {
    ctx.session().delete(link)?;
    ctx.history().record_identity_link_change(link, false)?;
    ctx.dispatch_event(|| Ok(EngineEvent::EntityDeleted(EntitySnapshot::of(link)?)))
}

/// Link a user or a group to the task. Exactly one of `user_id` and
/// `group_id` must be given. An existing identical link is returned as is.
pub fn add_identity_link(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    user_id: Option<&str>,
    group_id: Option<&str>,
    link_type: IdentityLinkType,
) -> CaseResult<IdentityLink> {
    let principal = Principal::from_parts(user_id, group_id, task.id.as_str())?;
    ensure_identity_links_initialized(ctx, task)?;

    if let Some(existing) = task
        .cached_identity_links()?
        .iter()
        .find(|link| link.same_tuple(&principal, &link_type))
    {
        return Ok(existing.clone());
    }

    let link = IdentityLink::new(LinkOwner::Task(task.id.clone()), principal, link_type);
    insert_link(ctx, &link)?;
    task.identity_links
        .get_mut(task.id.as_str(), "add_identity_link")?
        .push(link.clone());
    debug!(task_id = %task.id, principal = %link.principal, link_type = %link.link_type, "Identity link added");

    if let (Some(user), Some(process_instance_id)) = (user_id, task.process_instance_id.clone()) {
        involve_user(ctx, &process_instance_id, user, IdentityLinkType::Participant)?;
    }
    Ok(link)
}

/// Delete the persisted links matching `(user, group, type)`, where an
/// absent argument matches anything. Then delete every remaining candidate
/// link of the task whose user or group equals the given one, whatever type
/// was asked for. Returns the number of links removed.
pub fn delete_identity_link(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    user_id: Option<&str>,
    group_id: Option<&str>,
    link_type: Option<IdentityLinkType>,
) -> CaseResult<usize> {
    let mut filter = owner_filter(&LinkOwner::Task(task.id.clone()))?;
    if let Some(link_type) = &link_type {
        filter = filter.field_eq_serialized("link_type", link_type)?;
    }
    let exact: Vec<IdentityLink> = ctx
        .session()
        .select_list::<IdentityLink>(&filter)?
        .into_iter()
        .filter(|link| user_id.map_or(true, |u| link.principal.user_id() == Some(u)))
        .filter(|link| group_id.map_or(true, |g| link.principal.group_id() == Some(g)))
        .collect();

    for link in &exact {
        delete_link(ctx, link)?;
    }
    let deleted_ids: Vec<_> = exact.iter().map(|link| link.id.clone()).collect();

    ensure_identity_links_initialized(ctx, task)?;
    let task_id = task.id.clone();
    let cached = task
        .identity_links
        .get_mut(task_id.as_str(), "delete_identity_link")?;
    cached.retain(|link| !deleted_ids.contains(&link.id));

    let (stale_candidates, kept): (Vec<IdentityLink>, Vec<IdentityLink>) =
        std::mem::take(cached).into_iter().partition(|link| {
            link.link_type == IdentityLinkType::Candidate
                && ((user_id.is_some() && link.principal.user_id() == user_id)
                    || (group_id.is_some() && link.principal.group_id() == group_id))
        });
    *cached = kept;

    for link in &stale_candidates {
        delete_link(ctx, link)?;
    }
    Ok(exact.len() + stale_candidates.len())
}

/// Delete every link of the task.
pub fn delete_identity_links(ctx: &mut CommandContext<'_>, task: &mut Task) -> CaseResult<usize> {
    ensure_identity_links_initialized(ctx, task)?;
    let task_id = task.id.clone();
    let links = std::mem::take(
        task.identity_links
            .get_mut(task_id.as_str(), "delete_identity_links")?,
    );
    for link in &links {
        delete_link(ctx, link)?;
    }
    Ok(links.len())
}

pub fn process_identity_links(
    ctx: &mut CommandContext<'_>,
    process_instance_id: &ExecutionId,
) -> CaseResult<Vec<IdentityLink>> {
    let filter = owner_filter(&LinkOwner::ProcessInstance(process_instance_id.clone()))?;
    ctx.session().select_list::<IdentityLink>(&filter)
}

/// Relate a user to a process instance, once per `(user, type)`.
pub fn involve_user(
    ctx: &mut CommandContext<'_>,
    process_instance_id: &ExecutionId,
    user_id: &str,
    link_type: IdentityLinkType,
) -> CaseResult<IdentityLink> {
    let principal = Principal::User(user_id.to_string());
    if let Some(existing) = process_identity_links(ctx, process_instance_id)?
        .into_iter()
        .find(|link| link.same_tuple(&principal, &link_type))
    {
        return Ok(existing);
    }
    let link = IdentityLink::new(
        LinkOwner::ProcessInstance(process_instance_id.clone()),
        principal,
        link_type,
    );
    insert_link(ctx, &link)?;
    debug!(process_instance_id = %process_instance_id, user_id, "User involved in process");
    Ok(link)
}

// ── Convenience operations ───────────────────────────────────────────

pub fn add_candidate_user(ctx: &mut CommandContext<'_>, task: &mut Task, user_id: &str) -> CaseResult<IdentityLink> {
    add_identity_link(ctx, task, Some(user_id), None, IdentityLinkType::Candidate)
}

pub fn add_candidate_users(ctx: &mut CommandContext<'_>, task: &mut Task, user_ids: &[&str]) -> CaseResult<()> {
    for user_id in user_ids {
        add_candidate_user(ctx, task, user_id)?;
    }
    Ok(())
}

pub fn add_candidate_group(ctx: &mut CommandContext<'_>, task: &mut Task, group_id: &str) -> CaseResult<IdentityLink> {
    add_identity_link(ctx, task, None, Some(group_id), IdentityLinkType::Candidate)
}

pub fn add_candidate_groups(ctx: &mut CommandContext<'_>, task: &mut Task, group_ids: &[&str]) -> CaseResult<()> {
    for group_id in group_ids {
        add_candidate_group(ctx, task, group_id)?;
    }
    Ok(())
}

pub fn add_user_identity_link(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    user_id: &str,
    link_type: IdentityLinkType,
) -> CaseResult<IdentityLink> {
    add_identity_link(ctx, task, Some(user_id), None, link_type)
}

pub fn add_group_identity_link(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    group_id: &str,
    link_type: IdentityLinkType,
) -> CaseResult<IdentityLink> {
    add_identity_link(ctx, task, None, Some(group_id), link_type)
}

pub fn delete_candidate_user(ctx: &mut CommandContext<'_>, task: &mut Task, user_id: &str) -> CaseResult<usize> {
    delete_identity_link(ctx, task, Some(user_id), None, Some(IdentityLinkType::Candidate))
}

pub fn delete_candidate_group(ctx: &mut CommandContext<'_>, task: &mut Task, group_id: &str) -> CaseResult<usize> {
    delete_identity_link(ctx, task, None, Some(group_id), Some(IdentityLinkType::Candidate))
}

pub fn delete_user_identity_link(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    user_id: &str,
    link_type: IdentityLinkType,
) -> CaseResult<usize> {
    delete_identity_link(ctx, task, Some(user_id), None, Some(link_type))
}

pub fn delete_group_identity_link(
    ctx: &mut CommandContext<'_>,
    task: &mut Task,
    group_id: &str,
    link_type: IdentityLinkType,
) -> CaseResult<usize> {
    delete_identity_link(ctx, task, None, Some(group_id), Some(link_type))
}

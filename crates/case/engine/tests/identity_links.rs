//! Identity links between tasks, users and groups.

use case_engine::{identity_links, CaseEngine};
use case_types::{IdentityLinkType, Principal, Task};

fn saved_task(engine: &CaseEngine, process_bound: bool) -> Task {
    let mut task = engine.new_task();
    if process_bound {
        let process = engine.start_process_instance(None).unwrap();
        task = task.with_execution(process.id.clone(), process.id);
    }
    engine.save_task(&mut task).unwrap();
    task
}

#[test]
fn adding_same_tuple_twice_keeps_one_link() {
    let engine = CaseEngine::in_memory();
    let task = saved_task(&engine, false);

    let first = engine.add_candidate_user(&task.id, "kermit").unwrap();
    let second = engine.add_candidate_user(&task.id, "kermit").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(engine.task_identity_links(&task.id).unwrap().len(), 1);
}

#[test]
fn user_link_makes_user_process_participant() {
    let engine = CaseEngine::in_memory();
    let task = saved_task(&engine, true);
    let process_id = task.process_instance_id.clone().unwrap();

    engine.add_candidate_user(&task.id, "kermit").unwrap();
    engine.add_candidate_group(&task.id, "sales").unwrap();
    // Assigning the same user does not add a second participant link.
    engine.set_assignee(&task.id, Some("kermit")).unwrap();

    let links = engine.process_identity_links(&process_id).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].principal, Principal::User("kermit".into()));
    assert_eq!(links[0].link_type, IdentityLinkType::Participant);
}

#[test]
fn deleting_user_link_also_drops_candidate_links_of_that_user() {
    let engine = CaseEngine::in_memory();
    let task = saved_task(&engine, false);

    let removed = engine
        .execute(|ctx| {
            let mut task = ctx.find_task(&task.id, "test")?;
            identity_links::add_candidate_user(ctx, &mut task, "kermit")?;
            identity_links::add_candidate_group(ctx, &mut task, "management")?;
            identity_links::add_user_identity_link(
                ctx,
                &mut task,
                "kermit",
                IdentityLinkType::Custom("reviewer".into()),
            )?;
            identity_links::delete_user_identity_link(
                ctx,
                &mut task,
                "kermit",
                IdentityLinkType::Custom("reviewer".into()),
            )
        })
        .unwrap();
    assert_eq!(removed, 2);

    let remaining = engine.task_identity_links(&task.id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].principal, Principal::Group("management".into()));
}

#[test]
fn delete_candidate_user_leaves_other_users() {
    let engine = CaseEngine::in_memory();
    let task = saved_task(&engine, false);
    engine.add_candidate_user(&task.id, "kermit").unwrap();
    engine.add_candidate_user(&task.id, "gonzo").unwrap();

    assert_eq!(engine.delete_candidate_user(&task.id, "kermit").unwrap(), 1);

    let remaining = engine.task_identity_links(&task.id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].principal.user_id(), Some("gonzo"));
}

#[test]
fn candidates_filter_by_type() {
    let engine = CaseEngine::in_memory();
    let task = saved_task(&engine, false);

    let candidates = engine
        .execute(|ctx| {
            let mut task = ctx.find_task(&task.id, "test")?;
            identity_links::add_candidate_users(ctx, &mut task, &["kermit", "gonzo"])?;
            identity_links::add_group_identity_link(ctx, &mut task, "sales", IdentityLinkType::Owner)?;
            identity_links::candidates(ctx, &mut task)
        })
        .unwrap();

    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|link| link.is_user()));
}

#[test]
fn link_needs_exactly_one_principal() {
    let engine = CaseEngine::in_memory();
    let task = saved_task(&engine, false);

    let result = engine.execute(|ctx| {
        let mut task = ctx.find_task(&task.id, "test")?;
        identity_links::add_identity_link(ctx, &mut task, Some("kermit"), Some("sales"), IdentityLinkType::Candidate)
    });
    assert!(result.is_err());
    assert!(engine.task_identity_links(&task.id).unwrap().is_empty());
}

//! Optimistic locking between concurrent commands.

use case_engine::{tasks, CaseEngine, EngineConfig};
use case_store::{EntityStore, InMemoryEntityStore};
use case_types::{CaseError, EntityKind};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn second_writer_from_same_revision_fails() {
    let store = Arc::new(InMemoryEntityStore::new());
    let engine = CaseEngine::new(store.clone(), EngineConfig::default());
    let mut task = engine.new_task().with_name("Shared");
    engine.save_task(&mut task).unwrap();
    let task_id = task.id.clone();

    let loaded = Barrier::new(2);
    let (committed_tx, committed_rx) = mpsc::channel();

    let (engine, loaded, task_id) = (&engine, &loaded, &task_id);
    let (first, second) = thread::scope(|s| {
        let first = s.spawn(move || {
            let result = engine.execute(|ctx| {
                let mut task = ctx.find_task(task_id, "test")?;
                loaded.wait();
                tasks::set_priority(ctx, &mut task, 10, true)
            });
            committed_tx.send(()).unwrap();
            result
        });
        let second = s.spawn(move || {
            engine.execute(|ctx| {
                let mut task = ctx.find_task(task_id, "test")?;
                loaded.wait();
                committed_rx.recv().unwrap();
                tasks::set_priority(ctx, &mut task, 20, true)
            })
        });
        (first.join().unwrap(), second.join().unwrap())
    });

    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert!(err.is_optimistic_lock());
    match err {
        CaseError::OptimisticLock {
            expected, actual, ..
        } => {
            assert_eq!(expected, 1);
            assert_eq!(actual, Some(2));
        }
        other => panic!("unexpected error: {other}"),
    }

    let row = store.fetch(EntityKind::Task, task_id.as_str()).unwrap().unwrap();
    assert_eq!(row.revision, 2);
    assert_eq!(row.state["priority"], 10);
    assert_eq!(store.stats().unwrap().rejected_commits, 1);
}

#[test]
fn unchanged_update_never_reaches_the_store() {
    let store = Arc::new(InMemoryEntityStore::new());
    let engine = CaseEngine::new(store.clone(), EngineConfig::default());
    let mut task = engine.new_task();
    engine.save_task(&mut task).unwrap();
    let commits = store.stats().unwrap().commits;

    let summary_writes = engine
        .execute(|ctx| {
            let task = ctx.find_task(&task.id, "test")?;
            tasks::update_task(ctx, &task)?;
            Ok(ctx.session().pending_writes())
        })
        .unwrap();

    assert_eq!(summary_writes, 0);
    assert_eq!(store.stats().unwrap().commits, commits);
}

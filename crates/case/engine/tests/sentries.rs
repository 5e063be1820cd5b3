//! Sentry evaluation: the edge-triggered AND over OnParts and the events a
//! running case instance publishes.

use case_engine::{CaseEngine, CaseInstance, SentryEvaluator, SourceEvent};
use case_types::{
    CaseError, CaseFileItem, CaseFileItemTransition, CaseFileModel, CaseModel, Criterion, EngineEvent,
    EventKind, Multiplicity, OnPart, PlanItem, PlanItemState, PlanItemTransition, Sentry,
};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sentry `both` waits for `a` and `b` to be created.
fn and_model() -> Arc<CaseModel> {
    Arc::new(
        CaseModel::builder("and")
            .file_model(
                CaseFileModel::new("files")
                    .with_item(CaseFileItem::new("a", Multiplicity::ZeroOrMore))
                    .with_item(CaseFileItem::new("b", Multiplicity::ZeroOrMore))
                    .with_item(CaseFileItem::new("c", Multiplicity::ZeroOrMore)),
            )
            .sentry(
                Sentry::new("both")
                    .with_on_part(OnPart::file_item("a", "create"))
                    .with_on_part(OnPart::file_item("b", "create")),
            )
            .plan_item(PlanItem::new("work").with_criterion(Criterion::entry("start_work", "both")))
            .build()
            .unwrap(),
    )
}

fn event_for(index: u8) -> SourceEvent {
    let item = match index {
        0 => "a",
        1 => "b",
        _ => "c",
    };
    SourceEvent::case_file_item(item, CaseFileItemTransition::Create)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn fires_once_for_both_then_needs_both_again() {
    let mut evaluator = SentryEvaluator::new(and_model());

    assert!(evaluator.handle(event_for(0)).fired_sentries().is_empty());
    assert_eq!(evaluator.handle(event_for(1)).fired_sentries(), vec!["both"]);

    // A third A alone does not fire.
    assert!(evaluator.handle(event_for(0)).fired_sentries().is_empty());
    assert!(evaluator.handle(event_for(0)).fired_sentries().is_empty());
    // Both have recurred.
    assert_eq!(evaluator.handle(event_for(1)).fired_sentries(), vec!["both"]);
}

#[test]
fn other_events_leave_flags_alone() {
    let mut evaluator = SentryEvaluator::new(and_model());
    evaluator.handle(event_for(0));
    evaluator.handle(SourceEvent::case_file_item("a", CaseFileItemTransition::Update));
    evaluator.handle(event_for(2));
    assert!(evaluator.is_satisfied("both", 0));
    assert!(!evaluator.is_satisfied("both", 1));
}

#[test]
fn case_instance_publishes_transitions() {
    let mut engine = CaseEngine::in_memory();
    let published: Arc<Mutex<Vec<EngineEvent>>> = Arc::default();
    let sink = Arc::clone(&published);
    engine.dispatcher_mut().add_catch_all(move |event| {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    });

    let mut case = CaseInstance::new(and_model());
    engine
        .execute(|ctx| {
            case.case_file_item_event(ctx, "b", CaseFileItemTransition::Create)?;
            case.case_file_item_event(ctx, "a", CaseFileItemTransition::Create)
        })
        .unwrap();
    assert_eq!(case.plan_item_state("work"), Some(PlanItemState::Active));

    let kinds: Vec<EventKind> = published.lock().unwrap().iter().map(EngineEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::CaseFileItemTransition,
            EventKind::CaseFileItemTransition,
            EventKind::SentryFired,
            EventKind::PlanItemTransition,
        ]
    );

    match published.lock().unwrap().last() {
        Some(EngineEvent::PlanItemTransition {
            case_instance_id,
            plan_item_id,
            transition,
            from,
            to,
        }) => {
            assert_eq!(case_instance_id, case.id());
            assert_eq!(plan_item_id, "work");
            assert_eq!(*transition, PlanItemTransition::Start);
            assert_eq!((*from, *to), (PlanItemState::Available, PlanItemState::Active));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    engine
        .execute(|ctx| case.complete_plan_item(ctx, "work"))
        .unwrap();
    assert_eq!(case.plan_item_state("work"), Some(PlanItemState::Completed));
}

#[test]
fn failing_transition_listener_leaves_case_untouched() {
    let mut engine = CaseEngine::in_memory();
    engine
        .dispatcher_mut()
        .add_listener(EventKind::PlanItemTransition, |_| {
            Err(CaseError::illegal_state("work", "start", "vetoed"))
        });

    let mut case = CaseInstance::new(and_model());
    let result = engine.execute(|ctx| {
        case.case_file_item_event(ctx, "a", CaseFileItemTransition::Create)?;
        case.case_file_item_event(ctx, "b", CaseFileItemTransition::Create)
    });
    assert!(matches!(result, Err(CaseError::Listener { .. })));

    assert_eq!(case.plan_item_state("work"), Some(PlanItemState::Available));
    assert!(!case.evaluator().is_satisfied("both", 0));
    assert!(!case.evaluator().is_satisfied("both", 1));

    // The next command starts from the restored state and needs both again.
    let engine = CaseEngine::in_memory();
    let evaluation = engine
        .execute(|ctx| case.case_file_item_event(ctx, "b", CaseFileItemTransition::Create))
        .unwrap();
    assert!(evaluation.fired_sentries().is_empty());
    let evaluation = engine
        .execute(|ctx| case.case_file_item_event(ctx, "a", CaseFileItemTransition::Create))
        .unwrap();
    assert_eq!(evaluation.fired_sentries(), vec!["both"]);
    assert_eq!(case.plan_item_state("work"), Some(PlanItemState::Active));
}

#[test]
fn later_failure_in_command_rolls_back_case() {
    let engine = CaseEngine::in_memory();
    let mut case = CaseInstance::new(and_model());
    engine
        .execute(|ctx| case.case_file_item_event(ctx, "a", CaseFileItemTransition::Create))
        .unwrap();

    let result: Result<(), CaseError> = engine.execute(|ctx| {
        case.case_file_item_event(ctx, "b", CaseFileItemTransition::Create)?;
        Err(CaseError::illegal_state("claim", "review", "rejected"))
    });
    assert!(result.is_err());

    // Only the committed first event survives.
    assert_eq!(case.plan_item_state("work"), Some(PlanItemState::Available));
    assert!(case.evaluator().is_satisfied("both", 0));
    assert!(!case.evaluator().is_satisfied("both", 1));
}

#[test]
fn unknown_case_file_item_aborts_command() {
    let engine = CaseEngine::in_memory();
    let mut case = CaseInstance::new(and_model());
    let result = engine.execute(|ctx| case.case_file_item_event(ctx, "zzz", CaseFileItemTransition::Create));
    assert!(result.is_err());
}

proptest! {
    /// Firing count matches a reference pair of flags that reset on firing.
    #[test]
    fn and_sentry_is_edge_triggered(events in prop::collection::vec(0u8..3, 0..40)) {
        let mut evaluator = SentryEvaluator::new(and_model());
        let (mut a, mut b) = (false, false);
        let mut expected = 0;
        let mut fired = 0;

        for index in events {
            match index {
                0 => a = true,
                1 => b = true,
                _ => {}
            }
            let touched = index < 2;
            if touched && a && b {
                expected += 1;
                a = false;
                b = false;
            }
            fired += evaluator.handle(event_for(index)).fired_sentries().len();

            prop_assert_eq!(evaluator.is_satisfied("both", 0), a);
            prop_assert_eq!(evaluator.is_satisfied("both", 1), b);
        }
        prop_assert_eq!(fired, expected);
    }
}

//! Sentry evaluator: edge-triggered entry and exit criteria
//!
//! Each (sentry, OnPart) pair carries a satisfaction flag that is set when
//! the OnPart's source emits its standard event. A sentry fires once all of
//! its flags are set, after which every flag resets. Firing an entry
//! criterion starts its plan item; firing an exit criterion terminates it.
//! Transitions produced by a firing are fed back as plan-item events,
//! breadth-first, until nothing else fires.
//!
//! The evaluator has no side effects beyond its own state; the case runtime
//! dispatches what it reports.

use case_types::{
    CaseError, CaseFileItemTransition, CaseModel, CaseResult, CriterionKind, PlanItemState,
    PlanItemTransition, SourceKind,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// A standard event emitted by a case file item or a plan item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceEvent {
    pub source_kind: SourceKind,
    pub source_id: String,
    pub standard_event: String,
}

impl SourceEvent {
    pub fn case_file_item(item_id: impl Into<String>, transition: CaseFileItemTransition) -> Self {
        Self {
            source_kind: SourceKind::CaseFileItem,
            source_id: item_id.into(),
            standard_event: transition.standard_event().to_string(),
        }
    }

    pub fn plan_item(plan_item_id: impl Into<String>, transition: PlanItemTransition) -> Self {
        Self {
            source_kind: SourceKind::PlanItem,
            source_id: plan_item_id.into(),
            standard_event: transition.standard_event().to_string(),
        }
    }
}

/// One plan item state change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanItemStep {
    pub plan_item_id: String,
    pub transition: PlanItemTransition,
    pub from: PlanItemState,
    pub to: PlanItemState,
    /// Sentry whose firing caused the change; `None` for direct calls
    pub sentry_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvaluationStep {
    SentryFired { sentry_id: String },
    Transition(PlanItemStep),
}

/// Everything one call produced, in order of occurrence
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub steps: Vec<EvaluationStep>,
}

impl Evaluation {
    pub fn fired_sentries(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                EvaluationStep::SentryFired { sentry_id } => Some(sentry_id.as_str()),
                EvaluationStep::Transition(_) => None,
            })
            .collect()
    }

    pub fn transitions(&self) -> Vec<&PlanItemStep> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                EvaluationStep::Transition(t) => Some(t),
                EvaluationStep::SentryFired { .. } => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Clone)]
pub struct SentryEvaluator {
    model: Arc<CaseModel>,
    satisfied: HashMap<String, Vec<bool>>,
    states: BTreeMap<String, PlanItemState>,
}

impl SentryEvaluator {
    pub fn new(model: Arc<CaseModel>) -> Self {
        let satisfied = model
            .sentries
            .iter()
            .map(|s| (s.id.clone(), vec![false; s.on_parts.len()]))
            .collect();
        let states = model
            .plan_items
            .iter()
            .map(|p| (p.id.clone(), PlanItemState::Available))
            .collect();
        Self {
            model,
            satisfied,
            states,
        }
    }

    pub fn model(&self) -> &CaseModel {
        &self.model
    }

    pub fn plan_item_state(&self, plan_item_id: &str) -> Option<PlanItemState> {
        self.states.get(plan_item_id).copied()
    }

    pub fn plan_item_states(&self) -> &BTreeMap<String, PlanItemState> {
        &self.states
    }

    /// Whether the OnPart at `index` has been satisfied since the sentry last fired.
    pub fn is_satisfied(&self, sentry_id: &str, index: usize) -> bool {
        self.satisfied
            .get(sentry_id)
            .and_then(|flags| flags.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Start every available plan item that has no entry criteria.
    pub fn start(&mut self) -> Evaluation {
        let mut evaluation = Evaluation::default();
        let mut queue = VecDeque::new();
        let model = Arc::clone(&self.model);
        for plan_item in model.plan_items.iter().filter(|p| p.entry_criteria.is_empty()) {
            if let Some(step) = self.apply(
                &plan_item.id,
                PlanItemTransition::Start,
                PlanItemState::Active,
                None,
            ) {
                queue.push_back(SourceEvent::plan_item(&step.plan_item_id, step.transition));
                evaluation.steps.push(EvaluationStep::Transition(step));
            }
        }
        self.run(queue, &mut evaluation);
        evaluation
    }

    /// Feed one source event and cascade.
    pub fn handle(&mut self, event: SourceEvent) -> Evaluation {
        let mut evaluation = Evaluation::default();
        self.run(VecDeque::from([event]), &mut evaluation);
        evaluation
    }

    pub fn case_file_item_event(
        &mut self,
        item_id: &str,
        transition: CaseFileItemTransition,
    ) -> CaseResult<Evaluation> {
        if self.model.case_file_item(item_id).is_none() {
            return Err(CaseError::not_found("case_file_item", item_id, "case_file_item_event"));
        }
        Ok(self.handle(SourceEvent::case_file_item(item_id, transition)))
    }

    /// Complete an active plan item and cascade its `complete` event.
    pub fn complete_plan_item(&mut self, plan_item_id: &str) -> CaseResult<Evaluation> {
        self.manual_transition(plan_item_id, PlanItemTransition::Complete, PlanItemState::Completed)
    }

    /// Terminate an active plan item and cascade its `terminate` event.
    pub fn terminate_plan_item(&mut self, plan_item_id: &str) -> CaseResult<Evaluation> {
        self.manual_transition(plan_item_id, PlanItemTransition::Terminate, PlanItemState::Terminated)
    }

    fn manual_transition(
        &mut self,
        plan_item_id: &str,
        transition: PlanItemTransition,
        to: PlanItemState,
    ) -> CaseResult<Evaluation> {
        let current = self
            .plan_item_state(plan_item_id)
            .ok_or_else(|| CaseError::not_found("plan_item", plan_item_id, transition.standard_event()))?;
        if current != PlanItemState::Active {
            return Err(CaseError::illegal_state(
                plan_item_id,
                transition.standard_event(),
                format!("plan item is {current}, expected active"),
            ));
        }
        let mut evaluation = Evaluation::default();
        if let Some(step) = self.apply(plan_item_id, transition, to, None) {
            let event = SourceEvent::plan_item(&step.plan_item_id, step.transition);
            evaluation.steps.push(EvaluationStep::Transition(step));
            self.run(VecDeque::from([event]), &mut evaluation);
        }
        Ok(evaluation)
    }

    /// Move a plan item if its current state allows the transition.
    fn apply(
        &mut self,
        plan_item_id: &str,
        transition: PlanItemTransition,
        to: PlanItemState,
        sentry_id: Option<&str>,
    ) -> Option<PlanItemStep> {
        let state = self.states.get_mut(plan_item_id)?;
        let from = *state;
        let allowed = match transition {
            PlanItemTransition::Start => from == PlanItemState::Available,
            PlanItemTransition::Exit => !from.is_terminal(),
            PlanItemTransition::Complete | PlanItemTransition::Terminate => from == PlanItemState::Active,
            PlanItemTransition::Create => false,
        };
        if !allowed {
            return None;
        }
        *state = to;
        debug!(plan_item_id, %from, %to, ?transition, "Plan item transition");
        Some(PlanItemStep {
            plan_item_id: plan_item_id.to_string(),
            transition,
            from,
            to,
            sentry_id: sentry_id.map(str::to_string),
        })
    }

    fn run(&mut self, mut queue: VecDeque<SourceEvent>, evaluation: &mut Evaluation) {
        let model = Arc::clone(&self.model);
        while let Some(event) = queue.pop_front() {
            for sentry in &model.sentries {
                let fires = match self.satisfied.get_mut(&sentry.id) {
                    Some(flags) => {
                        let mut touched = false;
                        for (flag, on_part) in flags.iter_mut().zip(&sentry.on_parts) {
                            if on_part.matches(event.source_kind, &event.source_id, &event.standard_event) {
                                *flag = true;
                                touched = true;
                            }
                        }
                        let fires = touched && flags.iter().all(|f| *f);
                        if fires {
                            flags.iter_mut().for_each(|f| *f = false);
                        }
                        fires
                    }
                    None => false,
                };
                if !fires {
                    continue;
                }

                info!(sentry_id = %sentry.id, "Sentry fired");
                evaluation.steps.push(EvaluationStep::SentryFired {
                    sentry_id: sentry.id.clone(),
                });

                for (plan_item, criterion) in model.criteria_for_sentry(&sentry.id) {
                    let (transition, to) = match criterion.kind {
                        CriterionKind::Entry => (PlanItemTransition::Start, PlanItemState::Active),
                        CriterionKind::Exit => (PlanItemTransition::Exit, PlanItemState::Terminated),
                    };
                    if let Some(step) = self.apply(&plan_item.id, transition, to, Some(&sentry.id)) {
                        queue.push_back(SourceEvent::plan_item(&step.plan_item_id, step.transition));
                        evaluation.steps.push(EvaluationStep::Transition(step));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_types::{CaseFileItem, CaseFileModel, Criterion, Multiplicity, OnPart, PlanItem, Sentry};

    fn model() -> Arc<CaseModel> {
        Arc::new(
            CaseModel::builder("claims")
                .file_model(
                    CaseFileModel::new("cfm")
                        .with_item(CaseFileItem::new("claim", Multiplicity::ExactlyOne))
                        .with_item(CaseFileItem::new("evidence", Multiplicity::ZeroOrMore)),
                )
                .sentry(
                    Sentry::new("ready")
                        .with_on_part(OnPart::file_item("claim", "create"))
                        .with_on_part(OnPart::file_item("evidence", "addChild")),
                )
                .sentry(Sentry::new("reviewed").with_on_part(OnPart::plan_item("review", "complete")))
                .sentry(Sentry::new("withdrawn").with_on_part(OnPart::file_item("claim", "delete")))
                .plan_item(
                    PlanItem::new("review")
                        .with_criterion(Criterion::entry("review_entry", "ready"))
                        .with_criterion(Criterion::exit("review_exit", "withdrawn")),
                )
                .plan_item(PlanItem::new("payout").with_criterion(Criterion::entry("payout_entry", "reviewed")))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_and_combination_in_any_order() {
        let mut evaluator = SentryEvaluator::new(model());
        let first = evaluator
            .case_file_item_event("evidence", CaseFileItemTransition::AddChild)
            .unwrap();
        assert!(first.is_empty());
        assert!(evaluator.is_satisfied("ready", 1));
        assert!(!evaluator.is_satisfied("ready", 0));

        let second = evaluator
            .case_file_item_event("claim", CaseFileItemTransition::Create)
            .unwrap();
        assert_eq!(second.fired_sentries(), vec!["ready"]);
        assert_eq!(evaluator.plan_item_state("review"), Some(PlanItemState::Active));
        assert!(!evaluator.is_satisfied("ready", 0));
        assert!(!evaluator.is_satisfied("ready", 1));
    }

    #[test]
    fn test_completion_cascades_to_next_entry() {
        let mut evaluator = SentryEvaluator::new(model());
        evaluator.case_file_item_event("claim", CaseFileItemTransition::Create).unwrap();
        evaluator
            .case_file_item_event("evidence", CaseFileItemTransition::AddChild)
            .unwrap();

        let evaluation = evaluator.complete_plan_item("review").unwrap();
        let transitions = evaluation.transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].plan_item_id, "review");
        assert_eq!(transitions[0].sentry_id, None);
        assert_eq!(transitions[1].plan_item_id, "payout");
        assert_eq!(transitions[1].sentry_id.as_deref(), Some("reviewed"));
        assert_eq!(evaluator.plan_item_state("payout"), Some(PlanItemState::Active));
    }

    #[test]
    fn test_exit_criterion_terminates() {
        let mut evaluator = SentryEvaluator::new(model());
        let evaluation = evaluator
            .case_file_item_event("claim", CaseFileItemTransition::Delete)
            .unwrap();
        assert_eq!(evaluation.fired_sentries(), vec!["withdrawn"]);
        assert_eq!(evaluator.plan_item_state("review"), Some(PlanItemState::Terminated));

        // A terminated item is not started again.
        evaluator.case_file_item_event("claim", CaseFileItemTransition::Create).unwrap();
        let evaluation = evaluator
            .case_file_item_event("evidence", CaseFileItemTransition::AddChild)
            .unwrap();
        assert_eq!(evaluation.fired_sentries(), vec!["ready"]);
        assert!(evaluation.transitions().is_empty());
    }

    #[test]
    fn test_manual_transition_guards() {
        let mut evaluator = SentryEvaluator::new(model());
        let err = evaluator.complete_plan_item("review").unwrap_err();
        assert!(matches!(err, CaseError::IllegalState { .. }));
        assert!(evaluator.complete_plan_item("nope").is_err());
        assert!(evaluator
            .case_file_item_event("nope", CaseFileItemTransition::Create)
            .is_err());
    }

    #[test]
    fn test_start_activates_items_without_entry_criteria() {
        let model = Arc::new(
            CaseModel::builder("c")
                .plan_item(PlanItem::new("first"))
                .sentry(Sentry::new("after_first").with_on_part(OnPart::plan_item("first", "start")))
                .plan_item(PlanItem::new("second").with_criterion(Criterion::entry("e2", "after_first")))
                .build()
                .unwrap(),
        );
        let mut evaluator = SentryEvaluator::new(model);
        let evaluation = evaluator.start();
        assert_eq!(evaluation.transitions().len(), 2);
        assert_eq!(evaluator.plan_item_state("first"), Some(PlanItemState::Active));
        assert_eq!(evaluator.plan_item_state("second"), Some(PlanItemState::Active));
    }
}

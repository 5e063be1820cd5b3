//! Running case instances
//!
//! Pairs a [`SentryEvaluator`] with a case instance id and publishes what the
//! evaluator reports through the command's dispatcher.
//!
//! Evaluator state follows the command that changed it. A failed operation
//! restores the state it started from, and the state from before a command's
//! first change is restored if that command ends without committing.

use crate::context::CommandContext;
use crate::sentry::{Evaluation, EvaluationStep, SentryEvaluator};
use case_types::{
    CaseFileItemTransition, CaseInstanceId, CaseModel, CaseResult, CommandToken, EngineEvent,
    PlanItemState,
};
use std::sync::Arc;
use tracing::debug;

/// Evaluator state from before the first change of a command
struct Checkpoint {
    token: Arc<CommandToken>,
    before: SentryEvaluator,
}

pub struct CaseInstance {
    id: CaseInstanceId,
    evaluator: SentryEvaluator,
    checkpoint: Option<Checkpoint>,
}

impl CaseInstance {
    pub fn new(model: Arc<CaseModel>) -> Self {
        Self::with_id(CaseInstanceId::generate(), model)
    }

    pub fn with_id(id: CaseInstanceId, model: Arc<CaseModel>) -> Self {
        Self {
            id,
            evaluator: SentryEvaluator::new(model),
            checkpoint: None,
        }
    }

    pub fn id(&self) -> &CaseInstanceId {
        &self.id
    }

    /// Evaluator state as of the last command that did not abort.
    pub fn evaluator(&self) -> &SentryEvaluator {
        match &self.checkpoint {
            Some(checkpoint) if checkpoint.token.is_aborted() => &checkpoint.before,
            _ => &self.evaluator,
        }
    }

    pub fn plan_item_state(&self, plan_item_id: &str) -> Option<PlanItemState> {
        self.evaluator().plan_item_state(plan_item_id)
    }

    /// Activate plan items without entry criteria.
    pub fn start(&mut self, ctx: &mut CommandContext<'_>) -> CaseResult<Evaluation> {
        ctx.ensure_active(self.id.as_str(), "start_case")?;
        debug!(case_instance_id = %self.id, model = %self.evaluator.model().id, "Starting case instance");
        self.evaluate(ctx, None, |evaluator| Ok(evaluator.start()))
    }

    /// Report a standard event on a case file item.
    pub fn case_file_item_event(
        &mut self,
        ctx: &mut CommandContext<'_>,
        item_id: &str,
        transition: CaseFileItemTransition,
    ) -> CaseResult<Evaluation> {
        ctx.ensure_active(item_id, "case_file_item_event")?;
        let source = EngineEvent::CaseFileItemTransition {
            case_instance_id: self.id.clone(),
            item_id: item_id.to_string(),
            standard_event: transition.standard_event().to_string(),
        };
        self.evaluate(ctx, Some(source), |evaluator| {
            evaluator.case_file_item_event(item_id, transition)
        })
    }

    pub fn complete_plan_item(
        &mut self,
        ctx: &mut CommandContext<'_>,
        plan_item_id: &str,
    ) -> CaseResult<Evaluation> {
        ctx.ensure_active(plan_item_id, "complete_plan_item")?;
        self.evaluate(ctx, None, |evaluator| evaluator.complete_plan_item(plan_item_id))
    }

    pub fn terminate_plan_item(
        &mut self,
        ctx: &mut CommandContext<'_>,
        plan_item_id: &str,
    ) -> CaseResult<Evaluation> {
        ctx.ensure_active(plan_item_id, "terminate_plan_item")?;
        self.evaluate(ctx, None, |evaluator| evaluator.terminate_plan_item(plan_item_id))
    }

    /// Settle the previous command's outcome and remember the state this
    /// command starts from.
    fn begin(&mut self, ctx: &CommandContext<'_>) {
        if let Some(checkpoint) = self.checkpoint.take() {
            if checkpoint.token.id() == ctx.command_id() {
                self.checkpoint = Some(checkpoint);
                return;
            }
            if checkpoint.token.is_aborted() {
                debug!(case_instance_id = %self.id, command_id = checkpoint.token.id(), "Discarding sentry state of aborted command");
                self.evaluator = checkpoint.before;
            }
        }
        self.checkpoint = Some(Checkpoint {
            token: Arc::clone(ctx.token()),
            before: self.evaluator.clone(),
        });
    }

    /// Run one evaluator operation and publish its steps, restoring the
    /// evaluator if either fails.
    fn evaluate<F>(
        &mut self,
        ctx: &mut CommandContext<'_>,
        source: Option<EngineEvent>,
        operation: F,
    ) -> CaseResult<Evaluation>
    where
        F: FnOnce(&mut SentryEvaluator) -> CaseResult<Evaluation>,
    {
        self.begin(ctx);
        let before = self.evaluator.clone();
        let result = operation(&mut self.evaluator).and_then(|evaluation| {
            if let Some(event) = source {
                ctx.dispatch_event(|| Ok(event))?;
            }
            self.publish(ctx, &evaluation)?;
            Ok(evaluation)
        });
        if result.is_err() {
            self.evaluator = before;
        }
        result
    }

    fn publish(&self, ctx: &CommandContext<'_>, evaluation: &Evaluation) -> CaseResult<()> {
        for step in &evaluation.steps {
            let case_instance_id = self.id.clone();
            match step {
                EvaluationStep::SentryFired { sentry_id } => ctx.dispatch_event(|| {
                    Ok(EngineEvent::SentryFired {
                        case_instance_id,
                        sentry_id: sentry_id.clone(),
                    })
                })?,
                EvaluationStep::Transition(t) => ctx.dispatch_event(|| {
                    Ok(EngineEvent::PlanItemTransition {
                        case_instance_id,
                        plan_item_id: t.plan_item_id.clone(),
                        transition: t.transition,
                        from: t.from,
                        to: t.to,
                    })
                })?,
            }
        }
        Ok(())
    }
}

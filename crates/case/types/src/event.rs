//! Engine events
//!
//! Every mutation the engine performs is announced as one typed event. The
//! fieldless [`EventKind`] is the key of the dispatcher's table.

use crate::{
    CaseInstanceId, CaseResult, EntityKind, ExecutionId, PersistentEntity, PlanItemState,
    PlanItemTransition, TaskId, VariableContext, VariableId,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    EntityCreated,
    EntityInitialized,
    EntityUpdated,
    EntityDeleted,
    EntitySuspended,
    EntityActivated,
    TaskAssigned,
    TaskCompleted,
    VariableCreated,
    VariableUpdated,
    VariableDeleted,
    ExecutionSignaled,
    CaseFileItemTransition,
    PlanItemTransition,
    SentryFired,
}

/// Persistent state of an entity at the moment an event was raised
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub kind: EntityKind,
    pub id: String,
    pub state: serde_json::Value,
}

impl EntitySnapshot {
    pub fn of<E: PersistentEntity>(entity: &E) -> CaseResult<Self> {
        Ok(Self {
            kind: E::KIND,
            id: entity.id().to_string(),
            state: entity.persistent_state()?,
        })
    }

    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.state.get(name)
    }
}

/// Payload of the variable events
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariableEvent {
    pub variable_id: VariableId,
    pub name: String,
    pub value: serde_json::Value,
    pub type_name: String,
    #[serde(flatten)]
    pub context: VariableContext,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    EntityCreated(EntitySnapshot),
    EntityInitialized(EntitySnapshot),
    EntityUpdated(EntitySnapshot),
    EntityDeleted(EntitySnapshot),
    EntitySuspended(EntitySnapshot),
    EntityActivated(EntitySnapshot),
    TaskAssigned(EntitySnapshot),
    TaskCompleted {
        task: EntitySnapshot,
        variables: BTreeMap<String, serde_json::Value>,
        local_scope: bool,
    },
    VariableCreated(VariableEvent),
    VariableUpdated(VariableEvent),
    VariableDeleted(VariableEvent),
    ExecutionSignaled {
        execution_id: ExecutionId,
        task_id: Option<TaskId>,
    },
    CaseFileItemTransition {
        case_instance_id: CaseInstanceId,
        item_id: String,
        standard_event: String,
    },
    PlanItemTransition {
        case_instance_id: CaseInstanceId,
        plan_item_id: String,
        transition: PlanItemTransition,
        from: PlanItemState,
        to: PlanItemState,
    },
    SentryFired {
        case_instance_id: CaseInstanceId,
        sentry_id: String,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::EntityCreated(_) => EventKind::EntityCreated,
            Self::EntityInitialized(_) => EventKind::EntityInitialized,
            Self::EntityUpdated(_) => EventKind::EntityUpdated,
            Self::EntityDeleted(_) => EventKind::EntityDeleted,
            Self::EntitySuspended(_) => EventKind::EntitySuspended,
            Self::EntityActivated(_) => EventKind::EntityActivated,
            Self::TaskAssigned(_) => EventKind::TaskAssigned,
            Self::TaskCompleted { .. } => EventKind::TaskCompleted,
            Self::VariableCreated(_) => EventKind::VariableCreated,
            Self::VariableUpdated(_) => EventKind::VariableUpdated,
            Self::VariableDeleted(_) => EventKind::VariableDeleted,
            Self::ExecutionSignaled { .. } => EventKind::ExecutionSignaled,
            Self::CaseFileItemTransition { .. } => EventKind::CaseFileItemTransition,
            Self::PlanItemTransition { .. } => EventKind::PlanItemTransition,
            Self::SentryFired { .. } => EventKind::SentryFired,
        }
    }

    /// Id of the entity or element the event is about
    pub fn subject_id(&self) -> &str {
        match self {
            Self::EntityCreated(s)
            | Self::EntityInitialized(s)
            | Self::EntityUpdated(s)
            | Self::EntityDeleted(s)
            | Self::EntitySuspended(s)
            | Self::EntityActivated(s)
            | Self::TaskAssigned(s) => &s.id,
            Self::TaskCompleted { task, .. } => &task.id,
            Self::VariableCreated(v) | Self::VariableUpdated(v) | Self::VariableDeleted(v) => {
                v.variable_id.as_str()
            }
            Self::ExecutionSignaled { execution_id, .. } => execution_id.as_str(),
            Self::CaseFileItemTransition { item_id, .. } => item_id,
            Self::PlanItemTransition { plan_item_id, .. } => plan_item_id,
            Self::SentryFired { sentry_id, .. } => sentry_id,
        }
    }
}

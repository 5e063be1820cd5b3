//! Case runtime engine
//!
//! Runs commands against the entity store. Each command gets a
//! [`CommandContext`] that owns its unit of work: reads go through a session
//! that overlays pending writes, writes are buffered and flushed atomically
//! with revision checks when the command ends.
//!
//! # Architecture
//!
//! - [`CaseEngine`]: facade; opens a context per call and commits it
//! - [`tasks`]: task lifecycle: assignment, delegation, completion, deletion
//! - [`variables`]: hierarchical variable scopes (task → execution)
//! - [`identity_links`]: candidate, participant and custom links
//! - [`SentryEvaluator`] / [`CaseInstance`]: edge-triggered entry and exit
//!   criteria for case plan items
//! - [`EventDispatcher`], [`HistoryManager`], [`TaskListenerRegistry`]: the
//!   side effects every mutation produces
//!
//! # Example
//!
//! ```rust
//! use case_engine::CaseEngine;
//!
//! let engine = CaseEngine::in_memory();
//!
//! let mut task = engine.new_task().with_name("Review claim");
//! engine.save_task(&mut task).unwrap();
//!
//! engine.set_assignee(&task.id, Some("kermit")).unwrap();
//! engine.delegate_task(&task.id, "fozzie").unwrap();
//! engine.resolve_task(&task.id).unwrap();
//!
//! let task = engine.get_task(&task.id).unwrap().unwrap();
//! assert_eq!(task.assignee.as_deref(), Some("kermit"));
//! ```

#![deny(unsafe_code)]

pub mod config;
mod case_instance;
mod context;
mod dispatcher;
mod engine;
mod history;
pub mod identity_links;
mod listeners;
mod sentry;
pub mod tasks;
pub mod telemetry;
pub mod variables;

pub use case_instance::CaseInstance;
pub use config::{EngineConfig, LoggingConfig};
pub use context::CommandContext;
pub use dispatcher::{EventDispatcher, EventListener};
pub use engine::CaseEngine;
pub use history::{HistoryManager, HistoryRecorder, StoreHistoryRecorder};
pub use listeners::{TaskEvent, TaskListener, TaskListenerRegistry};
pub use sentry::{Evaluation, EvaluationStep, PlanItemStep, SentryEvaluator, SourceEvent};

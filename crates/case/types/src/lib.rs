//! Domain types for the case runtime core
//!
//! The runtime persists long-lived units of work (tasks, executions, case
//! plan items), mutates them under optimistic concurrency and advances them
//! through declarative triggers.
//!
//! # Key Concepts
//!
//! - **PersistentEntity**: anything stored by the entity store. Carries an id
//!   and a revision; the revision grows by exactly one per committed update.
//! - **Task**: the human-task entity with assignment, delegation and
//!   suspension state. Owns a variable scope and a lazily loaded list of
//!   identity links.
//! - **Execution**: the runtime path a task is bound to. A process instance is
//!   the root execution whose id equals its process instance id.
//! - **VariableInstance** / **IdentityLink**: rows owned by exactly one scope
//!   or owner, resolved on demand inside a command.
//! - **EngineEvent** / **HistoryEntry**: the side effects every mutation
//!   produces.
//! - **CaseModel**: the immutable CMMN model (case file items, sentries,
//!   criteria, plan items), validated once when built.

#![deny(unsafe_code)]

mod capability;
mod case_model;
mod entity;
mod errors;
mod event;
mod execution;
mod history;
mod identity_link;
mod ids;
mod lazy;
mod scope;
mod task;
mod variable;

pub use capability::*;
pub use case_model::*;
pub use entity::*;
pub use errors::*;
pub use event::*;
pub use execution::*;
pub use history::*;
pub use identity_link::*;
pub use ids::*;
pub use lazy::*;
pub use scope::*;
pub use task::*;
pub use variable::*;

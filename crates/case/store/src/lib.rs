//! Entity storage for the case runtime.
//!
//! This crate defines the storage contract used by the engine:
//! - an [`EntityStore`] that keeps rows keyed by `(kind, id)` with a revision
//! - an in-memory reference backend that checks revisions atomically per commit
//! - [`DbSession`], the unit of work of one command: buffered writes,
//!   load snapshots for dirty checking, and a single flush at command end
//!
//! Design stance:
//! - A stale write is rejected, never merged.
//! - A command either commits all of its writes or none of them.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod memory;
mod model;
mod session;
mod traits;

pub use memory::InMemoryEntityStore;
pub use model::{CommitReceipt, RowFilter, RowKey, StoreStats, StoredRow, WriteBatch, WriteOp};
pub use session::{DbSession, FlushSummary};
pub use traits::EntityStore;

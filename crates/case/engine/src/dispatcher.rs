//! Synchronous engine event dispatch
//!
//! Listeners are kept in a table keyed by [`EventKind`] plus a catch-all
//! list. Dispatch runs inline on the command's thread; a listener error
//! aborts the command.

use case_types::{CaseError, CaseResult, EngineEvent, EventKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Handler invoked for a dispatched event
pub type EventListener = Arc<dyn Fn(&EngineEvent) -> CaseResult<()> + Send + Sync>;

pub struct EventDispatcher {
    enabled: bool,
    by_kind: HashMap<EventKind, Vec<EventListener>>,
    catch_all: Vec<EventListener>,
}

impl EventDispatcher {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            by_kind: HashMap::new(),
            catch_all: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Listen for one kind of event
    pub fn add_listener<F>(&mut self, kind: EventKind, listener: F)
    where
        F: Fn(&EngineEvent) -> CaseResult<()> + Send + Sync + 'static,
    {
        self.by_kind.entry(kind).or_default().push(Arc::new(listener));
    }

    /// Listen for every event
    pub fn add_catch_all<F>(&mut self, listener: F)
    where
        F: Fn(&EngineEvent) -> CaseResult<()> + Send + Sync + 'static,
    {
        self.catch_all.push(Arc::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.catch_all.len() + self.by_kind.values().map(Vec::len).sum::<usize>()
    }

    /// Deliver an event to the listeners of its kind, then to the catch-all
    /// listeners. Does nothing while disabled.
    pub fn dispatch(&self, event: &EngineEvent) -> CaseResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let kind = event.kind();
        trace!(?kind, subject = event.subject_id(), "Dispatching event");

        let typed = self.by_kind.get(&kind).into_iter().flatten();
        for listener in typed.chain(self.catch_all.iter()) {
            listener(event).map_err(|e| match e {
                CaseError::Listener { .. } => e,
                other => CaseError::listener(event.subject_id(), format!("{kind:?}"), other.to_string()),
            })?;
        }
        Ok(())
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(true)
    }
}

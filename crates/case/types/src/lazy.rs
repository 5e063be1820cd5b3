//! Lazily loaded associations bound to a command
//!
//! An association (a task's identity links, a scope's variables) is loaded
//! inside a command and stays readable only while that command is active.
//! Reading it afterwards fails with a context error instead of silently
//! returning stale rows.

use crate::{CaseError, CaseResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Identity, liveness and outcome of one command
#[derive(Debug)]
pub struct CommandToken {
    id: u64,
    active: AtomicBool,
    committed: AtomicBool,
}

impl CommandToken {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed),
            active: AtomicBool::new(true),
            committed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Record that the command's unit of work reached the store.
    pub fn mark_committed(&self) {
        self.committed.store(true, Ordering::Release);
    }

    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }

    /// Ended without committing.
    pub fn is_aborted(&self) -> bool {
        !self.is_active() && !self.is_committed()
    }
}

/// Load state of an association
#[derive(Clone, Debug)]
pub enum Lazy<T> {
    /// Not loaded in any command
    Unloaded,
    /// Created in memory for a new entity; nothing to load
    Fresh(T),
    /// Loaded inside a command; readable while that command is active
    Loaded { token: Arc<CommandToken>, value: T },
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl<T> Lazy<T> {
    pub fn fresh(value: T) -> Self {
        Self::Fresh(value)
    }

    /// True when the value can be read under the given command without a load.
    pub fn is_loaded_in(&self, token: &CommandToken) -> bool {
        match self {
            Self::Unloaded => false,
            Self::Fresh(_) => true,
            Self::Loaded { token: t, .. } => t.id() == token.id() && t.is_active(),
        }
    }

    pub fn load(&mut self, token: &Arc<CommandToken>, value: T) {
        *self = Self::Loaded {
            token: Arc::clone(token),
            value,
        };
    }

    /// Tie a fresh value to a command, typically when its entity is inserted.
    pub fn bind(&mut self, token: &Arc<CommandToken>) {
        if let Self::Fresh(_) = self {
            if let Self::Fresh(value) = std::mem::take(self) {
                self.load(token, value);
            }
        }
    }

    pub fn invalidate(&mut self) {
        *self = Self::Unloaded;
    }

    pub fn get(&self, entity_id: &str, operation: &str) -> CaseResult<&T> {
        match self {
            Self::Fresh(value) => Ok(value),
            Self::Loaded { token, value } if token.is_active() => Ok(value),
            _ => Err(CaseError::context(entity_id, operation)),
        }
    }

    pub fn get_mut(&mut self, entity_id: &str, operation: &str) -> CaseResult<&mut T> {
        match self {
            Self::Fresh(value) => Ok(value),
            Self::Loaded { token, value } if token.is_active() => Ok(value),
            _ => Err(CaseError::context(entity_id, operation)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_access_is_context_error() {
        let lazy: Lazy<Vec<u8>> = Lazy::Unloaded;
        let err = lazy.get("t1", "identity_links").unwrap_err();
        assert!(matches!(err, CaseError::Context { .. }));
    }

    #[test]
    fn test_loaded_value_expires_with_its_command() {
        let token = CommandToken::new();
        let mut lazy = Lazy::Unloaded;
        lazy.load(&token, vec![1, 2]);
        assert!(lazy.is_loaded_in(&token));
        assert_eq!(lazy.get("t1", "read").unwrap().len(), 2);

        token.deactivate();
        assert!(!lazy.is_loaded_in(&token));
        assert!(lazy.get("t1", "read").is_err());
    }

    #[test]
    fn test_bind_moves_fresh_value_under_command() {
        let token = CommandToken::new();
        let mut lazy = Lazy::fresh(vec![7]);
        lazy.bind(&token);
        assert!(matches!(lazy, Lazy::Loaded { .. }));

        let other = CommandToken::new();
        assert!(!lazy.is_loaded_in(&other));
    }

    #[test]
    fn test_token_outcome() {
        let committed = CommandToken::new();
        assert!(!committed.is_aborted());
        committed.mark_committed();
        committed.deactivate();
        assert!(committed.is_committed());
        assert!(!committed.is_aborted());

        let aborted = CommandToken::new();
        aborted.deactivate();
        assert!(aborted.is_aborted());
    }
}

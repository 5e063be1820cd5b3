//! Error types for the case runtime
//!
//! Every variant carries the originating entity (or model element) id and
//! the operation or field that failed. All of them abort the running
//! command; none are retried by the engine.

use crate::{EntityKind, SourcePosition};

/// Errors that can occur in case runtime operations
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("Illegal state for {entity_id} in {operation}: {message}")]
    IllegalState {
        entity_id: String,
        operation: String,
        message: String,
    },

    #[error(
        "Optimistic lock failure on {kind} {entity_id} in {operation}: expected revision {expected}, found {}",
        describe_revision(.actual)
    )]
    OptimisticLock {
        kind: EntityKind,
        entity_id: String,
        operation: String,
        expected: u32,
        actual: Option<u32>,
    },

    #[error("Validation failed for '{element_id}'{}: {message}", describe_position(.position))]
    Validation {
        element_id: String,
        position: Option<SourcePosition>,
        message: String,
    },

    #[error("{kind} not found: {entity_id} (in {operation})")]
    NotFound {
        kind: &'static str,
        entity_id: String,
        operation: String,
    },

    #[error("No active command context for {entity_id} in {operation}: lazy loading outside command context")]
    Context { entity_id: String, operation: String },

    #[error("Listener failed for {entity_id} in {operation}: {message}")]
    Listener {
        entity_id: String,
        operation: String,
        message: String,
    },

    #[error("Serialization of {entity_id} failed: {message}")]
    Serialization { entity_id: String, message: String },

    #[error("Storage backend error in {operation}: {message}")]
    Backend { operation: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

fn describe_revision(actual: &Option<u32>) -> String {
    match actual {
        Some(revision) => revision.to_string(),
        None => "no row".to_string(),
    }
}

fn describe_position(position: &Option<SourcePosition>) -> String {
    match position {
        Some(pos) => format!(" at {pos}"),
        None => String::new(),
    }
}

impl CaseError {
    pub fn illegal_state(
        entity_id: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::IllegalState {
            entity_id: entity_id.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn not_found(
        kind: &'static str,
        entity_id: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind,
            entity_id: entity_id.into(),
            operation: operation.into(),
        }
    }

    pub fn context(entity_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Context {
            entity_id: entity_id.into(),
            operation: operation.into(),
        }
    }

    pub fn validation(
        element_id: impl Into<String>,
        position: Option<SourcePosition>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            element_id: element_id.into(),
            position,
            message: message.into(),
        }
    }

    pub fn listener(
        entity_id: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Listener {
            entity_id: entity_id.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn serialization(entity_id: impl Into<String>, err: serde_json::Error) -> Self {
        Self::Serialization {
            entity_id: entity_id.into(),
            message: err.to_string(),
        }
    }

    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, Self::OptimisticLock { .. })
    }
}

/// Result type alias for case runtime operations
pub type CaseResult<T> = Result<T, CaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_lock_message() {
        let err = CaseError::OptimisticLock {
            kind: EntityKind::Task,
            entity_id: "t1".into(),
            operation: "update".into(),
            expected: 3,
            actual: Some(4),
        };
        assert!(err.is_optimistic_lock());
        assert_eq!(
            err.to_string(),
            "Optimistic lock failure on task t1 in update: expected revision 3, found 4"
        );
    }

    #[test]
    fn test_validation_message_includes_position() {
        let err = CaseError::validation(
            "item2",
            Some(SourcePosition::new(7, 5)),
            "multiplicity violated",
        );
        assert_eq!(
            err.to_string(),
            "Validation failed for 'item2' at line 7, column 5: multiplicity violated"
        );
    }

    #[test]
    fn test_context_message() {
        let err = CaseError::context("t9", "identity_links");
        assert!(err.to_string().contains("lazy loading outside command context"));
    }
}

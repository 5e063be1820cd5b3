//! DSL error types

use case_types::CaseError;

/// Errors that can occur during DSL parsing, validation, or compilation
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    #[error("Parse error at line {line}, column {col}: {message}")]
    ParseError {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("Unexpected token at line {line}, column {col}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        col: usize,
    },

    #[error("Unexpected end of input: expected {0}")]
    UnexpectedEof(String),

    #[error("Unknown keyword at line {line}, column {col}: '{keyword}'")]
    UnknownKeyword {
        keyword: String,
        line: usize,
        col: usize,
    },

    #[error("Unknown multiplicity at line {line}, column {col}: '{value}'")]
    UnknownMultiplicity {
        value: String,
        line: usize,
        col: usize,
    },

    #[error("Case model error: {0}")]
    CaseError(#[from] CaseError),
}

impl DslError {
    /// Whether the model parsed but failed validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::CaseError(CaseError::Validation { .. }))
    }
}

/// Result type alias for DSL operations
pub type DslResult<T> = Result<T, DslError>;

//! Case model DSL
//!
//! A keyword block language for declaring CMMN case models. The DSL compiles
//! down to `CaseModel` from the `case-types` crate; every element keeps the
//! line and column it was declared at, so validation errors point back into
//! the source.
//!
//! # DSL Syntax
//!
//! ```text
//! CASE claims "Claims handling" {
//!     FILEMODEL files {
//!         ITEM claim "Claim" EXACTLY_ONE
//!         ITEM evidence ZERO_OR_MORE DEFINITION document {
//!             ITEM page ONE_OR_MORE
//!         }
//!     }
//!
//!     SENTRY ready {
//!         ON claim create
//!         ON evidence addChild
//!     }
//!     SENTRY reviewed {
//!         ON review complete
//!     }
//!
//!     PLANITEM review "Review claim" {
//!         ENTRY review_entry ready
//!     }
//!     PLANITEM payout {
//!         ENTRY payout_entry reviewed
//!     }
//! }
//! ```
//!
//! An `ON` source is looked up among case file items first, then plan items.
//!
//! # Usage
//!
//! ```rust
//! use case_dsl::compile;
//!
//! let model = compile(r#"
//! CASE simple {
//!     FILEMODEL files { ITEM doc EXACTLY_ONE }
//!     SENTRY doc_ready { ON doc create }
//!     PLANITEM review { ENTRY start_review doc_ready }
//! }
//! "#).unwrap();
//!
//! assert_eq!(model.id, "simple");
//! assert_eq!(model.criteria_for_sentry("doc_ready").count(), 1);
//! ```

#![deny(unsafe_code)]

mod compiler;
mod errors;
mod lexer;
mod parser;
mod validator;

pub use compiler::{compile, compile_parsed};
pub use errors::{DslError, DslResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{
    ParsedCase, ParsedCriterion, ParsedFileModel, ParsedItem, ParsedOnPart, ParsedPlanItem,
    ParsedSentry, Parser,
};
pub use validator::validate;

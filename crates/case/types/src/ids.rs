//! Entity and model element identifiers

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn short(&self) -> &str {
                self.0.get(..8).unwrap_or(&self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier for a task
    TaskId
);

string_id!(
    /// Unique identifier for an execution. A process instance is identified
    /// by the id of its root execution.
    ExecutionId
);

string_id!(
    /// Unique identifier for a stored variable instance
    VariableId
);

string_id!(
    /// Unique identifier for an identity link
    IdentityLinkId
);

string_id!(
    /// Unique identifier for a history entry
    HistoryEntryId
);

string_id!(
    /// Identifier of a running case instance
    CaseInstanceId
);

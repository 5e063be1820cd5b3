//! Stored variable instances

use crate::{EntityKind, PersistentEntity, ScopeRef, VariableContext, VariableId};
use serde::{Deserialize, Serialize};

/// One named value owned by exactly one scope
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableInstance {
    pub id: VariableId,
    #[serde(skip)]
    pub revision: u32,
    pub name: String,
    pub value: serde_json::Value,
    pub type_name: String,
    pub scope: ScopeRef,
    #[serde(flatten)]
    pub context: VariableContext,
}

impl VariableInstance {
    pub fn new(
        name: impl Into<String>,
        value: serde_json::Value,
        scope: ScopeRef,
        context: VariableContext,
    ) -> Self {
        let type_name = type_name_of(&value).to_string();
        Self {
            id: VariableId::generate(),
            revision: 0,
            name: name.into(),
            value,
            type_name,
            scope,
            context,
        }
    }

    pub fn set_value(&mut self, value: serde_json::Value) {
        self.type_name = type_name_of(&value).to_string();
        self.value = value;
    }
}

/// Name of the value type as stored next to the value
pub fn type_name_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "long",
        serde_json::Value::Number(_) => "double",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => "json",
    }
}

impl PersistentEntity for VariableInstance {
    const KIND: EntityKind = EntityKind::VariableInstance;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

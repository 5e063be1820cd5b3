//! Configuration for the case engine

use case_types::{CaseError, CaseResult, HistoryLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dispatch engine events to registered listeners
    #[serde(default = "default_true")]
    pub event_dispatcher_enabled: bool,

    /// How much audit history to keep
    #[serde(default)]
    pub history_level: HistoryLevel,

    /// Tenant stamped on tasks that are not bound to an execution
    #[serde(default)]
    pub default_tenant_id: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_dispatcher_enabled: true,
            history_level: HistoryLevel::default(),
            default_tenant_id: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Parse configuration from YAML text. Missing keys take their defaults.
    pub fn from_yaml(text: &str) -> CaseResult<Self> {
        serde_yaml::from_str(text).map_err(|e| CaseError::Config(e.to_string()))
    }

    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> CaseResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CaseError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }

    /// Configuration with history and events switched off
    pub fn minimal() -> Self {
        Self {
            event_dispatcher_enabled: false,
            history_level: HistoryLevel::None,
            ..Default::default()
        }
    }

    pub fn with_history_level(mut self, level: HistoryLevel) -> Self {
        self.history_level = level;
        self
    }

    pub fn with_event_dispatcher(mut self, enabled: bool) -> Self {
        self.event_dispatcher_enabled = enabled;
        self
    }

    pub fn with_default_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.default_tenant_id = Some(tenant_id.into());
        self
    }
}

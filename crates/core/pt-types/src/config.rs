//! Configuration types supplied by the caller.
//!
//! Everything here is plain data. The planner never fetches configuration on
//! its own; it receives a [`PartitionSettings`] value.

use pt_error::{PtError, Result};
use serde::{Deserialize, Serialize};

/// Pure formatting configuration for generated partition names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingPolicy {
    /// Prepended to every generated name
    #[serde(default)]
    pub prefix: String,

    /// Appended to every generated name
    #[serde(default)]
    pub suffix: String,

    /// Placed between the base name and the interval tag
    #[serde(default = "default_separator")]
    pub separator: String,

    /// chrono format for daily keys
    #[serde(default = "default_daily_format")]
    pub daily_format: String,

    /// chrono format for weekly keys (ISO week by default)
    #[serde(default = "default_weekly_format")]
    pub weekly_format: String,

    /// chrono format for monthly keys
    #[serde(default = "default_monthly_format")]
    pub monthly_format: String,

    /// chrono format for quarterly keys; `{q}` is replaced by the quarter number
    #[serde(default = "default_quarterly_format")]
    pub quarterly_format: String,

    /// chrono format for yearly keys
    #[serde(default = "default_yearly_format")]
    pub yearly_format: String,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            separator: default_separator(),
            daily_format: default_daily_format(),
            weekly_format: default_weekly_format(),
            monthly_format: default_monthly_format(),
            quarterly_format: default_quarterly_format(),
            yearly_format: default_yearly_format(),
        }
    }
}

fn default_separator() -> String {
    "_".to_string()
}

fn default_daily_format() -> String {
    "%Y_%m_%d".to_string()
}

fn default_weekly_format() -> String {
    "%G_%V".to_string()
}

fn default_monthly_format() -> String {
    "%Y_%m".to_string()
}

fn default_quarterly_format() -> String {
    "%Y_{q}".to_string()
}

fn default_yearly_format() -> String {
    "%Y".to_string()
}

/// Planner-wide settings and behaviour toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSettings {
    /// Naming policy for generated partitions
    #[serde(default)]
    pub naming: NamingPolicy,

    /// Global fallback schema, lowest precedence before none
    #[serde(default)]
    pub default_schema: Option<String>,

    /// Global fallback tablespace
    #[serde(default)]
    pub default_tablespace: Option<String>,

    /// Detach partitions without blocking concurrent queries
    #[serde(default)]
    pub detach_concurrently: bool,

    /// Run ANALYZE on newly created partitions
    #[serde(default = "default_true")]
    pub analyze_after_create: bool,

    /// Run VACUUM on the parent after dropping partitions
    #[serde(default)]
    pub vacuum_after_drop: bool,

    /// Drop a partition's schema once the last partition in it is dropped
    #[serde(default)]
    pub reclaim_empty_schemas: bool,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            naming: NamingPolicy::default(),
            default_schema: None,
            default_tablespace: None,
            detach_concurrently: false,
            analyze_after_create: default_true(),
            vacuum_after_drop: false,
            reclaim_empty_schemas: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl PartitionSettings {
    /// Create settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PtError::Config(format!("Invalid partition settings: {}", e)))
    }

    /// Set the global default schema.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Set the global default tablespace.
    pub fn with_default_tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.default_tablespace = Some(tablespace.into());
        self
    }

    /// Set the naming policy.
    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    /// Detach partitions concurrently.
    pub fn with_detach_concurrently(mut self, enabled: bool) -> Self {
        self.detach_concurrently = enabled;
        self
    }

    /// Vacuum the parent after drops.
    pub fn with_vacuum_after_drop(mut self, enabled: bool) -> Self {
        self.vacuum_after_drop = enabled;
        self
    }

    /// Reclaim schemas emptied by drops.
    pub fn with_reclaim_empty_schemas(mut self, enabled: bool) -> Self {
        self.reclaim_empty_schemas = enabled;
        self
    }
}

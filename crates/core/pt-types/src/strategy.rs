//! Partition strategies and partition keys.

use pt_error::{PtError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The rule by which rows are routed to child tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionStrategy {
    /// Contiguous half-open value ranges
    Range,
    /// Discrete value sets
    List,
    /// Modulus/remainder buckets
    Hash,
}

impl PartitionStrategy {
    /// SQL keyword for this strategy.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Range => "RANGE",
            Self::List => "LIST",
            Self::Hash => "HASH",
        }
    }
}

impl std::fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for PartitionStrategy {
    type Err = PtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "range" => Ok(Self::Range),
            "list" => Ok(Self::List),
            "hash" => Ok(Self::Hash),
            other => Err(PtError::Config(format!(
                "Unknown partition strategy '{}'. Expected range, list or hash",
                other
            ))),
        }
    }
}

/// The column(s) or expression a level is partitioned by.
///
/// Opaque to the planner beyond being rendered into `PARTITION BY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKey {
    /// One or more plain column identifiers
    Columns(Vec<String>),
    /// A computed expression, e.g. `date_trunc('day', created_at)`
    Expression(String),
}

impl PartitionKey {
    /// Key on a single column.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Columns(vec![name.into()])
    }

    /// Key on a computed expression.
    pub fn expression(expr: impl Into<String>) -> Self {
        Self::Expression(expr.into())
    }

    /// Returns true if no column or expression was given.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Columns(cols) => cols.iter().all(|c| c.trim().is_empty()),
            Self::Expression(expr) => expr.trim().is_empty(),
        }
    }

    /// Renders the key list used inside `PARTITION BY <strategy> (...)`.
    pub fn to_sql(&self) -> String {
        match self {
            Self::Columns(cols) => cols.join(", "),
            Self::Expression(expr) => format!("({})", expr),
        }
    }
}

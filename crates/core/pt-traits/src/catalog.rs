//! Catalog reader trait and related types.

use async_trait::async_trait;
use pt_error::Result;
use pt_types::PartitionKey;
use serde::{Deserialize, Serialize};

/// Trait for reading the partition layout of existing tables.
///
/// Every call is expected to return fresh catalog state; the planner never
/// caches what it reads.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Lists the direct children of a partitioned table.
    ///
    /// # Arguments
    ///
    /// * `parent` - Parent table, optionally schema-qualified
    ///
    /// # Returns
    ///
    /// Children with their raw boundary expressions, in catalog order
    async fn list_child_partitions(&self, parent: &str) -> Result<Vec<ChildPartition>>;

    /// Lists the index names defined on a table.
    async fn list_indexes(&self, table: &str) -> Result<Vec<String>>;

    /// Returns the partition key of a table, if it is partitioned.
    async fn partition_key(&self, table: &str) -> Result<Option<PartitionKey>>;
}

/// A child partition as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildPartition {
    /// Partition name, schema-qualified when outside the default schema
    pub name: String,

    /// Raw boundary expression, e.g. `FOR VALUES FROM ('2024-01-01') TO ('2024-02-01')`
    pub boundary_expression: String,
}

impl ChildPartition {
    /// Create a new child partition record.
    pub fn new(name: impl Into<String>, boundary_expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            boundary_expression: boundary_expression.into(),
        }
    }
}

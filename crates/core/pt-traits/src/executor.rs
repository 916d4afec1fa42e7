//! Executor trait and related types.

use async_trait::async_trait;
use pt_error::Result;
use pt_types::PartitionDefinition;
use serde::{Deserialize, Serialize};

/// Trait for turning planner output into DDL.
///
/// Implementations must apply a multi-definition creation as one transaction
/// and roll back on any failure; a partially created topology is
/// inconsistent.
///
/// # Message Flow
///
/// 1. The maintainer calls [`ensure_schema`](Executor::ensure_schema) for each
///    schema it has not seen
/// 2. [`create_partitions`](Executor::create_partitions) receives the
///    definitions to create, nested sub-partitions included
/// 3. [`drop_partition`](Executor::drop_partition) receives one retention
///    drop at a time, oldest first
#[async_trait]
pub trait Executor: Send + Sync {
    /// Creates a schema if it does not exist.
    async fn ensure_schema(&self, schema: &str) -> Result<()>;

    /// Creates partitions of `parent`, including any nested sub-partitions.
    async fn create_partitions(
        &self,
        parent: &str,
        definitions: &[PartitionDefinition],
    ) -> Result<()>;

    /// Detaches and drops one partition of `parent`.
    async fn drop_partition(&self, parent: &str, name: &str, options: &DropOptions)
        -> Result<()>;
}

/// How a partition should be removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOptions {
    /// Use a non-blocking detach
    pub detach_concurrently: bool,

    /// Vacuum the parent afterwards
    pub vacuum_parent: bool,

    /// Drop the partition's schema if nothing is left in it
    pub reclaim_schema: bool,
}

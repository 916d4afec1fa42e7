//! Partition definitions and nested sub-partition trees.

use serde::{Deserialize, Serialize};

use crate::boundary::{PartitionBoundary, RangeBound};
use crate::strategy::{PartitionKey, PartitionStrategy};

/// One child table of a partitioned parent.
///
/// Built during a single configuration pass and read-only once handed to an
/// executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionDefinition {
    /// Unqualified partition table name
    pub name: String,

    /// Strategy of the level this partition belongs to
    pub strategy: PartitionStrategy,

    /// Which rows belong here
    pub boundary: PartitionBoundary,

    /// Schema to create the partition in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Tablespace to create the partition in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablespace: Option<String>,

    /// Whether the caller chose the name rather than the naming resolver
    #[serde(default)]
    pub explicit_name: bool,

    /// Further partitioning of this partition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_partitions: Option<SubPartitionTree>,
}

impl PartitionDefinition {
    /// Create a definition with no schema, tablespace or nesting.
    pub fn new(
        name: impl Into<String>,
        strategy: PartitionStrategy,
        boundary: PartitionBoundary,
    ) -> Self {
        Self {
            name: name.into(),
            strategy,
            boundary,
            schema: None,
            tablespace: None,
            explicit_name: false,
            sub_partitions: None,
        }
    }

    /// Set the schema.
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// Set the tablespace.
    pub fn with_tablespace(mut self, tablespace: Option<String>) -> Self {
        self.tablespace = tablespace;
        self
    }

    /// Mark the name as caller-chosen.
    pub fn with_explicit_name(mut self) -> Self {
        self.explicit_name = true;
        self
    }

    /// `schema.name` when a schema is set, otherwise the bare name.
    pub fn qualified_name(&self) -> String {
        qualify(self.schema.as_deref(), &self.name)
    }

    /// The range bound, if this is a RANGE partition.
    pub fn range(&self) -> Option<&RangeBound> {
        self.boundary.as_range()
    }

    /// Number of definitions in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .sub_partitions
            .as_ref()
            .map(|tree| tree.definitions.iter().map(Self::subtree_len).sum())
            .unwrap_or(0)
    }
}

/// Partitioning of a partition: one nesting level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPartitionTree {
    /// Key this level is partitioned by
    pub column: PartitionKey,

    /// Strategy of this level
    pub strategy: PartitionStrategy,

    /// Child definitions, in creation order
    pub definitions: Vec<PartitionDefinition>,

    /// Fallback schema for children that specify none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,

    /// Fallback tablespace for children that specify none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tablespace: Option<String>,
}

/// Joins an optional schema and a name into a qualified identifier.
pub fn qualify(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => format!("{}.{}", schema, name),
        _ => name.to_string(),
    }
}

/// Splits `schema.name` into its parts.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}

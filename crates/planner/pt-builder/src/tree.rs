//! Nested sub-partition composition and schema/tablespace inheritance.

use chrono::NaiveDate;
use pt_error::{PtError, Result};
use pt_types::{
    qualify, PartitionBoundary, PartitionDefinition, PartitionKey, PartitionSettings,
    PartitionStrategy, SubPartitionTree,
};
use tracing::debug;

use crate::deferred::PartitionSet;

/// Sub-partition configuration that is not yet attached to a parent.
///
/// The inner [`PartitionSet`] stays unbound until [`attach`] supplies the
/// parent's name, so partitions can be configured with `{table}` placeholders
/// and interval names that resolve against whichever parent they end up under.
#[derive(Debug, Clone)]
pub struct SubPartitionSpec {
    /// Key the nested level is partitioned by
    pub column: PartitionKey,

    /// Partitions of the nested level
    pub set: PartitionSet,
}

impl SubPartitionSpec {
    /// Create a spec for a nested level.
    ///
    /// Nested partitions without a schema or tablespace of their own inherit
    /// the parent's, so the settings' defaults only apply at the top level.
    pub fn new(
        column: PartitionKey,
        strategy: PartitionStrategy,
        settings: PartitionSettings,
        today: NaiveDate,
    ) -> Self {
        Self {
            column,
            set: PartitionSet::unbound(strategy, settings, today).without_global_defaults(),
        }
    }

    /// Fallback schema for nested partitions that specify none.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.set = self.set.with_default_schema(Some(schema.into()));
        self
    }

    /// Fallback tablespace for nested partitions that specify none.
    pub fn with_default_tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.set = self.set.with_default_tablespace(Some(tablespace.into()));
        self
    }

    /// Strategy of the nested level.
    pub fn strategy(&self) -> PartitionStrategy {
        self.set.strategy()
    }

    /// Bind the parent name and produce the finished tree.
    pub fn bind(mut self, base_name: &str) -> Result<SubPartitionTree> {
        if let Some(bound) = self.set.base_name() {
            return Err(PtError::Config(format!(
                "Sub-partition layout is already bound to '{}'",
                bound
            )));
        }
        self.set.bind_base_name(base_name)?;

        let strategy = self.set.strategy();
        let default_schema = self.set.default_schema().map(str::to_string);
        let default_tablespace = self.set.default_tablespace().map(str::to_string);
        Ok(SubPartitionTree {
            column: self.column,
            strategy,
            definitions: self.set.into_definitions()?,
            default_schema,
            default_tablespace,
        })
    }
}

/// Attach a nested level under `parent`, using the parent's name as base name.
pub fn attach(parent: &mut PartitionDefinition, spec: SubPartitionSpec) -> Result<()> {
    if parent.sub_partitions.is_some() {
        return Err(PtError::Config(format!(
            "Partition '{}' is already sub-partitioned",
            parent.name
        )));
    }
    if spec.column.is_empty() {
        return Err(PtError::Config(format!(
            "Sub-partitions of '{}' need a partition column",
            parent.name
        )));
    }

    let tree = spec.bind(&parent.name)?;
    debug!(
        parent = %parent.name,
        strategy = %tree.strategy,
        count = tree.definitions.len(),
        "Attached sub-partitions"
    );
    parent.sub_partitions = Some(tree);
    Ok(())
}

/// Attach a clone of `spec` under every partition in `parents`.
///
/// Each clone is bound to its own parent's name.
pub fn attach_to_all(parents: &mut [PartitionDefinition], spec: &SubPartitionSpec) -> Result<()> {
    for parent in parents.iter_mut() {
        attach(parent, spec.clone())?;
    }
    Ok(())
}

/// Push schema and tablespace down the tree.
///
/// Depth-first. A definition without its own schema receives the parent's
/// effective schema; a nested level's default, when set, replaces the
/// inherited value for that level's children. Tablespaces follow the same
/// rule.
pub fn resolve_inheritance(
    definitions: &mut [PartitionDefinition],
    parent_schema: Option<&str>,
    parent_tablespace: Option<&str>,
) {
    for def in definitions.iter_mut() {
        if def.schema.is_none() {
            def.schema = parent_schema.map(str::to_string);
        }
        if def.tablespace.is_none() {
            def.tablespace = parent_tablespace.map(str::to_string);
        }

        let schema = def.schema.clone();
        let tablespace = def.tablespace.clone();
        if let Some(tree) = def.sub_partitions.as_mut() {
            let effective_schema = tree.default_schema.clone().or(schema);
            let effective_tablespace = tree.default_tablespace.clone().or(tablespace);
            resolve_inheritance(
                &mut tree.definitions,
                effective_schema.as_deref(),
                effective_tablespace.as_deref(),
            );
        }
    }
}

/// One partition from a flattened tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatPartition {
    /// Qualified name of the table this partition is attached to
    pub parent: String,

    /// Unqualified partition name
    pub name: String,

    /// `schema.name`, or the bare name without a schema
    pub qualified_name: String,

    /// Strategy of the level this partition belongs to
    pub strategy: PartitionStrategy,

    pub boundary: PartitionBoundary,

    pub schema: Option<String>,

    pub tablespace: Option<String>,

    /// 0 for direct children of the root table
    pub depth: usize,

    /// Strategy and key this partition is itself partitioned by
    pub partition_by: Option<(PartitionStrategy, PartitionKey)>,
}

/// Flatten a definition tree into creation order.
///
/// Depth-first, so every parent precedes its children.
pub fn flatten(parent: &str, definitions: &[PartitionDefinition]) -> Vec<FlatPartition> {
    let mut flat = Vec::new();
    flatten_into(&mut flat, parent, definitions, 0);
    flat
}

fn flatten_into(
    flat: &mut Vec<FlatPartition>,
    parent: &str,
    definitions: &[PartitionDefinition],
    depth: usize,
) {
    for def in definitions {
        let qualified_name = qualify(def.schema.as_deref(), &def.name);
        flat.push(FlatPartition {
            parent: parent.to_string(),
            name: def.name.clone(),
            qualified_name: qualified_name.clone(),
            strategy: def.strategy,
            boundary: def.boundary.clone(),
            schema: def.schema.clone(),
            tablespace: def.tablespace.clone(),
            depth,
            partition_by: def
                .sub_partitions
                .as_ref()
                .map(|tree| (tree.strategy, tree.column.clone())),
        });

        if let Some(tree) = &def.sub_partitions {
            flatten_into(flat, &qualified_name, &tree.definitions, depth + 1);
        }
    }
}

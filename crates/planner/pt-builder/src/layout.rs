//! Layout builder for one partitioned table.
//!
//! [`LayoutBuilder`] is the mutable configuration phase; [`LayoutBuilder::build`]
//! validates it and produces an immutable [`PartitionLayout`] ready to be
//! handed to an executor.

use chrono::{Local, NaiveDate};
use pt_error::{PtError, Result};
use pt_types::{
    split_qualified, BoundValue, PartitionDefinition, PartitionKey, PartitionSettings,
    PartitionStrategy,
};
use std::collections::HashSet;
use tracing::info;

use crate::deferred::{HashRequest, PartitionSet};
use crate::sequence::SequenceRequest;
use crate::tree::{attach, attach_to_all, flatten, resolve_inheritance, FlatPartition, SubPartitionSpec};

/// Accumulates the partition layout of one table.
///
/// Settings, defaults and the injected date apply to partitions added after
/// they are set.
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    table: String,
    key: Option<PartitionKey>,
    set: PartitionSet,
}

impl LayoutBuilder {
    /// Start a layout for `table` (optionally schema-qualified).
    pub fn new(table: impl Into<String>, strategy: PartitionStrategy) -> Self {
        let table = table.into();
        let base = split_qualified(&table).1.to_string();
        Self {
            set: PartitionSet::bound(
                base,
                strategy,
                PartitionSettings::default(),
                Local::now().date_naive(),
            ),
            table,
            key: None,
        }
    }

    /// Partition by a single column.
    pub fn with_column(self, column: impl Into<String>) -> Self {
        self.with_key(PartitionKey::column(column))
    }

    /// Partition by several columns.
    pub fn with_columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_key(PartitionKey::Columns(
            columns.into_iter().map(Into::into).collect(),
        ))
    }

    /// Partition by an arbitrary key.
    pub fn with_key(mut self, key: PartitionKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Builder-level default schema.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.set = self.set.with_default_schema(Some(schema.into()));
        self
    }

    /// Builder-level default tablespace.
    pub fn with_default_tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.set = self.set.with_default_tablespace(Some(tablespace.into()));
        self
    }

    /// Naming policy, global defaults and behavior toggles.
    pub fn with_settings(mut self, settings: PartitionSettings) -> Self {
        self.set = self.set.with_settings(settings);
        self
    }

    /// Date used wherever a sequence starts "now".
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.set = self.set.with_today(today);
        self
    }

    /// Table this layout belongs to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Definitions added so far.
    pub fn definitions(&self) -> &[PartitionDefinition] {
        self.set.definitions()
    }

    /// Add a run of interval partitions.
    pub fn add_sequence(&mut self, request: SequenceRequest) -> Result<&mut Self> {
        self.set.add_sequence(request)?;
        Ok(self)
    }

    /// Add a complete HASH batch of `modulus` partitions.
    pub fn add_hash(&mut self, modulus: u32) -> Result<&mut Self> {
        self.add_hash_with(HashRequest::new(modulus))
    }

    /// Add a complete HASH batch with explicit schema, tablespace or prefix.
    pub fn add_hash_with(&mut self, request: HashRequest) -> Result<&mut Self> {
        self.set.add_hash(request)?;
        Ok(self)
    }

    /// Add an explicitly named RANGE partition.
    pub fn add_range(
        &mut self,
        name: impl Into<String>,
        from: impl Into<BoundValue>,
        to: impl Into<BoundValue>,
        schema: Option<String>,
    ) -> Result<&mut Self> {
        self.set.add_range(name, from, to, schema)?;
        Ok(self)
    }

    /// Add a LIST partition.
    pub fn add_list(
        &mut self,
        name: Option<String>,
        values: Vec<BoundValue>,
        schema: Option<String>,
    ) -> Result<&mut Self> {
        self.set.add_list(name, values, schema)?;
        Ok(self)
    }

    /// Add the DEFAULT partition.
    pub fn add_default(&mut self, name: Option<String>) -> Result<&mut Self> {
        self.set.add_default(name, None)?;
        Ok(self)
    }

    /// Sub-partition the partition called `name`.
    pub fn sub_partition(&mut self, name: &str, spec: SubPartitionSpec) -> Result<&mut Self> {
        let parent = self
            .set
            .definitions_mut()
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                PtError::Config(format!("No partition named '{}' to sub-partition", name))
            })?;
        attach(parent, spec)?;
        Ok(self)
    }

    /// Give every partition added so far the same nested structure.
    pub fn sub_partition_all(&mut self, spec: &SubPartitionSpec) -> Result<&mut Self> {
        attach_to_all(self.set.definitions_mut(), spec)?;
        Ok(self)
    }

    /// Validate the configuration and produce the finished layout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if:
    /// - No partition column or expression was set
    /// - Two partitions resolve to the same qualified name
    pub fn build(self) -> Result<PartitionLayout> {
        let key = match self.key {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(PtError::Config(format!(
                    "No partition column set for table '{}'",
                    self.table
                )))
            }
        };

        let strategy = self.set.strategy();
        let analyze_after_create = self.set.settings().analyze_after_create;
        let inherited_schema = self
            .set
            .default_schema()
            .map(str::to_string)
            .or_else(|| self.set.settings().default_schema.clone());
        let inherited_tablespace = self
            .set
            .default_tablespace()
            .map(str::to_string)
            .or_else(|| self.set.settings().default_tablespace.clone());

        let mut definitions = self.set.into_definitions()?;
        resolve_inheritance(
            &mut definitions,
            inherited_schema.as_deref(),
            inherited_tablespace.as_deref(),
        );

        let layout = PartitionLayout {
            table: self.table,
            strategy,
            key,
            definitions,
            analyze_after_create,
        };

        let mut seen = HashSet::new();
        for partition in layout.flatten() {
            if !seen.insert(partition.qualified_name.clone()) {
                return Err(PtError::Config(format!(
                    "Duplicate partition name '{}' in layout of '{}'",
                    partition.qualified_name, layout.table
                )));
            }
        }

        info!(
            table = %layout.table,
            strategy = %layout.strategy,
            partitions = layout.len(),
            "Built partition layout"
        );
        Ok(layout)
    }
}

/// Finished, schema-resolved layout of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionLayout {
    /// Partitioned table, optionally schema-qualified
    pub table: String,

    /// Root strategy
    pub strategy: PartitionStrategy,

    /// Root partition key
    pub key: PartitionKey,

    /// Top-level definitions in creation order
    pub definitions: Vec<PartitionDefinition>,

    /// Whether executors should analyze new partitions
    pub analyze_after_create: bool,
}

impl PartitionLayout {
    /// Names of the top-level partitions.
    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    /// Number of partitions at every depth.
    pub fn len(&self) -> usize {
        self.definitions.iter().map(PartitionDefinition::subtree_len).sum()
    }

    /// Returns true if the layout has no partitions.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Every partition in creation order, parents first.
    pub fn flatten(&self) -> Vec<FlatPartition> {
        flatten(&self.table, &self.definitions)
    }

    /// Schemas referenced by the layout, in first-use order.
    pub fn schemas(&self) -> Vec<String> {
        let mut schemas: Vec<String> = Vec::new();
        for partition in self.flatten() {
            if let Some(schema) = partition.schema {
                if !schemas.contains(&schema) {
                    schemas.push(schema);
                }
            }
        }
        schemas
    }

    /// PostgreSQL DDL that creates the layout under an existing parent table.
    pub fn create_statements(&self) -> Vec<String> {
        let flat = self.flatten();
        let mut statements: Vec<String> = self
            .schemas()
            .iter()
            .map(|schema| format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
            .collect();

        for partition in &flat {
            let mut sql = format!(
                "CREATE TABLE {} PARTITION OF {} {}",
                partition.qualified_name,
                partition.parent,
                partition.boundary.to_sql()
            );
            if let Some((strategy, key)) = &partition.partition_by {
                sql.push_str(&format!(" PARTITION BY {} ({})", strategy, key.to_sql()));
            }
            if let Some(tablespace) = &partition.tablespace {
                sql.push_str(&format!(" TABLESPACE {}", tablespace));
            }
            statements.push(sql);
        }

        if self.analyze_after_create {
            statements.extend(
                flat.iter()
                    .filter(|p| p.partition_by.is_none())
                    .map(|p| format!("ANALYZE {}", p.qualified_name)),
            );
        }
        statements
    }
}

//! In-memory catalog and executor.
//!
//! Keeps partitions, indexes and schemas in process memory. Intended for
//! tests and development; it renders the same boundary expressions a real
//! catalog would report, so everything read back goes through the normal
//! parsing path.

use async_trait::async_trait;
use pt_error::{ExecutionError, Result};
use pt_types::{split_qualified, PartitionDefinition, PartitionKey};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::catalog::{CatalogReader, ChildPartition};
use crate::executor::{DropOptions, Executor};

#[derive(Debug, Default)]
struct State {
    /// Parent table -> children in creation order
    children: HashMap<String, Vec<ChildPartition>>,
    /// Table -> partition key
    keys: HashMap<String, PartitionKey>,
    /// Table -> index names
    indexes: HashMap<String, Vec<String>>,
    schemas: HashSet<String>,
    statements: Vec<String>,
    /// Partition names whose creation should fail
    failing: HashSet<String>,
}

/// In-memory [`CatalogReader`] and [`Executor`].
///
/// Parent indexes are propagated to new partitions as
/// `{partition}_{parent_index}` unless propagation is disabled, which lets
/// tests simulate a missing index.
#[derive(Debug)]
pub struct MemoryCatalog {
    state: RwLock<State>,
    propagate_indexes: bool,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            propagate_indexes: true,
        }
    }

    /// Disable propagation of parent indexes to new partitions.
    pub fn without_index_propagation(mut self) -> Self {
        self.propagate_indexes = false;
        self
    }

    /// Register a partitioned table.
    pub fn add_table(&self, table: &str, key: PartitionKey) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.keys.insert(table.to_string(), key);
        state.children.entry(table.to_string()).or_default();
    }

    /// Register a child partition with a raw boundary expression.
    pub fn add_child(&self, parent: &str, name: &str, boundary_expression: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .children
            .entry(parent.to_string())
            .or_default()
            .push(ChildPartition::new(name, boundary_expression));
    }

    /// Register an index on a table.
    pub fn add_index(&self, table: &str, index: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .indexes
            .entry(table.to_string())
            .or_default()
            .push(index.to_string());
    }

    /// Make creation of the named partition fail.
    pub fn fail_on(&self, name: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.failing.insert(name.to_string());
    }

    /// Names of the direct children of `parent`.
    pub fn child_names(&self, parent: &str) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .children
            .get(parent)
            .map(|c| c.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Schemas created so far.
    pub fn schemas(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut schemas: Vec<String> = state.schemas.iter().cloned().collect();
        schemas.sort();
        schemas
    }

    /// Statements executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.statements.clone()
    }

    fn insert_definition(
        &self,
        state: &mut State,
        parent: &str,
        parent_indexes: &[String],
        def: &PartitionDefinition,
    ) {
        let qualified = def.qualified_name();
        state.statements.push(format!(
            "CREATE TABLE {} PARTITION OF {} {}",
            qualified,
            parent,
            def.boundary.to_sql()
        ));
        state
            .children
            .entry(parent.to_string())
            .or_default()
            .push(ChildPartition::new(qualified.clone(), def.boundary.to_sql()));

        if self.propagate_indexes && !parent_indexes.is_empty() {
            let own: Vec<String> = parent_indexes
                .iter()
                .map(|idx| format!("{}_{}", def.name, idx))
                .collect();
            state.indexes.insert(qualified.clone(), own);
        }

        if let Some(tree) = &def.sub_partitions {
            state.keys.insert(qualified.clone(), tree.column.clone());
            let inherited = state.indexes.get(&qualified).cloned().unwrap_or_default();
            for child in &tree.definitions {
                self.insert_definition(state, &qualified, &inherited, child);
            }
        }
    }

    fn remove_subtree(state: &mut State, name: &str) {
        if let Some(children) = state.children.remove(name) {
            for child in children {
                Self::remove_subtree(state, &child.name);
            }
        }
        state.keys.remove(name);
        state.indexes.remove(name);
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogReader for MemoryCatalog {
    async fn list_child_partitions(&self, parent: &str) -> Result<Vec<ChildPartition>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.children.get(parent).cloned().unwrap_or_default())
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<String>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.indexes.get(table).cloned().unwrap_or_default())
    }

    async fn partition_key(&self, table: &str) -> Result<Option<PartitionKey>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.keys.get(table).cloned())
    }
}

#[async_trait]
impl Executor for MemoryCatalog {
    async fn ensure_schema(&self, schema: &str) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.schemas.insert(schema.to_string()) {
            state
                .statements
                .push(format!("CREATE SCHEMA IF NOT EXISTS {}", schema));
        }
        Ok(())
    }

    async fn create_partitions(
        &self,
        parent: &str,
        definitions: &[PartitionDefinition],
    ) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        // All-or-nothing: check every definition before touching state
        let existing: HashSet<String> = state
            .children
            .get(parent)
            .map(|c| c.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default();
        for def in definitions {
            let qualified = def.qualified_name();
            if state.failing.contains(&def.name) || state.failing.contains(&qualified) {
                return Err(ExecutionError::Statement {
                    statement: format!("CREATE TABLE {} PARTITION OF {}", qualified, parent),
                    message: "injected failure".to_string(),
                }
                .into());
            }
            if existing.contains(&qualified) {
                return Err(ExecutionError::AlreadyExists(qualified).into());
            }
        }

        let parent_indexes = state.indexes.get(parent).cloned().unwrap_or_default();
        for def in definitions {
            self.insert_definition(&mut state, parent, &parent_indexes, def);
        }
        debug!(parent = %parent, count = definitions.len(), "Created partitions in memory");
        Ok(())
    }

    async fn drop_partition(
        &self,
        parent: &str,
        name: &str,
        options: &DropOptions,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let children = state.children.entry(parent.to_string()).or_default();
        let Some(pos) = children.iter().position(|c| c.name == name) else {
            return Err(ExecutionError::NotFound(name.to_string()).into());
        };
        children.remove(pos);

        let concurrently = if options.detach_concurrently {
            " CONCURRENTLY"
        } else {
            ""
        };
        state.statements.push(format!(
            "ALTER TABLE {} DETACH PARTITION {}{}",
            parent, name, concurrently
        ));
        state.statements.push(format!("DROP TABLE {}", name));
        Self::remove_subtree(&mut state, name);

        if options.reclaim_schema {
            if let (Some(schema), _) = split_qualified(name) {
                let schema = schema.to_string();
                let still_used = state
                    .children
                    .values()
                    .flatten()
                    .any(|c| split_qualified(&c.name).0 == Some(schema.as_str()));
                if !still_used && state.schemas.remove(&schema) {
                    state.statements.push(format!("DROP SCHEMA {}", schema));
                }
            }
        }
        if options.vacuum_parent {
            state.statements.push(format!("VACUUM {}", parent));
        }
        Ok(())
    }
}

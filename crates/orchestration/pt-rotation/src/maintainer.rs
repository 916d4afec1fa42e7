//! Catalog-backed maintenance.
//!
//! Reads a fresh snapshot from the catalog on every call, lets the
//! [`RotationEngine`] decide, and hands the decision to the executor.

use pt_error::{PtError, Result};
use pt_inspect::{analyze_raw, parse_boundary, BoundaryEntry, HealthReport, IndexSnapshot};
use pt_traits::{CatalogReader, ChildPartition, Executor};
use pt_types::{split_qualified, PartitionDefinition, PartitionKey};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::detect::detect_future_spec;
use crate::engine::{FutureSpec, RotationEngine};
use crate::schema_cache::SchemaCache;

/// Runs health checks, create-ahead and retention against live collaborators.
pub struct PartitionMaintainer<C, E> {
    catalog: Arc<C>,
    executor: Arc<E>,
    engine: RotationEngine,
    schema_cache: Arc<SchemaCache>,
}

impl<C, E> PartitionMaintainer<C, E>
where
    C: CatalogReader,
    E: Executor,
{
    /// Create a maintainer.
    ///
    /// The schema cache is shared with the caller, who decides when to flush it.
    pub fn new(
        catalog: Arc<C>,
        executor: Arc<E>,
        engine: RotationEngine,
        schema_cache: Arc<SchemaCache>,
    ) -> Self {
        Self {
            catalog,
            executor,
            engine,
            schema_cache,
        }
    }

    pub fn engine(&self) -> &RotationEngine {
        &self.engine
    }

    /// Analyze the current partitions of `table`.
    pub async fn health(&self, table: &str) -> Result<HealthReport> {
        let children = self.catalog.list_child_partitions(table).await?;

        let mut snapshot = IndexSnapshot {
            parent: self.catalog.list_indexes(table).await?,
            ..Default::default()
        };
        if !snapshot.parent.is_empty() {
            for child in &children {
                let indexes = self.catalog.list_indexes(&child.name).await?;
                snapshot.per_partition.insert(child.name.clone(), indexes);
            }
        }

        let report = analyze_raw(
            children
                .iter()
                .map(|c| (c.name.as_str(), c.boundary_expression.as_str())),
            Some(&snapshot),
        );
        if !report.is_healthy() {
            warn!(
                table = %table,
                gaps = report.gaps.len(),
                overlaps = report.overlaps.len(),
                missing_indexes = report.missing_indexes.len(),
                "Partition health check found issues"
            );
        }
        Ok(report)
    }

    /// Create the next `count` interval partitions that do not exist yet.
    ///
    /// Without a spec, the interval and schema are detected from the newest
    /// existing RANGE partition. Returns the number of partitions created.
    pub async fn ensure_future(
        &self,
        table: &str,
        count: u32,
        spec: Option<&FutureSpec>,
    ) -> Result<usize> {
        let children = self.catalog.list_child_partitions(table).await?;
        let entries = parse_entries(table, &children);

        let detected;
        let spec = match spec {
            Some(spec) => spec,
            None => {
                let key = self.catalog.partition_key(table).await?;
                let column = match &key {
                    Some(PartitionKey::Columns(cols)) => cols.first().map(String::as_str),
                    _ => None,
                };
                detected = detect_future_spec(&entries, column).ok_or_else(|| {
                    PtError::Config(format!(
                        "Cannot detect the partition interval of '{}', pass an explicit spec",
                        table
                    ))
                })?;
                debug!(table = %table, interval = %detected.interval, "Detected partition interval");
                &detected
            }
        };

        // Every existing name counts, including unclassified partitions
        let plan = self.engine.ensure_future(
            table,
            count,
            spec,
            children.iter().map(|c| c.name.as_str()),
        )?;
        if plan.to_create.is_empty() {
            return Ok(0);
        }

        self.ensure_schemas(&plan.to_create).await?;
        self.executor.create_partitions(table, &plan.to_create).await?;

        info!(table = %table, created = plan.created(), "Created future partitions");
        Ok(plan.created())
    }

    /// Drop all but the newest `keep` RANGE partitions of `table`.
    ///
    /// Returns the dropped names, oldest first.
    pub async fn rotate(&self, table: &str, keep: usize) -> Result<Vec<String>> {
        let children = self.catalog.list_child_partitions(table).await?;
        let entries = parse_entries(table, &children);
        let plan = self.engine.rotate(table, keep, &entries);

        let mut dropped = Vec::with_capacity(plan.to_drop.len());
        for action in &plan.to_drop {
            self.executor
                .drop_partition(table, &action.name, &action.options)
                .await?;
            if action.options.reclaim_schema {
                if let (Some(schema), _) = split_qualified(&action.name) {
                    self.schema_cache.remove(schema);
                }
            }
            dropped.push(action.name.clone());
        }

        if !dropped.is_empty() {
            info!(table = %table, dropped = dropped.len(), "Rotated partitions");
        }
        Ok(dropped)
    }

    async fn ensure_schemas(&self, definitions: &[PartitionDefinition]) -> Result<()> {
        let mut schemas: Vec<&str> = Vec::new();
        collect_schemas(definitions, &mut schemas);

        for schema in schemas {
            if self.schema_cache.contains(schema) {
                continue;
            }
            self.executor.ensure_schema(schema).await?;
            self.schema_cache.insert(schema);
        }
        Ok(())
    }
}

fn parse_entries(table: &str, children: &[ChildPartition]) -> Vec<BoundaryEntry> {
    let mut entries = Vec::with_capacity(children.len());
    for child in children {
        match parse_boundary(&child.boundary_expression) {
            Some(boundary) => entries.push(BoundaryEntry::new(child.name.clone(), boundary)),
            None => warn!(
                table = %table,
                partition = %child.name,
                "Ignoring partition with unrecognized boundary"
            ),
        }
    }
    entries
}

fn collect_schemas<'a>(definitions: &'a [PartitionDefinition], schemas: &mut Vec<&'a str>) {
    for def in definitions {
        if let Some(schema) = def.schema.as_deref() {
            if !schemas.contains(&schema) {
                schemas.push(schema);
            }
        }
        if let Some(tree) = &def.sub_partitions {
            collect_schemas(&tree.definitions, schemas);
        }
    }
}

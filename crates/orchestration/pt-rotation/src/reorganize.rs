//! Split and merge planning.
//!
//! A reorganization never rewrites a partition in place. The original is
//! detached, its replacements are attached, the rows are routed back through
//! the parent and the original is dropped. Moving the rows is left to the
//! executor; the plan only describes it.

use pt_builder::{generate_sequence, SequenceContext, SequenceRequest};
use pt_error::{PtError, Result};
use pt_inspect::BoundaryEntry;
use pt_types::{
    split_qualified, BoundValue, IntervalKind, PartitionBoundary, PartitionDefinition,
    PartitionStrategy,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::RotationEngine;

/// One step of a reorganization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ReorgStep {
    Detach {
        parent: String,
        partition: String,
        concurrently: bool,
    },
    Create {
        parent: String,
        definition: PartitionDefinition,
    },
    /// Re-insert the rows of a detached table through the parent
    MoveRows { source: String, parent: String },
    Drop { table: String },
}

impl ReorgStep {
    /// PostgreSQL statement for this step.
    pub fn to_sql(&self) -> String {
        match self {
            Self::Detach {
                parent,
                partition,
                concurrently,
            } => format!(
                "ALTER TABLE {} DETACH PARTITION {}{}",
                parent,
                partition,
                if *concurrently { " CONCURRENTLY" } else { "" }
            ),
            Self::Create { parent, definition } => {
                let mut sql = format!(
                    "CREATE TABLE {} PARTITION OF {} {}",
                    definition.qualified_name(),
                    parent,
                    definition.boundary.to_sql()
                );
                if let Some(tablespace) = &definition.tablespace {
                    sql.push_str(&format!(" TABLESPACE {}", tablespace));
                }
                sql
            }
            Self::MoveRows { source, parent } => {
                format!("INSERT INTO {} SELECT * FROM {}", parent, source)
            }
            Self::Drop { table } => format!("DROP TABLE {}", table),
        }
    }
}

/// Ordered steps of one split or merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReorganizePlan {
    pub table: String,
    pub steps: Vec<ReorgStep>,
}

impl ReorganizePlan {
    /// Statements for every step, in order.
    pub fn statements(&self) -> Vec<String> {
        self.steps.iter().map(ReorgStep::to_sql).collect()
    }

    /// Definitions the plan creates.
    pub fn created(&self) -> Vec<&PartitionDefinition> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                ReorgStep::Create { definition, .. } => Some(definition),
                _ => None,
            })
            .collect()
    }
}

impl RotationEngine {
    /// Plan splitting one date-bounded RANGE partition into `into` intervals,
    /// e.g. a yearly partition into monthly ones.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the entry is not date-bounded RANGE,
    /// or if `into` does not divide it into at least two whole intervals.
    pub fn split_plan(
        &self,
        table: &str,
        entry: &BoundaryEntry,
        into: IntervalKind,
    ) -> Result<ReorganizePlan> {
        let (from, to) = entry
            .boundary
            .range()
            .and_then(|(from, to)| Some((from.as_date()?, to.as_date()?)))
            .ok_or_else(|| {
                PtError::Config(format!(
                    "Only date-bounded RANGE partitions can be split, '{}' is not one",
                    entry.name
                ))
            })?;

        let (schema, _) = split_qualified(&entry.name);
        let request = SequenceRequest::until(into, to).starting_at(from);
        let ctx = SequenceContext {
            base_name: split_qualified(table).1,
            previous: &[],
            default_schema: schema,
            default_tablespace: None,
            settings: self.settings(),
            global_defaults: false,
            today: self.today(),
        };
        let pieces = generate_sequence(&request, &ctx)?;

        let end = pieces.last().and_then(|d| d.range()).and_then(|r| r.to.as_date());
        if pieces.len() < 2 || end != Some(to) {
            return Err(PtError::Config(format!(
                "Splitting '{}' into {} partitions does not yield two or more whole intervals",
                entry.name, into
            )));
        }

        let concurrently = self.settings().detach_concurrently;
        let mut steps = vec![ReorgStep::Detach {
            parent: table.to_string(),
            partition: entry.name.clone(),
            concurrently,
        }];
        steps.extend(pieces.into_iter().map(|definition| ReorgStep::Create {
            parent: table.to_string(),
            definition,
        }));
        steps.push(ReorgStep::MoveRows {
            source: entry.name.clone(),
            parent: table.to_string(),
        });
        steps.push(ReorgStep::Drop {
            table: entry.name.clone(),
        });

        info!(table = %table, partition = %entry.name, into = %into, "Planned partition split");
        Ok(ReorganizePlan {
            table: table.to_string(),
            steps,
        })
    }

    /// Plan merging contiguous RANGE partitions into one named `name`.
    ///
    /// The merged partition lives in the schema of the oldest input.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if fewer than two RANGE partitions are
    /// given or they are not contiguous.
    pub fn merge_plan(
        &self,
        table: &str,
        entries: &[BoundaryEntry],
        name: &str,
    ) -> Result<ReorganizePlan> {
        let mut ranges: Vec<(&BoundaryEntry, &BoundValue, &BoundValue)> = entries
            .iter()
            .filter_map(|e| e.boundary.range().map(|(from, to)| (e, from, to)))
            .collect();
        if ranges.len() < 2 || ranges.len() != entries.len() {
            return Err(PtError::Config(
                "Merging needs at least two RANGE partitions and nothing else".to_string(),
            ));
        }
        ranges.sort_by(|a, b| a.1.semantic_cmp(b.1));

        for pair in ranges.windows(2) {
            if !pair[0].2.semantic_eq(pair[1].1) {
                return Err(PtError::Config(format!(
                    "Partitions '{}' and '{}' are not contiguous",
                    pair[0].0.name, pair[1].0.name
                )));
            }
        }

        let (first, from, _) = ranges[0];
        let (_, _, to) = ranges[ranges.len() - 1];
        let schema = split_qualified(&first.name).0.map(str::to_string);
        let merged = PartitionDefinition::new(
            name,
            PartitionStrategy::Range,
            PartitionBoundary::range(from.clone(), to.clone()),
        )
        .with_explicit_name()
        .with_schema(schema);

        let concurrently = self.settings().detach_concurrently;
        let mut steps: Vec<ReorgStep> = ranges
            .iter()
            .map(|(entry, _, _)| ReorgStep::Detach {
                parent: table.to_string(),
                partition: entry.name.clone(),
                concurrently,
            })
            .collect();
        steps.push(ReorgStep::Create {
            parent: table.to_string(),
            definition: merged,
        });
        for (entry, _, _) in &ranges {
            steps.push(ReorgStep::MoveRows {
                source: entry.name.clone(),
                parent: table.to_string(),
            });
        }
        for (entry, _, _) in &ranges {
            steps.push(ReorgStep::Drop {
                table: entry.name.clone(),
            });
        }

        info!(table = %table, merged = %name, count = ranges.len(), "Planned partition merge");
        Ok(ReorganizePlan {
            table: table.to_string(),
            steps,
        })
    }
}

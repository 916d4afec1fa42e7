//! Create-ahead and drop-behind planning.

use chrono::{Local, NaiveDate};
use pt_builder::{generate_sequence, interval_name, SequenceContext, SequenceRequest};
use pt_error::Result;
use pt_inspect::BoundaryEntry;
use pt_traits::DropOptions;
use pt_types::{split_qualified, IntervalKind, PartitionDefinition, PartitionSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, trace};

/// What `ensure_future` creates.
///
/// Usually supplied by configuration or by [`detect_future_spec`](crate::detect_future_spec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureSpec {
    pub interval: IntervalKind,

    /// Partition column of the table, informational
    #[serde(default)]
    pub column: Option<String>,

    /// Schema new partitions are created in
    #[serde(default)]
    pub schema: Option<String>,

    /// Name prefix, may contain `{table}`
    #[serde(default)]
    pub prefix: Option<String>,
}

impl FutureSpec {
    pub fn new(interval: IntervalKind) -> Self {
        Self {
            interval,
            column: None,
            schema: None,
            prefix: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// One retention drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropAction {
    /// Partition name as the catalog reports it
    pub name: String,
    pub options: DropOptions,
}

/// Decision handed to an executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationPlan {
    /// Partitions to create, in creation order
    pub to_create: Vec<PartitionDefinition>,

    /// Partitions to drop, oldest first
    pub to_drop: Vec<DropAction>,
}

impl RotationPlan {
    /// Number of partitions the plan creates.
    pub fn created(&self) -> usize {
        self.to_create.len()
    }

    /// Names of the partitions the plan drops, oldest first.
    pub fn dropped_names(&self) -> Vec<&str> {
        self.to_drop.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_drop.is_empty()
    }
}

/// Pure rotation decisions for partitioned tables.
#[derive(Debug, Clone)]
pub struct RotationEngine {
    settings: PartitionSettings,
    today: NaiveDate,
}

impl RotationEngine {
    /// Create an engine whose "now" is the local date.
    pub fn new(settings: PartitionSettings) -> Self {
        Self::with_today(settings, Local::now().date_naive())
    }

    /// Create an engine with an injected "now".
    pub fn with_today(settings: PartitionSettings, today: NaiveDate) -> Self {
        Self { settings, today }
    }

    pub fn settings(&self) -> &PartitionSettings {
        &self.settings
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Plan the next `count` interval partitions of `table`, starting with the
    /// interval containing today.
    ///
    /// A slot whose name is already in `existing_names` is skipped, so running
    /// the plan and calling again with the resulting names plans nothing. The
    /// cursor advances one interval per slot, skipped or not. Existing names
    /// may be schema-qualified.
    pub fn ensure_future<I, S>(
        &self,
        table: &str,
        count: u32,
        spec: &FutureSpec,
        existing_names: I,
    ) -> Result<RotationPlan>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = split_qualified(table).1;
        let existing: HashSet<String> = existing_names
            .into_iter()
            .map(|name| split_qualified(name.as_ref()).1.to_string())
            .collect();

        let mut plan = RotationPlan::default();
        let mut cursor = spec.interval.align(self.today);
        for _ in 0..count {
            let name = interval_name(
                base,
                spec.interval,
                cursor,
                spec.prefix.as_deref(),
                &self.settings.naming,
            )?;

            if existing.contains(&name) {
                trace!(table = %table, partition = %name, "Partition already exists, skipping");
            } else {
                let mut request = SequenceRequest::count(spec.interval, 1).starting_at(cursor);
                request.schema = spec.schema.clone();
                request.prefix = spec.prefix.clone();
                let ctx = SequenceContext {
                    base_name: base,
                    previous: &[],
                    default_schema: None,
                    default_tablespace: None,
                    settings: &self.settings,
                    global_defaults: true,
                    today: self.today,
                };
                plan.to_create.extend(generate_sequence(&request, &ctx)?);
            }

            cursor = spec.interval.advance(cursor)?;
        }

        debug!(
            table = %table,
            interval = %spec.interval,
            requested = count,
            planned = plan.created(),
            "Planned future partitions"
        );
        Ok(plan)
    }

    /// Plan dropping all but the newest `keep` RANGE partitions.
    ///
    /// Partitions are ordered by lower bound. Non-RANGE entries are ignored.
    pub fn rotate(&self, table: &str, keep: usize, entries: &[BoundaryEntry]) -> RotationPlan {
        let mut ranges: Vec<&BoundaryEntry> =
            entries.iter().filter(|e| e.boundary.range().is_some()).collect();
        ranges.sort_by(|a, b| match (a.boundary.range(), b.boundary.range()) {
            (Some((a, _)), Some((b, _))) => a.semantic_cmp(b),
            _ => std::cmp::Ordering::Equal,
        });

        let total = ranges.len();
        if total <= keep {
            debug!(table = %table, total, keep, "Nothing to rotate");
            return RotationPlan::default();
        }

        let options = self.drop_options();
        let to_drop: Vec<DropAction> = ranges[..total - keep]
            .iter()
            .map(|entry| DropAction {
                name: entry.name.clone(),
                options: options.clone(),
            })
            .collect();

        info!(
            table = %table,
            total,
            keep,
            dropping = to_drop.len(),
            "Planned partition rotation"
        );
        RotationPlan {
            to_create: Vec::new(),
            to_drop,
        }
    }

    pub(crate) fn drop_options(&self) -> DropOptions {
        DropOptions {
            detach_concurrently: self.settings.detach_concurrently,
            vacuum_parent: self.settings.vacuum_after_drop,
            reclaim_schema: self.settings.reclaim_empty_schemas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_types::{BoundValue, PartitionBoundary};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine() -> RotationEngine {
        RotationEngine::with_today(PartitionSettings::default(), date(2024, 5, 15))
    }

    #[test]
    fn test_ensure_future_from_aligned_today() {
        let plan = engine()
            .ensure_future("t", 4, &FutureSpec::new(IntervalKind::Monthly), Vec::<String>::new())
            .unwrap();

        let names: Vec<_> = plan.to_create.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["t_m2024_05", "t_m2024_06", "t_m2024_07", "t_m2024_08"]);
        assert_eq!(
            plan.to_create[0].boundary,
            PartitionBoundary::range(date(2024, 5, 1), date(2024, 6, 1))
        );
        assert_eq!(plan.created(), 4);
    }

    #[test]
    fn test_ensure_future_is_idempotent() {
        let engine = engine();
        let spec = FutureSpec::new(IntervalKind::Monthly);

        let first = engine.ensure_future("t", 4, &spec, Vec::<String>::new()).unwrap();
        assert_eq!(first.created(), 4);

        let existing: Vec<String> = first.to_create.iter().map(|d| d.name.clone()).collect();
        let second = engine.ensure_future("t", 4, &spec, &existing).unwrap();
        assert_eq!(second.created(), 0);
    }

    #[test]
    fn test_ensure_future_fills_holes_without_shifting() {
        let existing = vec!["t_m2024_05", "public.t_m2024_07"];
        let plan = engine()
            .ensure_future("public.t", 4, &FutureSpec::new(IntervalKind::Monthly), existing)
            .unwrap();

        let names: Vec<_> = plan.to_create.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["t_m2024_06", "t_m2024_08"]);
        assert_eq!(
            plan.to_create[1].boundary,
            PartitionBoundary::range(date(2024, 8, 1), date(2024, 9, 1))
        );
    }

    #[test]
    fn test_ensure_future_schema() {
        let spec = FutureSpec::new(IntervalKind::Daily).with_schema("hot");
        let plan = engine().ensure_future("t", 2, &spec, Vec::<String>::new()).unwrap();
        assert!(plan
            .to_create
            .iter()
            .all(|d| d.qualified_name().starts_with("hot.t_d2024_05_")));
    }

    #[test]
    fn test_rotate_drops_oldest_first() {
        let entries: Vec<_> = [2025, 2023, 2022, 2024]
            .iter()
            .map(|y| {
                BoundaryEntry::range(
                    format!("t_y{}", y),
                    format!("{}-01-01", y),
                    format!("{}-01-01", y + 1),
                )
            })
            .collect();

        let plan = engine().rotate("t", 2, &entries);
        assert_eq!(plan.dropped_names(), vec!["t_y2022", "t_y2023"]);
        assert!(plan.to_create.is_empty());
    }

    #[test]
    fn test_rotate_within_retention_is_noop() {
        let entries = vec![
            BoundaryEntry::range("t_y2024", "2024-01-01", "2025-01-01"),
            BoundaryEntry::range("t_y2025", "2025-01-01", "2026-01-01"),
        ];
        assert!(engine().rotate("t", 2, &entries).is_empty());
        assert!(engine().rotate("t", 5, &entries).is_empty());
    }

    #[test]
    fn test_rotate_numeric_order_and_options() {
        let settings = PartitionSettings::default()
            .with_detach_concurrently(true)
            .with_reclaim_empty_schemas(true);
        let engine = RotationEngine::with_today(settings, date(2024, 5, 15));
        let entries = vec![
            BoundaryEntry::range("t_100", BoundValue::Int(100), BoundValue::Int(200)),
            BoundaryEntry::range("t_20", BoundValue::Int(20), BoundValue::Int(100)),
            BoundaryEntry::range("t_0", BoundValue::Int(0), BoundValue::Int(20)),
        ];

        let plan = engine.rotate("t", 1, &entries);
        assert_eq!(plan.dropped_names(), vec!["t_0", "t_20"]);
        assert!(plan.to_drop[0].options.detach_concurrently);
        assert!(plan.to_drop[0].options.reclaim_schema);
        assert!(!plan.to_drop[0].options.vacuum_parent);
    }
}

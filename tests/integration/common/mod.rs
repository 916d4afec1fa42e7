//! Common fixtures for integration tests.

use chrono::NaiveDate;
use pt_inspect::{parse_boundary, BoundaryEntry};
use pt_traits::{CatalogReader, MemoryCatalog};
use pt_types::{PartitionDefinition, PartitionKey};
use std::sync::Arc;

/// Fixed "today" so interval alignment is reproducible.
pub fn today() -> NaiveDate {
    date(2024, 5, 15)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `(name, from, to)` of RANGE definitions, with bounds as text.
pub fn range_triples(definitions: &[PartitionDefinition]) -> Vec<(String, String, String)> {
    definitions
        .iter()
        .filter_map(|d| {
            let range = d.range()?;
            Some((d.name.clone(), range.from.as_text(), range.to.as_text()))
        })
        .collect()
}

/// Catalog with one range-partitioned table and an index on it.
pub fn events_catalog() -> Arc<MemoryCatalog> {
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.add_table("events", PartitionKey::column("created_at"));
    catalog.add_index("events", "created_at_idx");
    catalog
}

/// Parse what the catalog reports for `table`.
pub async fn catalog_entries(catalog: &MemoryCatalog, table: &str) -> Vec<BoundaryEntry> {
    catalog
        .list_child_partitions(table)
        .await
        .unwrap()
        .into_iter()
        .map(|child| {
            let boundary = parse_boundary(&child.boundary_expression).unwrap();
            BoundaryEntry::new(child.name, boundary)
        })
        .collect()
}

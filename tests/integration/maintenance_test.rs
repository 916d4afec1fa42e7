//! Lifecycle scenarios: create-ahead, retention and reorganization.

use crate::common::{catalog_entries, date, events_catalog, today};
use pt_builder::{LayoutBuilder, SequenceRequest};
use pt_inspect::{analyze, BoundaryEntry};
use pt_rotation::{FutureSpec, PartitionMaintainer, RotationEngine, SchemaCache};
use pt_traits::{Executor, MemoryCatalog};
use pt_types::{IntervalKind, PartitionSettings, PartitionStrategy};
use std::sync::Arc;

fn maintainer(
    catalog: &Arc<MemoryCatalog>,
    settings: PartitionSettings,
) -> PartitionMaintainer<MemoryCatalog, MemoryCatalog> {
    PartitionMaintainer::new(
        catalog.clone(),
        catalog.clone(),
        RotationEngine::with_today(settings, today()),
        Arc::new(SchemaCache::new()),
    )
}

async fn create_yearly(catalog: &MemoryCatalog, from_year: i32, count: u32) {
    let mut builder = LayoutBuilder::new("events", PartitionStrategy::Range)
        .with_column("created_at")
        .with_today(today());
    builder
        .add_sequence(
            SequenceRequest::count(IntervalKind::Yearly, count).starting_at(date(from_year, 1, 1)),
        )
        .unwrap();
    let layout = builder.build().unwrap();
    catalog
        .create_partitions(&layout.table, &layout.definitions)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ensure_future_is_idempotent() {
    let catalog = events_catalog();
    let maintainer = maintainer(&catalog, PartitionSettings::default());
    let spec = FutureSpec::new(IntervalKind::Monthly).with_column("created_at");

    let first = maintainer.ensure_future("events", 4, Some(&spec)).await.unwrap();
    let second = maintainer.ensure_future("events", 4, Some(&spec)).await.unwrap();

    assert_eq!(first, 4);
    assert_eq!(second, 0);
    assert!(maintainer.health("events").await.unwrap().is_healthy());
}

#[tokio::test]
async fn test_ensure_future_extends_detected_layout() {
    let catalog = events_catalog();
    create_yearly(&catalog, 2023, 1).await;
    let maintainer = maintainer(&catalog, PartitionSettings::default());

    // Yearly detected from the existing partition, starting at 2024
    let created = maintainer.ensure_future("events", 3, None).await.unwrap();

    assert_eq!(created, 3);
    assert_eq!(
        catalog.child_names("events"),
        vec!["events_y2023", "events_y2024", "events_y2025", "events_y2026"]
    );
    let report = maintainer.health("events").await.unwrap();
    assert!(report.gaps.is_empty());
    assert!(report.overlaps.is_empty());
}

#[tokio::test]
async fn test_rotation_keeps_newest() {
    let catalog = events_catalog();
    create_yearly(&catalog, 2022, 4).await;
    let settings = PartitionSettings::default().with_detach_concurrently(true);
    let maintainer = maintainer(&catalog, settings);

    let dropped = maintainer.rotate("events", 2).await.unwrap();

    assert_eq!(dropped, vec!["events_y2022", "events_y2023"]);
    assert_eq!(catalog.child_names("events"), vec!["events_y2024", "events_y2025"]);
    assert!(catalog
        .statements()
        .contains(&"ALTER TABLE events DETACH PARTITION events_y2022 CONCURRENTLY".to_string()));

    // Nothing left to drop
    assert!(maintainer.rotate("events", 2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_split_keeps_topology_gap_free() {
    let catalog = events_catalog();
    create_yearly(&catalog, 2023, 2).await;
    let entries = catalog_entries(&catalog, "events").await;

    let engine = RotationEngine::with_today(PartitionSettings::default(), today());
    let plan = engine
        .split_plan("events", &entries[0], IntervalKind::Monthly)
        .unwrap();

    // Topology after the plan is applied: the split partition replaced by its pieces
    let mut after: Vec<BoundaryEntry> = entries[1..].to_vec();
    for definition in plan.created() {
        let range = definition.range().unwrap();
        after.push(BoundaryEntry::range(
            definition.name.clone(),
            range.from.clone(),
            range.to.clone(),
        ));
    }

    let report = analyze(&after, None);
    assert!(report.is_healthy(), "unexpected findings: {:?}", report);
    assert_eq!(after.len(), 13);
    assert_eq!(plan.statements()[0], "ALTER TABLE events DETACH PARTITION events_y2023");
}

#[tokio::test]
async fn test_merge_of_rotated_months() {
    let catalog = events_catalog();
    let maintainer = maintainer(&catalog, PartitionSettings::default());
    maintainer
        .ensure_future("events", 3, Some(&FutureSpec::new(IntervalKind::Monthly)))
        .await
        .unwrap();

    let entries = catalog_entries(&catalog, "events").await;
    let plan = maintainer
        .engine()
        .merge_plan("events", &entries, "events_2024_summer")
        .unwrap();

    let created = plan.created();
    assert_eq!(created.len(), 1);
    assert_eq!(
        created[0].boundary.to_sql(),
        "FOR VALUES FROM ('2024-05-01') TO ('2024-08-01')"
    );
    assert_eq!(
        plan.steps.len(),
        entries.len() * 3 + 1,
        "detach, move and drop per input plus one create"
    );
}

#[test]
fn test_health_report_json() {
    let entries = vec![
        BoundaryEntry::range("a", "2024-01-01", "2024-03-01"),
        BoundaryEntry::range("b", "2024-02-01", "2024-04-01"),
    ];
    let report = analyze(&entries, None);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["overlaps"][0]["first"], "a");
    assert_eq!(json["overlaps"][0]["second"], "b");
}

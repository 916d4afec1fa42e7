//! Layout planning scenarios, from builder to catalog and back.

use crate::common::{catalog_entries, date, events_catalog, range_triples, today};
use pt_builder::{
    HashRequest, LayoutBuilder, SequenceRequest, SubPartitionSpec, TemplateOverrides,
    TemplateRegistry,
};
use pt_inspect::{analyze, IndexSnapshot};
use pt_traits::{CatalogReader, Executor};
use pt_types::{
    BoundValue, HashBound, IntervalKind, PartitionBoundary, PartitionKey, PartitionSettings,
    PartitionStrategy,
};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_monthly_sequence_scenario() {
    let mut builder = LayoutBuilder::new("t", PartitionStrategy::Range)
        .with_column("created_at")
        .with_today(today());
    builder
        .add_sequence(SequenceRequest::count(IntervalKind::Monthly, 3).starting_at(date(2024, 1, 1)))
        .unwrap();
    let layout = builder.build().unwrap();

    let expected = vec![
        ("t_m2024_01", "2024-01-01", "2024-02-01"),
        ("t_m2024_02", "2024-02-01", "2024-03-01"),
        ("t_m2024_03", "2024-03-01", "2024-04-01"),
    ];
    let expected: Vec<(String, String, String)> = expected
        .into_iter()
        .map(|(n, f, t)| (n.to_string(), f.to_string(), t.to_string()))
        .collect();
    assert_eq!(range_triples(&layout.definitions), expected);
}

#[test]
fn test_hash_scenario() {
    let mut builder = LayoutBuilder::new("t", PartitionStrategy::Hash).with_column("id");
    builder.add_hash(4).unwrap();
    let layout = builder.build().unwrap();

    let actual: Vec<(&str, u32, u32)> = layout
        .definitions
        .iter()
        .map(|d| match d.boundary {
            PartitionBoundary::Hash(HashBound { modulus, remainder }) => {
                (d.name.as_str(), remainder, modulus)
            }
            _ => panic!("expected hash boundary for {}", d.name),
        })
        .collect();
    assert_eq!(
        actual,
        vec![("t_p0", 0, 4), ("t_p1", 1, 4), ("t_p2", 2, 4), ("t_p3", 3, 4)]
    );
}

#[test]
fn test_contiguity_for_every_interval() {
    for interval in IntervalKind::ALL {
        let mut builder = LayoutBuilder::new("t", PartitionStrategy::Range)
            .with_column("ts")
            .with_today(today());
        builder
            .add_sequence(SequenceRequest::count(interval, 6).starting_now())
            .unwrap();
        let layout = builder.build().unwrap();

        for pair in layout.definitions.windows(2) {
            let (a, b) = (pair[0].range().unwrap(), pair[1].range().unwrap());
            assert_eq!(a.to, b.from, "{} sequence is not contiguous", interval);
        }
    }
}

#[test]
fn test_deferred_sub_partitions_before_parents_exist() {
    // Sub-partition layout configured before any parent partition exists
    let mut spec = SubPartitionSpec::new(
        PartitionKey::column("region"),
        PartitionStrategy::Hash,
        PartitionSettings::default(),
        today(),
    )
    .with_default_schema("regions");
    spec.set
        .add_hash(HashRequest::new(2).with_prefix("{table}_r"))
        .unwrap();
    assert_eq!(spec.set.pending_len(), 1);

    let mut builder = LayoutBuilder::new("orders", PartitionStrategy::Range)
        .with_column("created_at")
        .with_default_schema("sales")
        .with_today(today());
    builder
        .add_sequence(SequenceRequest::count(IntervalKind::Quarterly, 2).starting_now())
        .unwrap();
    builder.sub_partition_all(&spec).unwrap();
    let layout = builder.build().unwrap();

    let flat = layout.flatten();
    let names: Vec<&str> = flat.iter().map(|p| p.qualified_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "sales.orders_q2024_2",
            "regions.orders_q2024_2_r0",
            "regions.orders_q2024_2_r1",
            "sales.orders_q2024_3",
            "regions.orders_q2024_3_r0",
            "regions.orders_q2024_3_r1",
        ]
    );
    assert_eq!(layout.schemas(), vec!["sales", "regions"]);
}

#[tokio::test]
async fn test_nested_layout_round_trips_through_catalog() {
    let catalog = events_catalog();

    let mut spec = SubPartitionSpec::new(
        PartitionKey::column("status"),
        PartitionStrategy::List,
        PartitionSettings::default(),
        today(),
    );
    for status in ["pending", "active", "closed", "archived"] {
        spec.set
            .add_list(None, vec![BoundValue::text(status)], None)
            .unwrap();
    }

    let mut builder = LayoutBuilder::new("events", PartitionStrategy::Range)
        .with_column("created_at")
        .with_today(today());
    builder
        .add_sequence(SequenceRequest::count(IntervalKind::Monthly, 3).starting_now())
        .unwrap();
    builder.sub_partition_all(&spec).unwrap();
    builder.add_default(None).unwrap();
    let layout = builder.build().unwrap();
    assert_eq!(layout.len(), 3 * 5 + 1);

    catalog
        .create_partitions(&layout.table, &layout.definitions)
        .await
        .unwrap();

    let entries = catalog_entries(&catalog, "events").await;
    assert_eq!(entries.len(), 4);

    let mut snapshot = IndexSnapshot {
        parent: catalog.list_indexes("events").await.unwrap(),
        ..Default::default()
    };
    for entry in &entries {
        let indexes = catalog.list_indexes(&entry.name).await.unwrap();
        snapshot.per_partition.insert(entry.name.clone(), indexes);
    }
    let report = analyze(&entries, Some(&snapshot));
    assert!(report.is_healthy(), "unexpected findings: {:?}", report);

    let nested = catalog_entries(&catalog, "events_m2024_06").await;
    let values: Vec<_> = nested
        .iter()
        .flat_map(|e| e.boundary.list_values().unwrap())
        .collect();
    assert_eq!(
        values,
        vec![
            BoundValue::text("pending"),
            BoundValue::text("active"),
            BoundValue::text("closed"),
            BoundValue::text("archived"),
        ]
    );
}

#[test]
fn test_template_from_file_with_overrides() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"name": "monthly_archive", "strategy": "range", "columns": ["created_at"],
             "interval": "monthly", "count": 12, "schema": "{{table}}_archive",
             "default_partition": true}}]"#
    )
    .unwrap();

    let mut registry = TemplateRegistry::new();
    registry.load_json_file(file.path()).unwrap();

    let overrides = TemplateOverrides {
        count: Some(2),
        ..Default::default()
    };
    let layout = registry
        .expand(
            "monthly_archive",
            "public.invoices",
            Some(&overrides),
            &PartitionSettings::default(),
            today(),
        )
        .unwrap();

    let names: Vec<String> = layout.flatten().into_iter().map(|p| p.qualified_name).collect();
    assert_eq!(
        names,
        vec![
            "invoices_archive.invoices_m2024_05",
            "invoices_archive.invoices_m2024_06",
            "invoices_archive.invoices_default",
        ]
    );
    assert_eq!(registry.get("monthly_archive").unwrap().count, 12);
}

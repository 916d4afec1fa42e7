//! Interval detection from existing partitions.

use pt_inspect::BoundaryEntry;
use pt_types::{split_qualified, IntervalKind};
use tracing::debug;

use crate::engine::FutureSpec;

/// Infer the create-ahead spec of a table from its newest RANGE partition.
///
/// The interval comes from that partition's span (1, 7, 28-31, 89-92 or
/// 365-366 days) and the schema from its qualified name. Returns `None` when
/// there is no date-bounded RANGE partition or the span matches no interval.
pub fn detect_future_spec(entries: &[BoundaryEntry], column: Option<&str>) -> Option<FutureSpec> {
    let (newest, from, to) = entries
        .iter()
        .filter_map(|entry| {
            let (from, to) = entry.boundary.range()?;
            Some((entry, from.as_date()?, to.as_date()?))
        })
        .max_by_key(|(_, from, _)| *from)?;

    let Some(interval) = IntervalKind::from_span(from, to) else {
        debug!(
            partition = %newest.name,
            days = (to - from).num_days(),
            "Partition span matches no interval"
        );
        return None;
    };

    Some(FutureSpec {
        interval,
        column: column.map(str::to_string),
        schema: split_qualified(&newest.name).0.map(str::to_string),
        prefix: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_inspect::ParsedBoundary;

    #[test]
    fn test_detect_monthly_with_schema() {
        let entries = vec![
            BoundaryEntry::range("t_m2024_01", "2024-01-01", "2024-02-01"),
            BoundaryEntry::range("archive.t_m2024_02", "2024-02-01", "2024-03-01"),
        ];
        let spec = detect_future_spec(&entries, Some("created_at")).unwrap();

        assert_eq!(spec.interval, IntervalKind::Monthly);
        assert_eq!(spec.schema.as_deref(), Some("archive"));
        assert_eq!(spec.column.as_deref(), Some("created_at"));
    }

    #[test]
    fn test_detect_uses_newest_partition() {
        // Older yearly partitions were split into monthly ones later on
        let entries = vec![
            BoundaryEntry::range("t_2025_01", "2025-01-01 00:00:00+00", "2025-02-01 00:00:00+00"),
            BoundaryEntry::range("t_y2024", "2024-01-01", "2025-01-01"),
        ];
        let spec = detect_future_spec(&entries, None).unwrap();
        assert_eq!(spec.interval, IntervalKind::Monthly);
    }

    #[test]
    fn test_detect_each_interval() {
        let cases = [
            ("2024-03-05", "2024-03-06", IntervalKind::Daily),
            ("2024-03-04", "2024-03-11", IntervalKind::Weekly),
            ("2024-04-01", "2024-07-01", IntervalKind::Quarterly),
            ("2024-01-01", "2025-01-01", IntervalKind::Yearly),
        ];
        for (from, to, expected) in cases {
            let entries = vec![BoundaryEntry::range("t", from, to)];
            assert_eq!(detect_future_spec(&entries, None).unwrap().interval, expected);
        }
    }

    #[test]
    fn test_detect_nothing() {
        assert!(detect_future_spec(&[], None).is_none());

        let entries = vec![
            BoundaryEntry::new("t_p0", ParsedBoundary::Hash { modulus: 2, remainder: 0 }),
            BoundaryEntry::range("t_0", pt_types::BoundValue::Int(0), pt_types::BoundValue::Int(10)),
            BoundaryEntry::range("t_odd", "2024-01-01", "2024-01-04"),
        ];
        assert!(detect_future_spec(&entries, None).is_none());
    }
}

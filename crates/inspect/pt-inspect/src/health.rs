//! Partition health analysis.
//!
//! Works only on the snapshot it is given. Findings are data for the caller
//! to act on; nothing here fails.

use pt_types::{split_qualified, BoundValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::parser::{parse_boundary, ParsedBoundary};

/// One partition of the analyzed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEntry {
    pub name: String,
    pub boundary: ParsedBoundary,
}

impl BoundaryEntry {
    pub fn new(name: impl Into<String>, boundary: ParsedBoundary) -> Self {
        Self {
            name: name.into(),
            boundary,
        }
    }

    /// RANGE entry shorthand.
    pub fn range(
        name: impl Into<String>,
        from: impl Into<BoundValue>,
        to: impl Into<BoundValue>,
    ) -> Self {
        Self::new(
            name,
            ParsedBoundary::Range {
                from: from.into(),
                to: to.into(),
                columns: 1,
            },
        )
    }
}

/// Index names of the parent table and of each partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Indexes defined on the partitioned parent
    pub parent: Vec<String>,

    /// Partition name -> its own index names
    pub per_partition: HashMap<String, Vec<String>>,
}

impl IndexSnapshot {
    fn indexes_of(&self, name: &str) -> &[String] {
        self.per_partition
            .get(name)
            .or_else(|| self.per_partition.get(split_qualified(name).1))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Uncovered stretch between two adjacent RANGE partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    /// Partition ending at `from`
    pub after: String,
    /// Partition starting at `to`
    pub before: String,
    pub from: BoundValue,
    pub to: BoundValue,
}

/// Two RANGE partitions claiming the same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    pub first: String,
    pub second: String,
}

/// Hash remainders no partition covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashGap {
    /// Largest modulus among the hash partitions
    pub modulus: u32,
    pub missing: Vec<u32>,
}

/// LIST value routed to more than one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateListValue {
    pub value: String,
    pub partitions: Vec<String>,
}

/// Findings for one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub gaps: Vec<Gap>,
    pub overlaps: Vec<Overlap>,
    /// Partitions without a copy of the parent's indexes
    pub missing_indexes: Vec<String>,
    pub hash_gaps: Vec<HashGap>,
    pub duplicate_list_values: Vec<DuplicateListValue>,
    /// Partitions whose boundary expression was not recognized
    pub unclassified: Vec<String>,
}

impl HealthReport {
    /// Returns true if no finding calls for action.
    ///
    /// Unclassified partitions are informational and do not count.
    pub fn is_healthy(&self) -> bool {
        self.gaps.is_empty()
            && self.overlaps.is_empty()
            && self.missing_indexes.is_empty()
            && self.hash_gaps.is_empty()
            && self.duplicate_list_values.is_empty()
    }
}

/// Analyze a table's parsed partitions.
pub fn analyze(entries: &[BoundaryEntry], indexes: Option<&IndexSnapshot>) -> HealthReport {
    let ranges = sorted_ranges(entries);

    let report = HealthReport {
        gaps: find_gaps(&ranges),
        overlaps: find_overlaps(&ranges),
        missing_indexes: indexes
            .map(|snapshot| find_missing_indexes(entries, snapshot))
            .unwrap_or_default(),
        hash_gaps: find_hash_gaps(entries),
        duplicate_list_values: find_duplicate_list_values(entries),
        unclassified: Vec::new(),
    };

    debug!(
        partitions = entries.len(),
        gaps = report.gaps.len(),
        overlaps = report.overlaps.len(),
        missing_indexes = report.missing_indexes.len(),
        "Analyzed partition health"
    );
    report
}

/// Parse raw `(name, boundary expression)` pairs and analyze them.
///
/// Unrecognized expressions are listed as unclassified; the rest of the table
/// is still analyzed.
pub fn analyze_raw<'a, I>(raw: I, indexes: Option<&IndexSnapshot>) -> HealthReport
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut entries = Vec::new();
    let mut unclassified = Vec::new();
    for (name, expression) in raw {
        match parse_boundary(expression) {
            Some(boundary) => entries.push(BoundaryEntry::new(name, boundary)),
            None => {
                warn!(partition = %name, expression = %expression, "Unrecognized partition boundary");
                unclassified.push(name.to_string());
            }
        }
    }

    let mut report = analyze(&entries, indexes);
    report.unclassified = unclassified;
    report
}

struct RangeRef<'a> {
    name: &'a str,
    from: &'a BoundValue,
    to: &'a BoundValue,
}

/// RANGE entries, ascending by `from`. Ties keep input order.
fn sorted_ranges(entries: &[BoundaryEntry]) -> Vec<RangeRef<'_>> {
    let mut ranges: Vec<RangeRef<'_>> = entries
        .iter()
        .filter_map(|e| {
            e.boundary.range().map(|(from, to)| RangeRef {
                name: &e.name,
                from,
                to,
            })
        })
        .collect();
    ranges.sort_by(|a, b| a.from.semantic_cmp(b.from));
    ranges
}

fn find_gaps(ranges: &[RangeRef<'_>]) -> Vec<Gap> {
    ranges
        .windows(2)
        .filter(|pair| pair[0].to.semantic_cmp(pair[1].from) == Ordering::Less)
        .map(|pair| Gap {
            after: pair[0].name.to_string(),
            before: pair[1].name.to_string(),
            from: pair[0].to.clone(),
            to: pair[1].from.clone(),
        })
        .collect()
}

// Pairwise; partition counts per table are small
fn find_overlaps(ranges: &[RangeRef<'_>]) -> Vec<Overlap> {
    let mut overlaps = Vec::new();
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            if a.from.semantic_cmp(b.to) == Ordering::Less
                && a.to.semantic_cmp(b.from) == Ordering::Greater
            {
                overlaps.push(Overlap {
                    first: a.name.to_string(),
                    second: b.name.to_string(),
                });
            }
        }
    }
    overlaps
}

fn find_missing_indexes(entries: &[BoundaryEntry], snapshot: &IndexSnapshot) -> Vec<String> {
    if snapshot.parent.is_empty() {
        return Vec::new();
    }
    entries
        .iter()
        .filter(|entry| {
            let bare = split_qualified(&entry.name).1;
            !snapshot
                .indexes_of(&entry.name)
                .iter()
                .any(|index| index.contains(bare))
        })
        .map(|entry| entry.name.clone())
        .collect()
}

fn find_hash_gaps(entries: &[BoundaryEntry]) -> Vec<HashGap> {
    let buckets: Vec<(u32, u32)> = entries
        .iter()
        .filter_map(|e| match e.boundary {
            ParsedBoundary::Hash { modulus, remainder } if modulus > 0 => Some((modulus, remainder)),
            _ => None,
        })
        .collect();
    let Some(max) = buckets.iter().map(|(m, _)| *m).max() else {
        return Vec::new();
    };

    // Smaller moduli must divide the largest, so coverage is checked there
    let missing: Vec<u32> = (0..max)
        .filter(|r| !buckets.iter().any(|(m, rem)| r % m == *rem))
        .collect();
    if missing.is_empty() {
        Vec::new()
    } else {
        vec![HashGap {
            modulus: max,
            missing,
        }]
    }
}

fn find_duplicate_list_values(entries: &[BoundaryEntry]) -> Vec<DuplicateListValue> {
    let mut owners: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in entries {
        let Some(values) = entry.boundary.list_values() else {
            continue;
        };
        for value in values {
            let partitions = owners.entry(value.as_text()).or_default();
            if !partitions.contains(&entry.name) {
                partitions.push(entry.name.clone());
            }
        }
    }

    owners
        .into_iter()
        .filter(|(_, partitions)| partitions.len() > 1)
        .map(|(value, partitions)| DuplicateListValue { value, partitions })
        .collect()
}

//! Strategy-specific partition boundaries.

use pt_error::{PtError, Result};
use serde::{Deserialize, Serialize};

use crate::strategy::PartitionStrategy;
use crate::value::BoundValue;

/// A half-open RANGE interval `[from, to)`.
///
/// `from < to` is expected but not enforced here; violations surface through
/// health analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBound {
    /// Inclusive lower bound
    pub from: BoundValue,
    /// Exclusive upper bound
    pub to: BoundValue,
}

impl RangeBound {
    /// Create a new range bound.
    pub fn new(from: impl Into<BoundValue>, to: impl Into<BoundValue>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Half-open overlap test against another range.
    pub fn overlaps(&self, other: &RangeBound) -> bool {
        self.from.semantic_cmp(&other.to).is_lt() && self.to.semantic_cmp(&other.from).is_gt()
    }
}

/// An ordered set of discrete LIST values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBound {
    /// Values routed to this partition, in declaration order
    pub values: Vec<BoundValue>,
}

impl ListBound {
    /// Create a new list bound.
    pub fn new(values: Vec<BoundValue>) -> Self {
        Self { values }
    }
}

/// A HASH bucket: rows where `hash(key) % modulus == remainder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashBound {
    /// Number of buckets
    pub modulus: u32,
    /// Bucket index, `0 <= remainder < modulus`
    pub remainder: u32,
}

impl HashBound {
    /// Create a hash bound, checking `0 <= remainder < modulus`.
    pub fn new(modulus: u32, remainder: u32) -> Result<Self> {
        if modulus == 0 {
            return Err(PtError::Config("Hash modulus must be at least 1".to_string()));
        }
        if remainder >= modulus {
            return Err(PtError::Config(format!(
                "Hash remainder {} must be less than modulus {}",
                remainder, modulus
            )));
        }
        Ok(Self { modulus, remainder })
    }
}

/// The condition that defines which rows belong to a partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PartitionBoundary {
    /// `FOR VALUES FROM (..) TO (..)`
    Range(RangeBound),
    /// `FOR VALUES IN (..)`
    List(ListBound),
    /// `FOR VALUES WITH (modulus m, remainder r)`
    Hash(HashBound),
    /// `DEFAULT` catch-all partition
    Default,
}

impl PartitionBoundary {
    /// Range boundary shorthand.
    pub fn range(from: impl Into<BoundValue>, to: impl Into<BoundValue>) -> Self {
        Self::Range(RangeBound::new(from, to))
    }

    /// List boundary shorthand.
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<BoundValue>,
    {
        Self::List(ListBound::new(values.into_iter().map(Into::into).collect()))
    }

    /// Renders the boundary clause used after `PARTITION OF <parent>`.
    pub fn to_sql(&self) -> String {
        match self {
            Self::Range(r) => format!(
                "FOR VALUES FROM ({}) TO ({})",
                r.from.to_sql(),
                r.to.to_sql()
            ),
            Self::List(l) => format!(
                "FOR VALUES IN ({})",
                l.values
                    .iter()
                    .map(BoundValue::to_sql)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Hash(h) => format!(
                "FOR VALUES WITH (modulus {}, remainder {})",
                h.modulus, h.remainder
            ),
            Self::Default => "DEFAULT".to_string(),
        }
    }

    /// The strategy this boundary belongs to, if it implies one.
    ///
    /// `DEFAULT` partitions take their strategy from the parent.
    pub fn strategy(&self) -> Option<PartitionStrategy> {
        match self {
            Self::Range(_) => Some(PartitionStrategy::Range),
            Self::List(_) => Some(PartitionStrategy::List),
            Self::Hash(_) => Some(PartitionStrategy::Hash),
            Self::Default => None,
        }
    }

    /// The range bound, if this is a RANGE boundary.
    pub fn as_range(&self) -> Option<&RangeBound> {
        match self {
            Self::Range(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_range_to_sql() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(
            PartitionBoundary::range(from, to).to_sql(),
            "FOR VALUES FROM ('2024-01-01') TO ('2024-02-01')"
        );
        assert_eq!(
            PartitionBoundary::range(BoundValue::MinValue, 100i64).to_sql(),
            "FOR VALUES FROM (MINVALUE) TO (100)"
        );
    }

    #[test]
    fn test_list_to_sql() {
        let boundary = PartitionBoundary::list(["active", "o'brien"]);
        assert_eq!(boundary.to_sql(), "FOR VALUES IN ('active', 'o''brien')");
    }

    #[test]
    fn test_hash_to_sql() {
        let boundary = PartitionBoundary::Hash(HashBound::new(4, 3).unwrap());
        assert_eq!(boundary.to_sql(), "FOR VALUES WITH (modulus 4, remainder 3)");
        assert_eq!(PartitionBoundary::Default.to_sql(), "DEFAULT");
    }

    #[test]
    fn test_hash_bound_validation() {
        assert!(HashBound::new(0, 0).is_err());
        assert!(HashBound::new(4, 4).is_err());
        assert!(HashBound::new(4, 0).is_ok());
    }

    #[test]
    fn test_range_overlap() {
        let a = RangeBound::new("2024-01-01", "2024-03-01");
        let b = RangeBound::new("2024-02-01", "2024-04-01");
        let c = RangeBound::new("2024-03-01", "2024-04-01");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Touching ranges do not overlap
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_strategy_of_boundary() {
        assert_eq!(
            PartitionBoundary::list([1i64]).strategy(),
            Some(PartitionStrategy::List)
        );
        assert_eq!(PartitionBoundary::Default.strategy(), None);
    }
}

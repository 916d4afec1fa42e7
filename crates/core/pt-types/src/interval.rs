//! Calendar intervals for date-driven RANGE partitioning.

use chrono::{Datelike, Days, Months, NaiveDate};
use pt_error::{PtError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Name tag used for hash partitions (`{base}_p{remainder}`).
pub const HASH_TAG: &str = "p";

/// The length of one RANGE partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl IntervalKind {
    /// All interval kinds, finest first.
    pub const ALL: [IntervalKind; 5] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Yearly,
    ];

    /// Canonical one-letter name tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Daily => "d",
            Self::Weekly => "w",
            Self::Monthly => "m",
            Self::Quarterly => "q",
            Self::Yearly => "y",
        }
    }

    /// Aligns a date down to the start of the interval containing it.
    ///
    /// Weeks start on Monday; quarters start in January, April, July and October.
    pub fn align(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => {
                let back = date.weekday().num_days_from_monday() as u64;
                date - Days::new(back)
            }
            Self::Monthly => date.with_day(1).unwrap_or(date),
            Self::Quarterly => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
            Self::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Advances a date by exactly one interval.
    ///
    /// The date is not re-aligned, so a sequence continued from an arbitrary
    /// boundary stays contiguous with it.
    pub fn advance(&self, date: NaiveDate) -> Result<NaiveDate> {
        let next = match self {
            Self::Daily => date.checked_add_days(Days::new(1)),
            Self::Weekly => date.checked_add_days(Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Quarterly => date.checked_add_months(Months::new(3)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        };
        next.ok_or_else(|| {
            PtError::Config(format!("Date {} cannot be advanced by one {} interval", date, self))
        })
    }

    /// Rough length in days, used to recognise an interval from a span.
    pub fn approx_days(&self) -> std::ops::RangeInclusive<i64> {
        match self {
            Self::Daily => 1..=1,
            Self::Weekly => 7..=7,
            Self::Monthly => 28..=31,
            Self::Quarterly => 89..=92,
            Self::Yearly => 365..=366,
        }
    }

    /// Recognises the interval whose length matches `[from, to)`.
    pub fn from_span(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        let days = (to - from).num_days();
        Self::ALL
            .into_iter()
            .find(|kind| kind.approx_days().contains(&days))
    }

    /// Returns true if `self` is strictly finer than `other`.
    pub fn is_finer_than(&self, other: IntervalKind) -> bool {
        self.rank() < other.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Daily => 0,
            Self::Weekly => 1,
            Self::Monthly => 2,
            Self::Quarterly => 3,
            Self::Yearly => 4,
        }
    }
}

impl std::fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        };
        f.write_str(name)
    }
}

impl FromStr for IntervalKind {
    type Err = PtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Self::Daily),
            "weekly" | "week" | "w" => Ok(Self::Weekly),
            "monthly" | "month" | "m" => Ok(Self::Monthly),
            "quarterly" | "quarter" | "q" => Ok(Self::Quarterly),
            "yearly" | "year" | "y" => Ok(Self::Yearly),
            other => Err(PtError::Config(format!("Unknown interval '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_align() {
        // 2024-05-15 is a Wednesday
        let d = date(2024, 5, 15);
        assert_eq!(IntervalKind::Daily.align(d), d);
        assert_eq!(IntervalKind::Weekly.align(d), date(2024, 5, 13));
        assert_eq!(IntervalKind::Monthly.align(d), date(2024, 5, 1));
        assert_eq!(IntervalKind::Quarterly.align(d), date(2024, 4, 1));
        assert_eq!(IntervalKind::Yearly.align(d), date(2024, 1, 1));
    }

    #[test]
    fn test_align_quarter_edges() {
        assert_eq!(IntervalKind::Quarterly.align(date(2024, 3, 31)), date(2024, 1, 1));
        assert_eq!(IntervalKind::Quarterly.align(date(2024, 10, 1)), date(2024, 10, 1));
        assert_eq!(IntervalKind::Quarterly.align(date(2024, 12, 31)), date(2024, 10, 1));
    }

    #[test]
    fn test_advance() {
        let d = date(2024, 1, 31);
        assert_eq!(IntervalKind::Daily.advance(d).unwrap(), date(2024, 2, 1));
        assert_eq!(IntervalKind::Weekly.advance(d).unwrap(), date(2024, 2, 7));
        assert_eq!(IntervalKind::Quarterly.advance(date(2024, 10, 1)).unwrap(), date(2025, 1, 1));
        assert_eq!(IntervalKind::Yearly.advance(date(2024, 1, 1)).unwrap(), date(2025, 1, 1));
    }

    #[test]
    fn test_from_span() {
        assert_eq!(
            IntervalKind::from_span(date(2024, 2, 1), date(2024, 3, 1)),
            Some(IntervalKind::Monthly)
        );
        assert_eq!(
            IntervalKind::from_span(date(2024, 1, 1), date(2025, 1, 1)),
            Some(IntervalKind::Yearly)
        );
        assert_eq!(
            IntervalKind::from_span(date(2024, 1, 1), date(2024, 4, 1)),
            Some(IntervalKind::Quarterly)
        );
        assert_eq!(IntervalKind::from_span(date(2024, 1, 1), date(2024, 1, 4)), None);
    }

    #[test]
    fn test_from_str_and_tag() {
        assert_eq!("Monthly".parse::<IntervalKind>().unwrap(), IntervalKind::Monthly);
        assert_eq!("q".parse::<IntervalKind>().unwrap(), IntervalKind::Quarterly);
        assert!("hourly".parse::<IntervalKind>().is_err());
        assert_eq!(IntervalKind::Weekly.tag(), "w");
    }

    #[test]
    fn test_is_finer_than() {
        assert!(IntervalKind::Daily.is_finer_than(IntervalKind::Monthly));
        assert!(!IntervalKind::Yearly.is_finer_than(IntervalKind::Monthly));
    }
}

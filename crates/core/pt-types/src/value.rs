//! Typed boundary values.
//!
//! Values are kept typed from creation onward; the SQL text form only exists at
//! the edges (DDL rendering and catalog import).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single boundary value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawValue", into = "RawValue")]
pub enum BoundValue {
    /// Quoted text literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// Calendar date, rendered as a quoted ISO date
    Date(NaiveDate),
    /// Timestamp without zone, rendered as a quoted ISO timestamp
    Timestamp(NaiveDateTime),
    /// Lower sentinel, never quoted
    MinValue,
    /// Upper sentinel, never quoted
    MaxValue,
}

impl BoundValue {
    /// Text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Renders the value as a SQL literal.
    ///
    /// Strings, dates and timestamps are single-quoted with embedded quotes
    /// doubled. Numbers, booleans and the sentinels are emitted bare.
    pub fn to_sql(&self) -> String {
        match self {
            Self::Str(s) => quote(s),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => quote(&d.format(DATE_FORMAT).to_string()),
            Self::Timestamp(ts) => quote(&ts.format(TIMESTAMP_FORMAT).to_string()),
            Self::MinValue => "MINVALUE".to_string(),
            Self::MaxValue => "MAXVALUE".to_string(),
        }
    }

    /// Unquoted text of the value, as an operator would read it.
    pub fn as_text(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            other => other.to_sql(),
        }
    }

    /// Returns true for `MINVALUE` and `MAXVALUE`.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::MinValue | Self::MaxValue)
    }

    /// Interprets the value as a calendar date, if it is one.
    ///
    /// Text that holds an ISO date or timestamp counts, since catalog import
    /// cannot tell dates apart from strings.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self.sort_key() {
            SortKey::Time(ts) => Some(ts.date()),
            _ => None,
        }
    }

    /// Compares two values by their semantic type.
    ///
    /// `MINVALUE` sorts before and `MAXVALUE` after everything else. Numbers
    /// compare numerically, dates and timestamps chronologically (including
    /// quoted ISO text), and anything else falls back to text order.
    pub fn semantic_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::MinValue, Self::MinValue) | (Self::MaxValue, Self::MaxValue) => {
                return Ordering::Equal
            }
            (Self::MinValue, _) | (_, Self::MaxValue) => return Ordering::Less,
            (_, Self::MinValue) | (Self::MaxValue, _) => return Ordering::Greater,
            (Self::Int(a), Self::Int(b)) => return a.cmp(b),
            _ => {}
        }

        match (self.sort_key(), other.sort_key()) {
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(&b),
            (SortKey::Number(a), SortKey::Number(b)) => {
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(&b),
            _ => self.as_text().cmp(&other.as_text()),
        }
    }

    /// Semantic equality, e.g. `'2024-01-01'` equals `'2024-01-01 00:00:00'`.
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.semantic_cmp(other) == Ordering::Equal
    }

    fn sort_key(&self) -> SortKey {
        match self {
            Self::Int(i) => SortKey::Number(*i as f64),
            Self::Float(f) => SortKey::Number(*f),
            Self::Bool(b) => SortKey::Bool(*b),
            Self::Date(d) => SortKey::Time(d.and_time(chrono::NaiveTime::MIN)),
            Self::Timestamp(ts) => SortKey::Time(*ts),
            Self::Str(s) => parse_time(s)
                .map(SortKey::Time)
                .or_else(|| s.trim().parse::<f64>().ok().map(SortKey::Number))
                .unwrap_or(SortKey::Text),
            Self::MinValue | Self::MaxValue => SortKey::Text,
        }
    }
}

impl std::fmt::Display for BoundValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<NaiveDate> for BoundValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveDateTime> for BoundValue {
    fn from(ts: NaiveDateTime) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<i64> for BoundValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for BoundValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for BoundValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for BoundValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

enum SortKey {
    Time(NaiveDateTime),
    Number(f64),
    Bool(bool),
    Text,
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn parse_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Some(d.and_time(chrono::NaiveTime::MIN));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    // Zone-qualified catalog output such as '2024-01-01 00:00:00+00'
    chrono::DateTime::parse_from_str(&format!("{}00", s), "%Y-%m-%d %H:%M:%S%z")
        .ok()
        .map(|dt| dt.naive_utc())
}

/// Wire form used for configuration files.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<RawValue> for BoundValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Bool(b) => Self::Bool(b),
            RawValue::Int(i) => Self::Int(i),
            RawValue::Float(f) => Self::Float(f),
            RawValue::Str(s) if s.eq_ignore_ascii_case("MINVALUE") => Self::MinValue,
            RawValue::Str(s) if s.eq_ignore_ascii_case("MAXVALUE") => Self::MaxValue,
            RawValue::Str(s) => Self::Str(s),
        }
    }
}

impl From<BoundValue> for RawValue {
    fn from(value: BoundValue) -> Self {
        match value {
            BoundValue::Bool(b) => Self::Bool(b),
            BoundValue::Int(i) => Self::Int(i),
            BoundValue::Float(f) => Self::Float(f),
            other => Self::Str(other.as_text()),
        }
    }
}

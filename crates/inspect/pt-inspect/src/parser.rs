//! Boundary expression parser.
//!
//! Inverse of [`PartitionBoundary::to_sql`]. Handles the grammar catalogs use
//! to report partition bounds:
//!
//! - `FOR VALUES FROM (<v>[, ...]) TO (<v>[, ...])`
//! - `FOR VALUES IN (<v>, ...)`
//! - `FOR VALUES WITH (modulus <m>, remainder <r>)`
//! - anything containing `DEFAULT`
//!
//! Anything else is "no match", not an error.

use once_cell::sync::Lazy;
use pt_error::{CatalogError, Result};
use pt_types::{BoundValue, HashBound, ListBound, PartitionBoundary, PartitionStrategy, RangeBound};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Parenthesized tuple body: quoted literals (with `''` escapes) or anything
/// but quotes and parentheses.
const TUPLE: &str = r"((?:'(?:[^']|'')*'|[^'()])*)";

static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*FOR\s+VALUES\s+FROM\s*\({}\)\s*TO\s*\({}\)\s*$",
        TUPLE, TUPLE
    ))
    .unwrap()
});
static LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*FOR\s+VALUES\s+IN\s*\((.*)\)\s*$").unwrap());
static HASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*FOR\s+VALUES\s+WITH\s*\(\s*modulus\s+(\d+)\s*,\s*remainder\s+(\d+)\s*\)\s*$")
        .unwrap()
});
static DEFAULT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)DEFAULT").unwrap());

/// A boundary recovered from its SQL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParsedBoundary {
    /// Only the first column of a multi-column range is kept; `columns` is the
    /// tuple arity.
    Range {
        from: BoundValue,
        to: BoundValue,
        columns: usize,
    },
    /// Raw value list, as reported. Values may contain delimiters, so splitting
    /// is left to [`ParsedBoundary::list_values`].
    List { raw: String },
    Hash { modulus: u32, remainder: u32 },
    Default,
}

impl ParsedBoundary {
    /// Strategy implied by the boundary. `None` for DEFAULT.
    pub fn strategy(&self) -> Option<PartitionStrategy> {
        match self {
            Self::Range { .. } => Some(PartitionStrategy::Range),
            Self::List { .. } => Some(PartitionStrategy::List),
            Self::Hash { .. } => Some(PartitionStrategy::Hash),
            Self::Default => None,
        }
    }

    /// `(from, to)` of a RANGE boundary.
    pub fn range(&self) -> Option<(&BoundValue, &BoundValue)> {
        match self {
            Self::Range { from, to, .. } => Some((from, to)),
            _ => None,
        }
    }

    /// Values of a LIST boundary, split on top-level commas.
    pub fn list_values(&self) -> Option<Vec<BoundValue>> {
        match self {
            Self::List { raw } => Some(split_values(raw).iter().map(|v| parse_value(v)).collect()),
            _ => None,
        }
    }

    /// Convert to the model boundary.
    pub fn into_boundary(self) -> PartitionBoundary {
        match self {
            Self::Range { from, to, .. } => PartitionBoundary::Range(RangeBound { from, to }),
            Self::List { raw } => PartitionBoundary::List(ListBound::new(
                split_values(&raw).iter().map(|v| parse_value(v)).collect(),
            )),
            Self::Hash { modulus, remainder } => {
                PartitionBoundary::Hash(HashBound { modulus, remainder })
            }
            Self::Default => PartitionBoundary::Default,
        }
    }
}

/// Parse a boundary expression. `None` means the grammar is not recognized.
pub fn parse_boundary(raw: &str) -> Option<ParsedBoundary> {
    if let Some(caps) = RANGE_RE.captures(raw) {
        let from = split_values(&caps[1]);
        let to = split_values(&caps[2]);
        if from.is_empty() || from.len() != to.len() {
            return None;
        }
        return Some(ParsedBoundary::Range {
            from: parse_value(&from[0]),
            to: parse_value(&to[0]),
            columns: from.len(),
        });
    }

    if let Some(caps) = LIST_RE.captures(raw) {
        return Some(ParsedBoundary::List {
            raw: caps[1].trim().to_string(),
        });
    }

    if let Some(caps) = HASH_RE.captures(raw) {
        let modulus: u32 = caps[1].parse().ok()?;
        let remainder: u32 = caps[2].parse().ok()?;
        if modulus == 0 || remainder >= modulus {
            return None;
        }
        return Some(ParsedBoundary::Hash { modulus, remainder });
    }

    if DEFAULT_RE.is_match(raw) {
        return Some(ParsedBoundary::Default);
    }

    None
}

/// Like [`parse_boundary`], but an unrecognized expression is an error.
pub fn parse_boundary_strict(raw: &str) -> Result<ParsedBoundary> {
    parse_boundary(raw).ok_or_else(|| CatalogError::UnrecognizedBoundary(raw.to_string()).into())
}

/// Parse one SQL literal.
///
/// Quoted text stays text, even when it looks like a date or number; the
/// comparison helpers on [`BoundValue`] interpret it by content.
pub fn parse_value(token: &str) -> BoundValue {
    let token = token.trim();
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        return BoundValue::Str(unquote(token));
    }
    if token.eq_ignore_ascii_case("MINVALUE") {
        return BoundValue::MinValue;
    }
    if token.eq_ignore_ascii_case("MAXVALUE") {
        return BoundValue::MaxValue;
    }
    if token.eq_ignore_ascii_case("true") {
        return BoundValue::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return BoundValue::Bool(false);
    }
    if let Ok(i) = token.parse::<i64>() {
        return BoundValue::Int(i);
    }
    if let Ok(f) = token.parse::<f64>() {
        if f.is_finite() {
            return BoundValue::Float(f);
        }
    }
    BoundValue::Str(token.to_string())
}

/// Strip one layer of single quotes and un-double embedded quotes.
///
/// ```
/// use pt_inspect::unquote;
///
/// assert_eq!(unquote("'o''brien'"), "o'brien");
/// assert_eq!(unquote("42"), "42");
/// ```
pub fn unquote(s: &str) -> String {
    let s = s.trim();
    match s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => s.to_string(),
    }
}

/// Split a value list on commas outside quoted literals.
pub fn split_values(list: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in list.chars() {
        match c {
            // A doubled quote toggles twice, which leaves the state unchanged
            '\'' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                values.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !values.is_empty() {
        values.push(current.trim().to_string());
    }
    values
}

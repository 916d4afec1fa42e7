//! Deterministic partition naming.
//!
//! Names are a pure function of their inputs. `ensure_future` relies on this:
//! a generated name that already exists means the partition is already there.

use chrono::{Datelike, NaiveDate};
use pt_error::{PtError, Result};
use pt_types::{BoundValue, IntervalKind, NamingPolicy};
use std::fmt::Write;

/// Placeholder replaced by the base (table or parent partition) name.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Resolve a partition name.
///
/// # Arguments
///
/// * `base` - Table name, or parent partition name for sub-partitions
/// * `tag` - Interval tag (`d`, `w`, `m`, `q`, `y`) or `p` for hash
/// * `key` - Interval-formatted date or zero-padded hash remainder
/// * `explicit_prefix` - Caller-provided prefix, may contain `{table}`
/// * `policy` - Naming policy
///
/// # Example
///
/// ```
/// use pt_builder::resolve_name;
/// use pt_types::NamingPolicy;
///
/// let policy = NamingPolicy::default();
/// assert_eq!(resolve_name("t", "m", "2024_01", None, &policy), "t_m2024_01");
/// assert_eq!(resolve_name("t", "m", "2024_01", Some("{table}_hist_"), &policy), "t_hist_2024_01");
/// assert_eq!(resolve_name("t", "m", "2024_01", Some("archive_"), &policy), "archive_2024_01");
/// ```
pub fn resolve_name(
    base: &str,
    tag: &str,
    key: &str,
    explicit_prefix: Option<&str>,
    policy: &NamingPolicy,
) -> String {
    match explicit_prefix {
        Some(prefix) if !prefix.is_empty() => {
            format!("{}{}", substitute_placeholders(prefix, base), key)
        }
        _ => format!(
            "{}{}{}{}{}{}",
            policy.prefix, base, policy.separator, tag, key, policy.suffix
        ),
    }
}

/// Replace every `{table}` placeholder with `base`.
pub fn substitute_placeholders(template: &str, base: &str) -> String {
    template.replace(TABLE_PLACEHOLDER, base)
}

/// Format the name key for the interval starting at `date`.
///
/// Fails if the policy holds an invalid chrono format string.
pub fn format_key(interval: IntervalKind, date: NaiveDate, policy: &NamingPolicy) -> Result<String> {
    let format = match interval {
        IntervalKind::Daily => &policy.daily_format,
        IntervalKind::Weekly => &policy.weekly_format,
        IntervalKind::Monthly => &policy.monthly_format,
        IntervalKind::Quarterly => &policy.quarterly_format,
        IntervalKind::Yearly => &policy.yearly_format,
    };

    let mut key = String::new();
    write!(key, "{}", date.format(format)).map_err(|_| {
        PtError::Config(format!(
            "Invalid {} name format '{}' in naming policy",
            interval, format
        ))
    })?;

    let quarter = date.month0() / 3 + 1;
    Ok(key.replace("{q}", &quarter.to_string()))
}

/// Zero-padded hash remainder, as wide as the largest remainder.
///
/// ```
/// use pt_builder::hash_key;
///
/// assert_eq!(hash_key(3, 4), "3");
/// assert_eq!(hash_key(3, 16), "03");
/// ```
pub fn hash_key(remainder: u32, modulus: u32) -> String {
    let width = modulus.saturating_sub(1).max(1).to_string().len();
    format!("{:0width$}", remainder, width = width)
}

/// Name-safe key for a LIST value: lowercase, non-alphanumerics collapsed to `_`.
pub fn value_key(value: &BoundValue) -> String {
    let mut key = String::new();
    for c in value.as_text().chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    let key = key.trim_matches('_');
    if key.is_empty() {
        "empty".to_string()
    } else {
        key.to_string()
    }
}

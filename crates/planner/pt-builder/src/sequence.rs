//! Date-driven RANGE sequence generation and HASH batches.
//!
//! Expands an interval request into an ordered run of partition definitions.
//! Each boundary is computed as `current + 1 interval`, so a generated run is
//! contiguous by construction.

use chrono::NaiveDate;
use pt_error::{PtError, Result};
use pt_types::{
    HashBound, IntervalKind, NamingPolicy, PartitionBoundary, PartitionDefinition,
    PartitionSettings, PartitionStrategy, HASH_TAG,
};
use tracing::debug;

use crate::naming::{format_key, hash_key, resolve_name};

/// Where a sequence starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStart {
    /// Exactly at this date, no alignment
    At(NaiveDate),
    /// At the last known partition's upper bound, no alignment
    Continue,
    /// Today, aligned down to the interval boundary
    Now,
}

/// How long a sequence is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceExtent {
    /// This many partitions
    Count(u32),
    /// Partitions until this date (exclusive upper bound of the last one)
    Until(NaiveDate),
}

/// A request for a run of interval partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRequest {
    /// Interval length of each partition
    pub interval: IntervalKind,
    /// Start of the first partition
    pub start: SequenceStart,
    /// Number of partitions or end date
    pub extent: SequenceExtent,
    /// Explicit schema, highest precedence
    pub schema: Option<String>,
    /// Explicit tablespace, highest precedence
    pub tablespace: Option<String>,
    /// Explicit name prefix, may contain `{table}`
    pub prefix: Option<String>,
}

impl SequenceRequest {
    /// `count` partitions of `interval`, continuing from the last known partition.
    pub fn count(interval: IntervalKind, count: u32) -> Self {
        Self {
            interval,
            start: SequenceStart::Continue,
            extent: SequenceExtent::Count(count),
            schema: None,
            tablespace: None,
            prefix: None,
        }
    }

    /// Partitions of `interval` until `end`, continuing from the last known partition.
    pub fn until(interval: IntervalKind, end: NaiveDate) -> Self {
        Self {
            extent: SequenceExtent::Until(end),
            ..Self::count(interval, 0)
        }
    }

    /// Start exactly at `date`.
    pub fn starting_at(mut self, date: NaiveDate) -> Self {
        self.start = SequenceStart::At(date);
        self
    }

    /// Start today, aligned to the interval.
    pub fn starting_now(mut self) -> Self {
        self.start = SequenceStart::Now;
        self
    }

    /// Set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the tablespace.
    pub fn with_tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.tablespace = Some(tablespace.into());
        self
    }

    /// Set the name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Everything a sequence needs besides the request itself.
#[derive(Debug, Clone, Copy)]
pub struct SequenceContext<'a> {
    /// Base name for generated names
    pub base_name: &'a str,
    /// Definitions already added to the same level, oldest first
    pub previous: &'a [PartitionDefinition],
    /// Builder-level default schema
    pub default_schema: Option<&'a str>,
    /// Builder-level default tablespace
    pub default_tablespace: Option<&'a str>,
    /// Planner-wide settings
    pub settings: &'a PartitionSettings,
    /// Fall back to the settings' default schema and tablespace
    pub global_defaults: bool,
    /// Current date, for `SequenceStart::Now`
    pub today: NaiveDate,
}

/// Generate a contiguous run of RANGE partitions.
///
/// # Errors
///
/// Returns an error if:
/// - An `Until` end date is not after the resolved start date
/// - The naming policy contains an invalid date format
/// - A boundary overflows the supported date range
pub fn generate_sequence(
    request: &SequenceRequest,
    ctx: &SequenceContext<'_>,
) -> Result<Vec<PartitionDefinition>> {
    let start = resolve_start(request, ctx);

    if let SequenceExtent::Until(end) = request.extent {
        if end <= start {
            return Err(PtError::Config(format!(
                "Sequence end {} must be after its start {}",
                end, start
            )));
        }
    }

    let (global_schema, global_tablespace) = if ctx.global_defaults {
        (
            ctx.settings.default_schema.as_deref(),
            ctx.settings.default_tablespace.as_deref(),
        )
    } else {
        (None, None)
    };
    let schema = resolve_schema(
        request.schema.as_deref(),
        ctx.previous,
        ctx.default_schema,
        global_schema,
    );
    let tablespace = resolve_tablespace(
        request.tablespace.as_deref(),
        ctx.previous,
        ctx.default_tablespace,
        global_tablespace,
    );

    let mut definitions = Vec::new();
    let mut current = start;
    loop {
        match request.extent {
            SequenceExtent::Count(n) if definitions.len() >= n as usize => break,
            SequenceExtent::Until(end) if current >= end => break,
            _ => {}
        }

        let next = request.interval.advance(current)?;
        let name = interval_name(
            ctx.base_name,
            request.interval,
            current,
            request.prefix.as_deref(),
            &ctx.settings.naming,
        )?;

        definitions.push(
            PartitionDefinition::new(
                name,
                PartitionStrategy::Range,
                PartitionBoundary::range(current, next),
            )
            .with_schema(schema.clone())
            .with_tablespace(tablespace.clone()),
        );
        current = next;
    }

    debug!(
        base = %ctx.base_name,
        interval = %request.interval,
        start = %start,
        count = definitions.len(),
        "Generated partition sequence"
    );

    Ok(definitions)
}

/// Name of the interval partition starting at `date`.
pub fn interval_name(
    base: &str,
    interval: IntervalKind,
    date: NaiveDate,
    prefix: Option<&str>,
    policy: &NamingPolicy,
) -> Result<String> {
    let key = format_key(interval, date, policy)?;
    Ok(resolve_name(base, interval.tag(), &key, prefix, policy))
}

/// Generate a complete HASH batch: remainders `0..modulus`, each exactly once.
///
/// ```
/// use pt_builder::hash_partitions;
/// use pt_types::NamingPolicy;
///
/// let defs = hash_partitions("t", 4, None, &NamingPolicy::default()).unwrap();
/// let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
/// assert_eq!(names, vec!["t_p0", "t_p1", "t_p2", "t_p3"]);
/// ```
pub fn hash_partitions(
    base: &str,
    modulus: u32,
    prefix: Option<&str>,
    policy: &NamingPolicy,
) -> Result<Vec<PartitionDefinition>> {
    if modulus == 0 {
        return Err(PtError::Config("Hash modulus must be at least 1".to_string()));
    }

    (0..modulus)
        .map(|remainder| {
            let bound = HashBound::new(modulus, remainder)?;
            let name = resolve_name(base, HASH_TAG, &hash_key(remainder, modulus), prefix, policy);
            Ok(PartitionDefinition::new(
                name,
                PartitionStrategy::Hash,
                PartitionBoundary::Hash(bound),
            ))
        })
        .collect()
}

/// Resolve the schema for new partitions.
///
/// Precedence, highest first: explicit argument, schema of the most recently
/// added sibling, builder default, global default, none.
pub fn resolve_schema(
    explicit: Option<&str>,
    previous: &[PartitionDefinition],
    builder_default: Option<&str>,
    global_default: Option<&str>,
) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| previous.last().and_then(|d| d.schema.clone()))
        .or_else(|| builder_default.map(str::to_string))
        .or_else(|| global_default.map(str::to_string))
}

/// Resolve the tablespace for new partitions, with the same precedence as schemas.
pub fn resolve_tablespace(
    explicit: Option<&str>,
    previous: &[PartitionDefinition],
    builder_default: Option<&str>,
    global_default: Option<&str>,
) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| previous.last().and_then(|d| d.tablespace.clone()))
        .or_else(|| builder_default.map(str::to_string))
        .or_else(|| global_default.map(str::to_string))
}

/// Upper bound of the last RANGE definition, if it is a date.
pub fn last_range_end(previous: &[PartitionDefinition]) -> Option<NaiveDate> {
    previous
        .iter()
        .rev()
        .find_map(|d| d.range())
        .and_then(|r| r.to.as_date())
}

fn resolve_start(request: &SequenceRequest, ctx: &SequenceContext<'_>) -> NaiveDate {
    match request.start {
        SequenceStart::At(date) => date,
        SequenceStart::Now => request.interval.align(ctx.today),
        SequenceStart::Continue => match last_range_end(ctx.previous) {
            Some(end) => end,
            None => {
                debug!(
                    base = %ctx.base_name,
                    "No previous range partition to continue from, starting at current interval"
                );
                request.interval.align(ctx.today)
            }
        },
    }
}

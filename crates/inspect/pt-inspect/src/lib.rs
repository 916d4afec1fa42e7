//! pt-inspect - reading existing partition topology back.
//!
//! Catalogs report partition boundaries as SQL text. This crate turns that
//! text back into structured boundaries and validates a table's partitions
//! as a whole:
//!
//! - [`parse_boundary`] recovers RANGE, LIST, HASH and DEFAULT boundaries
//! - [`analyze`] reports gaps, overlaps, hash coverage, duplicate list values
//!   and partitions that lack their parent's indexes
//!
//! Nothing here talks to a catalog. Callers pass a fresh snapshot on every
//! call, and irregularities come back as data rather than errors.

pub mod health;
pub mod parser;

pub use health::{
    analyze, analyze_raw, BoundaryEntry, DuplicateListValue, Gap, HashGap, HealthReport,
    IndexSnapshot, Overlap,
};
pub use parser::{parse_boundary, parse_boundary_strict, parse_value, split_values, unquote, ParsedBoundary};

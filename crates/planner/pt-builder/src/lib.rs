//! pt-builder - partition definition planning.
//!
//! This crate turns a caller's partitioning intent into an ordered,
//! schema-resolved tree of [`PartitionDefinition`](pt_types::PartitionDefinition)s.
//! It supports:
//!
//! - Deterministic naming from base name, interval tag and formatted key
//! - Contiguous date-driven RANGE sequences and complete HASH batches
//! - Deferred generation while the base name is not yet known
//! - Nested sub-partitions with schema/tablespace inheritance
//! - Named, reusable templates with override semantics
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use pt_builder::{LayoutBuilder, SequenceRequest};
//! use pt_types::{IntervalKind, PartitionStrategy};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let mut builder = LayoutBuilder::new("t", PartitionStrategy::Range).with_column("created_at");
//! builder
//!     .add_sequence(SequenceRequest::count(IntervalKind::Monthly, 3).starting_at(start))
//!     .unwrap();
//!
//! let layout = builder.build().unwrap();
//! assert_eq!(layout.names(), vec!["t_m2024_01", "t_m2024_02", "t_m2024_03"]);
//! ```

pub mod deferred;
pub mod layout;
pub mod naming;
pub mod sequence;
pub mod template;
pub mod tree;

pub use deferred::{HashRequest, PartitionSet};
pub use layout::{LayoutBuilder, PartitionLayout};
pub use naming::{
    format_key, hash_key, resolve_name, substitute_placeholders, value_key, TABLE_PLACEHOLDER,
};
pub use sequence::{
    generate_sequence, hash_partitions, interval_name, last_range_end, resolve_schema,
    resolve_tablespace, SequenceContext, SequenceExtent, SequenceRequest, SequenceStart,
};
pub use template::{PartitionTemplate, RotationPolicy, TemplateOverrides, TemplateRegistry};
pub use tree::{attach, attach_to_all, flatten, resolve_inheritance, FlatPartition, SubPartitionSpec};

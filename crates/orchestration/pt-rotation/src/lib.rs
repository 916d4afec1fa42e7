//! pt-rotation - partition lifecycle.
//!
//! This crate decides how a partitioned table evolves over time:
//!
//! - [`RotationEngine::ensure_future`] plans partitions ahead of need
//! - [`RotationEngine::rotate`] plans retention drops, oldest first
//! - [`RotationEngine::split_plan`] and [`RotationEngine::merge_plan`] describe
//!   reorganizations as detach, create, move and drop steps
//! - [`detect_future_spec`] infers the interval of an existing table
//!
//! The engine itself is pure. [`PartitionMaintainer`] wires it to a
//! [`CatalogReader`](pt_traits::CatalogReader) and an
//! [`Executor`](pt_traits::Executor).

pub mod detect;
pub mod engine;
pub mod maintainer;
pub mod reorganize;
pub mod schema_cache;

pub use detect::detect_future_spec;
pub use engine::{DropAction, FutureSpec, RotationEngine, RotationPlan};
pub use maintainer::PartitionMaintainer;
pub use reorganize::{ReorgStep, ReorganizePlan};
pub use schema_cache::SchemaCache;

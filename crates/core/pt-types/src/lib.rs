//! Core types for the partition topology planner.
//!
//! This crate provides the data model shared by every other crate:
//! - [`PartitionStrategy`] and [`PartitionKey`] - how a level is partitioned
//! - [`BoundValue`] - typed boundary values with semantic ordering
//! - [`PartitionBoundary`] - RANGE/LIST/HASH/DEFAULT boundaries and their SQL form
//! - [`PartitionDefinition`] and [`SubPartitionTree`] - the nested topology
//! - [`IntervalKind`] - calendar intervals for date-driven RANGE partitioning
//! - [`PartitionSettings`] and [`NamingPolicy`] - caller-provided configuration

pub mod boundary;
pub mod config;
pub mod definition;
pub mod interval;
pub mod strategy;
pub mod value;

pub use boundary::*;
pub use config::*;
pub use definition::*;
pub use interval::*;
pub use strategy::*;
pub use value::*;

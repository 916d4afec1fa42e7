//! Collaborator traits for the partition topology planner.
//!
//! The planner itself performs no I/O. This crate defines the seams through
//! which it is fed and through which its output leaves:
//! - [`CatalogReader`] - Reads existing partitions and indexes of a table
//! - [`Executor`] - Turns definitions and drop decisions into DDL
//! - [`MemoryCatalog`] - In-memory implementation of both (for testing/development)

pub mod catalog;
pub mod executor;
pub mod memory;

pub use catalog::*;
pub use executor::*;
pub use memory::*;

//! Integration tests for partition topology planning.
//!
//! These tests run the planner, inspector and rotation engine together
//! against the in-memory catalog, so they need no database.
//!
//! ```bash
//! cargo test -p integration-tests
//! ```

mod common;
mod layout_test;
mod maintenance_test;

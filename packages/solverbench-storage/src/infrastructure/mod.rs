//! Infrastructure layer - Result store adapters
//!
//! - `json`: one JSON file per (group, solver) plus one oracle file per group
//! - `memory`: process-local store for tests and dry runs

pub mod json;
pub mod memory;

pub use json::JsonResultStore;
pub use memory::InMemoryResultStore;

//! solverbench-storage - group-partitioned result persistence
//!
//! ## Core Principles
//!
//! 1. **Identifier as join key**: every record is keyed by the benchmark's
//!    content-derived identifier, never by a machine-local path
//! 2. **Group partitioning**: one result file per (group, solver configuration),
//!    replaced wholesale when a group is re-run
//! 3. **Missing is empty, corrupt is fatal**: absent files load as empty so runs
//!    can resume; undecodable files abort the run
//!
//! ## Usage
//!
//! ```rust,no_run
//! use solverbench_storage::{JsonResultStore, ResultStore};
//!
//! let store = JsonResultStore::new("results");
//! if !store.has_results("QF_BV", "z3_z3") {
//!     // benchmark the group ...
//! }
//! let oracle = store.load_oracle()?;
//! # Ok::<(), solverbench_storage::StorageError>(())
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    GroupResults, Identifier, OracleBucket, OracleBuckets, OracleTable, RawStatus, ResultStore,
    Score, ScoredResult,
};
pub use infrastructure::{InMemoryResultStore, JsonResultStore};

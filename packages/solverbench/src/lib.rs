//! solverbench - SAT/SMT solver benchmark harness
//!
//! Runs a corpus of `.smt2`/`.cnf` instances through one or more solvers
//! under time and memory limits, classifies every answer, checks definite
//! answers against a trusted oracle and aggregates per-group statistics.
//!
//! # Pipeline
//!
//! ```text
//! discover -> execute (bounded) -> classify -> score -> store -> aggregate -> report
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use solverbench::{BenchmarkRunner, HarnessConfig, RunOptions, SolverConfig, SolverKind};
//! use solverbench_storage::JsonResultStore;
//!
//! let config = HarnessConfig::default()
//!     .with_suite("suites/smtlib")
//!     .with_solver(SolverConfig::new(SolverKind::Z3));
//! let store = JsonResultStore::new(&config.results_dir);
//! let summary = BenchmarkRunner::new(config, store).run(&RunOptions::default())?;
//! println!("executed {} benchmarks", summary.executed());
//! # Ok::<(), solverbench::BenchError>(())
//! ```

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod descriptor;
pub mod executor;
pub mod identifier;
pub mod report;
pub mod runner;
pub mod scorer;
pub mod solver;

pub use aggregator::{aggregate, Aggregate, ReportDetails, ScoreSummary};
pub use classifier::{classify, Classification, VerdictClassifier};
pub use config::{ConfigError, HarnessConfig};
pub use descriptor::{discover, BenchmarkDescriptor, BenchmarkFormat, DeclaredStatus, DiscoveryOptions, NameIndex};
pub use executor::{execute, ExecutionResult};
pub use identifier::{identify, normalize};
pub use runner::{BenchmarkRunner, RunMode, RunOptions, RunSummary, SolverRunSummary};
pub use scorer::{rescore, score, Oracle};
pub use solver::{SolverCommand, SolverConfig, SolverKind};

use solverbench_storage::StorageError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("Invalid corpus: {0}")]
    InvalidCorpus(String),

    #[error("Invalid TIMEOUT override {path:?}: '{content}' is not a positive integer")]
    InvalidTimeoutOverride { path: PathBuf, content: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown solver: {0}")]
    UnknownSolver(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

pub type BenchResult<T> = std::result::Result<T, BenchError>;

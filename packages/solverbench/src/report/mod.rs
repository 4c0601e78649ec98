//! Report generation
//!
//! Generates per-solver reports in multiple formats: plain text, JSON, Terminal.

pub mod json;
pub mod terminal;
pub mod text;

pub use json::JsonReporter;
pub use terminal::TerminalReporter;
pub use text::TextReporter;

use crate::aggregator::{aggregate, Aggregate};
use crate::descriptor::NameIndex;
use crate::solver::SolverConfig;
use crate::BenchResult;
use solverbench_storage::{Identifier, ResultStore};
use std::collections::BTreeSet;

/// Aggregated results of one solver configuration, ready to render
#[derive(Debug, Clone)]
pub struct SolverReport {
    pub solver: SolverConfig,
    pub aggregate: Aggregate,
    pub names: NameIndex,
}

impl SolverReport {
    /// Load every stored group of `solver` and aggregate it against the oracle
    pub fn load(store: &dyn ResultStore, solver: &SolverConfig, names: NameIndex) -> BenchResult<Self> {
        let stored = store.load_all(&solver.key())?;
        let oracle = store.load_oracle()?;
        Ok(Self {
            solver: solver.clone(),
            aggregate: aggregate(&stored, &oracle),
            names,
        })
    }

    /// Readable names of `ids`, sorted
    pub fn sorted_names(&self, ids: &BTreeSet<Identifier>) -> Vec<String> {
        let mut names: Vec<String> = ids.iter().map(|id| self.names.name(id)).collect();
        names.sort();
        names
    }

    pub fn file_stem(&self) -> String {
        format!("report_{}", self.solver.key())
    }
}

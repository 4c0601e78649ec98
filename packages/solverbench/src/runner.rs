//! Benchmark orchestration
//!
//! Coordinates one run: discovery, skip decisions per (group, solver),
//! bounded execution (sequential or on a worker pool), scoring and
//! incremental persistence of every finished group.

use crate::descriptor::{discover, BenchmarkDescriptor, DeclaredStatus, NameIndex};
use crate::executor::{execute, ExecutionResult};
use crate::report::TerminalReporter;
use crate::scorer::score;
use crate::solver::SolverConfig;
use crate::{BenchError, BenchResult, HarnessConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use solverbench_storage::{GroupResults, Identifier, OracleBucket, OracleBuckets, OracleTable, ResultStore};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{debug, info, warn};

/// What a run produces besides results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Ordinary benchmarking; the oracle is read, never written
    #[default]
    Benchmark,

    /// Also record every answer as the group's oracle buckets
    EstablishOracle,
}

/// Per-run switches (usually from the command line)
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub mode: RunMode,

    /// Re-run groups that already have results
    pub force: bool,

    /// Global time limit; bypasses TIMEOUT markers
    pub time_limit_override: Option<u64>,

    /// Suppress per-benchmark progress lines
    pub quiet: bool,
}

/// Outcome of one solver configuration in a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverRunSummary {
    pub solver_key: String,
    pub executed: usize,

    /// Benchmarks in a format the solver cannot read
    pub unsupported: usize,
    pub written_groups: Vec<String>,
    pub skipped_groups: Vec<String>,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub solvers: Vec<SolverRunSummary>,

    /// Names of everything discovered, for reports
    pub names: NameIndex,
}

impl RunSummary {
    pub fn executed(&self) -> usize {
        self.solvers.iter().map(|s| s.executed).sum()
    }
}

/// Results of one group still being worked on
struct GroupProgress {
    remaining: usize,
    results: GroupResults,
    buckets: OracleBuckets,
}

/// Benchmark orchestrator
pub struct BenchmarkRunner<S: ResultStore> {
    pub config: HarnessConfig,
    pub store: S,
}

impl<S: ResultStore> BenchmarkRunner<S> {
    pub fn new(config: HarnessConfig, store: S) -> Self {
        Self { config, store }
    }

    /// Discover every configured suite
    ///
    /// A benchmark reachable from two suite roots is kept once.
    pub fn discover(&self, opts: &RunOptions) -> BenchResult<Vec<Arc<BenchmarkDescriptor>>> {
        if self.config.suites.is_empty() {
            return Err(BenchError::InvalidCorpus("no benchmark suites configured".to_string()));
        }

        let discovery = self.config.discovery_options(opts.time_limit_override);
        let mut seen: HashSet<Identifier> = HashSet::new();
        let mut descriptors = Vec::new();
        for root in &self.config.suites {
            for descriptor in discover(root, &discovery)? {
                if seen.insert(descriptor.identifier.clone()) {
                    descriptors.push(Arc::new(descriptor));
                } else {
                    warn!("{} discovered twice, keeping the first", descriptor.corpus_path);
                }
            }
        }
        Ok(descriptors)
    }

    /// Run every configured solver over every discovered benchmark
    pub fn run(&self, opts: &RunOptions) -> BenchResult<RunSummary> {
        let descriptors = self.discover(opts)?;
        let oracle = self.store.load_oracle()?;
        info!(
            "{} benchmarks, {} solver configurations, mode {:?}",
            descriptors.len(),
            self.config.solvers.len(),
            opts.mode
        );

        let mut summary = RunSummary {
            solvers: Vec::with_capacity(self.config.solvers.len()),
            names: NameIndex::from_descriptors(descriptors.iter().map(Arc::as_ref)),
        };
        for solver in &self.config.solvers {
            summary
                .solvers
                .push(self.run_solver(solver, &descriptors, &oracle, opts)?);
        }
        Ok(summary)
    }

    fn run_solver(
        &self,
        solver: &SolverConfig,
        descriptors: &[Arc<BenchmarkDescriptor>],
        oracle: &OracleTable,
        opts: &RunOptions,
    ) -> BenchResult<SolverRunSummary> {
        let key = solver.key();
        let mut summary = SolverRunSummary {
            solver_key: key.clone(),
            ..Default::default()
        };

        let (supported, unsupported): (Vec<_>, Vec<_>) = descriptors
            .iter()
            .partition(|d| solver.kind.accepts(d.format));
        if !unsupported.is_empty() {
            warn!("{} cannot read {} benchmarks, skipping them", solver, unsupported.len());
            summary.unsupported = unsupported.len();
        }

        let mut sizes: BTreeMap<&str, usize> = BTreeMap::new();
        for d in &supported {
            *sizes.entry(d.group.as_str()).or_insert(0) += 1;
        }

        let mut groups: BTreeMap<String, GroupProgress> = BTreeMap::new();
        for (group, size) in sizes {
            if !opts.force && self.store.has_results(group, &key) {
                info!("Results for {} with {} already exist. Use --force to recreate.", group, key);
                summary.skipped_groups.push(group.to_string());
                continue;
            }
            let buckets = match opts.mode {
                RunMode::EstablishOracle => self.store.load_oracle_buckets(group)?,
                RunMode::Benchmark => OracleBuckets::new(),
            };
            groups.insert(
                group.to_string(),
                GroupProgress {
                    remaining: size,
                    results: GroupResults::new(),
                    buckets,
                },
            );
        }

        let pending: Vec<Arc<BenchmarkDescriptor>> = supported
            .into_iter()
            .filter(|d| groups.contains_key(&d.group))
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(summary);
        }
        info!("running {} benchmarks with {}", pending.len(), solver);

        let total = pending.len();
        let started = chrono::Local::now();
        let mut on_result = |execution: ExecutionResult| -> BenchResult<()> {
            summary.executed += 1;
            let scored = score(&execution, oracle);
            if !opts.quiet {
                TerminalReporter::print_progress(
                    &scored,
                    &execution.descriptor.corpus_path,
                    summary.executed,
                    total,
                    started,
                );
            }

            let descriptor = &execution.descriptor;
            let progress = match groups.get_mut(&descriptor.group) {
                Some(progress) => progress,
                None => return Ok(()),
            };
            if opts.mode == RunMode::EstablishOracle {
                progress
                    .buckets
                    .insert(oracle_bucket(&execution), descriptor.identifier.clone());
            }
            progress.results.insert(descriptor.identifier.clone(), scored);
            progress.remaining -= 1;

            if progress.remaining == 0 {
                self.store.save_group(&descriptor.group, &key, &progress.results)?;
                if opts.mode == RunMode::EstablishOracle {
                    self.store.save_oracle_buckets(&descriptor.group, &progress.buckets)?;
                }
                info!("wrote {} results for {} with {}", progress.results.len(), descriptor.group, key);
                summary.written_groups.push(descriptor.group.clone());
            }
            Ok(())
        };

        self.execute_all(&pending, solver, &mut on_result)?;
        Ok(summary)
    }

    /// Execute `pending`, handing each result to `on_result` on this thread
    fn execute_all(
        &self,
        pending: &[Arc<BenchmarkDescriptor>],
        solver: &SolverConfig,
        on_result: &mut dyn FnMut(ExecutionResult) -> BenchResult<()>,
    ) -> BenchResult<()> {
        let grace = self.config.grace();

        if !self.config.parallel {
            for descriptor in pending {
                let command = solver.command(descriptor, grace);
                on_result(execute(Arc::clone(descriptor), &command))?;
            }
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("solverbench-worker-{}", i))
            .build()
            .map_err(|e| BenchError::WorkerPool(e.to_string()))?;
        let batch = self.config.batch_size.max(1);
        debug!("worker pool: {} threads, batch size {}", self.config.workers, batch);

        let cancelled = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<ExecutionResult>();

        thread::scope(|scope| {
            let cancelled = &cancelled;
            scope.spawn(move || {
                pool.install(|| {
                    pending
                        .par_iter()
                        .with_min_len(batch)
                        .for_each_with(tx, |tx, descriptor| {
                            if cancelled.load(Ordering::Relaxed) {
                                return;
                            }
                            let command = solver.command(descriptor, grace);
                            // the receiver only hangs up after a fatal error
                            let _ = tx.send(execute(Arc::clone(descriptor), &command));
                        });
                });
            });

            for execution in rx {
                if let Err(e) = on_result(execution) {
                    cancelled.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
            Ok(())
        })
    }
}

/// Oracle bucket an establishing run records for one execution
///
/// A status the benchmark declares beats what the solver said.
fn oracle_bucket(execution: &ExecutionResult) -> OracleBucket {
    match execution.descriptor.declared_expected {
        Some(DeclaredStatus::Sat) => OracleBucket::Sat,
        Some(DeclaredStatus::Unsat) => OracleBucket::Unsat,
        Some(DeclaredStatus::Unknown) => OracleBucket::Unknown,
        None => OracleBucket::from_raw(execution.raw_status),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::solver::SolverKind;
    use solverbench_storage::{InMemoryResultStore, RawStatus, Score};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// A z3 stand-in: answers with the `;answer` comment of the benchmark
    fn fake_solver(dir: &Path) -> String {
        let path = dir.join("fake-z3");
        std::fs::write(
            &path,
            "#!/bin/sh\nfor f; do :; done\nsed -n 's/^;answer //p' \"$f\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    fn corpus(dir: &Path) -> std::path::PathBuf {
        let root = dir.join("suite");
        for (file, body) in [
            ("A/one.smt2", ";answer sat\n(set-info :status sat)\n"),
            ("A/two.smt2", ";answer sat\n(set-info :status unsat)\n"),
            ("B/three.smt2", ";answer unknown\n"),
            ("B/four.smt2", ";answer unsat\n"),
        ] {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        root
    }

    fn runner(dir: &TempDir, parallel: bool) -> (BenchmarkRunner<InMemoryResultStore>, String) {
        let solver = SolverConfig::new(SolverKind::Z3).with_binary(fake_solver(dir.path()));
        let key = solver.key();
        let config = HarnessConfig::default()
            .with_suite(corpus(dir.path()))
            .with_solver(solver)
            .parallel(parallel)
            .workers(2)
            .batch_size(1);
        (BenchmarkRunner::new(config, InMemoryResultStore::new()), key)
    }

    fn quiet() -> RunOptions {
        RunOptions {
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_scores_and_persists_each_group() {
        let dir = TempDir::new().unwrap();
        let (runner, key) = runner(&dir, false);
        let summary = runner.run(&quiet()).unwrap();

        assert_eq!(summary.executed(), 4);
        assert_eq!(summary.solvers[0].written_groups, vec!["A".to_string(), "B".to_string()]);

        let a = runner.store.load_group("A", &key).unwrap();
        let scores: Vec<Score> = a.values().map(|r| r.score).collect();
        assert_eq!(a.len(), 2);
        assert!(scores.contains(&Score::Solved));
        assert!(scores.contains(&Score::Unsound));

        let b = runner.store.load_group("B", &key).unwrap();
        assert!(b.values().any(|r| r.raw_status == RawStatus::Unknown));
        assert!(b.values().any(|r| r.raw_status == RawStatus::Unsat));
    }

    #[test]
    fn test_existing_groups_are_skipped_unless_forced() {
        let dir = TempDir::new().unwrap();
        let (runner, key) = runner(&dir, false);
        runner.store.save_group("A", &key, &GroupResults::new()).unwrap();

        let summary = runner.run(&quiet()).unwrap();
        assert_eq!(summary.executed(), 2);
        assert_eq!(summary.solvers[0].skipped_groups, vec!["A".to_string()]);
        assert!(runner.store.load_group("A", &key).unwrap().is_empty());

        let forced = RunOptions {
            force: true,
            ..quiet()
        };
        assert_eq!(runner.run(&forced).unwrap().executed(), 4);
        assert_eq!(runner.store.load_group("A", &key).unwrap().len(), 2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = TempDir::new().unwrap();
        let (sequential, key) = runner(&dir, false);
        let (parallel, _) = runner(&dir, true);
        sequential.run(&quiet()).unwrap();
        parallel.run(&quiet()).unwrap();

        for group in ["A", "B"] {
            let s = sequential.store.load_group(group, &key).unwrap();
            let p = parallel.store.load_group(group, &key).unwrap();
            let s: Vec<(Identifier, Score)> = s.into_iter().map(|(id, r)| (id, r.score)).collect();
            let p: Vec<(Identifier, Score)> = p.into_iter().map(|(id, r)| (id, r.score)).collect();
            assert_eq!(s, p);
        }
    }

    #[test]
    fn test_establish_oracle_prefers_declared_status() {
        let dir = TempDir::new().unwrap();
        let (runner, _) = runner(&dir, false);
        let opts = RunOptions {
            mode: RunMode::EstablishOracle,
            ..quiet()
        };
        let summary = runner.run(&opts).unwrap();

        let oracle = runner.store.load_oracle().unwrap();
        let a = runner.store.load_oracle_buckets("A").unwrap();
        assert_eq!(a.bucket(OracleBucket::Sat).len(), 1);
        // two.smt2 answered sat but declares unsat
        assert_eq!(a.bucket(OracleBucket::Unsat).len(), 1);
        let b = runner.store.load_oracle_buckets("B").unwrap();
        assert_eq!(b.bucket(OracleBucket::Unknown).len(), 1);
        assert_eq!(b.bucket(OracleBucket::Unsat).len(), 1);
        assert_eq!(summary.names.len(), 4);
        assert!(!oracle.is_empty());
    }

    #[test]
    fn test_benchmark_mode_never_writes_oracle() {
        let dir = TempDir::new().unwrap();
        let (runner, _) = runner(&dir, false);
        runner.run(&quiet()).unwrap();
        assert!(runner.store.load_oracle().unwrap().is_empty());
    }

    #[test]
    fn test_solver_skips_formats_it_cannot_read() {
        let dir = TempDir::new().unwrap();
        let root = corpus(dir.path());
        std::fs::write(root.join("B/five.cnf"), "p cnf 1 1\n1 0\n").unwrap();
        let solver = SolverConfig::new(SolverKind::Kissat).with_binary(fake_solver(dir.path()));
        let key = solver.key();
        let config = HarnessConfig::default().with_suite(root).with_solver(solver);
        let runner = BenchmarkRunner::new(config, InMemoryResultStore::new());

        let summary = runner.run(&quiet()).unwrap();
        assert_eq!(summary.executed(), 1);
        assert_eq!(summary.solvers[0].unsupported, 4);
        assert_eq!(summary.solvers[0].written_groups, vec!["B".to_string()]);
        assert!(!runner.store.has_results("A", &key));
        assert_eq!(runner.store.load_group("B", &key).unwrap().len(), 1);
    }

    #[test]
    fn test_no_suites_is_an_error() {
        let runner = BenchmarkRunner::new(HarnessConfig::default(), InMemoryResultStore::new());
        assert!(matches!(
            runner.run(&quiet()).unwrap_err(),
            BenchError::InvalidCorpus(_)
        ));
    }
}

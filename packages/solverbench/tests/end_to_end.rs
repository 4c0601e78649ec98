//! End-to-end runs against throwaway shell-script solvers
#![cfg(unix)]

use pretty_assertions::assert_eq;
use solverbench::report::{SolverReport, TextReporter};
use solverbench::{
    aggregate, identify, BenchmarkRunner, HarnessConfig, RunMode, RunOptions, SolverConfig,
    SolverKind,
};
use solverbench_storage::{
    JsonResultStore, OracleBucket, OracleBuckets, RawStatus, ResultStore, Score,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn write(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    write(&path, &format!("#!/bin/sh\n{}\n", body));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().to_string()
}

fn quiet() -> RunOptions {
    RunOptions {
        quiet: true,
        ..Default::default()
    }
}

struct Fixture {
    dir: TempDir,
    suite: PathBuf,
    results: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let suite = dir.path().join("suite");
        let results = dir.path().join("results");
        Self { dir, suite, results }
    }

    fn config(&self, solver: SolverConfig) -> HarnessConfig {
        HarnessConfig::default()
            .results_dir(&self.results)
            .with_suite(&self.suite)
            .with_solver(solver)
    }

    fn store(&self) -> JsonResultStore {
        JsonResultStore::new(&self.results)
    }
}

#[test]
fn test_sat_answer_against_unsat_oracle_is_unsound() {
    let fx = Fixture::new();
    write(&fx.suite.join("QF_BV/a.smt2"), "(check-sat)\n");
    write(&fx.suite.join("QF_BV/b.smt2"), "(check-sat)\n");
    let solver = SolverConfig::new(SolverKind::Z3).with_binary(script(fx.dir.path(), "z3", "echo sat"));
    let key = solver.key();

    let a = identify(Path::new("suite/QF_BV/a.smt2"));
    let mut buckets = OracleBuckets::new();
    buckets.insert(OracleBucket::Unsat, a.clone());
    fx.store().save_oracle_buckets("QF_BV", &buckets).unwrap();

    let runner = BenchmarkRunner::new(fx.config(solver), fx.store());
    runner.run(&quiet()).unwrap();

    let results = fx.store().load_group("QF_BV", &key).unwrap();
    assert_eq!(results.len(), 2);
    let unsound = &results[&a];
    assert_eq!(unsound.raw_status, RawStatus::Sat);
    assert_eq!(unsound.score, Score::Unsound);
    assert_eq!(unsound.comment, "result sat is not unsat");

    let b = identify(Path::new("suite/QF_BV/b.smt2"));
    assert_eq!(results[&b].score, Score::Solved);
}

#[test]
fn test_runaway_solver_is_killed_at_deadline() {
    let fx = Fixture::new();
    write(&fx.suite.join("slow/a.cnf"), "p cnf 1 1\n1 0\n");
    write(&fx.suite.join("slow/TIMEOUT"), "1\n");
    let solver = SolverConfig::new(SolverKind::Z3).with_binary(script(fx.dir.path(), "z3", "sleep 30"));
    let key = solver.key();

    let config = fx.config(solver).watchdog_grace(Duration::ZERO);
    let started = Instant::now();
    BenchmarkRunner::new(config, fx.store()).run(&quiet()).unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));

    let results = fx.store().load_group("slow", &key).unwrap();
    let result = results.values().next().unwrap();
    assert_eq!(result.raw_status, RawStatus::Timeout);
    assert_eq!(result.score, Score::Timeout);
    assert!(result.elapsed_seconds >= 1.0 && result.elapsed_seconds < 3.0);
}

#[test]
fn test_resume_skips_finished_groups() {
    let fx = Fixture::new();
    write(&fx.suite.join("A/a.smt2"), "");
    write(&fx.suite.join("B/b.smt2"), "");
    let log = fx.dir.path().join("calls.log");
    let body = format!("echo call >> '{}'\necho unsat", log.display());
    let solver = SolverConfig::new(SolverKind::Z3).with_binary(script(fx.dir.path(), "z3", &body));

    let runner = BenchmarkRunner::new(fx.config(solver), fx.store());
    assert_eq!(runner.run(&quiet()).unwrap().executed(), 2);
    let second = runner.run(&quiet()).unwrap();
    assert_eq!(second.executed(), 0);
    assert_eq!(second.solvers[0].skipped_groups, vec!["A".to_string(), "B".to_string()]);

    let calls = std::fs::read_to_string(&log).unwrap();
    assert_eq!(calls.lines().count(), 2);
}

#[test]
fn test_establish_then_benchmark_then_report() {
    let fx = Fixture::new();
    write(&fx.suite.join("G/x.smt2"), "");
    write(&fx.suite.join("G/y.smt2"), "");
    write(&fx.suite.join("H/z.smt2"), "(set-info :status sat)\n");

    // reference solver says unsat to everything
    let reference = SolverConfig::new(SolverKind::Z3).with_binary(script(fx.dir.path(), "ref", "echo unsat"));
    let runner = BenchmarkRunner::new(fx.config(reference), fx.store());
    let opts = RunOptions {
        mode: RunMode::EstablishOracle,
        ..quiet()
    };
    runner.run(&opts).unwrap();

    let oracle = fx.store().load_oracle().unwrap();
    assert_eq!(oracle.group("G").unwrap().bucket(OracleBucket::Unsat).len(), 2);
    assert_eq!(oracle.group("H").unwrap().bucket(OracleBucket::Sat).len(), 1);

    // candidate solver says sat to everything
    let candidate = SolverConfig::new(SolverKind::Z3).with_binary(script(fx.dir.path(), "cand", "echo sat"));
    let runner = BenchmarkRunner::new(fx.config(candidate.clone()), fx.store());
    let summary = runner.run(&quiet()).unwrap();

    let stored = fx.store().load_all(&candidate.key()).unwrap();
    let first = aggregate(&stored, &oracle);
    let second = aggregate(&stored, &oracle);
    assert_eq!(first, second);
    assert_eq!(first.groups["G"].count(Score::Unsound), 2);
    assert_eq!(first.groups["H"].count(Score::Solved), 1);
    assert_eq!(first.total.count(Score::Unsound), 2);
    // mean of 0% and 100%
    assert!((first.total.percent(Score::Solved) - 50.0).abs() < 1e-9);

    let report = SolverReport::load(&fx.store(), &candidate, summary.names).unwrap();
    let path = TextReporter::save(&report, fx.dir.path()).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("# Unsound results\nsuite/G/x.smt2\nsuite/G/y.smt2\n"));
}

#[test]
fn test_corrupt_result_file_aborts_run() {
    let fx = Fixture::new();
    write(&fx.suite.join("G/x.smt2"), "");
    write(&fx.results.join("G/benchmarks.json"), "{ not json");
    let solver = SolverConfig::new(SolverKind::Z3).with_binary(script(fx.dir.path(), "z3", "echo sat"));

    let err = BenchmarkRunner::new(fx.config(solver), fx.store())
        .run(&quiet())
        .unwrap_err();
    assert!(matches!(err, solverbench::BenchError::Storage(_)));
}

#[test]
fn test_parallel_run_writes_every_group() {
    let fx = Fixture::new();
    for g in ["A", "B", "C"] {
        for i in 0..4 {
            write(&fx.suite.join(format!("{}/{}.cnf", g, i)), "p cnf 1 1\n1 0\n");
        }
    }
    let solver = SolverConfig::new(SolverKind::Kissat)
        .with_binary(script(fx.dir.path(), "kissat", "echo 'c kissat'\necho 's UNSATISFIABLE'"));
    let key = solver.key();
    let config = fx.config(solver).parallel(true).workers(3).batch_size(2);

    let summary = BenchmarkRunner::new(config, fx.store()).run(&quiet()).unwrap();
    assert_eq!(summary.executed(), 12);

    for g in ["A", "B", "C"] {
        let results = fx.store().load_group(g, &key).unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.values().all(|r| r.raw_status == RawStatus::Unsat));
    }
}

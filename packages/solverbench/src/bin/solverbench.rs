//! solverbench CLI
//!
//! # Usage
//!
//! ```bash
//! # Benchmark z3 on a corpus, then write report_z3_z3.txt
//! solverbench run --suite suites/smtlib --solver z3 --report
//!
//! # Record trusted verdicts from a reference solver
//! solverbench establish-oracle --suite suites/smtlib --solver cvc5 --timeout 60
//!
//! # Re-render reports from stored results
//! solverbench report --config bench.yaml --json
//! ```

use clap::{Args, Parser, Subcommand};
use solverbench::report::{JsonReporter, SolverReport, TerminalReporter, TextReporter};
use solverbench::{
    BenchmarkRunner, HarnessConfig, NameIndex, RunMode, RunOptions, SolverConfig, SolverKind,
};
use solverbench_storage::JsonResultStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "solverbench")]
#[command(about = "SAT/SMT solver benchmark harness with soundness checking", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run solvers over the corpus
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Re-run groups that already have results
        #[arg(long)]
        force: bool,

        /// Write reports after the run
        #[arg(long)]
        report: bool,
    },

    /// Run the corpus and record the answers as oracle verdicts
    EstablishOracle {
        #[command(flatten)]
        common: CommonArgs,

        /// Re-run groups that already have results
        #[arg(long)]
        force: bool,
    },

    /// Aggregate stored results into reports
    Report {
        #[command(flatten)]
        common: CommonArgs,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Also write a JSON report
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Corpus root (repeatable)
    #[arg(short, long)]
    suite: Vec<PathBuf>,

    /// Solver as KIND or KIND:BINARY (repeatable)
    #[arg(long)]
    solver: Vec<SolverConfig>,

    /// Result store root
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Global time limit in seconds (ignores TIMEOUT files)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Run benchmarks on a worker pool
    #[arg(long)]
    parallel: bool,

    /// Worker pool size
    #[arg(long)]
    workers: Option<usize>,

    /// Benchmarks per worker batch (1 for debugging)
    #[arg(long)]
    batch_size: Option<usize>,
}

impl CommonArgs {
    /// File settings with command-line overrides applied
    fn harness_config(&self) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_yaml(path)?,
            None => HarnessConfig::default(),
        };

        config.suites.extend(self.suite.iter().cloned());
        config.solvers.extend(self.solver.iter().cloned());
        if config.solvers.is_empty() {
            config.solvers.push(SolverConfig::new(SolverKind::Z3));
        }
        if let Some(dir) = &self.results_dir {
            config.results_dir = dir.clone();
        }
        if self.parallel {
            config.parallel = true;
        }
        if let Some(n) = self.workers {
            config.workers = n;
        }
        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            common,
            force,
            report,
        } => {
            run(&common, RunMode::Benchmark, force, report)?;
        }
        Commands::EstablishOracle { common, force } => {
            run(&common, RunMode::EstablishOracle, force, false)?;
        }
        Commands::Report {
            common,
            output,
            json,
        } => {
            let config = common.harness_config()?;
            let names = names_for(&config, common.timeout)?;
            write_reports(&config, names, &output, json)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "solverbench=debug" } else { "solverbench=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(
    common: &CommonArgs,
    mode: RunMode,
    force: bool,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = common.harness_config()?;
    let store = JsonResultStore::new(&config.results_dir);
    let opts = RunOptions {
        mode,
        force,
        time_limit_override: common.timeout,
        quiet: false,
    };

    let runner = BenchmarkRunner::new(config, store);
    let summary = runner.run(&opts)?;
    TerminalReporter::print_run(&summary);

    if report {
        write_reports(&runner.config, summary.names, Path::new("."), false)?;
    }

    println!("\n✅ Run complete!");
    Ok(())
}

/// Name index from whatever suites are configured (empty when none)
fn names_for(
    config: &HarnessConfig,
    timeout: Option<u64>,
) -> Result<NameIndex, Box<dyn std::error::Error>> {
    let mut names = NameIndex::default();
    let opts = config.discovery_options(timeout);
    for root in &config.suites {
        names.extend(solverbench::discover(root, &opts)?.iter());
    }
    Ok(names)
}

fn write_reports(
    config: &HarnessConfig,
    names: NameIndex,
    output: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonResultStore::new(&config.results_dir);
    for solver in &config.solvers {
        let report = SolverReport::load(&store, solver, names.clone())?;
        TerminalReporter::print(&report);

        let text_path = TextReporter::save(&report, output)?;
        println!("\n📄 Report saved: {:?}", text_path);

        if json {
            let json_path = JsonReporter::save(&report, output)?;
            println!("📄 JSON saved: {:?}", json_path);
        }
    }
    Ok(())
}

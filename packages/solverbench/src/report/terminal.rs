//! Terminal (pretty-print) report generation

use super::{SolverReport, TextReporter};
use crate::runner::RunSummary;
use chrono::{DateTime, Local};
use solverbench_storage::{RawStatus, Score, ScoredResult};

pub struct TerminalReporter;

impl TerminalReporter {
    /// Progress mark for a scored result
    pub fn mark(result: &ScoredResult) -> &'static str {
        match result.score {
            Score::Solved if result.raw_status == RawStatus::Unsat => "u ✓",
            Score::Solved => "s ✓",
            Score::Unknown => " ? ",
            Score::Timeout => " ⌛ ",
            Score::Oom => "oom",
            Score::Error => "err",
            Score::Unsound => " ! ",
        }
    }

    /// `<P.P%> Time Remaining:N (runtime:T) [mark] name`
    ///
    /// The remaining time extrapolates the elapsed wall time linearly.
    pub fn progress_line(result: &ScoredResult, name: &str, progress_pct: f64, elapsed_secs: f64) -> String {
        let remaining = if progress_pct > 0.0 {
            elapsed_secs / progress_pct * (100.0 - progress_pct)
        } else {
            0.0
        };
        format!(
            "<{:.1}%> Time Remaining:{:.0} (runtime:{:.3}) [{}] {}",
            progress_pct,
            remaining,
            result.elapsed_seconds,
            Self::mark(result),
            name
        )
    }

    /// Print one completed benchmark; errors and unsound answers include their comment
    pub fn print_progress(result: &ScoredResult, name: &str, done: usize, total: usize, started: DateTime<Local>) {
        let progress_pct = 100.0 * done as f64 / total.max(1) as f64;
        let elapsed = (Local::now() - started).num_milliseconds() as f64 / 1000.0;
        println!("{}", Self::progress_line(result, name, progress_pct, elapsed));
        if matches!(result.score, Score::Error | Score::Unsound) && !result.comment.trim().is_empty() {
            println!("{}", result.comment.trim());
        }
    }

    pub fn print_run(summary: &RunSummary) {
        println!("\n┌──────────────────────────────────────────────────────────┐");
        println!("│ Run Summary                                              │");
        println!("├──────────────────────────────────────────────────────────┤");
        for solver in &summary.solvers {
            println!(
                "│  {:<54}  │",
                format!(
                    "{}: {} run, {} groups written, {} skipped",
                    solver.solver_key,
                    solver.executed,
                    solver.written_groups.len(),
                    solver.skipped_groups.len()
                )
            );
            if solver.unsupported > 0 {
                println!(
                    "│  {:<54}  │",
                    format!("  {} benchmarks in formats it cannot read", solver.unsupported)
                );
            }
        }
        println!("└──────────────────────────────────────────────────────────┘");
    }

    pub fn print(report: &SolverReport) {
        println!("\n┌──────────────────────────────────────────────────────────┐");
        println!("│ {:<56} │", format!("Results: {}", report.solver));
        println!("└──────────────────────────────────────────────────────────┘");
        print!("{}", TextReporter::summary_table(report));

        let details = &report.aggregate.details;
        if !details.unsound.is_empty() {
            println!("\nUnsound results:");
            for name in report.sorted_names(&details.unsound) {
                println!("  ! {}", name);
            }
        }
    }
}

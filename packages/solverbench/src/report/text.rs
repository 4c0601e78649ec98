//! Plain-text report generation

use super::SolverReport;
use crate::aggregator::ScoreSummary;
use crate::BenchResult;
use solverbench_storage::Score;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const HEAD: [&str; 9] = [
    "Benchmark",
    "Time",
    "Non-Err",
    "Solved",
    "Unknown",
    "Error",
    "Timeout",
    "OOM",
    "Unsound",
];

pub struct TextReporter;

impl TextReporter {
    pub fn save(report: &SolverReport, output_dir: &Path) -> BenchResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}.txt", report.file_stem()));
        std::fs::write(&path, Self::generate(report))?;
        Ok(path)
    }

    pub fn generate(report: &SolverReport) -> String {
        let mut out = String::new();
        out.push_str("# Configuration\n");
        let _ = writeln!(out, "Solver kind   : {}", report.solver.kind);
        let _ = writeln!(out, "Solver binary : {}", report.solver.binary);

        out.push_str("\n# Summary\n");
        out.push_str(&Self::summary_table(report));

        let details = &report.aggregate.details;
        for (title, ids) in [
            ("Unsound results", &details.unsound),
            ("Timeouts", &details.timeouts),
            ("Unknown", &details.unknown),
        ] {
            if ids.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n# {}", title);
            for name in report.sorted_names(ids) {
                out.push_str(&name);
                out.push('\n');
            }
        }

        if !details.errors.is_empty() {
            out.push_str("\n# Errors (duplicates grouped)\n");
            for (error, ids) in &details.errors {
                for name in report.sorted_names(ids) {
                    let _ = writeln!(out, "## {}", name);
                }
                let _ = write!(out, "{}\n\n", error);
            }
        }

        out
    }

    /// Per-group rows plus TOTAL
    pub fn summary_table(report: &SolverReport) -> String {
        let groups = &report.aggregate.groups;
        let first = groups
            .keys()
            .map(String::len)
            .chain([HEAD[0].len(), "TOTAL".len()])
            .max()
            .unwrap_or(0);
        let rest = HEAD[1..].iter().map(|h| h.len()).max().unwrap_or(0);

        let row = |cells: &[String]| -> String {
            let mut line = format!("{:>first$} ", cells[0], first = first);
            let tail: Vec<String> = cells[1..]
                .iter()
                .map(|c| format!("{:>rest$}", c, rest = rest))
                .collect();
            line.push_str(&tail.join(" "));
            line.push('\n');
            line
        };

        let mut out = row(&HEAD.map(str::to_string));
        for (group, summary) in groups {
            out.push_str(&row(&Self::cells(group, summary)));
        }
        out.push_str(&row(&Self::cells("TOTAL", &report.aggregate.total)));
        out
    }

    fn cells(label: &str, summary: &ScoreSummary) -> [String; 9] {
        [
            label.to_string(),
            format!("{:.3}", summary.time),
            format!("{:.1}%", summary.non_error_percent()),
            format!("{:.1}%", summary.percent(Score::Solved)),
            summary.count(Score::Unknown).to_string(),
            summary.count(Score::Error).to_string(),
            summary.count(Score::Timeout).to_string(),
            summary.count(Score::Oom).to_string(),
            summary.count(Score::Unsound).to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::descriptor::NameIndex;
    use crate::solver::{SolverConfig, SolverKind};
    use pretty_assertions::assert_eq;
    use solverbench_storage::{GroupResults, Identifier, OracleTable, RawStatus, ScoredResult};
    use std::collections::BTreeMap;

    fn result(id: &str, raw: RawStatus, score: Score, comment: &str) -> ScoredResult {
        ScoredResult {
            identifier: Identifier::new(id),
            raw_status: raw,
            score,
            elapsed_seconds: 0.5,
            comment: comment.to_string(),
        }
    }

    fn report() -> SolverReport {
        let group: GroupResults = [
            result("a", RawStatus::Sat, Score::Solved, ""),
            result("b", RawStatus::Unsat, Score::Unsound, "result unsat is not sat"),
            result("c", RawStatus::Error, Score::Error, "boom\n"),
            result("d", RawStatus::Timeout, Score::Timeout, ""),
        ]
        .into_iter()
        .map(|r| (r.identifier.clone(), r))
        .collect();
        let stored: BTreeMap<String, GroupResults> = [("QF_BV".to_string(), group)].into_iter().collect();

        SolverReport {
            solver: SolverConfig::new(SolverKind::Z3),
            aggregate: aggregate(&stored, &OracleTable::new()),
            names: NameIndex::default(),
        }
    }

    #[test]
    fn test_summary_table_layout() {
        let table = TextReporter::summary_table(&report());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(
            lines[0],
            "Benchmark    Time Non-Err  Solved Unknown   Error Timeout     OOM Unsound"
        );
        assert_eq!(
            lines[1],
            "    QF_BV   2.000   50.0%   25.0%       0       1       1       0       1"
        );
        assert!(lines[2].starts_with("    TOTAL"));
    }

    #[test]
    fn test_sections() {
        let text = TextReporter::generate(&report());
        assert!(text.starts_with("# Configuration\nSolver kind   : z3\nSolver binary : z3\n"));
        assert!(text.contains("\n# Unsound results\nsha<b>\n"));
        assert!(text.contains("\n# Timeouts\nsha<d>\n"));
        assert!(!text.contains("# Unknown"));
        assert!(text.contains("# Errors (duplicates grouped)\n## sha<c>\nboom\n\n"));
    }

    #[test]
    fn test_save_uses_solver_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = TextReporter::save(&report(), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "report_z3_z3.txt");
        assert!(std::fs::read_to_string(path).unwrap().contains("# Summary"));
    }
}

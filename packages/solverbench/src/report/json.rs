//! JSON report generation

use super::SolverReport;
use crate::aggregator::ScoreSummary;
use crate::BenchResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    solver_key: String,
    kind: String,
    binary: &'a str,
    generated_at: String,
    groups: &'a BTreeMap<String, ScoreSummary>,
    total: &'a ScoreSummary,
    unsound: Vec<String>,
    timeouts: Vec<String>,
    unknown: Vec<String>,
    errors: BTreeMap<&'a str, Vec<String>>,
}

pub struct JsonReporter;

impl JsonReporter {
    pub fn save(report: &SolverReport, output_dir: &Path) -> BenchResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}.json", report.file_stem()));
        std::fs::write(&path, Self::generate(report)?)?;
        Ok(path)
    }

    pub fn generate(report: &SolverReport) -> BenchResult<String> {
        let details = &report.aggregate.details;
        let json = JsonReport {
            solver_key: report.solver.key(),
            kind: report.solver.kind.to_string(),
            binary: &report.solver.binary,
            generated_at: chrono::Local::now().to_rfc3339(),
            groups: &report.aggregate.groups,
            total: &report.aggregate.total,
            unsound: report.sorted_names(&details.unsound),
            timeouts: report.sorted_names(&details.timeouts),
            unknown: report.sorted_names(&details.unknown),
            errors: details
                .errors
                .iter()
                .map(|(error, ids)| (error.as_str(), report.sorted_names(ids)))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::descriptor::NameIndex;
    use crate::solver::{SolverConfig, SolverKind};
    use solverbench_storage::{GroupResults, Identifier, OracleTable, RawStatus, Score, ScoredResult};

    #[test]
    fn test_json_report_shape() {
        let r = ScoredResult {
            identifier: Identifier::new("a"),
            raw_status: RawStatus::Sat,
            score: Score::Solved,
            elapsed_seconds: 1.5,
            comment: String::new(),
        };
        let group: GroupResults = [(r.identifier.clone(), r)].into_iter().collect();
        let stored: BTreeMap<String, GroupResults> = [("G".to_string(), group)].into_iter().collect();
        let report = SolverReport {
            solver: SolverConfig::new(SolverKind::Cvc5),
            aggregate: aggregate(&stored, &OracleTable::new()),
            names: NameIndex::default(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = JsonReporter::save(&report, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "report_cvc5_cvc5.json");

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["solver_key"], "cvc5_cvc5");
        assert_eq!(value["groups"]["G"]["score"]["solved"], 1);
        assert_eq!(value["total"]["average"]["solved"], 100.0);
        assert_eq!(value["total"]["time"], 1.5);
        assert!(value["unsound"].as_array().unwrap().is_empty());
    }
}

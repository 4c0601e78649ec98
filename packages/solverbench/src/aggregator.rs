//! Result aggregation
//!
//! Pure functions from stored results (plus the oracle) to per-group and
//! total summaries. Nothing here touches the filesystem.

use crate::scorer::{rescore, Oracle};
use serde::{Deserialize, Serialize};
use solverbench_storage::{GroupResults, Identifier, Score};
use std::collections::{BTreeMap, BTreeSet};

/// Scores counted as "not an error" in the Non-Err column
pub const NON_ERROR_SCORES: [Score; 4] = [Score::Solved, Score::Unknown, Score::Timeout, Score::Oom];

/// Counts, percentages and summed runtime for a set of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Count per score (all six present)
    pub score: BTreeMap<Score, usize>,

    /// Percentage per score
    pub average: BTreeMap<Score, f64>,

    /// Sum of elapsed seconds
    pub time: f64,
}

impl ScoreSummary {
    fn empty() -> Self {
        Self {
            score: Score::ALL.iter().map(|s| (*s, 0)).collect(),
            average: Score::ALL.iter().map(|s| (*s, 0.0)).collect(),
            time: 0.0,
        }
    }

    /// Summarize one group
    ///
    /// An empty group has zero counts and zero percentages.
    pub fn of_group(results: &GroupResults) -> Self {
        let mut summary = Self::empty();
        for result in results.values() {
            *summary.score.entry(result.score).or_insert(0) += 1;
            summary.time += result.elapsed_seconds;
        }

        let total = results.len();
        if total > 0 {
            for s in Score::ALL {
                summary.average.insert(s, 100.0 * summary.count(s) as f64 / total as f64);
            }
        }
        summary
    }

    /// Combine group summaries into a total
    ///
    /// Counts and time are summed. The total percentage of a score is the
    /// unweighted mean of the per-group percentages, so every group weighs
    /// the same regardless of its size.
    pub fn total<'a>(groups: impl IntoIterator<Item = &'a ScoreSummary>) -> Self {
        let mut total = Self::empty();
        let mut n = 0usize;
        for group in groups {
            n += 1;
            for s in Score::ALL {
                *total.score.entry(s).or_insert(0) += group.count(s);
                *total.average.entry(s).or_insert(0.0) += group.percent(s);
            }
            total.time += group.time;
        }
        if n > 0 {
            for avg in total.average.values_mut() {
                *avg /= n as f64;
            }
        }
        total
    }

    pub fn count(&self, score: Score) -> usize {
        self.score.get(&score).copied().unwrap_or(0)
    }

    pub fn percent(&self, score: Score) -> f64 {
        self.average.get(&score).copied().unwrap_or(0.0)
    }

    pub fn total_count(&self) -> usize {
        self.score.values().sum()
    }

    /// Percentage of results that are not errors or unsound answers
    pub fn non_error_percent(&self) -> f64 {
        NON_ERROR_SCORES.iter().map(|s| self.percent(*s)).sum()
    }
}

/// Benchmarks worth listing individually in a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDetails {
    pub unsound: BTreeSet<Identifier>,
    pub timeouts: BTreeSet<Identifier>,
    pub unknown: BTreeSet<Identifier>,

    /// Trimmed error comment -> benchmarks that failed with it
    pub errors: BTreeMap<String, BTreeSet<Identifier>>,
}

/// Everything a report needs for one solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub groups: BTreeMap<String, ScoreSummary>,
    pub total: ScoreSummary,
    pub details: ReportDetails,

    /// Results after re-scoring against the current oracle
    #[serde(skip)]
    pub results: BTreeMap<String, GroupResults>,
}

/// Re-score every stored result against `oracle` and summarize
pub fn aggregate(stored: &BTreeMap<String, GroupResults>, oracle: &impl Oracle) -> Aggregate {
    let mut results: BTreeMap<String, GroupResults> = BTreeMap::new();
    let mut details = ReportDetails::default();

    for (group, group_results) in stored {
        let rescored: GroupResults = group_results
            .iter()
            .map(|(id, r)| (id.clone(), rescore(r, group, oracle)))
            .collect();

        for result in rescored.values() {
            let id = result.identifier.clone();
            match result.score {
                Score::Unsound => {
                    details.unsound.insert(id);
                }
                Score::Timeout => {
                    details.timeouts.insert(id);
                }
                Score::Unknown => {
                    details.unknown.insert(id);
                }
                Score::Error => {
                    details
                        .errors
                        .entry(result.comment.trim().to_string())
                        .or_default()
                        .insert(id);
                }
                Score::Solved | Score::Oom => {}
            }
        }
        results.insert(group.clone(), rescored);
    }

    let groups: BTreeMap<String, ScoreSummary> = results
        .iter()
        .map(|(g, r)| (g.clone(), ScoreSummary::of_group(r)))
        .collect();
    let total = ScoreSummary::total(groups.values());

    Aggregate {
        groups,
        total,
        details,
        results,
    }
}

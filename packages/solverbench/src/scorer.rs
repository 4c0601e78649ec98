//! Soundness scoring
//!
//! Reconciles a raw solver status against the trusted verdict for the same
//! benchmark. Only definite answers (`sat`/`unsat`) can be unsound; every
//! other status passes through unchanged.

use crate::executor::ExecutionResult;
use solverbench_storage::{Identifier, OracleBucket, OracleTable, RawStatus, Score, ScoredResult};

/// Source of trusted verdicts
pub trait Oracle {
    /// Bucket recorded for `id` in `group`, `None` when the oracle has no entry
    fn bucket(&self, group: &str, id: &Identifier) -> Option<OracleBucket>;

    /// Definite verdict for `id`, if the oracle asserts one
    fn verdict(&self, group: &str, id: &Identifier) -> Option<RawStatus> {
        self.bucket(group, id).and_then(OracleBucket::verdict)
    }
}

impl Oracle for OracleTable {
    fn bucket(&self, group: &str, id: &Identifier) -> Option<OracleBucket> {
        self.lookup(group, id)
    }
}

/// Score one raw status against an (optional) definite expected verdict
pub fn score_status(raw: RawStatus, expected: Option<RawStatus>) -> (Score, Option<String>) {
    if let Some(score) = Score::passthrough(raw) {
        return (score, None);
    }
    match expected {
        Some(expected) if expected != raw => (
            Score::Unsound,
            Some(format!("result {} is not {}", raw, expected)),
        ),
        _ => (Score::Solved, None),
    }
}

/// Score a fresh execution
///
/// A status the benchmark declares about itself takes precedence over the
/// oracle table; a declared `unknown` asserts no verdict.
pub fn score(execution: &ExecutionResult, oracle: &impl Oracle) -> ScoredResult {
    let descriptor = &execution.descriptor;
    let expected = match descriptor.declared_expected {
        Some(declared) => declared.verdict(),
        None => oracle.verdict(&descriptor.group, &descriptor.identifier),
    };

    let (score, contradiction) = score_status(execution.raw_status, expected);
    ScoredResult {
        identifier: descriptor.identifier.clone(),
        raw_status: execution.raw_status,
        score,
        elapsed_seconds: execution.elapsed_seconds,
        comment: contradiction.unwrap_or_else(|| execution.comment()),
    }
}

/// Re-score a stored result against the current oracle
///
/// When the oracle has no entry at all for the benchmark the stored score is
/// kept, so an unsoundness found at run time (from a declared status) is not
/// lost at aggregation.
pub fn rescore(stored: &ScoredResult, group: &str, oracle: &impl Oracle) -> ScoredResult {
    let bucket = match oracle.bucket(group, &stored.identifier) {
        Some(bucket) => bucket,
        None if Score::passthrough(stored.raw_status).is_some() => {
            return ScoredResult {
                score: score_status(stored.raw_status, None).0,
                ..stored.clone()
            };
        }
        None => return stored.clone(),
    };

    let (score, contradiction) = score_status(stored.raw_status, bucket.verdict());
    let comment = match (contradiction, stored.score) {
        (Some(contradiction), _) => contradiction,
        // a stale contradiction message is dropped once the oracle agrees
        (None, Score::Unsound) => String::new(),
        (None, _) => stored.comment.clone(),
    };
    ScoredResult {
        score,
        comment,
        ..stored.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{BenchmarkDescriptor, BenchmarkFormat, DeclaredStatus};
    use proptest::prelude::*;
    use solverbench_storage::OracleBuckets;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn id(s: &str) -> Identifier {
        Identifier::new(s)
    }

    fn table(bucket: OracleBucket) -> OracleTable {
        let mut buckets = OracleBuckets::new();
        buckets.insert(bucket, id("aa"));
        let mut table = OracleTable::new();
        table.insert_group("G", buckets);
        table
    }

    fn execution(raw: RawStatus, declared: Option<DeclaredStatus>) -> ExecutionResult {
        ExecutionResult {
            descriptor: Arc::new(BenchmarkDescriptor {
                path: PathBuf::from("G/a.smt2"),
                corpus_path: "G/a.smt2".to_string(),
                identifier: id("aa"),
                display_name: "a.smt2".to_string(),
                group: "G".to_string(),
                format: BenchmarkFormat::Smt2,
                logic: None,
                time_limit_secs: 1,
                memory_limit_mb: 100,
                declared_expected: declared,
            }),
            raw_status: raw,
            stdout: String::new(),
            stderr_text: "note".to_string(),
            elapsed_seconds: 0.25,
            diagnostic: None,
        }
    }

    fn stored(raw: RawStatus, score: Score, comment: &str) -> ScoredResult {
        ScoredResult {
            identifier: id("aa"),
            raw_status: raw,
            score,
            elapsed_seconds: 1.0,
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_agreement_is_solved() {
        let result = score(&execution(RawStatus::Sat, None), &table(OracleBucket::Sat));
        assert_eq!(result.score, Score::Solved);
        assert_eq!(result.comment, "note");
        assert_eq!(result.elapsed_seconds, 0.25);
    }

    #[test]
    fn test_contradiction_is_unsound() {
        let result = score(&execution(RawStatus::Sat, None), &table(OracleBucket::Unsat));
        assert_eq!(result.score, Score::Unsound);
        assert_eq!(result.comment, "result sat is not unsat");
    }

    #[test]
    fn test_missing_or_unknown_oracle_trusts_solver() {
        let empty = OracleTable::new();
        assert_eq!(score(&execution(RawStatus::Unsat, None), &empty).score, Score::Solved);
        assert_eq!(
            score(&execution(RawStatus::Unsat, None), &table(OracleBucket::Timeout)).score,
            Score::Solved
        );
    }

    #[test]
    fn test_declared_status_takes_precedence() {
        let oracle = table(OracleBucket::Sat);
        let result = score(&execution(RawStatus::Sat, Some(DeclaredStatus::Unsat)), &oracle);
        assert_eq!(result.score, Score::Unsound);

        let result = score(&execution(RawStatus::Sat, Some(DeclaredStatus::Unknown)), &table(OracleBucket::Unsat));
        assert_eq!(result.score, Score::Solved);
    }

    #[test]
    fn test_rescore_keeps_unsound_without_oracle_entry() {
        let s = stored(RawStatus::Sat, Score::Unsound, "result sat is not unsat");
        assert_eq!(rescore(&s, "G", &OracleTable::new()), s);
    }

    #[test]
    fn test_rescore_follows_current_oracle() {
        let s = stored(RawStatus::Sat, Score::Unsound, "result sat is not unsat");
        let now_agrees = rescore(&s, "G", &table(OracleBucket::Sat));
        assert_eq!(now_agrees.score, Score::Solved);
        assert_eq!(now_agrees.comment, "");

        let s = stored(RawStatus::Unsat, Score::Solved, "");
        let now_disagrees = rescore(&s, "G", &table(OracleBucket::Sat));
        assert_eq!(now_disagrees.score, Score::Unsound);
        assert_eq!(now_disagrees.comment, "result unsat is not sat");
    }

    fn any_raw() -> impl Strategy<Value = RawStatus> {
        prop::sample::select(RawStatus::ALL.to_vec())
    }

    fn any_bucket() -> impl Strategy<Value = Option<OracleBucket>> {
        prop::option::of(prop::sample::select(OracleBucket::ALL.to_vec()))
    }

    proptest! {
        #[test]
        fn prop_non_definite_passes_through(raw in any_raw(), bucket in any_bucket()) {
            prop_assume!(!raw.is_definite());
            let expected = bucket.and_then(OracleBucket::verdict);
            let (score, comment) = score_status(raw, expected);
            prop_assert_eq!(Some(score), Score::passthrough(raw));
            prop_assert!(comment.is_none());
        }

        #[test]
        fn prop_unsound_iff_definite_contradiction(raw in any_raw(), bucket in any_bucket()) {
            let expected = bucket.and_then(OracleBucket::verdict);
            let (score, _) = score_status(raw, expected);
            let contradicts = raw.is_definite() && expected.is_some_and(|e| e != raw);
            prop_assert_eq!(score == Score::Unsound, contradicts);
        }
    }
}

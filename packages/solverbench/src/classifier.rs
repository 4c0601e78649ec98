//! Verdict classification
//!
//! Maps free-form solver stdout onto a `RawStatus`. Only the first
//! significant line is inspected; rules are tried in a fixed order and the
//! first match wins.

use lazy_static::lazy_static;
use regex::Regex;
use solverbench_storage::RawStatus;
use tracing::warn;

lazy_static! {
    static ref UNSAT: Regex = Regex::new(r"(?i)\bunsat(isfiable)?\b").unwrap();
    static ref SAT: Regex = Regex::new(r"(?i)\bsat(isfiable)?\b").unwrap();
    static ref TIMEOUT: Regex = Regex::new(r"(?i)\btime\s*out\b").unwrap();
    static ref UNKNOWN: Regex = Regex::new(r"(?i)\b(unknown|indeterminate)\b").unwrap();
    static ref OOM: Regex =
        Regex::new(r"(?i)\boom\b|out of memory|\bmemout\b|bad_alloc").unwrap();
    static ref ERROR: Regex = Regex::new(r"(?i)error").unwrap();
}

/// Outcome of classifying one solver output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: RawStatus,

    /// Set when the output matched no rule
    pub diagnostic: Option<String>,
}

impl Classification {
    fn of(status: RawStatus) -> Self {
        Self {
            status,
            diagnostic: None,
        }
    }
}

/// Solver-output classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerdictClassifier {
    /// Lines starting with this token are skipped (`c` for DIMACS solvers)
    comment_prefix: Option<&'static str>,
}

impl VerdictClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comment_prefix(prefix: &'static str) -> Self {
        Self {
            comment_prefix: Some(prefix),
        }
    }

    /// First non-empty line that is not a solver comment
    pub fn significant_line<'a>(&self, stdout: &'a str) -> Option<&'a str> {
        stdout.lines().map(str::trim).find(|line| {
            !line.is_empty()
                && !self.comment_prefix.is_some_and(|prefix| {
                    line.split_whitespace().next() == Some(prefix)
                })
        })
    }

    pub fn classify(&self, stdout: &str) -> Classification {
        let line = match self.significant_line(stdout) {
            Some(line) => line,
            None => return Classification::of(RawStatus::Unknown),
        };

        // SMT-LIB error responses may quote arbitrary text, including "sat"
        if !line.starts_with("(error") {
            if UNSAT.is_match(line) {
                return Classification::of(RawStatus::Unsat);
            }
            if SAT.is_match(line) {
                return Classification::of(RawStatus::Sat);
            }
            if TIMEOUT.is_match(line) {
                return Classification::of(RawStatus::Timeout);
            }
            if UNKNOWN.is_match(line) {
                return Classification::of(RawStatus::Unknown);
            }
        }
        if OOM.is_match(line) {
            return Classification::of(RawStatus::Oom);
        }
        if ERROR.is_match(line) {
            return Classification::of(RawStatus::Error);
        }

        warn!("unrecognised solver output: {}", line);
        Classification {
            status: RawStatus::Error,
            diagnostic: Some(format!("unrecognised solver output: {}", line)),
        }
    }
}

/// Classify with the default (SMT-LIB) rules
pub fn classify(stdout: &str) -> RawStatus {
    VerdictClassifier::new().classify(stdout).status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definite_answers() {
        assert_eq!(classify("sat\n"), RawStatus::Sat);
        assert_eq!(classify("unsat\n"), RawStatus::Unsat);
        assert_eq!(classify("UNSAT"), RawStatus::Unsat);
        assert_eq!(classify("s SATISFIABLE\nv 1 -2 0\n"), RawStatus::Sat);
        assert_eq!(classify("s UNSATISFIABLE\n"), RawStatus::Unsat);
    }

    #[test]
    fn test_only_first_line_counts() {
        assert_eq!(classify("unsat\nsat\n"), RawStatus::Unsat);
        assert_eq!(classify("\n\n  sat  \n(:time 0.01)\n"), RawStatus::Sat);
    }

    #[test]
    fn test_non_definite_answers() {
        assert_eq!(classify("timeout\n"), RawStatus::Timeout);
        assert_eq!(classify("unknown\n"), RawStatus::Unknown);
        assert_eq!(classify("s UNKNOWN\n"), RawStatus::Unknown);
        assert_eq!(classify("s INDETERMINATE\n"), RawStatus::Unknown);
        assert_eq!(classify("(error \"out of memory\")\n"), RawStatus::Oom);
        assert_eq!(classify("(error \"line 3: unexpected token\")"), RawStatus::Error);
    }

    #[test]
    fn test_error_mentioning_sat_is_still_error() {
        assert_eq!(
            classify("(error \"line 5 column 10: unknown constant sat\")"),
            RawStatus::Error
        );
    }

    #[test]
    fn test_empty_output_is_unknown() {
        let c = VerdictClassifier::new().classify("");
        assert_eq!(c.status, RawStatus::Unknown);
        assert_eq!(c.diagnostic, None);
        assert_eq!(classify("  \n\n"), RawStatus::Unknown);
    }

    #[test]
    fn test_unrecognised_output_degrades_to_error() {
        let c = VerdictClassifier::new().classify("segmentation fault (core dumped)\n");
        assert_eq!(c.status, RawStatus::Error);
        assert_eq!(
            c.diagnostic.as_deref(),
            Some("unrecognised solver output: segmentation fault (core dumped)")
        );
    }

    #[test]
    fn test_dimacs_comments_are_skipped() {
        let classifier = VerdictClassifier::with_comment_prefix("c");
        let out = "c kissat 3.1.0\nc unsat cores disabled\ns SATISFIABLE\nv 1 0\n";
        assert_eq!(classifier.classify(out).status, RawStatus::Sat);
        assert_eq!(classifier.classify("c only comments\n").status, RawStatus::Unknown);
        // without the prefix the comment line decides
        assert_eq!(classify(out), RawStatus::Error);
    }
}

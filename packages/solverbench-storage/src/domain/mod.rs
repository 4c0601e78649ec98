//! Domain layer for the result store
//!
//! # Domain Models
//!
//! - `Identifier`: content-derived benchmark key, the only cross-run join key
//! - `RawStatus`: what the solver said (or what happened to it)
//! - `Score`: the raw status reconciled against the oracle
//! - `ScoredResult`: the persisted unit, one per (group, solver, identifier)
//! - `OracleBuckets` / `OracleTable`: trusted verdicts per group
//!
//! # Port Trait
//!
//! - `ResultStore`: group-partitioned persistence keyed by (group, solver key)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Identifier
// ═══════════════════════════════════════════════════════════════════════════

/// Stable benchmark identifier (hex digest of the normalized corpus path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Status / Score
// ═══════════════════════════════════════════════════════════════════════════

/// Solver outcome before oracle reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawStatus {
    Sat,
    Unsat,
    Unknown,
    Timeout,
    Oom,
    Error,
}

impl RawStatus {
    pub const ALL: [RawStatus; 6] = [
        RawStatus::Sat,
        RawStatus::Unsat,
        RawStatus::Unknown,
        RawStatus::Timeout,
        RawStatus::Oom,
        RawStatus::Error,
    ];

    /// Single-character on-disk code
    pub fn code(self) -> char {
        match self {
            RawStatus::Sat => 's',
            RawStatus::Unsat => 'u',
            RawStatus::Unknown => '?',
            RawStatus::Timeout => 't',
            RawStatus::Oom => 'o',
            RawStatus::Error => 'e',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RawStatus::Sat => "sat",
            RawStatus::Unsat => "unsat",
            RawStatus::Unknown => "unknown",
            RawStatus::Timeout => "timeout",
            RawStatus::Oom => "oom",
            RawStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// `sat` or `unsat`
    pub fn is_definite(self) -> bool {
        matches!(self, RawStatus::Sat | RawStatus::Unsat)
    }
}

impl fmt::Display for RawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome after reconciling a raw status against the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Score {
    Solved,
    Unknown,
    Timeout,
    Oom,
    Error,
    Unsound,
}

impl Score {
    /// Report column order
    pub const ALL: [Score; 6] = [
        Score::Solved,
        Score::Unknown,
        Score::Timeout,
        Score::Oom,
        Score::Error,
        Score::Unsound,
    ];

    pub fn code(self) -> char {
        match self {
            Score::Solved => 's',
            Score::Unknown => '?',
            Score::Timeout => 't',
            Score::Oom => 'o',
            Score::Error => 'e',
            Score::Unsound => 'u',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Score::Solved => "solved",
            Score::Unknown => "unknown",
            Score::Timeout => "timeout",
            Score::Oom => "oom",
            Score::Error => "error",
            Score::Unsound => "unsound",
        }
    }

    /// Pass-through score for a non-definite raw status
    ///
    /// Returns `None` for `sat`/`unsat`, which need an oracle to be scored.
    pub fn passthrough(status: RawStatus) -> Option<Self> {
        match status {
            RawStatus::Sat | RawStatus::Unsat => None,
            RawStatus::Unknown => Some(Score::Unknown),
            RawStatus::Timeout => Some(Score::Timeout),
            RawStatus::Oom => Some(Score::Oom),
            RawStatus::Error => Some(Score::Error),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Score::ALL
            .into_iter()
            .find(|score| score.as_str() == s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown score '{}'", s)))
    }
}

impl Serialize for RawStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RawStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RawStatus::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown status '{}'", s)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ScoredResult
// ═══════════════════════════════════════════════════════════════════════════

/// One scored benchmark run (the persisted unit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub identifier: Identifier,
    pub raw_status: RawStatus,
    pub score: Score,
    pub elapsed_seconds: f64,
    pub comment: String,
}

/// Results of one (group, solver) pair, keyed by identifier
pub type GroupResults = BTreeMap<Identifier, ScoredResult>;

// ═══════════════════════════════════════════════════════════════════════════
// Oracle
// ═══════════════════════════════════════════════════════════════════════════

/// Oracle verdict bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OracleBucket {
    Sat,
    Unsat,
    Unknown,
    Timeout,
    Oom,
}

impl OracleBucket {
    pub const ALL: [OracleBucket; 5] = [
        OracleBucket::Sat,
        OracleBucket::Unsat,
        OracleBucket::Unknown,
        OracleBucket::Timeout,
        OracleBucket::Oom,
    ];

    /// Bucket a raw status observed during a ground-truth run
    ///
    /// `error` has no bucket of its own and is recorded as `unknown`.
    pub fn from_raw(status: RawStatus) -> Self {
        match status {
            RawStatus::Sat => OracleBucket::Sat,
            RawStatus::Unsat => OracleBucket::Unsat,
            RawStatus::Unknown | RawStatus::Error => OracleBucket::Unknown,
            RawStatus::Timeout => OracleBucket::Timeout,
            RawStatus::Oom => OracleBucket::Oom,
        }
    }

    /// The definite verdict this bucket asserts, if any
    pub fn verdict(self) -> Option<RawStatus> {
        match self {
            OracleBucket::Sat => Some(RawStatus::Sat),
            OracleBucket::Unsat => Some(RawStatus::Unsat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OracleBucket::Sat => "sat",
            OracleBucket::Unsat => "unsat",
            OracleBucket::Unknown => "unknown",
            OracleBucket::Timeout => "timeout",
            OracleBucket::Oom => "oom",
        }
    }
}

/// Per-group oracle contribution, partitioned by verdict bucket
///
/// Each identifier lives in at most one bucket. Buckets are sorted sets so
/// the serialized file diffs cleanly across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleBuckets {
    sat: BTreeSet<Identifier>,
    unsat: BTreeSet<Identifier>,
    unknown: BTreeSet<Identifier>,
    timeout: BTreeSet<Identifier>,
    oom: BTreeSet<Identifier>,
}

impl OracleBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, bucket: OracleBucket) -> &BTreeSet<Identifier> {
        match bucket {
            OracleBucket::Sat => &self.sat,
            OracleBucket::Unsat => &self.unsat,
            OracleBucket::Unknown => &self.unknown,
            OracleBucket::Timeout => &self.timeout,
            OracleBucket::Oom => &self.oom,
        }
    }

    fn bucket_mut(&mut self, bucket: OracleBucket) -> &mut BTreeSet<Identifier> {
        match bucket {
            OracleBucket::Sat => &mut self.sat,
            OracleBucket::Unsat => &mut self.unsat,
            OracleBucket::Unknown => &mut self.unknown,
            OracleBucket::Timeout => &mut self.timeout,
            OracleBucket::Oom => &mut self.oom,
        }
    }

    /// Place `id` in `bucket`, removing it from any other bucket
    pub fn insert(&mut self, bucket: OracleBucket, id: Identifier) {
        for other in OracleBucket::ALL {
            if other != bucket {
                self.bucket_mut(other).remove(&id);
            }
        }
        self.bucket_mut(bucket).insert(id);
    }

    pub fn lookup(&self, id: &Identifier) -> Option<OracleBucket> {
        OracleBucket::ALL
            .into_iter()
            .find(|b| self.bucket(*b).contains(id))
    }

    pub fn len(&self) -> usize {
        OracleBucket::ALL.iter().map(|b| self.bucket(*b).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the one-bucket-per-identifier invariant
    pub fn validate(&self) -> Result<()> {
        let mut seen: BTreeMap<&Identifier, OracleBucket> = BTreeMap::new();
        for bucket in OracleBucket::ALL {
            for id in self.bucket(bucket) {
                if let Some(previous) = seen.insert(id, bucket) {
                    return Err(StorageError::corrupt(format!(
                        "identifier {} is in both '{}' and '{}' oracle buckets",
                        id,
                        previous.as_str(),
                        bucket.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Oracle for all groups: group -> buckets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleTable {
    groups: BTreeMap<String, OracleBuckets>,
}

impl OracleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_group(&mut self, group: impl Into<String>, buckets: OracleBuckets) {
        self.groups.insert(group.into(), buckets);
    }

    pub fn group(&self, group: &str) -> Option<&OracleBuckets> {
        self.groups.get(group)
    }

    pub fn lookup(&self, group: &str, id: &Identifier) -> Option<OracleBucket> {
        self.groups.get(group).and_then(|b| b.lookup(id))
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &OracleBuckets)> {
        self.groups.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(OracleBuckets::is_empty)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Port
// ═══════════════════════════════════════════════════════════════════════════

/// Group-partitioned result persistence
///
/// A missing file is never an error: `load_group` returns an empty mapping and
/// `load_oracle_buckets` returns empty buckets. A file that exists but cannot
/// be decoded, or that breaks an invariant, is an error.
pub trait ResultStore: Send + Sync {
    /// Load one (group, solver) result file
    fn load_group(&self, group: &str, solver_key: &str) -> Result<GroupResults>;

    /// Replace one (group, solver) result file wholesale
    fn save_group(&self, group: &str, solver_key: &str, results: &GroupResults) -> Result<()>;

    /// Whether a result file exists for (group, solver)
    fn has_results(&self, group: &str, solver_key: &str) -> bool;

    /// All groups known to the store, sorted
    fn groups(&self) -> Result<Vec<String>>;

    fn load_oracle_buckets(&self, group: &str) -> Result<OracleBuckets>;

    fn save_oracle_buckets(&self, group: &str, buckets: &OracleBuckets) -> Result<()>;

    /// Assemble the oracle table from every group's buckets
    fn load_oracle(&self) -> Result<OracleTable> {
        let mut table = OracleTable::new();
        for group in self.groups()? {
            let buckets = self.load_oracle_buckets(&group)?;
            table.insert_group(group, buckets);
        }
        Ok(table)
    }

    /// Load every group this solver has results for
    fn load_all(&self, solver_key: &str) -> Result<BTreeMap<String, GroupResults>> {
        let mut all = BTreeMap::new();
        for group in self.groups()? {
            if self.has_results(&group, solver_key) {
                let results = self.load_group(&group, solver_key)?;
                all.insert(group, results);
            }
        }
        Ok(all)
    }
}

/// Reject group names and solver keys that would escape the store root
pub fn validate_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(StorageError::config(format!(
            "invalid {} '{}': must be a single path segment",
            kind, value
        )));
    }
    Ok(())
}

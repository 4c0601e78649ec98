//! JSON file adapter for `ResultStore`
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<group>/data_<solver_key>.json   identifier -> {status, score, time, comment}
//! <root>/<group>/benchmarks.json          {sat, unsat, unknown, timeout, oom} -> [identifier]
//! ```
//!
//! Files are written to a temporary sibling and renamed over the target, so a
//! crash mid-write leaves the previous file intact.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    validate_segment, GroupResults, Identifier, OracleBuckets, RawStatus, ResultStore, Score,
    ScoredResult,
};
use crate::{Result, StorageError};

/// Current result file schema
pub const SCHEMA_VERSION: u32 = 1;

const ORACLE_FILE: &str = "benchmarks.json";

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResultFile {
    schema_version: u32,
    results: BTreeMap<Identifier, StoredRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredRecord {
    #[serde(with = "status_code")]
    status: RawStatus,
    #[serde(with = "score_code")]
    score: Score,
    time: f64,
    comment: String,
}

impl StoredRecord {
    fn from_result(result: &ScoredResult) -> Self {
        Self {
            status: result.raw_status,
            score: result.score,
            time: result.elapsed_seconds,
            comment: result.comment.clone(),
        }
    }

    fn into_result(self, identifier: Identifier) -> ScoredResult {
        ScoredResult {
            identifier,
            raw_status: self.status,
            score: self.score,
            elapsed_seconds: self.time,
            comment: self.comment,
        }
    }
}

/// File-backed result store
#[derive(Debug, Clone)]
pub struct JsonResultStore {
    /// Storage directory
    pub root_dir: PathBuf,
}

impl JsonResultStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.root_dir.join(group)
    }

    pub fn results_path(&self, group: &str, solver_key: &str) -> PathBuf {
        self.group_dir(group).join(format!("data_{}.json", solver_key))
    }

    pub fn oracle_path(&self, group: &str) -> PathBuf {
        self.group_dir(group).join(ORACLE_FILE)
    }

    fn read_optional(path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_atomic(path: &Path, content: &str) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| StorageError::config(format!("no parent directory for {:?}", path)))?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StorageError::from(e.error))?;

        debug!("wrote {:?} ({} bytes)", path, content.len());
        Ok(())
    }

    fn corrupt(path: &Path, err: serde_json::Error) -> StorageError {
        StorageError::corrupt(format!("cannot decode {:?}: {}", path, err)).with_source(err)
    }
}

impl ResultStore for JsonResultStore {
    fn load_group(&self, group: &str, solver_key: &str) -> Result<GroupResults> {
        validate_segment("group", group)?;
        validate_segment("solver key", solver_key)?;

        let path = self.results_path(group, solver_key);
        let Some(content) = Self::read_optional(&path)? else {
            return Ok(GroupResults::new());
        };

        let file: ResultFile =
            serde_json::from_str(&content).map_err(|e| Self::corrupt(&path, e))?;
        if file.schema_version != SCHEMA_VERSION {
            return Err(StorageError::corrupt(format!(
                "{:?} has schema version {}, expected {}",
                path, file.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(file
            .results
            .into_iter()
            .map(|(id, record)| (id.clone(), record.into_result(id)))
            .collect())
    }

    fn save_group(&self, group: &str, solver_key: &str, results: &GroupResults) -> Result<()> {
        validate_segment("group", group)?;
        validate_segment("solver key", solver_key)?;

        let file = ResultFile {
            schema_version: SCHEMA_VERSION,
            results: results
                .iter()
                .map(|(id, r)| (id.clone(), StoredRecord::from_result(r)))
                .collect(),
        };
        let mut content = serde_json::to_string_pretty(&file)?;
        content.push('\n');
        Self::write_atomic(&self.results_path(group, solver_key), &content)
    }

    fn has_results(&self, group: &str, solver_key: &str) -> bool {
        self.results_path(group, solver_key).is_file()
    }

    fn groups(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut groups = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                groups.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        groups.sort();
        Ok(groups)
    }

    fn load_oracle_buckets(&self, group: &str) -> Result<OracleBuckets> {
        validate_segment("group", group)?;

        let path = self.oracle_path(group);
        let Some(content) = Self::read_optional(&path)? else {
            return Ok(OracleBuckets::new());
        };
        let buckets: OracleBuckets =
            serde_json::from_str(&content).map_err(|e| Self::corrupt(&path, e))?;
        buckets.validate()?;
        Ok(buckets)
    }

    fn save_oracle_buckets(&self, group: &str, buckets: &OracleBuckets) -> Result<()> {
        validate_segment("group", group)?;
        buckets.validate()?;

        let mut content = serde_json::to_string_pretty(buckets)?;
        content.push('\n');
        Self::write_atomic(&self.oracle_path(group), &content)
    }
}

mod status_code {
    use crate::domain::RawStatus;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &RawStatus, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(status.code().encode_utf8(&mut [0; 4]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RawStatus, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => RawStatus::from_code(c),
            _ => None,
        }
        .ok_or_else(|| serde::de::Error::custom(format!("invalid status code '{}'", s)))
    }
}

mod score_code {
    use crate::domain::Score;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(score: &Score, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(score.code().encode_utf8(&mut [0; 4]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Score, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Score::from_code(c),
            _ => None,
        }
        .ok_or_else(|| serde::de::Error::custom(format!("invalid score code '{}'", s)))
    }
}

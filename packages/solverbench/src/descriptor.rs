//! Benchmark descriptors and corpus discovery

use crate::identifier::{corpus_path, identify};
use crate::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use solverbench_storage::{Identifier, RawStatus};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Name of the per-directory time limit override marker
pub const TIMEOUT_MARKER: &str = "TIMEOUT";

/// Benchmark file format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BenchmarkFormat {
    Smt2,
    Cnf,
}

impl BenchmarkFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "smt2" => Some(BenchmarkFormat::Smt2),
            "cnf" => Some(BenchmarkFormat::Cnf),
            _ => None,
        }
    }
}

/// Status a benchmark declares about itself
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredStatus {
    Sat,
    Unsat,
    Unknown,
}

impl DeclaredStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sat" => Some(DeclaredStatus::Sat),
            "unsat" => Some(DeclaredStatus::Unsat),
            "unknown" => Some(DeclaredStatus::Unknown),
            _ => None,
        }
    }

    /// The definite verdict claimed, if any
    pub fn verdict(self) -> Option<RawStatus> {
        match self {
            DeclaredStatus::Sat => Some(RawStatus::Sat),
            DeclaredStatus::Unsat => Some(RawStatus::Unsat),
            DeclaredStatus::Unknown => None,
        }
    }
}

/// One problem instance (immutable after discovery)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkDescriptor {
    /// Path used to invoke the solver
    pub path: PathBuf,

    /// Normalized corpus-relative path the identifier is derived from
    pub corpus_path: String,

    pub identifier: Identifier,

    /// Display name (basename, hash prefix stripped)
    pub display_name: String,

    /// Top-level directory below the suite root
    pub group: String,

    pub format: BenchmarkFormat,

    /// `(set-logic ...)` of SMT-LIB instances
    pub logic: Option<String>,

    pub time_limit_secs: u64,
    pub memory_limit_mb: u64,

    pub declared_expected: Option<DeclaredStatus>,
}

/// Limits applied during discovery
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub default_time_limit_secs: u64,
    pub default_memory_limit_mb: u64,

    /// Global time limit; bypasses TIMEOUT markers when set
    pub time_limit_override: Option<u64>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            default_time_limit_secs: 1,
            default_memory_limit_mb: 2000,
            time_limit_override: None,
        }
    }
}

/// Discover every `.smt2`/`.cnf` benchmark below `root`, sorted by path
pub fn discover(root: &Path, opts: &DiscoveryOptions) -> BenchResult<Vec<BenchmarkDescriptor>> {
    if !root.is_dir() {
        return Err(BenchError::InvalidCorpus(format!(
            "Suite root is not a directory: {:?}",
            root
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| BenchError::InvalidCorpus(format!("Walk error: {}", e)))?;
        if entry.file_type().is_file() && BenchmarkFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }

    let mut timeout_cache: HashMap<PathBuf, Option<u64>> = HashMap::new();
    let mut descriptors = Vec::with_capacity(files.len());
    for file in files {
        let time_limit_secs = match opts.time_limit_override {
            Some(limit) => limit,
            None => {
                let dir = file.parent().unwrap_or(root).to_path_buf();
                let found = match timeout_cache.get(&dir) {
                    Some(found) => *found,
                    None => {
                        let found = find_timeout_override(&dir, root)?;
                        timeout_cache.insert(dir, found);
                        found
                    }
                };
                found.unwrap_or(opts.default_time_limit_secs)
            }
        };
        descriptors.push(BenchmarkDescriptor::load(
            root,
            &file,
            time_limit_secs,
            opts.default_memory_limit_mb,
        )?);
    }

    debug!("discovered {} benchmarks under {:?}", descriptors.len(), root);
    Ok(descriptors)
}

impl BenchmarkDescriptor {
    /// Build a descriptor for `file` under suite `root`, reading its metadata
    pub fn load(
        root: &Path,
        file: &Path,
        time_limit_secs: u64,
        memory_limit_mb: u64,
    ) -> BenchResult<Self> {
        let format = BenchmarkFormat::from_path(file).ok_or_else(|| {
            BenchError::InvalidCorpus(format!("Not a benchmark file: {:?}", file))
        })?;

        let (declared_expected, logic) = match format {
            BenchmarkFormat::Smt2 => {
                let scanned = File::open(file)
                    .map_err(BenchError::from)
                    .and_then(|f| scan_smt2_header(BufReader::new(f), file));
                match scanned {
                    Ok(header) => header,
                    Err(e) => {
                        // the solver reports the same problem when it runs
                        warn!("{:?}: cannot read header, no declared status: {}", file, e);
                        (None, None)
                    }
                }
            }
            BenchmarkFormat::Cnf => (None, None),
        };

        let corpus_path = corpus_path(root, file);
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            path: file.to_path_buf(),
            identifier: identify(Path::new(&corpus_path)),
            corpus_path,
            display_name: display_name(&file_name),
            group: group_of(root, file),
            format,
            logic,
            time_limit_secs,
            memory_limit_mb,
            declared_expected,
        })
    }
}

/// Group of `file`: first path segment below `root`
///
/// Files sitting directly in the root belong to a group named after the root.
pub fn group_of(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().to_string(),
        _ => {
            let normalized = crate::identifier::normalize(root);
            match normalized.rsplit('/').next() {
                Some(last) if !last.is_empty() && last != "." && last != ".." => last.to_string(),
                _ => "default".to_string(),
            }
        }
    }
}

/// Strip a leading 32-hex-digit hash prefix (`<md5>-name.cnf` corpora)
pub fn display_name(file_name: &str) -> String {
    let bytes = file_name.as_bytes();
    if bytes.len() > 33 && bytes[32] == b'-' && bytes[..32].iter().all(u8::is_ascii_hexdigit) {
        file_name[33..].to_string()
    } else {
        file_name.to_string()
    }
}

/// Nearest TIMEOUT marker from `dir` up to and including `root`
pub fn find_timeout_override(dir: &Path, root: &Path) -> BenchResult<Option<u64>> {
    let mut current = Some(dir);
    while let Some(d) = current {
        let marker = d.join(TIMEOUT_MARKER);
        if marker.is_file() {
            let content = std::fs::read_to_string(&marker)?;
            return match content.trim().parse::<u64>() {
                Ok(limit) if limit > 0 => Ok(Some(limit)),
                _ => Err(BenchError::InvalidTimeoutOverride {
                    path: marker,
                    content: content.trim().to_string(),
                }),
            };
        }
        if d == root || !d.starts_with(root) {
            break;
        }
        current = d.parent();
    }
    Ok(None)
}

/// Extract `(set-info :status ...)` and `(set-logic ...)` from an SMT-LIB file
///
/// `;` starts a comment except inside `|quoted symbols|`. Lines are decoded
/// lossily: corpora carry Latin-1 author names in comments.
pub fn scan_smt2_header<R: BufRead>(
    mut reader: R,
    origin: &Path,
) -> BenchResult<(Option<DeclaredStatus>, Option<String>)> {
    let mut status = None;
    let mut logic = None;
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = strip_comment(&String::from_utf8_lossy(&raw));

        if line.contains("set-info") && line.contains(":status") {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 3 && tokens[0] == "(set-info" && tokens[1] == ":status" {
                let value = tokens[2].trim_end_matches(')');
                match DeclaredStatus::parse(value) {
                    Some(s) => status = Some(s),
                    None => warn!("{:?}: ignoring unrecognised :status '{}'", origin, value),
                }
            }
        } else if line.contains("(set-logic") {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 2 && tokens[0] == "(set-logic" {
                logic = Some(tokens[1].trim_end_matches(')').to_string());
            }
        }

        if status.is_some() && logic.is_some() {
            break;
        }
    }

    Ok((status, logic))
}

fn strip_comment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_symbol = false;
    for c in raw.chars() {
        match c {
            '|' => in_symbol = !in_symbol,
            ';' if !in_symbol => break,
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Identifier -> corpus path, for readable reports
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    names: BTreeMap<Identifier, String>,
}

impl NameIndex {
    pub fn from_descriptors<'a>(descriptors: impl IntoIterator<Item = &'a BenchmarkDescriptor>) -> Self {
        Self {
            names: descriptors
                .into_iter()
                .map(|d| (d.identifier.clone(), d.corpus_path.clone()))
                .collect(),
        }
    }

    pub fn extend<'a>(&mut self, descriptors: impl IntoIterator<Item = &'a BenchmarkDescriptor>) {
        for d in descriptors {
            self.names.insert(d.identifier.clone(), d.corpus_path.clone());
        }
    }

    /// Readable name, or `sha<identifier>` for benchmarks not on disk
    pub fn name(&self, id: &Identifier) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("sha<{}>", id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

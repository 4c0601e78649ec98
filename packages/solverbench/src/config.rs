//! Harness configuration
//!
//! Loaded from a versioned YAML file, adjusted by CLI flags, or built
//! programmatically with the fluent setters.

use crate::descriptor::DiscoveryOptions;
use crate::solver::SolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Supported configuration schema versions
pub const SUPPORTED_VERSIONS: [u32; 1] = [1];

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing version field in YAML
    #[error("Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    /// Unsupported version
    #[error("Unsupported configuration version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    /// Unknown solver kind
    #[error("Unknown solver '{0}'. Valid solvers: z3, cvc5, kissat, cadical")]
    UnknownSolver(String),

    /// Range validation error
    #[error("Invalid range for field '{field}': {value} not in {min}..={max}. {hint}")]
    Range {
        field: String,
        value: String,
        min: String,
        max: String,
        hint: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Complete harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Schema version (always 1)
    pub version: u32,

    /// Result store root (default: "results")
    pub results_dir: PathBuf,

    /// Corpus roots
    pub suites: Vec<PathBuf>,

    /// Per-benchmark time limit when no TIMEOUT marker applies (default: 1)
    pub default_time_limit_secs: u64,

    /// Per-benchmark memory ceiling (default: 2000)
    pub default_memory_limit_mb: u64,

    /// Extra wall-clock time granted before the watchdog kills a solver
    pub watchdog_grace_ms: u64,

    /// Run benchmarks on a worker pool (default: false)
    pub parallel: bool,

    /// Worker pool size (default: number of CPUs)
    pub workers: usize,

    /// Benchmarks handed to a worker at a time (default: 5)
    pub batch_size: usize,

    pub solvers: Vec<SolverConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            version: 1,
            results_dir: PathBuf::from("results"),
            suites: Vec::new(),
            default_time_limit_secs: 1,
            default_memory_limit_mb: 2000,
            watchdog_grace_ms: 1000,
            parallel: false,
            workers: num_cpus::get(),
            batch_size: 5,
            solvers: Vec::new(),
        }
    }
}

/// Version probe, parsed before the full document
#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u32>,
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a YAML configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let probe: VersionProbe = serde_yaml::from_str(content)?;
        match probe.version {
            None => return Err(ConfigError::MissingVersion),
            Some(v) if !SUPPORTED_VERSIONS.contains(&v) => {
                return Err(ConfigError::UnsupportedVersion {
                    found: v,
                    supported: SUPPORTED_VERSIONS.to_vec(),
                })
            }
            Some(_) => {}
        }

        let config: HarnessConfig = serde_yaml::from_str(content).map_err(|e| {
            match unknown_solver(&e) {
                Some(name) => ConfigError::UnknownSolver(name),
                None => ConfigError::Yaml(e),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check numeric ranges
    pub fn validate(&self) -> ConfigResult<()> {
        check_min("default_time_limit_secs", self.default_time_limit_secs, 1)?;
        check_min("default_memory_limit_mb", self.default_memory_limit_mb, 1)?;
        check_min("workers", self.workers as u64, 1)?;
        check_min("batch_size", self.batch_size as u64, 1)?;
        Ok(())
    }

    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn time_limit(mut self, secs: u64) -> Self {
        self.default_time_limit_secs = secs;
        self
    }

    pub fn memory_limit(mut self, mb: u64) -> Self {
        self.default_memory_limit_mb = mb;
        self
    }

    pub fn watchdog_grace(mut self, grace: Duration) -> Self {
        self.watchdog_grace_ms = grace.as_millis() as u64;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_suite(mut self, root: impl Into<PathBuf>) -> Self {
        self.suites.push(root.into());
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solvers.push(solver);
        self
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.watchdog_grace_ms)
    }

    /// Discovery limits, with an optional global time limit
    pub fn discovery_options(&self, time_limit_override: Option<u64>) -> DiscoveryOptions {
        DiscoveryOptions {
            default_time_limit_secs: self.default_time_limit_secs,
            default_memory_limit_mb: self.default_memory_limit_mb,
            time_limit_override,
        }
    }
}

fn check_min(field: &str, value: u64, min: u64) -> ConfigResult<()> {
    if value < min {
        return Err(ConfigError::Range {
            field: field.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: u64::MAX.to_string(),
            hint: format!("'{}' must be at least {}.", field, min),
        });
    }
    Ok(())
}

/// Extract the offending name from serde's "unknown variant" message
///
/// `SolverKind` is the only enum in the schema.
fn unknown_solver(e: &serde_yaml::Error) -> Option<String> {
    let msg = e.to_string();
    let rest = msg.split_once("unknown variant `")?.1;
    Some(rest.split_once('`')?.0.to_string())
}

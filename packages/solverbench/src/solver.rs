//! Solver registry
//!
//! Each supported solver is one `SolverKind` variant carrying its command
//! template. Adding a solver means adding a variant and its match arms.

use crate::classifier::VerdictClassifier;
use crate::descriptor::{BenchmarkDescriptor, BenchmarkFormat};
use crate::BenchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Supported solver families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Z3,
    Cvc5,
    Kissat,
    Cadical,
}

/// How a memory ceiling is enforced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryLimit {
    /// The solver takes the limit as a flag
    Flag(String),
    /// Enforced around the solver with `ulimit -v` (KiB)
    External(u64),
}

impl SolverKind {
    pub const ALL: [SolverKind; 4] = [
        SolverKind::Z3,
        SolverKind::Cvc5,
        SolverKind::Kissat,
        SolverKind::Cadical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SolverKind::Z3 => "z3",
            SolverKind::Cvc5 => "cvc5",
            SolverKind::Kissat => "kissat",
            SolverKind::Cadical => "cadical",
        }
    }

    /// Binary name looked up on PATH when none is configured
    pub fn default_binary(self) -> &'static str {
        self.as_str()
    }

    /// Flags always passed before the limits
    fn base_flags(self) -> &'static [&'static str] {
        match self {
            SolverKind::Z3 => &["-st"],
            SolverKind::Cvc5 => &["--quiet"],
            SolverKind::Kissat => &["-q"],
            SolverKind::Cadical => &["-q"],
        }
    }

    fn time_flag(self, secs: u64) -> String {
        match self {
            SolverKind::Z3 => format!("-T:{}", secs),
            SolverKind::Cvc5 => format!("--tlimit={}", secs * 1000),
            SolverKind::Kissat => format!("--time={}", secs),
            SolverKind::Cadical => format!("-t{}", secs),
        }
    }

    pub fn memory_limit(self, mb: u64) -> MemoryLimit {
        match self {
            SolverKind::Z3 => MemoryLimit::Flag(format!("-memory:{}", mb)),
            SolverKind::Cvc5 | SolverKind::Kissat | SolverKind::Cadical => {
                MemoryLimit::External(mb * 1024)
            }
        }
    }

    /// Whether the solver reliably stops itself at its time flag
    ///
    /// Solvers that do get the watchdog grace period on top of the limit;
    /// the others are killed exactly at the limit.
    pub fn honors_time_limit(self) -> bool {
        matches!(self, SolverKind::Z3 | SolverKind::Kissat | SolverKind::Cadical)
    }

    /// Input formats the solver reads (z3 also takes DIMACS)
    pub fn accepts(self, format: BenchmarkFormat) -> bool {
        match self {
            SolverKind::Z3 => true,
            SolverKind::Cvc5 => format == BenchmarkFormat::Smt2,
            SolverKind::Kissat | SolverKind::Cadical => format == BenchmarkFormat::Cnf,
        }
    }

    pub fn classifier(self) -> VerdictClassifier {
        match self {
            SolverKind::Z3 | SolverKind::Cvc5 => VerdictClassifier::new(),
            SolverKind::Kissat | SolverKind::Cadical => VerdictClassifier::with_comment_prefix("c"),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| BenchError::UnknownSolver(s.to_string()))
    }
}

/// A solver configuration: kind + binary + extra flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    pub kind: SolverKind,
    pub binary: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl SolverConfig {
    pub fn new(kind: SolverKind) -> Self {
        Self {
            kind,
            binary: kind.default_binary().to_string(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Storage key: `<kind>_<binary>` with path characters flattened
    pub fn key(&self) -> String {
        let binary: String = self
            .binary
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}_{}", self.kind, binary.trim_start_matches('_'))
    }

    /// Build the command for one benchmark
    pub fn command(&self, descriptor: &BenchmarkDescriptor, grace: Duration) -> SolverCommand {
        let kind = self.kind;
        let mut solver_args: Vec<String> = kind.base_flags().iter().map(|s| s.to_string()).collect();
        solver_args.extend(self.extra_args.iter().cloned());
        solver_args.push(kind.time_flag(descriptor.time_limit_secs));

        let limit = Duration::from_secs(descriptor.time_limit_secs);
        let deadline = if kind.honors_time_limit() {
            limit + grace
        } else {
            limit
        };

        let (program, args) = match kind.memory_limit(descriptor.memory_limit_mb) {
            MemoryLimit::Flag(flag) => {
                solver_args.push(flag);
                solver_args.push(descriptor.path.to_string_lossy().to_string());
                (self.binary.clone(), solver_args)
            }
            MemoryLimit::External(kib) => {
                solver_args.push(descriptor.path.to_string_lossy().to_string());
                wrap_with_ulimit(&self.binary, solver_args, kib)
            }
        };

        SolverCommand {
            program,
            args,
            deadline,
            classifier: kind.classifier(),
        }
    }
}

impl fmt::Display for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.binary)
    }
}

/// `kind` or `kind:binary`
impl FromStr for SolverConfig {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((kind, binary)) if !binary.is_empty() => {
                Ok(SolverConfig::new(kind.parse()?).with_binary(binary))
            }
            _ => Ok(SolverConfig::new(s.trim_end_matches(':').parse()?)),
        }
    }
}

#[cfg(unix)]
fn wrap_with_ulimit(binary: &str, args: Vec<String>, kib: u64) -> (String, Vec<String>) {
    let mut wrapped = vec![
        "-c".to_string(),
        r#"ulimit -v "$1" && shift && exec "$@""#.to_string(),
        "solverbench".to_string(),
        kib.to_string(),
        binary.to_string(),
    ];
    wrapped.extend(args);
    ("sh".to_string(), wrapped)
}

#[cfg(not(unix))]
fn wrap_with_ulimit(binary: &str, args: Vec<String>, _kib: u64) -> (String, Vec<String>) {
    (binary.to_string(), args)
}

/// A fully resolved invocation
#[derive(Debug, Clone)]
pub struct SolverCommand {
    pub program: String,
    pub args: Vec<String>,

    /// Wall-clock watchdog deadline
    pub deadline: Duration,

    pub classifier: VerdictClassifier,
}

impl SolverCommand {
    /// Ad-hoc command, mainly for tests and custom wrappers
    pub fn new(program: impl Into<String>, args: Vec<String>, deadline: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            deadline,
            classifier: VerdictClassifier::new(),
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

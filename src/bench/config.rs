//! Configuration types for benchmark sweeps

use crate::bias::BiasLevel;
use crate::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Disjunction strategy handed to the engine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisjStrategy {
    /// Let the engine pick the disjunction sizes
    #[default]
    Auto,
    /// A strategy the engine knows by name
    Named(String),
}

impl fmt::Display for DisjStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisjStrategy::Auto => write!(f, "auto"),
            DisjStrategy::Named(name) => write!(f, "{}", name),
        }
    }
}

impl std::str::FromStr for DisjStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("Empty disjunction strategy".to_string()),
            "auto" => Ok(DisjStrategy::Auto),
            name => Ok(DisjStrategy::Named(name.to_string())),
        }
    }
}

/// Flags passed to every engine invocation of a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFlags {
    pub disj: DisjStrategy,
    /// Timeout of each membership query, in seconds
    pub emulto: u64,
    /// Use the query generation strategy
    pub strat: bool,
    /// Use background knowledge
    pub back: bool,
    /// Passive learning instead of active queries
    pub passive: bool,
    /// Global engine timeout, in seconds
    pub timeout: Option<u64>,
    pub bias_level: BiasLevel,
    /// Restrict the catalogue to the IJCAI'22 set
    pub ijcai22: bool,
}

impl Default for EngineFlags {
    fn default() -> Self {
        Self {
            disj: DisjStrategy::Auto,
            emulto: 10,
            strat: false,
            back: false,
            passive: false,
            timeout: None,
            bias_level: BiasLevel::Max,
            ijcai22: false,
        }
    }
}

impl EngineFlags {
    pub fn with_disj(mut self, disj: DisjStrategy) -> Self {
        self.disj = disj;
        self
    }

    pub fn with_emulto(mut self, secs: u64) -> Self {
        self.emulto = secs;
        self
    }

    pub fn with_strat(mut self, strat: bool) -> Self {
        self.strat = strat;
        self
    }

    pub fn with_back(mut self, back: bool) -> Self {
        self.back = back;
        self
    }

    pub fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    pub fn with_timeout_option(mut self, secs: Option<u64>) -> Self {
        self.timeout = secs;
        self
    }

    pub fn with_bias_level(mut self, level: BiasLevel) -> Self {
        self.bias_level = level;
        self
    }

    pub fn with_ijcai22(mut self, ijcai22: bool) -> Self {
        self.ijcai22 = ijcai22;
        self
    }

    /// Global timeout as a duration
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Command line for one engine invocation on `conffile`
    pub fn to_args(&self, conffile: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-file".into(),
            conffile.as_os_str().to_os_string(),
            "-disj".into(),
            self.disj.to_string().into(),
            "-emulto".into(),
            self.emulto.to_string().into(),
        ];
        if self.strat {
            args.push("-strat".into());
        }
        if self.back {
            args.push("-back".into());
        }
        if self.passive {
            args.push("-passive".into());
        }
        if let Some(timeout) = self.timeout {
            args.push("-timeout".into());
            args.push(timeout.to_string().into());
        }
        args.push("-biaslvl".into());
        args.push(self.bias_level.to_string().into());
        if self.ijcai22 {
            args.push("-ijcai22".into());
        }
        args
    }
}

/// A whole sweep: which files, how many runs, which flags
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Configuration files, in run order
    pub dataset: Vec<PathBuf>,
    /// Runs per configuration file
    pub nruns: usize,
    pub flags: EngineFlags,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            dataset: Vec::new(),
            nruns: 1,
            flags: EngineFlags::default(),
        }
    }
}

impl SweepConfig {
    pub fn with_dataset(mut self, dataset: Vec<PathBuf>) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_nruns(mut self, nruns: usize) -> Self {
        self.nruns = nruns.max(1);
        self
    }

    pub fn with_flags(mut self, flags: EngineFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Number of (configuration, run) pairs
    pub fn total_runs(&self) -> usize {
        self.dataset.len() * self.nruns
    }

    /// Configuration file processed by run `index`
    pub fn conffile(&self, index: usize) -> Option<&Path> {
        self.dataset.get(index / self.nruns).map(PathBuf::as_path)
    }
}

/// Every `*.txt` file of `dir` as an absolute path, sorted
///
/// Sorting keeps run indices stable between a sweep and its resumption.
pub fn list_dataset(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let dataset_error = |source| Error::Dataset {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(dataset_error)? {
        let path = entry.map_err(dataset_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(fs::canonicalize(&path).map_err(dataset_error)?);
        }
    }
    files.sort();
    Ok(files)
}

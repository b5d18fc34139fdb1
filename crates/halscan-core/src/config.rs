//! Configuration types

use crate::{CacheKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-TU argument naming the success-value cache
pub const ARG_SUCC_RET: &str = "-out-file-succ-ret";
/// Per-TU argument naming the API cache
pub const ARG_API: &str = "-out-file-api";
/// Per-TU argument naming the loop cache
pub const ARG_LOOPS: &str = "-out-file-loops";
/// Per-TU argument naming the peripheral struct-name cache
pub const ARG_PERIPH_STRUCT: &str = "-out-file-periph-struct";

/// halscan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the four caches live
    pub outputs: CachePaths,

    /// Analysis configuration
    pub analysis: AnalysisConfig,

    /// Cache lock configuration
    pub lock: LockConfig,
}

impl Config {
    /// Read a YAML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Create a configuration for the given cache paths
    pub fn with_outputs(outputs: CachePaths) -> Self {
        Self {
            outputs,
            ..Self::default()
        }
    }
}

/// Output paths of the four persistent caches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePaths {
    pub succ_ret: PathBuf,
    pub api: PathBuf,
    pub loops: PathBuf,
    pub periph_struct: PathBuf,
}

impl CachePaths {
    pub fn new(
        succ_ret: impl Into<PathBuf>,
        api: impl Into<PathBuf>,
        loops: impl Into<PathBuf>,
        periph_struct: impl Into<PathBuf>,
    ) -> Self {
        Self {
            succ_ret: succ_ret.into(),
            api: api.into(),
            loops: loops.into(),
            periph_struct: periph_struct.into(),
        }
    }

    /// The file names the compiler wrapper falls back to, placed under `dir`
    pub fn with_defaults(dir: &Path) -> Self {
        Self::new(
            dir.join("succ-ret.yaml"),
            dir.join("api.yaml"),
            dir.join("loops.yaml"),
            dir.join("periph-struct.yaml"),
        )
    }

    /// Parse the per-TU plugin arguments.
    ///
    /// Every option takes the following argument as its value. Unknown
    /// arguments are ignored; a dangling option or a missing path is an error.
    pub fn from_plugin_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut paths = Self::default();
        let mut iter = args.iter().map(AsRef::as_ref);
        while let Some(arg) = iter.next() {
            let slot = match arg {
                ARG_SUCC_RET => &mut paths.succ_ret,
                ARG_API => &mut paths.api,
                ARG_LOOPS => &mut paths.loops,
                ARG_PERIPH_STRUCT => &mut paths.periph_struct,
                _ => continue,
            };
            let value = iter
                .next()
                .ok_or_else(|| Error::Config(format!("missing {} argument", arg)))?;
            *slot = PathBuf::from(value);
        }
        paths.validate()?;
        Ok(paths)
    }

    /// Fail unless all four paths are set
    pub fn validate(&self) -> Result<()> {
        for kind in CacheKind::ALL {
            if self.get(kind).as_os_str().is_empty() {
                return Err(Error::Config(format!(
                    "missing {} argument",
                    Self::option_for(kind)
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, kind: CacheKind) -> &Path {
        match kind {
            CacheKind::SuccessValue => &self.succ_ret,
            CacheKind::Api => &self.api,
            CacheKind::Loop => &self.loops,
            CacheKind::StructName => &self.periph_struct,
        }
    }

    /// The plugin option that sets the path of `kind`
    pub fn option_for(kind: CacheKind) -> &'static str {
        match kind {
            CacheKind::SuccessValue => ARG_SUCC_RET,
            CacheKind::Api => ARG_API,
            CacheKind::Loop => ARG_LOOPS,
            CacheKind::StructName => ARG_PERIPH_STRUCT,
        }
    }
}

/// Analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Resolve returned locals through their last plain assignment when the
    /// declaration carries no enum initializer
    pub consult_assignments: bool,

    /// Read the persisted success cache before analysis so known functions are skipped
    pub prime_success_cache: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            consult_assignments: true,
            prime_success_cache: true,
        }
    }
}

/// Cache lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// How long one wait for another process's lock lasts before retrying (seconds)
    pub wait_timeout_secs: u64,

    /// Upper bound of the polling interval while waiting (milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: 90,
            max_backoff_ms: 500,
        }
    }
}

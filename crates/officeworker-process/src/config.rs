//! Worker configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    endpoint::EndpointDescriptor,
    error::{ProcessError, Result},
};

/// Environment prefix for configuration overrides
const ENV_PREFIX: &str = "OFFICEWORKER";

/// How the worker's library search path is assembled before launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathAugmentation {
    /// Inherit the environment unchanged
    None,
    /// Resolve `basis-link`/`ure-link` marker files and add their
    /// program directories to `PATH`
    BasisAndUre,
}

impl PathAugmentation {
    /// Strategy required by the platform this crate was built for
    pub fn for_target() -> Self {
        if cfg!(windows) {
            Self::BasisAndUre
        } else {
            Self::None
        }
    }
}

impl Default for PathAugmentation {
    fn default() -> Self {
        Self::for_target()
    }
}

/// Configuration for launching one office worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Office installation root
    pub office_home: PathBuf,
    /// Endpoint the worker accepts connections on
    pub endpoint: EndpointDescriptor,
    /// Wrapper command prepended to the launch command (e.g. `sudo -u office`)
    #[serde(default)]
    pub run_as_args: Vec<String>,
    /// Profile copied into the instance profile dir before launch
    #[serde(default)]
    pub template_profile_dir: Option<PathBuf>,
    /// Kill an existing worker bound to the same endpoint instead of failing
    #[serde(default)]
    pub auto_reclaim: bool,
    /// Search path strategy
    #[serde(default)]
    pub path_augmentation: PathAugmentation,
    /// Regex the process name must match to count as a worker
    #[serde(default = "default_process_name_pattern")]
    pub process_name_pattern: String,
    /// Interval between exit status polls
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Upper bound for exit status polling
    #[serde(default = "default_retry_timeout_ms")]
    pub retry_timeout_ms: u64,
}

fn default_process_name_pattern() -> String {
    "soffice.*".to_string()
}

fn default_retry_interval_ms() -> u64 {
    250
}

fn default_retry_timeout_ms() -> u64 {
    30_000
}

impl WorkerConfig {
    /// Create new worker configuration
    pub fn new(office_home: impl Into<PathBuf>, endpoint: EndpointDescriptor) -> Self {
        Self {
            office_home: office_home.into(),
            endpoint,
            run_as_args: vec![],
            template_profile_dir: None,
            auto_reclaim: false,
            path_augmentation: PathAugmentation::for_target(),
            process_name_pattern: default_process_name_pattern(),
            retry_interval_ms: default_retry_interval_ms(),
            retry_timeout_ms: default_retry_timeout_ms(),
        }
    }

    /// Load configuration from an optional TOML file, overridden by
    /// `OFFICEWORKER_*` environment variables
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let worker: WorkerConfig = config.try_deserialize()?;
        worker.validate()?;
        Ok(worker)
    }

    /// Check invariants the launcher relies on
    pub fn validate(&self) -> Result<()> {
        if self.office_home.as_os_str().is_empty() {
            return Err(ProcessError::InvalidConfig(
                "office_home must not be empty".to_string(),
            ));
        }
        if self.retry_interval_ms == 0 {
            return Err(ProcessError::InvalidConfig(
                "retry_interval_ms must be greater than 0".to_string(),
            ));
        }
        regex::Regex::new(&self.process_name_pattern).map_err(|e| {
            ProcessError::InvalidConfig(format!("invalid process_name_pattern: {}", e))
        })?;
        Ok(())
    }

    /// Set run-as wrapper arguments
    pub fn run_as<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_as_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set template profile directory
    pub fn template_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_profile_dir = Some(dir.into());
        self
    }

    /// Enable/disable reclaiming an endpoint held by another worker
    pub fn auto_reclaim(mut self, enabled: bool) -> Self {
        self.auto_reclaim = enabled;
        self
    }

    /// Set search path strategy
    pub fn path_augmentation(mut self, strategy: PathAugmentation) -> Self {
        self.path_augmentation = strategy;
        self
    }

    /// Set process name pattern
    pub fn process_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.process_name_pattern = pattern.into();
        self
    }

    /// Set exit status polling interval
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set exit status polling timeout
    pub fn retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn retry_interval_duration(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn retry_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }
}

/// Host-level settings shared by all workers of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerContext {
    /// Root under which profile directories are created
    pub temp_dir: PathBuf,
    /// Product name used in profile directory names
    pub product: String,
}

impl WorkerContext {
    pub fn new(temp_dir: impl Into<PathBuf>, product: impl Into<String>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            product: product.into(),
        }
    }
}

impl Default for WorkerContext {
    fn default() -> Self {
        Self::new(std::env::temp_dir(), "officeworker")
    }
}

//! Extraction configuration
//!
//! `ExtentConfig` is built in layers: defaults, then a TOML file, then
//! `SEAICE_*` environment variables, then command-line flags. Each layer only
//! overrides the keys it sets. Relative paths resolve against `working_dir`.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use log::{debug, warn};

use crate::coordinate::{Crs, CrsRegistry};
use crate::error::{ExtentError, ExtentResult};
use crate::mask::DEFAULT_THRESHOLD;
use crate::vectorize::Connectivity;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "SEAICE_";

/// South Pole Lambert Azimuthal Equal Area
pub const DEFAULT_TARGET_CRS: &str = "EPSG:6932";

#[derive(Debug, Clone, PartialEq)]
pub struct ExtentConfig {
    /// Base directory for relative paths
    pub working_dir: PathBuf,
    /// Shell glob selecting input grids
    pub input_pattern: String,
    /// Results table (CSV)
    pub output_table: PathBuf,
    /// Equal-area projection the areas are measured in
    pub target_crs: String,
    /// Minimum concentration counted as ice, in percent
    pub threshold: f64,
    pub connectivity: Connectivity,
    /// Worker threads, 0 for one per core
    pub workers: usize,
    /// Process inputs in lexicographic order instead of listing order
    pub sort_inputs: bool,
    /// Abort the batch on the first failed input
    pub fail_fast: bool,
    /// Where debug artifacts go; none are written when unset
    pub artifacts_dir: Option<PathBuf>,
    /// Accept a target projection that does not preserve area
    pub allow_non_equal_area: bool,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for ExtentConfig {
    fn default() -> Self {
        ExtentConfig {
            working_dir: PathBuf::from("."),
            input_pattern: "nt_*.tif".to_string(),
            output_table: PathBuf::from("extent_results.csv"),
            target_crs: DEFAULT_TARGET_CRS.to_string(),
            threshold: DEFAULT_THRESHOLD,
            connectivity: Connectivity::default(),
            workers: 0,
            sort_inputs: true,
            fail_fast: false,
            artifacts_dir: None,
            allow_non_equal_area: false,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl ExtentConfig {
    /// Defaults overlaid with a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> ExtentResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ExtentError::Config(format!("cannot read {}: {}", path.display(), e)))?;

        let mut config = ExtentConfig::default();
        config.merge_toml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Overlays the keys of a TOML document
    pub fn merge_toml_str(&mut self, content: &str) -> ExtentResult<()> {
        let value: toml::Value = content
            .parse()
            .map_err(|e| ExtentError::Config(format!("invalid TOML: {}", e)))?;
        let table = value
            .as_table()
            .ok_or_else(|| ExtentError::Config("configuration must be a table".to_string()))?;

        for (key, value) in table {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(ExtentError::Config(format!(
                        "key '{}' must be a scalar, got {}", key, other.type_str()
                    )))
                }
            };
            if !self.set(key, &text)? {
                warn!("Ignoring unknown configuration key '{}'", key);
            }
        }

        Ok(())
    }

    /// Overlays `SEAICE_*` variables of the process environment
    pub fn apply_env(&mut self) -> ExtentResult<()> {
        self.apply_env_vars(std::env::vars())
    }

    /// Overlays `SEAICE_<KEY>` entries of the given variables
    pub fn apply_env_vars<I, K, V>(&mut self, vars: I) -> ExtentResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            if let Some(key) = name.as_ref().strip_prefix(ENV_PREFIX) {
                if !self.set(&key.to_lowercase(), value.as_ref())? {
                    debug!("Ignoring environment variable {}", name.as_ref());
                }
            }
        }
        Ok(())
    }

    /// Sets one key from its textual value
    ///
    /// # Returns
    /// `false` when the key is unknown
    pub fn set(&mut self, key: &str, value: &str) -> ExtentResult<bool> {
        match key {
            "working_dir" => self.working_dir = PathBuf::from(value),
            "input_pattern" => self.input_pattern = value.to_string(),
            "output_table" => self.output_table = PathBuf::from(value),
            "target_crs" => self.target_crs = value.to_string(),
            "threshold" => self.threshold = parse_value(key, value)?,
            "connectivity" => {
                self.connectivity = value.parse().map_err(ExtentError::Config)?;
            },
            "workers" => self.workers = parse_value(key, value)?,
            "sort_inputs" => self.sort_inputs = parse_bool(key, value)?,
            "fail_fast" => self.fail_fast = parse_bool(key, value)?,
            "artifacts_dir" => self.artifacts_dir = non_empty(value).map(PathBuf::from),
            "allow_non_equal_area" => self.allow_non_equal_area = parse_bool(key, value)?,
            "log_file" => self.log_file = non_empty(value).map(PathBuf::from),
            "log_level" => self.log_level = value.to_lowercase(),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Checks value ranges and that the target projection is usable
    pub fn validate(&self) -> ExtentResult<()> {
        if !self.threshold.is_finite() {
            return Err(ExtentError::Config(format!("threshold must be finite, got {}", self.threshold)));
        }
        if self.input_pattern.trim().is_empty() {
            return Err(ExtentError::Config("input_pattern is empty".to_string()));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ExtentError::Config(format!("unknown log level '{}'", self.log_level)));
        }
        self.target()?;
        Ok(())
    }

    /// Target CRS, rejecting projections that do not preserve area
    pub fn target(&self) -> ExtentResult<Crs> {
        let crs = CrsRegistry::lookup(&self.target_crs)?;
        if !crs.is_equal_area() && !self.allow_non_equal_area {
            return Err(ExtentError::Projection(format!(
                "{} is not an equal-area projection; set allow_non_equal_area to use it anyway", crs
            )));
        }
        Ok(crs)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Input glob resolved against the working directory
    pub fn input_glob(&self) -> String {
        self.resolve(Path::new(&self.input_pattern)).to_string_lossy().into_owned()
    }

    pub fn output_table_path(&self) -> PathBuf {
        self.resolve(&self.output_table)
    }

    pub fn artifacts_path(&self) -> Option<PathBuf> {
        self.artifacts_dir.as_deref().map(|p| self.resolve(p))
    }

    /// Worker thread count, at least one
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ExtentResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ExtentError::Config(format!("invalid value '{}' for {}: {}", value, key, e)))
}

fn parse_bool(key: &str, value: &str) -> ExtentResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ExtentError::Config(format!("invalid boolean '{}' for {}", value, key))),
    }
}

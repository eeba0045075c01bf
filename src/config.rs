use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::monitor::{OutputMode, iteration_count};
use crate::system::snapshot::DEFAULT_SETTLE_DELAY;

/// Shortest interval that leaves any idle time after the settling delay.
pub const MIN_INTERVAL_SECS: u64 = DEFAULT_SETTLE_DELAY.as_secs() + 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub output: OutputConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    pub duration_secs: u64,
    pub exclude_processes: Vec<String>,
    pub output_mode: OutputMode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            interval_secs: 5,
            duration_secs: 60,
            exclude_processes: Vec::new(),
            output_mode: OutputMode::Aggregate,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_path: PathBuf,
    pub delete_csv_file: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            csv_path: PathBuf::from("process_data.csv"),
            delete_csv_file: false,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub delete_table: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("process_summary.db"),
            delete_table: false,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
    pub json: bool,
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            file: PathBuf::from("proctally.log"),
            json: false,
            debug: false,
        }
    }
}

/// Flat `config.json` layout used by earlier deployments.
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    monitoring_interval: u64,
    monitoring_duration: u64,
    output_file: PathBuf,
    #[serde(default)]
    delete_csv_file: bool,
    #[serde(default)]
    delete_database_table: bool,
    #[serde(default)]
    exclude_processes: Vec<String>,
    logging_output_file: Option<PathBuf>,
    database: Option<LegacyDatabase>,
}

#[derive(Debug, Deserialize)]
struct LegacyDatabase {
    dbname: String,
}

impl From<LegacyConfig> for Config {
    fn from(legacy: LegacyConfig) -> Self {
        let mut config = Config::default();
        config.monitor.interval_secs = legacy.monitoring_interval;
        config.monitor.duration_secs = legacy.monitoring_duration;
        config.monitor.exclude_processes = legacy.exclude_processes;
        config.output.csv_path = legacy.output_file;
        config.output.delete_csv_file = legacy.delete_csv_file;
        config.database.delete_table = legacy.delete_database_table;
        if let Some(db) = legacy.database {
            config.database.path = PathBuf::from(format!("{}.db", db.dbname));
        }
        if let Some(file) = legacy.logging_output_file {
            config.logging.file = file;
        }
        config
    }
}

impl Config {
    /// Rejects settings the monitor cannot run with. A run that fits zero
    /// intervals is allowed but logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.interval_secs < MIN_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "monitor.interval_secs must be at least {MIN_INTERVAL_SECS} (got {}); \
                 the first {}s of every interval are spent settling CPU counters",
                self.monitor.interval_secs,
                DEFAULT_SETTLE_DELAY.as_secs()
            )));
        }
        if self.output.csv_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output.csv_path is empty".into()));
        }
        if iteration_count(self.monitor.interval_secs, self.monitor.duration_secs) == 0 {
            warn!(
                interval = self.monitor.interval_secs,
                duration = self.monitor.duration_secs,
                "duration is shorter than one interval; no snapshots will be taken"
            );
        }
        Ok(())
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("proctally").join("config.toml"))
}

/// Loads the user config if one exists, otherwise returns defaults.
pub fn load_config() -> Result<Config, ConfigError> {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Ok(Config::default()),
    }
}

/// Parses `path` as TOML, or as the legacy JSON layout when the extension is
/// `.json`.
pub fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let legacy: LegacyConfig = serde_json::from_str(&contents)?;
        Ok(legacy.into())
    } else {
        Ok(toml::from_str(&contents)?)
    }
}

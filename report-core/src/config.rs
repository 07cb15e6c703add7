use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{
    error::ReportError,
    model::{Coordinate, ForecastDays, ForecastRequest},
    writer::DEFAULT_OUTPUT_ROOT,
};

/// Central London.
pub const DEFAULT_LATITUDE: f64 = 51.5074;
pub const DEFAULT_LONGITUDE: f64 = -0.1278;

/// Environment variable naming a config file to use.
pub const CONFIG_ENV: &str = "WEATHER_REPORT_CONFIG";

/// Contents of `config.yaml`. Every key is optional.
///
/// Example YAML:
/// latitude: 48.8566
/// longitude: 2.3522
/// forecast_days: 3
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub forecast_days: Option<u8>,
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty file deserializes to null.
        let cfg: Option<FileConfig> =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        Ok(cfg.unwrap_or_default())
    }

    /// Load the first config file found, or an empty config if none exists.
    ///
    /// Search order: `explicit`, `$WEATHER_REPORT_CONFIG`, `./config.yaml`,
    /// then the platform config directory. An explicitly named file that is
    /// missing is an error; the implicit locations are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        for path in Self::candidate_paths() {
            if path.exists() {
                return Self::read(&path);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(p) = std::env::var_os(CONFIG_ENV) {
            paths.push(PathBuf::from(p));
        }
        paths.push(PathBuf::from("config.yaml"));
        if let Some(dirs) = ProjectDirs::from("dev", "weather-report", "weather-report") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }
        paths
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub forecast_days: Option<u8>,
    pub output_dir: Option<PathBuf>,
}

impl CliOverrides {
    /// The config file is only consulted when a coordinate is missing.
    pub fn needs_config_file(&self) -> bool {
        self.latitude.is_none() || self.longitude.is_none()
    }
}

/// Fully resolved run settings. Not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub latitude: f64,
    pub longitude: f64,
    pub forecast_days: Option<u8>,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            forecast_days: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_ROOT),
        }
    }
}

impl Settings {
    /// Merge per field: command line, then config file, then defaults.
    pub fn resolve(cli: CliOverrides, file: FileConfig) -> Self {
        let defaults = Self::default();
        Self {
            latitude: cli.latitude.or(file.latitude).unwrap_or(defaults.latitude),
            longitude: cli.longitude.or(file.longitude).unwrap_or(defaults.longitude),
            forecast_days: cli.forecast_days.or(file.forecast_days),
            output_dir: cli.output_dir.or(file.output_dir).unwrap_or(defaults.output_dir),
        }
    }

    /// Checks coordinate and forecast-day ranges before anything is fetched.
    pub fn validate(&self) -> Result<ForecastRequest, ReportError> {
        let coordinate = Coordinate::new(self.latitude, self.longitude)?;
        let forecast_days = self.forecast_days.map(ForecastDays::new).transpose()?;
        Ok(ForecastRequest { coordinate, forecast_days })
    }
}

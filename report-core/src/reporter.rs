use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::{
    client::ForecastSource,
    config::Settings,
    error::ReportError,
    parse::parse_report,
    writer::{report_path, write_report},
};

/// Pipeline position, used to tag log lines and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Fetching,
    Parsing,
    Writing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Validating => "validating",
            Stage::Fetching => "fetching",
            Stage::Parsing => "parsing",
            Stage::Writing => "writing",
        })
    }
}

/// Runs validate -> fetch -> parse -> write for one set of settings.
///
/// Nothing touches the filesystem until a complete report has been built.
#[derive(Debug)]
pub struct WeatherReporter<S> {
    settings: Settings,
    source: S,
}

impl<S: ForecastSource> WeatherReporter<S> {
    pub fn new(settings: Settings, source: S) -> Self {
        Self { settings, source }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs the pipeline, stamping the report and its path with the current time.
    pub async fn run(&self) -> Result<PathBuf, ReportError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<PathBuf, ReportError> {
        let s = &self.settings;
        self.execute(now).await.map_err(|(stage, err)| {
            error!(
                "Weather report aborted while {stage} [lat: {}, lon: {}]: {err}",
                s.latitude, s.longitude
            );
            err
        })
    }

    async fn execute(&self, now: DateTime<Utc>) -> Result<PathBuf, (Stage, ReportError)> {
        let request = self.settings.validate().map_err(|e| (Stage::Validating, e))?;
        info!("Fetching weather data for [{}]", request.coordinate);

        let body = self.source.fetch(&request).await.map_err(|e| (Stage::Fetching, e))?;

        let report =
            parse_report(&body, request.forecast_days, now).map_err(|e| (Stage::Parsing, e))?;
        for line in report.lines() {
            info!("Output: {line}");
        }

        let path = report_path(&self.settings.output_dir, &request, now);
        info!("Writing weather report to {}", path.display());
        write_report(&path, &report).map_err(|e| (Stage::Writing, e))?;

        Ok(path)
    }
}

use std::path::PathBuf;

use clap::Parser;
use report_core::{CliOverrides, FileConfig, OpenMeteoClient, Settings, WeatherReporter};
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-report",
    version,
    about = "Fetch current weather and an optional forecast from Open-Meteo into a text report"
)]
pub struct Cli {
    /// Latitude in degrees, -90 to 90.
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Longitude in degrees, -180 to 180.
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Also fetch a daily forecast for this many days.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=7))]
    pub forecast: Option<u8>,

    /// YAML config file, read when --latitude or --longitude is missing.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root directory for reports; defaults to `results`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            latitude: self.latitude,
            longitude: self.longitude,
            forecast_days: self.forecast,
            output_dir: self.output_dir.clone(),
        }
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let overrides = self.overrides();
        let file = if overrides.needs_config_file() {
            FileConfig::load(self.config.as_deref())?
        } else {
            FileConfig::default()
        };

        Ok(Settings::resolve(overrides, file))
    }

    pub async fn run(self) -> anyhow::Result<PathBuf> {
        let settings = self.settings()?;
        info!(
            "Resolved settings: lat {}, lon {}, forecast days {:?}, output {}",
            settings.latitude,
            settings.longitude,
            settings.forecast_days,
            settings.output_dir.display()
        );

        let reporter = WeatherReporter::new(settings, OpenMeteoClient::new()?);
        Ok(reporter.run().await?)
    }
}

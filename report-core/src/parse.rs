use chrono::{DateTime, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::warn;

use crate::{
    error::ReportError,
    model::{CurrentWeather, DailyForecast, ForecastDays, WeatherCode, WeatherReport},
};

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature: f64,
    weathercode: WeatherCode,
}

/// Open-Meteo puts `null` in these arrays for days it cannot forecast.
#[derive(Debug, Deserialize)]
struct OmDaily {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    weathercode: Vec<Option<WeatherCode>>,
}

impl OmDaily {
    /// Zips the parallel arrays, stopping at the shortest one.
    fn entries(self, limit: usize) -> Vec<DailyForecast> {
        self.time
            .into_iter()
            .zip(self.temperature_2m_max)
            .zip(self.temperature_2m_min)
            .zip(self.weathercode)
            .take(limit)
            .map(|(((date, max_temp), min_temp), code)| DailyForecast {
                date,
                max_temp,
                min_temp,
                code,
            })
            .collect()
    }
}

/// Typed read of one top-level section. Absent, null, or mistyped sections
/// come back as `None`.
fn section<T: DeserializeOwned>(root: &Value, key: &str) -> Option<T> {
    let value = root.get(key).filter(|v| !v.is_null())?;
    match T::deserialize(value) {
        Ok(section) => Some(section),
        Err(e) => {
            warn!("Ignoring unusable `{key}` section in weather response: {e}");
            None
        }
    }
}

/// Turns an Open-Meteo response body into report lines.
///
/// `observed_at` stamps the current-weather line. Daily data is only read
/// when `forecast_days` is set, and at most that many days are emitted.
/// Only a body that is not JSON at all is a `ParseFailed`; valid JSON
/// without usable sections is `NoWeatherData`.
pub fn parse_report(
    body: &str,
    forecast_days: Option<ForecastDays>,
    observed_at: DateTime<Utc>,
) -> Result<WeatherReport, ReportError> {
    let root: Value = serde_json::from_str(body)?;

    let mut lines = Vec::new();

    if let Some(current) = section::<OmCurrent>(&root, "current_weather") {
        let current = CurrentWeather {
            temperature_celsius: current.temperature,
            code: current.weathercode,
            observed_at,
        };
        lines.push(current.to_line());
    }

    if let Some(days) = forecast_days {
        let entries = section::<OmDaily>(&root, "daily")
            .map(|daily| daily.entries(usize::from(days.get())))
            .unwrap_or_default();
        lines.extend(entries.iter().map(DailyForecast::to_line));
    }

    if lines.is_empty() {
        return Err(ReportError::NoWeatherData);
    }

    Ok(WeatherReport::new(lines))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// A validated point on the globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Accepts latitude in [-90, 90] and longitude in [-180, 180]. NaN is rejected.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ReportError> {
        if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
            Ok(Self { latitude, longitude })
        } else {
            Err(ReportError::InvalidCoordinates { latitude, longitude })
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lat: {}, lon: {}", self.latitude, self.longitude)
    }
}

/// Number of forecast days, 1 through 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastDays(u8);

impl ForecastDays {
    pub const MAX: u8 = 7;

    pub fn new(days: u8) -> Result<Self, ReportError> {
        if (1..=Self::MAX).contains(&days) {
            Ok(Self(days))
        } else {
            Err(ReportError::InvalidForecastDays(days))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub coordinate: Coordinate,
    pub forecast_days: Option<ForecastDays>,
}

const WEATHER_CODES: &[(i64, &str)] = &[
    (0, "Clear sky"),
    (1, "Mainly clear"),
    (2, "Partly cloudy"),
    (3, "Overcast"),
    (45, "Fog"),
    (48, "Depositing rime fog"),
    (51, "Light drizzle"),
    (53, "Moderate drizzle"),
    (55, "Dense drizzle"),
    (61, "Slight rain"),
    (63, "Moderate rain"),
    (65, "Heavy rain"),
    (71, "Slight snow fall"),
    (73, "Moderate snow fall"),
    (75, "Heavy snow fall"),
    (95, "Thunderstorm"),
];

/// WMO weather interpretation code as reported by Open-Meteo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherCode(pub i64);

impl WeatherCode {
    pub fn description(self) -> &'static str {
        WEATHER_CODES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, description)| *description)
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub temperature_celsius: f64,
    pub code: WeatherCode,
    pub observed_at: DateTime<Utc>,
}

impl CurrentWeather {
    pub fn to_line(&self) -> String {
        format!(
            "Current weather ({}): {:.1}°C, {}",
            self.observed_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.temperature_celsius,
            self.code.description(),
        )
    }
}

/// One forecast day. Values the upstream could not forecast are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: String,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub code: Option<WeatherCode>,
}

fn celsius(temp: Option<f64>) -> String {
    temp.map_or_else(|| "n/a".to_string(), |t| format!("{t:.1}°C"))
}

impl DailyForecast {
    pub fn to_line(&self) -> String {
        format!(
            "Forecast for {}: Max Temp: {}, Min Temp: {}, {}",
            self.date,
            celsius(self.max_temp),
            celsius(self.min_temp),
            self.code.map_or("Unknown", WeatherCode::description),
        )
    }
}

/// Formatted report lines, current weather first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeatherReport {
    lines: Vec<String>,
}

impl WeatherReport {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// File contents: every line newline-terminated.
    pub fn to_text(&self) -> String {
        self.lines.iter().map(|line| format!("{line}\n")).collect()
    }
}

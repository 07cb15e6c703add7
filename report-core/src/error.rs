use thiserror::Error;

/// Everything that can abort a report run.
///
/// None of these are retried once they surface here; the HTTP client has
/// already applied its own retry policy before returning `FetchFailed`.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(
        "Invalid coordinates (lat: {latitude}, lon: {longitude}). \
         Latitude must be within [-90, 90] and longitude within [-180, 180]."
    )]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Invalid forecast days {0}. Forecast days must be between 1 and 7.")]
    InvalidForecastDays(u8),

    #[error("Failed to fetch weather data: {0}")]
    FetchFailed(String),

    #[error("Failed to parse weather response: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("Weather response contained neither current nor daily data")]
    NoWeatherData,

    #[error("Failed to write report to {path}: {source}")]
    IoFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ReportError::IoFailure { path: path.display().to_string(), source }
    }

    /// Process exit code for this failure. Success is 0, config problems
    /// handled by the binary use 2 as well.
    pub fn exit_code(&self) -> u8 {
        match self {
            ReportError::InvalidCoordinates { .. } | ReportError::InvalidForecastDays(_) => 2,
            ReportError::FetchFailed(_) => 3,
            ReportError::ParseFailed(_) => 4,
            ReportError::NoWeatherData => 5,
            ReportError::IoFailure { .. } => 6,
        }
    }
}

//! Core library for the `weather-report` tool.
//!
//! This crate defines:
//! - Coordinate validation and the weather-code table
//! - The Open-Meteo request builder, HTTP client and retry policy
//! - Response parsing into report lines and the dated report writer
//! - Settings resolution (command line > config file > defaults)
//!
//! `WeatherReporter` ties these together into a single validate, fetch,
//! parse, write run. It is used by `report-cli`.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod reporter;
pub mod request;
pub mod writer;

pub use client::{ForecastSource, OpenMeteoClient, RetryPolicy};
pub use config::{CliOverrides, FileConfig, Settings};
pub use error::ReportError;
pub use model::{
    Coordinate, CurrentWeather, DailyForecast, ForecastDays, ForecastRequest, WeatherCode,
    WeatherReport,
};
pub use reporter::{Stage, WeatherReporter};

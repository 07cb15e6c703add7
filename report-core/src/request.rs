use crate::model::ForecastRequest;

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,weathercode";

/// Query parameters for a single forecast call.
pub fn query_params(request: &ForecastRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("latitude", request.coordinate.latitude().to_string()),
        ("longitude", request.coordinate.longitude().to_string()),
        ("current_weather", "true".to_string()),
        ("timezone", "auto".to_string()),
    ];

    if let Some(days) = request.forecast_days {
        params.push(("daily", DAILY_FIELDS.to_string()));
        params.push(("forecast_days", days.get().to_string()));
    }

    params
}

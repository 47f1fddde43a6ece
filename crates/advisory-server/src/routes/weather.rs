//! Current-conditions and daily-outlook proxies to OpenWeather.

use axum::extract::{Query, State};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CoordinateQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Summary returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSummary {
    pub location: String,
    pub temperature: f64,
    pub weather: String,
    pub humidity: f64,
    pub wind_speed: f64,
}

// Subset of the OpenWeather `/weather` payload.
#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    #[serde(default)]
    name: String,
    main: OpenWeatherMain,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
    #[serde(default)]
    wind: OpenWeatherWind,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherCondition {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OpenWeatherWind {
    #[serde(default)]
    speed: f64,
}

impl From<OpenWeatherResponse> for WeatherSummary {
    fn from(raw: OpenWeatherResponse) -> Self {
        Self {
            location: raw.name,
            temperature: raw.main.temp,
            weather: raw
                .weather
                .into_iter()
                .next()
                .map(|c| c.description)
                .unwrap_or_default(),
            humidity: raw.main.humidity,
            wind_speed: raw.wind.speed,
        }
    }
}

/// OpenWeather forecasts come in 3-hour steps.
const ENTRIES_PER_DAY: usize = 8;
/// Days returned by the outlook route.
const OUTLOOK_DAYS: usize = 7;

/// One day of the outlook, sampled from the first 3-hour entry of the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOutlook {
    /// Unix seconds of the sampled entry.
    pub dt: i64,
    /// UTC date of the sampled entry, `YYYY-MM-DD`.
    pub date: String,
    pub temp: f64,
    /// Condition group such as "Rain" or "Clear".
    pub weather: String,
    pub icon: String,
}

#[derive(Debug, Serialize)]
pub struct OutlookResponse {
    pub success: bool,
    pub days: Vec<DayOutlook>,
}

// Subset of the OpenWeather `/forecast` payload.
#[derive(Debug, Deserialize)]
struct OpenWeatherForecast {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: OpenWeatherMain,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
}

impl From<ForecastEntry> for DayOutlook {
    fn from(entry: ForecastEntry) -> Self {
        let date = chrono::DateTime::from_timestamp(entry.dt, 0)
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let (weather, icon) = entry
            .weather
            .into_iter()
            .next()
            .map(|c| (c.main, c.icon))
            .unwrap_or_default();

        Self {
            dt: entry.dt,
            date,
            temp: entry.main.temp,
            weather,
            icon,
        }
    }
}

/// Every eighth 3-hourly entry, at most a week of days.
fn daily_outlook(entries: Vec<ForecastEntry>) -> Vec<DayOutlook> {
    entries
        .into_iter()
        .step_by(ENTRIES_PER_DAY)
        .take(OUTLOOK_DAYS)
        .map(DayOutlook::from)
        .collect()
}

impl CoordinateQuery {
    fn require(&self) -> Result<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(ServerError::BadRequest(
                "Please provide latitude and longitude".to_string(),
            )),
        }
    }
}

async fn fetch_openweather<T: DeserializeOwned>(
    state: &AppState,
    endpoint: &str,
    (lat, lon): (f64, f64),
) -> Result<T> {
    let api_key = state
        .config
        .openweather_api_key
        .as_deref()
        .ok_or_else(|| ServerError::Unavailable("Weather service not configured".to_string()))?;

    let url = format!(
        "{}/{}",
        state.config.openweather_url.trim_end_matches('/'),
        endpoint
    );
    debug!(lat, lon, endpoint, "Fetching from OpenWeather");

    let response = state
        .http
        .get(&url)
        .query(&[
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", api_key.to_string()),
            ("units", "metric".to_string()),
        ])
        .send()
        .await?
        .error_for_status()?;

    response
        .json()
        .await
        .map_err(|e| ServerError::Internal(format!("Failed to fetch weather: {}", e)))
}

/// Fetch current conditions at a coordinate.
pub async fn current_weather(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<WeatherSummary>> {
    let coordinates = query.require()?;
    let raw: OpenWeatherResponse = fetch_openweather(&state, "weather", coordinates).await?;
    Ok(Json(raw.into()))
}

/// Fetch a daily outlook for up to a week at a coordinate.
pub async fn outlook(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<OutlookResponse>> {
    let coordinates = query.require()?;
    let raw: OpenWeatherForecast = fetch_openweather(&state, "forecast", coordinates).await?;
    Ok(Json(OutlookResponse {
        success: true,
        days: daily_outlook(raw.list),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_openweather() {
        let raw: OpenWeatherResponse = serde_json::from_value(serde_json::json!({
            "name": "Ludhiana",
            "main": {"temp": 31.5, "humidity": 40},
            "weather": [{"description": "haze"}],
            "wind": {"speed": 2.1}
        }))
        .unwrap();

        let summary = WeatherSummary::from(raw);
        assert_eq!(summary.location, "Ludhiana");
        assert_eq!(summary.weather, "haze");
        assert_eq!(summary.humidity, 40.0);
        assert_eq!(summary.wind_speed, 2.1);
    }

    #[test]
    fn test_summary_tolerates_missing_sections() {
        let raw: OpenWeatherResponse =
            serde_json::from_value(serde_json::json!({"main": {"temp": 20.0}})).unwrap();
        let summary = WeatherSummary::from(raw);
        assert_eq!(summary.weather, "");
        assert_eq!(summary.wind_speed, 0.0);
    }

    fn entries(count: i64) -> Vec<ForecastEntry> {
        (0..count)
            .map(|i| ForecastEntry {
                dt: 1_718_000_000 + i * 3 * 3600,
                main: OpenWeatherMain {
                    temp: i as f64,
                    humidity: 50.0,
                },
                weather: vec![OpenWeatherCondition {
                    main: "Clouds".to_string(),
                    description: "few clouds".to_string(),
                    icon: "02d".to_string(),
                }],
            })
            .collect()
    }

    #[test]
    fn test_outlook_samples_one_entry_per_day() {
        let days = daily_outlook(entries(20));
        let temps: Vec<f64> = days.iter().map(|d| d.temp).collect();
        assert_eq!(temps, vec![0.0, 8.0, 16.0]);
        assert_eq!(days[0].date, "2024-06-10");
        assert_eq!(days[0].weather, "Clouds");
        assert_eq!(days[0].icon, "02d");
    }

    #[test]
    fn test_outlook_caps_at_a_week() {
        assert_eq!(daily_outlook(entries(80)).len(), 7);
        assert!(daily_outlook(Vec::new()).is_empty());
    }
}

//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Advisory server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// OpenWeather API key. Coordinate weather is disabled without it.
    pub openweather_api_key: Option<String>,
    /// OpenWeather API base URL.
    pub openweather_url: String,
    /// Gemini API key. Farming news falls back to weather rules without it.
    pub gemini_api_key: Option<String>,
    /// Gemini `generateContent` endpoint.
    pub gemini_url: String,
    /// data.gov.in API key. Live mandi rates are disabled without it.
    pub data_gov_api_key: Option<String>,
    /// data.gov.in mandi price resource URL.
    pub data_gov_url: String,
}

const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5";
const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
const DATA_GOV_URL: &str =
    "https://api.data.gov.in/resource/9ef84268-d588-465a-a308-a864a43d0070";

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `KRISHI_ADDR` | Server bind address | `0.0.0.0:8080` |
    /// | `OPENWEATHER_API_KEY` | OpenWeather key | (none) |
    /// | `OPENWEATHER_URL` | OpenWeather base URL | `https://api.openweathermap.org/data/2.5` |
    /// | `GEMINI_API_KEY` | Gemini key | (none) |
    /// | `GEMINI_URL` | Gemini generateContent endpoint | gemini-1.5-flash |
    /// | `DATA_GOV_API_KEY` | data.gov.in key | (none) |
    /// | `DATA_GOV_URL` | Mandi price resource | data.gov.in resource `9ef84268-…` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("KRISHI_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        Ok(Self {
            addr,
            openweather_api_key: non_empty_var("OPENWEATHER_API_KEY"),
            openweather_url: env::var("OPENWEATHER_URL")
                .unwrap_or_else(|_| OPENWEATHER_URL.to_string()),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_url: env::var("GEMINI_URL").unwrap_or_else(|_| GEMINI_URL.to_string()),
            data_gov_api_key: non_empty_var("DATA_GOV_API_KEY"),
            data_gov_url: env::var("DATA_GOV_URL").unwrap_or_else(|_| DATA_GOV_URL.to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            openweather_api_key: None,
            openweather_url: OPENWEATHER_URL.to_string(),
            gemini_api_key: None,
            gemini_url: GEMINI_URL.to_string(),
            data_gov_api_key: None,
            data_gov_url: DATA_GOV_URL.to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid KRISHI_ADDR format")]
    InvalidAddr,
}

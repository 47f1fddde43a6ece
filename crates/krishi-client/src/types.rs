//! Request and response types for the advisory backend.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::validation::{self, ValidationError};

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
}

/// A farmer's advisory question with its context.
///
/// This is the payload that survives in the offline queue, so its field
/// names are part of the persisted format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryQuery {
    /// Free-text question.
    pub query: String,
    /// Region name or pincode.
    pub location: String,
    /// Language code (en, hi, pa).
    pub language: String,
    /// Soil type code (clay, sandy, ...).
    pub soil_type: String,
    /// Optional reference to a captured crop image.
    #[serde(default)]
    pub image_uri: Option<String>,
}

impl AdvisoryQuery {
    /// Create a text-only query.
    pub fn new(
        query: impl Into<String>,
        location: impl Into<String>,
        language: impl Into<String>,
        soil_type: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            language: language.into(),
            soil_type: soil_type.into(),
            image_uri: None,
        }
    }

    /// Attach an image reference.
    pub fn with_image(mut self, uri: impl Into<String>) -> Self {
        self.image_uri = Some(uri.into());
        self
    }

    /// Check every field before the query is sent or queued.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_query(&self.query)?;
        validation::require(&self.location, "location")?;
        validation::validate_language(&self.language)?;
        validation::validate_soil_type(&self.soil_type)?;
        Ok(())
    }
}

/// Every call the client can make to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    /// `POST /api/auth/login`
    Login { phone: String },
    /// `POST /api/advice`
    Advice(AdvisoryQuery),
    /// `POST /api/advice/feedback`
    Feedback { user_id: String, feedback: String },
    /// `POST /api/upload` (multipart)
    UploadImage { path: PathBuf },
    /// `GET /api/misc/market-prices`
    MarketPrices,
    /// `GET /api/misc/weather?pincode=`
    PincodeWeather { pincode: String },
    /// `GET /api/weather?lat=&lon=`
    CurrentWeather { lat: f64, lon: f64 },
    /// `GET /api/misc/default-questions?lang=`
    DefaultQuestions { language: String },
    /// `GET /api/weather/forecast?lat=&lon=`
    WeatherOutlook { lat: f64, lon: f64 },
    /// `POST /api/weather/advice`
    FarmNews { location: String, condition: String },
    /// `GET /api/market/mandi?state=&commodity=`
    MandiRates {
        state: Option<String>,
        commodity: Option<String>,
    },
}

impl ApiRequest {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Advice(_) => "advice",
            Self::Feedback { .. } => "feedback",
            Self::UploadImage { .. } => "upload",
            Self::MarketPrices => "market-prices",
            Self::PincodeWeather { .. } => "pincode-weather",
            Self::CurrentWeather { .. } => "current-weather",
            Self::DefaultQuestions { .. } => "default-questions",
            Self::WeatherOutlook { .. } => "weather-outlook",
            Self::FarmNews { .. } => "farm-news",
            Self::MandiRates { .. } => "mandi-rates",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Login { .. }
            | Self::Advice(_)
            | Self::Feedback { .. }
            | Self::UploadImage { .. }
            | Self::FarmNews { .. } => Method::Post,
            Self::MarketPrices
            | Self::PincodeWeather { .. }
            | Self::CurrentWeather { .. }
            | Self::DefaultQuestions { .. }
            | Self::WeatherOutlook { .. }
            | Self::MandiRates { .. } => Method::Get,
        }
    }

    /// Path and query string relative to the base URL.
    pub fn path(&self) -> String {
        match self {
            Self::Login { .. } => "/api/auth/login".to_string(),
            Self::Advice(_) => "/api/advice".to_string(),
            Self::Feedback { .. } => "/api/advice/feedback".to_string(),
            Self::UploadImage { .. } => "/api/upload".to_string(),
            Self::MarketPrices => "/api/misc/market-prices".to_string(),
            Self::PincodeWeather { pincode } => {
                format!("/api/misc/weather?pincode={}", urlencoding::encode(pincode))
            }
            Self::CurrentWeather { lat, lon } => format!("/api/weather?lat={}&lon={}", lat, lon),
            Self::DefaultQuestions { language } => format!(
                "/api/misc/default-questions?lang={}",
                urlencoding::encode(language)
            ),
            Self::WeatherOutlook { lat, lon } => {
                format!("/api/weather/forecast?lat={}&lon={}", lat, lon)
            }
            Self::FarmNews { .. } => "/api/weather/advice".to_string(),
            Self::MandiRates { state, commodity } => {
                let params: Vec<String> = [("state", state), ("commodity", commodity)]
                    .into_iter()
                    .filter_map(|(name, value)| {
                        value
                            .as_deref()
                            .map(|v| format!("{}={}", name, urlencoding::encode(v)))
                    })
                    .collect();
                if params.is_empty() {
                    "/api/market/mandi".to_string()
                } else {
                    format!("/api/market/mandi?{}", params.join("&"))
                }
            }
        }
    }

    pub fn body(&self) -> RequestBody {
        match self {
            Self::Login { phone } => RequestBody::Json(json!({ "phone": phone })),
            Self::Advice(query) => RequestBody::Json(advice_body(query)),
            Self::Feedback { user_id, feedback } => {
                RequestBody::Json(json!({ "userId": user_id, "feedback": feedback }))
            }
            Self::UploadImage { path } => RequestBody::Multipart {
                field: "image".to_string(),
                path: path.clone(),
            },
            Self::FarmNews {
                location,
                condition,
            } => RequestBody::Json(json!({ "location": location, "condition": condition })),
            _ => RequestBody::Empty,
        }
    }

    /// Reject malformed requests before they reach the network or the queue.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Login { phone } => validation::require(phone, "phone"),
            Self::Advice(query) => query.validate(),
            Self::Feedback { user_id, feedback } => {
                validation::require(user_id, "userId")?;
                validation::require(feedback, "feedback")
            }
            Self::UploadImage { path } => {
                if path.as_os_str().is_empty() {
                    Err(ValidationError::MissingField("image"))
                } else {
                    Ok(())
                }
            }
            Self::MarketPrices => Ok(()),
            Self::PincodeWeather { pincode } => validation::validate_pincode(pincode),
            Self::CurrentWeather { lat, lon } => validation::validate_coordinates(*lat, *lon),
            Self::DefaultQuestions { language } => validation::validate_language(language).map(|_| ()),
            Self::WeatherOutlook { lat, lon } => validation::validate_coordinates(*lat, *lon),
            Self::FarmNews {
                location,
                condition,
            } => {
                validation::require(location, "location")?;
                validation::require(condition, "condition")
            }
            Self::MandiRates { .. } => Ok(()),
        }
    }

    /// The payload to defer when offline, if this request can be deferred.
    ///
    /// Only advisory questions are deferred: reads have no consumer left by
    /// the time a replay happens, and login/upload need an interactive answer.
    pub fn deferrable(&self) -> Option<&AdvisoryQuery> {
        match self {
            Self::Advice(query) => Some(query),
            _ => None,
        }
    }
}

fn advice_body(query: &AdvisoryQuery) -> Value {
    let mut body = json!({
        "query": query.query,
        "location": query.location,
        "language": query.language,
        "soilType": query.soil_type,
    });
    if let Some(image) = &query.image_uri {
        body["image"] = Value::String(image.clone());
    }
    body
}

/// Body of a prepared request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// A single file uploaded as a multipart form field.
    Multipart { field: String, path: PathBuf },
}

/// A fully-formed request handed to a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl PreparedRequest {
    /// Look up a header value (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// JSON body, if any.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Raw backend response before envelope checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; non-JSON bodies are wrapped as a JSON string.
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// A 200 response with the given body.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }
}

/// Rule-based crop advisory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub recommended_crop: String,
    pub season: String,
    pub fertilizer: String,
    pub notes: String,
}

/// Pest/disease detection for an uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PestDetection {
    pub disease: String,
    pub confidence: f64,
    pub remedy: String,
}

/// Logged-in farmer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmerProfile {
    pub id: String,
    pub name: String,
    pub phone: String,
}

/// Successful login payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: FarmerProfile,
}

/// Crop name to price string (e.g. "₹2000/quintal").
pub type MarketPrices = BTreeMap<String, String>;

/// One day of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    #[serde(default)]
    pub day: Option<String>,
    pub temp: f64,
    pub condition: String,
}

/// Short forecast for a pincode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub today: DayForecast,
    pub next3: Vec<DayForecast>,
}

/// Current conditions at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub location: String,
    pub temperature: f64,
    pub weather: String,
    pub humidity: f64,
    pub wind_speed: f64,
}

/// One day of the coordinate outlook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOutlook {
    /// Unix seconds of the sampled forecast entry.
    pub dt: i64,
    /// `YYYY-MM-DD` (UTC).
    pub date: String,
    pub temp: f64,
    /// Condition group such as "Rain" or "Clear".
    pub weather: String,
    #[serde(default)]
    pub icon: String,
}

/// Regional farming news and weather advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmNews {
    pub news: String,
    pub advice: String,
    /// "model" or "fallback".
    #[serde(default)]
    pub source: String,
}

/// A live mandi price record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    pub state: String,
    pub district: String,
    pub market: String,
    pub commodity: String,
    pub variety: String,
    pub grade: String,
    pub date: String,
    pub min_price: String,
    pub max_price: String,
    pub modal_price: String,
}

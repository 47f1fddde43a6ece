//! Farming news and advice for the current weather.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, ServerError};
use crate::farm_news::{self, FarmNews};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NewsRequest {
    pub location: Option<String>,
    /// Current condition, e.g. the OpenWeather group "Rain".
    pub condition: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub news: FarmNews,
    /// "model" when Gemini answered, "fallback" for the weather rules.
    pub source: &'static str,
}

/// Ask the model for news and advice, falling back to weather rules when it
/// is not configured or fails.
pub async fn farm_news(
    State(state): State<AppState>,
    Json(req): Json<NewsRequest>,
) -> Result<Json<NewsResponse>> {
    let location = required(req.location, "location")?;
    let condition = required(req.condition, "condition")?;

    let Some(api_key) = state.config.gemini_api_key.as_deref() else {
        debug!("Gemini not configured, using fallback advice");
        return Ok(respond(FarmNews::fallback(&condition), "fallback"));
    };

    match ask_model(&state, api_key, &location, &condition).await {
        Ok(Some(reply)) => Ok(respond(FarmNews::parse(&reply), "model")),
        Ok(None) => {
            warn!("Gemini returned no text");
            Ok(respond(FarmNews::empty_reply(), "model"))
        }
        Err(e) => {
            warn!("Gemini request failed, using fallback advice: {}", e);
            Ok(respond(FarmNews::fallback(&condition), "fallback"))
        }
    }
}

async fn ask_model(
    state: &AppState,
    api_key: &str,
    location: &str,
    condition: &str,
) -> std::result::Result<Option<String>, reqwest::Error> {
    debug!(location, condition, "Requesting farming news from Gemini");
    let body = farm_news::request_body(&farm_news::prompt(location, condition));

    let response: Value = state
        .http
        .post(&state.config.gemini_url)
        .query(&[("key", api_key)])
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(farm_news::reply_text(&response).map(str::to_string))
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::BadRequest(format!("{} is required", name)))
}

fn respond(news: FarmNews, source: &'static str) -> Json<NewsResponse> {
    Json(NewsResponse {
        success: true,
        news,
        source,
    })
}

//! Advisory and feedback routes.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::agronomy::{self, Advisory};
use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Advice request. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    pub user_id: Option<String>,
    pub query: Option<String>,
    pub location: Option<String>,
    pub pincode: Option<String>,
    pub language: Option<String>,
    pub soil_type: Option<String>,
    /// Month as a number or numeric string. Defaults to the current month.
    pub month: Option<Value>,
    pub image: Option<String>,
}

impl AdviceRequest {
    fn month(&self) -> Result<u32> {
        let month = match &self.month {
            None | Some(Value::Null) => return Ok(chrono::Local::now().month()),
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Ok(chrono::Local::now().month())
            }
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };

        match month {
            Some(m @ 1..=12) => Ok(m as u32),
            _ => Err(ServerError::BadRequest(
                "month must be between 1 and 12".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
pub struct AdviceResponse {
    pub success: bool,
    pub advisory: Advisory,
}

/// Produce a rule-based advisory.
///
/// A missing month means the current month and an out-of-range or non-numeric
/// one is rejected with 400, rather than silently answering for Rabi.
pub async fn advice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AdviceRequest>,
) -> Result<Json<AdviceResponse>> {
    let month = req.month()?;
    let advisory = agronomy::simple_advisory(req.soil_type.as_deref(), month);

    let farmer = state.farmer_from_headers(&headers).await;
    let user = req
        .user_id
        .as_deref()
        .or(farmer.as_ref().map(|f| f.id.as_str()))
        .unwrap_or("anonymous");

    info!(
        user = %user,
        location = req.location.as_deref().or(req.pincode.as_deref()).unwrap_or("-"),
        language = req.language.as_deref().unwrap_or("-"),
        has_image = req.image.is_some(),
        query_len = req.query.as_deref().map(str::len).unwrap_or(0),
        crop = %advisory.recommended_crop,
        "Advice served"
    );

    Ok(Json(AdviceResponse {
        success: true,
        advisory,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub user_id: Option<String>,
    pub feedback: Option<String>,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub msg: String,
}

/// Acknowledge feedback on an advisory.
pub async fn feedback(Json(req): Json<FeedbackRequest>) -> Json<FeedbackResponse> {
    info!(
        user = req.user_id.as_deref().unwrap_or("anonymous"),
        len = req.feedback.as_deref().map(str::len).unwrap_or(0),
        "Feedback received"
    );

    Json(FeedbackResponse {
        success: true,
        msg: "Feedback recorded. Thank you.".to_string(),
    })
}

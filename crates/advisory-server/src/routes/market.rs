//! Live mandi rates proxied from data.gov.in.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::mandi::{self, MarketRecord, RecordFilter};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MandiQuery {
    pub state: Option<String>,
    pub commodity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MandiResponse {
    pub success: bool,
    pub records: Vec<MarketRecord>,
}

/// Fetch the latest mandi records, optionally narrowed by state and commodity.
pub async fn mandi_rates(
    State(state): State<AppState>,
    Query(query): Query<MandiQuery>,
) -> Result<Json<MandiResponse>> {
    let api_key = state
        .config
        .data_gov_api_key
        .as_deref()
        .ok_or_else(|| ServerError::Unavailable("Market rates not configured".to_string()))?;

    let limit = mandi::FETCH_LIMIT.to_string();
    let body: Value = state
        .http
        .get(&state.config.data_gov_url)
        .query(&[("api-key", api_key), ("format", "json"), ("limit", limit.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let filter = RecordFilter {
        state: query.state,
        commodity: query.commodity,
    };
    let records: Vec<MarketRecord> = mandi::records(&body)
        .into_iter()
        .filter(|record| filter.matches(record))
        .collect();
    debug!(count = records.len(), "Mandi records fetched");

    Ok(Json(MandiResponse {
        success: true,
        records,
    }))
}

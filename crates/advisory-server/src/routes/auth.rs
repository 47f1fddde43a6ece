//! Phone-number login.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::{AppState, Farmer};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: Farmer,
}

/// Issue a session token for a phone number.
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let Some(phone) = req
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
    else {
        let body = serde_json::json!({
            "success": false,
            "message": "Phone required"
        });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    };

    let user = Farmer {
        id: phone.clone(),
        name: "Farmer".to_string(),
        phone,
    };
    let token = state.open_session(user.clone()).await;
    info!(user = %user.id, "Session opened");

    Json(LoginResponse {
        success: true,
        token,
        user,
    })
    .into_response()
}

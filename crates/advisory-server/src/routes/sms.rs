//! Inbound SMS webhook.

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::Deserialize;
use tracing::info;

use crate::agronomy;
use crate::error::{Result, ServerError};

/// Twilio-style inbound message. Lowercase aliases are accepted.
#[derive(Debug, Default, Deserialize)]
pub struct InboundSms {
    #[serde(rename = "Body", alias = "body", default)]
    pub body: String,
    #[serde(rename = "From", alias = "from", default)]
    pub from: Option<String>,
}

/// Parse keywords from the message and reply in plain text.
pub async fn inbound(request: Request) -> Result<String> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let sms = if is_json {
        let Json(sms) = Json::<InboundSms>::from_request(request, &())
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        sms
    } else {
        let Form(sms) = Form::<InboundSms>::from_request(request, &())
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        sms
    };

    let query = agronomy::parse_sms(&sms.body);
    info!(
        from = sms.from.as_deref().unwrap_or("unknown"),
        soil = %query.soil_type,
        pincode = %query.pincode,
        "SMS received"
    );

    Ok(agronomy::sms_reply(&query))
}

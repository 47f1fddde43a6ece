//! Static lookups: market prices, pincode weather and starter questions.

use std::collections::BTreeMap;

use axum::extract::Query;
use axum::Json;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::agronomy;
use crate::error::{Result, ServerError};

#[derive(Serialize)]
pub struct PricesResponse {
    pub success: bool,
    pub prices: BTreeMap<String, String>,
}

pub async fn market_prices() -> Json<PricesResponse> {
    let prices = [
        ("wheat", "₹2000/quintal"),
        ("rice", "₹1800/quintal"),
        ("maize", "₹1600/quintal"),
    ]
    .into_iter()
    .map(|(crop, price)| (crop.to_string(), price.to_string()))
    .collect();

    Json(PricesResponse {
        success: true,
        prices,
    })
}

#[derive(Debug, Deserialize)]
pub struct PincodeQuery {
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayForecast {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    pub temp: f64,
    pub condition: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub today: DayForecast,
    pub next3: Vec<DayForecast>,
}

#[derive(Serialize)]
pub struct ForecastResponse {
    pub success: bool,
    pub pincode: String,
    pub forecast: Forecast,
}

/// Short forecast for a pincode.
pub async fn pincode_weather(Query(query): Query<PincodeQuery>) -> Result<Json<ForecastResponse>> {
    let pincode = query
        .pincode
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ServerError::BadRequest("pincode is required".to_string()))?;

    Ok(Json(ForecastResponse {
        success: true,
        pincode,
        forecast: Forecast {
            today: DayForecast {
                day: None,
                temp: 30.0,
                condition: "Sunny".to_string(),
            },
            next3: vec![DayForecast {
                day: Some("tomorrow".to_string()),
                temp: 29.0,
                condition: "Clouds".to_string(),
            }],
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    pub lang: Option<String>,
}

#[derive(Serialize)]
pub struct QuestionsResponse {
    pub success: bool,
    pub questions: Vec<String>,
}

/// Starter questions for a language. Unknown languages get an empty list.
pub async fn default_questions(Query(query): Query<QuestionsQuery>) -> Json<QuestionsResponse> {
    let lang = query.lang.as_deref().unwrap_or("en");
    let month = chrono::Local::now().month();
    let questions = agronomy::starter_questions(lang, month).unwrap_or_default();

    Json(QuestionsResponse {
        success: true,
        questions,
    })
}

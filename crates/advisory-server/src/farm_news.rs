//! Regional farming news and weather advice.
//!
//! The text comes from a Gemini model asked to answer in a fixed
//! `NEWS: ... ADVICE: ...` layout. Everything around the model is
//! deterministic: prompt, reply parsing and the weather-rule fallback used
//! when the model is unavailable.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

static NEWS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)NEWS:\s*(.*?)(?:ADVICE:|\z)").expect("news pattern compiles")
});
static ADVICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)ADVICE:\s*(.*)").expect("advice pattern compiles"));

/// News and advice shown next to the weather.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmNews {
    pub news: String,
    pub advice: String,
}

impl FarmNews {
    fn new(news: &str, advice: &str) -> Self {
        Self {
            news: news.to_string(),
            advice: advice.to_string(),
        }
    }

    /// Parse a model reply. Missing or empty sections get generic text.
    pub fn parse(reply: &str) -> Self {
        let section = |re: &Regex| {
            re.captures(reply)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
                .filter(|text| !text.is_empty())
        };

        Self::new(
            section(&NEWS_RE).unwrap_or("Monitor local agricultural conditions."),
            section(&ADVICE_RE).unwrap_or("Adjust farming practices based on weather conditions."),
        )
    }

    /// Answer when the model replied without any text.
    pub fn empty_reply() -> Self {
        Self::new(
            "Weather monitoring advised for current conditions.",
            "Monitor weather patterns and adjust farming activities accordingly.",
        )
    }

    /// Answer when the model could not be reached, keyed on the condition.
    pub fn fallback(condition: &str) -> Self {
        let condition = condition.to_lowercase();
        let advice = if condition.contains("rain") {
            "Good time for planting. Ensure proper drainage in fields."
        } else if condition.contains("clear") {
            "Ideal for harvesting. Ensure adequate irrigation for crops."
        } else if condition.contains("cloud") {
            "Moderate conditions. Good for most farming activities."
        } else {
            "Monitor weather and pests carefully."
        };
        Self::new(
            "Unable to fetch latest agricultural news. Check local sources.",
            advice,
        )
    }
}

/// Prompt asking for news and advice in the parseable layout.
pub fn prompt(location: &str, condition: &str) -> String {
    format!(
        "You are an agricultural advisor for Indian farmers. For the location {location}, India, \
         with current weather condition: {condition}.\n\n\
         Please provide:\n\
         1. Recent farming/agricultural news or pest alerts relevant to this region (2-3 sentences)\n\
         2. Practical farming advice based on current weather conditions (2-3 sentences)\n\n\
         Format your response exactly as:\n\
         NEWS: [your news content here]\n\
         ADVICE: [your advice content here]"
    )
}

/// `generateContent` request body for `prompt`.
pub fn request_body(prompt: &str) -> Value {
    let safety: Vec<Value> = [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| json!({"category": category, "threshold": "BLOCK_MEDIUM_AND_ABOVE"}))
    .collect();

    json!({
        "contents": [{"parts": [{"text": prompt}]}],
        "generationConfig": {
            "temperature": 0.7,
            "candidateCount": 1,
            "maxOutputTokens": 200
        },
        "safetySettings": safety
    })
}

/// Text of the first candidate in a `generateContent` response.
pub fn reply_text(response: &Value) -> Option<&str> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_sections() {
        let parsed = FarmNews::parse(
            "NEWS: Locust swarms reported near Bikaner.\nADVICE: Cover nurseries at night.\n",
        );
        assert_eq!(parsed.news, "Locust swarms reported near Bikaner.");
        assert_eq!(parsed.advice, "Cover nurseries at night.");
    }

    #[test]
    fn test_parse_multiline_news_without_advice() {
        let parsed = FarmNews::parse("Intro\nNEWS: Line one.\nLine two.");
        assert_eq!(parsed.news, "Line one.\nLine two.");
        assert_eq!(parsed.advice, "Adjust farming practices based on weather conditions.");
    }

    #[test]
    fn test_parse_unstructured_reply() {
        let parsed = FarmNews::parse("I cannot help with that.");
        assert_eq!(parsed.news, "Monitor local agricultural conditions.");
        assert_eq!(parsed.advice, "Adjust farming practices based on weather conditions.");

        let parsed = FarmNews::parse("NEWS:   ADVICE: Irrigate early.");
        assert_eq!(parsed.news, "Monitor local agricultural conditions.");
        assert_eq!(parsed.advice, "Irrigate early.");
    }

    #[test]
    fn test_fallback_by_condition() {
        assert!(FarmNews::fallback("Light Rain").advice.starts_with("Good time for planting"));
        assert!(FarmNews::fallback("clear sky").advice.starts_with("Ideal for harvesting"));
        assert!(FarmNews::fallback("Clouds").advice.starts_with("Moderate conditions"));
        assert_eq!(
            FarmNews::fallback("Haze").advice,
            "Monitor weather and pests carefully."
        );
        assert!(FarmNews::fallback("Haze").news.starts_with("Unable to fetch"));
    }

    #[test]
    fn test_reply_text() {
        let response = json!({
            "candidates": [{"content": {"parts": [{"text": "NEWS: a ADVICE: b"}]}}]
        });
        assert_eq!(reply_text(&response), Some("NEWS: a ADVICE: b"));
        assert_eq!(reply_text(&json!({"candidates": []})), None);
    }

    #[test]
    fn test_request_body_carries_prompt() {
        let body = request_body(&prompt("Ludhiana", "Rain"));
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("For the location Ludhiana, India"));
        assert!(text.contains("current weather condition: Rain."));
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 200);
    }
}

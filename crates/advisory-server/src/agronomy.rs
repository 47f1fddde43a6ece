//! Rule-based agronomy: season, soil-to-crop and SMS keyword parsing.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Soil assumed when none is given.
pub const DEFAULT_SOIL: &str = "loamy";

/// Pincode placeholder when an SMS carries none.
pub const UNKNOWN_PINCODE: &str = "000000";

/// Advisory returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub recommended_crop: String,
    pub season: String,
    pub fertilizer: String,
    pub notes: String,
}

/// Season for a calendar month: June-September is Kharif, everything else Rabi.
pub fn season_for_month(month: u32) -> &'static str {
    if (6..=9).contains(&month) {
        "Kharif"
    } else {
        "Rabi"
    }
}

/// Crop suited to a soil type.
pub fn crop_for_soil(soil_type: &str) -> &'static str {
    match soil_type.trim().to_lowercase().as_str() {
        "clay" => "Rice",
        "sandy" => "Pearl millet / Maize",
        "loamy" => "Wheat / Vegetables",
        "silt" => "Sugarcane / Rice",
        _ => "Wheat",
    }
}

/// Build an advisory from soil type and month.
pub fn simple_advisory(soil_type: Option<&str>, month: u32) -> Advisory {
    let season = season_for_month(month);
    let soil = soil_type
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SOIL);
    let crop = crop_for_soil(soil);
    let fertilizer = if crop == "Rice" {
        "Urea (split application)"
    } else {
        "General NPK as per soil test"
    };

    Advisory {
        recommended_crop: crop.to_string(),
        season: season.to_string(),
        fertilizer: fertilizer.to_string(),
        notes: format!(
            "Based on {} soil and {} season. Check local market & soil test.",
            soil, season
        ),
    }
}

/// Keywords extracted from an inbound SMS like `"SOIL clay PIN 110038"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsQuery {
    pub soil_type: String,
    pub pincode: String,
}

static SOIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)soil\s+(\w+)").expect("soil pattern compiles"));
static PIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pin\s+(\d{5,6})").expect("pin pattern compiles"));

/// Parse `SOIL <word>` and `PIN <5-6 digits>` keywords, case-insensitively.
///
/// Keywords may sit anywhere in the text, even glued to punctuation. A longer
/// digit run after `PIN` yields its first six digits.
pub fn parse_sms(text: &str) -> SmsQuery {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };

    SmsQuery {
        soil_type: capture(&SOIL_RE).unwrap_or_else(|| DEFAULT_SOIL.to_string()),
        pincode: capture(&PIN_RE).unwrap_or_else(|| UNKNOWN_PINCODE.to_string()),
    }
}

/// Short SMS reply for a parsed query. Only a lowercase `clay` gets rice.
pub fn sms_reply(query: &SmsQuery) -> String {
    let crop = if query.soil_type == "clay" { "Rice" } else { "Wheat" };
    format!("Rec: {}. Reply STOP to end.", crop)
}

/// Season-aware starter questions, or None for an unsupported language.
pub fn starter_questions(language: &str, month: u32) -> Option<Vec<String>> {
    let season = season_for_month(month);
    let questions = match language {
        "en" => vec![
            format!("Which {} crops suit my soil?", season),
            "How much fertilizer do I need?".to_string(),
            "How to prevent pest damage?".to_string(),
        ],
        "hi" => vec![
            format!("मेरी मिट्टी के लिए कौन सी {} फसल सही है?", season),
            "कितना खाद डालना चाहिए?".to_string(),
            "कीट-पतंगों से कैसे बचाव करें?".to_string(),
        ],
        "pa" => vec![
            format!("ਮੇਰੀ ਮਿੱਟੀ ਲਈ ਕਿਹੜੀ {} ਫਸਲ ਠੀਕ ਹੈ?", season),
            "ਕਿੰਨਾ ਖਾਦ ਪਾਉਣਾ ਚਾਹੀਦਾ ਹੈ?".to_string(),
            "ਕੀਟਾਂ ਤੋਂ ਕਿਵੇਂ ਬਚਾਅ ਕਰੀਏ?".to_string(),
        ],
        _ => return None,
    };
    Some(questions)
}

//! Static agronomy catalog: languages, soil types, seasons, regional crops.

use std::fmt;
use std::str::FromStr;

use crate::validation::ValidationError;

/// Supported advisory languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Punjabi,
}

impl Language {
    pub const ALL: [Language; 3] = [Self::English, Self::Hindi, Self::Punjabi];

    /// ISO 639-1 code used on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hindi => "hi",
            Self::Punjabi => "pa",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::English),
            "hi" => Ok(Self::Hindi),
            "pa" => Ok(Self::Punjabi),
            other => Err(ValidationError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// Soil types a farmer can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoilType {
    Clay,
    Sandy,
    Loamy,
    Black,
    Red,
    Silt,
}

impl SoilType {
    pub const ALL: [SoilType; 6] = [
        Self::Clay,
        Self::Sandy,
        Self::Loamy,
        Self::Black,
        Self::Red,
        Self::Silt,
    ];

    /// Identifier used on the wire and in preferences.
    pub fn id(self) -> &'static str {
        match self {
            Self::Clay => "clay",
            Self::Sandy => "sandy",
            Self::Loamy => "loamy",
            Self::Black => "black",
            Self::Red => "red",
            Self::Silt => "silt",
        }
    }

    /// Localized display name.
    pub fn name(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Clay, Language::English) => "Clay Soil",
            (Self::Clay, Language::Hindi) => "चिकनी मिट्टी",
            (Self::Clay, Language::Punjabi) => "ਚਿੱਕੜ ਮਿੱਟੀ",
            (Self::Sandy, Language::English) => "Sandy Soil",
            (Self::Sandy, Language::Hindi) => "बलुई मिट्टी",
            (Self::Sandy, Language::Punjabi) => "ਰੇਤਲੀ ਮਿੱਟੀ",
            (Self::Loamy, Language::English) => "Loamy Soil",
            (Self::Loamy, Language::Hindi) => "दोमट मिट्टी",
            (Self::Loamy, Language::Punjabi) => "ਮਿਸ਼ਰਿਤ ਮਿੱਟੀ",
            (Self::Black, Language::English) => "Black Soil",
            (Self::Black, Language::Hindi) => "काली मिट्टी",
            (Self::Black, Language::Punjabi) => "ਕਾਲੀ ਮਿੱਟੀ",
            (Self::Red, Language::English) => "Red Soil",
            (Self::Red, Language::Hindi) => "लाल मिट्टी",
            (Self::Red, Language::Punjabi) => "ਲਾਲ ਮਿੱਟੀ",
            (Self::Silt, Language::English) => "Silt Soil",
            (Self::Silt, Language::Hindi) => "गाद मिट्टी",
            (Self::Silt, Language::Punjabi) => "ਗਾਦ ਮਿੱਟੀ",
        }
    }
}

impl FromStr for SoilType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|soil| soil.id() == lowered)
            .ok_or_else(|| ValidationError::UnknownSoilType(s.to_string()))
    }
}

/// Indian cropping seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Kharif,
    Rabi,
    Zaid,
}

impl Season {
    pub const ALL: [Season; 3] = [Self::Kharif, Self::Rabi, Self::Zaid];

    /// Calendar months (1-12) belonging to the season.
    pub fn months(self) -> &'static [u32] {
        match self {
            Self::Kharif => &[6, 7, 8, 9, 10],
            Self::Rabi => &[11, 12, 1, 2, 3, 4],
            Self::Zaid => &[4, 5, 6],
        }
    }

    pub fn name(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Kharif, Language::English) => "Kharif",
            (Self::Kharif, Language::Hindi) => "खरीफ",
            (Self::Kharif, Language::Punjabi) => "ਖਰੀਫ",
            (Self::Rabi, Language::English) => "Rabi",
            (Self::Rabi, Language::Hindi) => "रबी",
            (Self::Rabi, Language::Punjabi) => "ਰਬੀ",
            (Self::Zaid, Language::English) => "Zaid",
            (Self::Zaid, Language::Hindi) => "जायद",
            (Self::Zaid, Language::Punjabi) => "ਜ਼ਾਇਦ",
        }
    }

    /// Seasons active in `month`. April and June belong to two seasons.
    pub fn for_month(month: u32) -> Vec<Season> {
        Self::ALL
            .into_iter()
            .filter(|season| season.months().contains(&month))
            .collect()
    }
}

/// Regions with curated crop lists.
pub const KNOWN_REGIONS: [&str; 3] = ["delhi", "punjab", "uttar pradesh"];

/// Whether `location` names a region with curated crop lists.
pub fn is_known_region(location: &str) -> bool {
    KNOWN_REGIONS.contains(&location.trim().to_lowercase().as_str())
}

/// Typical crops for a region and season.
pub fn regional_crops(region: &str, season: Season) -> Option<&'static [&'static str]> {
    let crops: &'static [&'static str] = match (region.trim().to_lowercase().as_str(), season) {
        ("delhi", Season::Kharif) | ("punjab", Season::Kharif) => {
            &["Rice", "Maize", "Cotton", "Sugarcane"]
        }
        ("delhi", Season::Rabi) => &["Wheat", "Barley", "Mustard", "Gram"],
        ("punjab", Season::Rabi) => &["Wheat", "Barley", "Mustard", "Potato"],
        ("uttar pradesh", Season::Kharif) => &["Rice", "Sugarcane", "Cotton", "Maize"],
        ("uttar pradesh", Season::Rabi) => &["Wheat", "Barley", "Mustard", "Peas"],
        ("delhi" | "punjab" | "uttar pradesh", Season::Zaid) => {
            &["Fodder", "Watermelon", "Cucumber"]
        }
        _ => return None,
    };
    Some(crops)
}

/// Crops for every season active in `month` in a known region.
///
/// Empty for regions without curated lists.
pub fn crop_calendar(location: &str, month: u32) -> Vec<(Season, &'static [&'static str])> {
    if !is_known_region(location) {
        return Vec::new();
    }
    Season::for_month(month)
        .into_iter()
        .filter_map(|season| regional_crops(location, season).map(|crops| (season, crops)))
        .collect()
}

/// Emoji for an OpenWeather condition group.
pub fn weather_emoji(condition: &str) -> &'static str {
    match condition.to_lowercase().as_str() {
        "clear" => "☀️",
        "clouds" => "☁️",
        "rain" => "🌧️",
        "drizzle" => "🌦️",
        "snow" => "❄️",
        "thunderstorm" => "⛈️",
        "mist" | "fog" => "🌫️",
        _ => "🌤️",
    }
}

/// Starter questions shown when the backend cannot provide any.
pub fn fallback_questions(language: Language) -> &'static [&'static str] {
    match language {
        Language::English => &[
            "What crops should I plant this season?",
            "How much fertilizer do I need?",
            "When should I harvest my crops?",
            "How to prevent pest damage?",
        ],
        Language::Hindi => &[
            "इस मौसम में कौन सी फसल बोनी चाहिए?",
            "कितना खाद डालना चाहिए?",
            "फसल कब काटनी चाहिए?",
            "कीट-पतंगों से कैसे बचाव करें?",
        ],
        Language::Punjabi => &[
            "ਇਸ ਮੌਸਮ ਵਿੱਚ ਕਿਹੜੀ ਫਸਲ ਬੀਜਣੀ ਚਾਹੀਦੀ ਹੈ?",
            "ਕਿੰਨਾ ਖਾਦ ਪਾਉਣਾ ਚਾਹੀਦਾ ਹੈ?",
            "ਫਸਲ ਕਦੋਂ ਕੱਟਣੀ ਚਾਹੀਦੀ ਹੈ?",
            "ਕੀਟਾਂ ਤੋਂ ਕਿਵੇਂ ਬਚਾਅ ਕਰੀਏ?",
        ],
    }
}

//! Mandi (wholesale market) rates from the data.gov.in price resource.

use serde::Serialize;
use serde_json::Value;

/// Records requested from data.gov.in per call.
pub const FETCH_LIMIT: u32 = 100;

/// One commodity price at one market on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
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

/// Map a raw data.gov.in record onto [`MarketRecord`].
///
/// Fields may arrive as strings or numbers; absent ones become empty.
pub fn normalize(record: &Value) -> MarketRecord {
    let field = |name: &str| match record.get(name) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    MarketRecord {
        state: field("State"),
        district: field("District"),
        market: field("Market"),
        commodity: field("Commodity"),
        variety: field("Variety"),
        grade: field("Grade"),
        date: field("Arrival_Date"),
        min_price: field("Min Price"),
        max_price: field("Max Price"),
        modal_price: field("Modal Price"),
    }
}

/// Normalize the `records` array of a response body. A missing array is empty.
pub fn records(body: &Value) -> Vec<MarketRecord> {
    body.get("records")
        .and_then(Value::as_array)
        .map(|records| records.iter().map(normalize).collect())
        .unwrap_or_default()
}

/// Case-insensitive filter on state and commodity.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub state: Option<String>,
    pub commodity: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &MarketRecord) -> bool {
        let same = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map_or(true, |w| w.eq_ignore_ascii_case(actual.trim()))
        };
        same(&self.state, &record.state) && same(&self.commodity, &record.commodity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> Value {
        json!({
            "State": "Punjab",
            "District": "Ludhiana",
            "Market": "Khanna",
            "Commodity": "Wheat",
            "Variety": "Dara",
            "Grade": "FAQ",
            "Arrival_Date": "10/06/2024",
            "Min Price": "2275",
            "Max Price": 2300,
            "Modal Price": "2290"
        })
    }

    #[test]
    fn test_normalize() {
        let record = normalize(&raw());
        assert_eq!(record.market, "Khanna");
        assert_eq!(record.date, "10/06/2024");
        assert_eq!(record.min_price, "2275");
        assert_eq!(record.max_price, "2300");
        assert_eq!(
            serde_json::to_value(&record).unwrap()["modalPrice"],
            "2290"
        );
    }

    #[test]
    fn test_normalize_missing_fields() {
        let record = normalize(&json!({"Commodity": "Onion"}));
        assert_eq!(record.commodity, "Onion");
        assert_eq!(record.state, "");
        assert_eq!(record.modal_price, "");
    }

    #[test]
    fn test_records_without_array() {
        assert!(records(&json!({"message": "Invalid key"})).is_empty());
        assert_eq!(records(&json!({"records": [raw(), raw()]})).len(), 2);
    }

    #[test]
    fn test_filter() {
        let record = normalize(&raw());
        assert!(RecordFilter::default().matches(&record));

        let filter = RecordFilter {
            state: Some("punjab".to_string()),
            commodity: Some(" WHEAT ".to_string()),
        };
        assert!(filter.matches(&record));

        let filter = RecordFilter {
            commodity: Some("rice".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&record));
    }
}

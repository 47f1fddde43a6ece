//! Request validation rules.
//!
//! Validation runs before a request touches the network or the offline
//! queue, so a malformed request is never persisted.

use thiserror::Error;

use crate::catalog::{Language, SoilType};

/// Minimum query length in characters, after trimming.
pub const MIN_QUERY_LEN: usize = 3;

/// Maximum query length in characters.
pub const MAX_QUERY_LEN: usize = 500;

/// Validation errors for outbound requests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("query cannot be empty")]
    EmptyQuery,

    #[error("query too short (min {} characters)", MIN_QUERY_LEN)]
    QueryTooShort,

    #[error("query too long (max {} characters)", MAX_QUERY_LEN)]
    QueryTooLong,

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("unknown soil type: {0}")]
    UnknownSoilType(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid pincode: {0}")]
    InvalidPincode(String),

    #[error("invalid coordinates: {lat}, {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

/// Validate free-text advisory query.
pub fn validate_query(query: &str) -> Result<(), ValidationError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    if trimmed.chars().count() < MIN_QUERY_LEN {
        return Err(ValidationError::QueryTooShort);
    }
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::QueryTooLong);
    }
    Ok(())
}

/// Validate a language code.
pub fn validate_language(language: &str) -> Result<Language, ValidationError> {
    language.parse()
}

/// Validate a soil type code.
pub fn validate_soil_type(soil_type: &str) -> Result<SoilType, ValidationError> {
    soil_type.parse()
}

/// Require a non-blank value.
pub fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Validate an Indian postal pincode (5-6 digits).
pub fn validate_pincode(pincode: &str) -> Result<(), ValidationError> {
    let valid = (5..=6).contains(&pincode.len()) && pincode.chars().all(|c| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidPincode(pincode.to_string()))
    }
}

/// Validate latitude/longitude ranges.
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinates { lat, lon })
    }
}

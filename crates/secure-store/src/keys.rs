//! Well-known storage keys.
//!
//! Each key holds one independently readable/writable string blob. There is
//! no atomicity across keys.

/// Bearer token for the backend.
pub const TOKEN_KEY: &str = "token";

/// JSON array of pending offline messages.
pub const QUEUE_KEY: &str = "krishi_offline_queue";

/// JSON array of messages that exhausted their replay attempts.
pub const DEAD_LETTER_KEY: &str = "krishi_offline_queue_failed";

/// Preferred UI/advisory language code.
pub const LANGUAGE_KEY: &str = "krishi_language";

/// Preferred location (region name or pincode).
pub const LOCATION_KEY: &str = "krishi_location";

/// Preferred soil type code.
pub const SOIL_TYPE_KEY: &str = "krishi_soil_type";

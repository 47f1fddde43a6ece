//! Store models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Entry {
    /// Storage key.
    pub key: String,
    /// Serialized value.
    pub value: String,
    /// Last update timestamp.
    pub updated_at: String,
}

//! Single-value user preferences (language, location, soil type).

use crate::keys::{LANGUAGE_KEY, LOCATION_KEY, SOIL_TYPE_KEY};
use crate::trait_def::KeyValueStore;
use crate::Result;

/// A preference slot backed by its own storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    Language,
    Location,
    SoilType,
}

impl PreferenceKey {
    /// All preference slots.
    pub const ALL: [PreferenceKey; 3] = [Self::Language, Self::Location, Self::SoilType];

    /// Storage key for this slot.
    pub fn key(self) -> &'static str {
        match self {
            Self::Language => LANGUAGE_KEY,
            Self::Location => LOCATION_KEY,
            Self::SoilType => SOIL_TYPE_KEY,
        }
    }
}

/// Create or update a preference entry.
pub async fn upsert_preference(
    store: &dyn KeyValueStore,
    slot: PreferenceKey,
    value: &str,
) -> Result<()> {
    store.set(slot.key(), value).await
}

/// Get a preference value.
pub async fn get_preference(store: &dyn KeyValueStore, slot: PreferenceKey) -> Result<Option<String>> {
    store.get(slot.key()).await
}

/// Clear a preference entry.
pub async fn clear_preference(store: &dyn KeyValueStore, slot: PreferenceKey) -> Result<()> {
    store.delete(slot.key()).await
}

/// Clear all preferences.
pub async fn clear_all(store: &dyn KeyValueStore) -> Result<()> {
    for slot in PreferenceKey::ALL {
        store.delete(slot.key()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn test_preferences_are_independent() {
        let store = MemoryStore::new();
        upsert_preference(&store, PreferenceKey::Language, "hi").await.unwrap();
        upsert_preference(&store, PreferenceKey::SoilType, "clay").await.unwrap();

        assert_eq!(
            get_preference(&store, PreferenceKey::Language).await.unwrap().as_deref(),
            Some("hi")
        );
        assert!(get_preference(&store, PreferenceKey::Location).await.unwrap().is_none());

        clear_preference(&store, PreferenceKey::Language).await.unwrap();
        assert!(get_preference(&store, PreferenceKey::Language).await.unwrap().is_none());
        assert_eq!(
            get_preference(&store, PreferenceKey::SoilType).await.unwrap().as_deref(),
            Some("clay")
        );

        clear_all(&store).await.unwrap();
        assert!(store.is_empty().await);
    }
}

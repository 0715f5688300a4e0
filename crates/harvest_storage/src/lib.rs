use harvest_core::config::{StorageConfig, StorageKind};
use harvest_core::{ContentStorage, Result};
use std::sync::Arc;

pub mod backends;

pub use backends::*;

/// Opens the backend selected in configuration.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ContentStorage>> {
    match config.backend {
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => Ok(Arc::new(SqliteStorage::open(&config.path).await?)),
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => Err(harvest_core::Error::Config(
            "this build has no sqlite support; use backend = \"memory\"".to_string(),
        )),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}

#[cfg(test)]
pub(crate) mod test_utils {
    use chrono::{Duration, TimeZone, Utc};
    use harvest_core::{ComplexityTier, ContentRecord, ContentType};

    pub fn record(link: &str, title: &str, content_type: ContentType, day: i64) -> ContentRecord {
        let published_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day);
        ContentRecord {
            title: title.to_string(),
            body: format!("# {}", title),
            source_name: "Test".to_string(),
            source_link: link.to_string(),
            content_type,
            tags: vec!["AI".to_string(), "Test".to_string()],
            published_at,
            ingested_at: published_at,
            summary: title.to_string(),
            reading_minutes: 1,
            complexity_tier: ComplexityTier::Beginner,
        }
    }
}

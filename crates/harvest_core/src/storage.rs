use async_trait::async_trait;
use crate::types::{ContentQuery, ContentRecord};
use crate::Result;

#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Insert or fully replace the record keyed by `source_link`.
    /// The store stamps `ingested_at` and returns what it persisted.
    async fn upsert(&self, record: ContentRecord) -> Result<ContentRecord>;

    /// Filtered read, newest `published_at` first.
    async fn query(&self, query: &ContentQuery) -> Result<Vec<ContentRecord>>;

    /// Look up a single record by its identity key
    async fn get(&self, source_link: &str) -> Result<Option<ContentRecord>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;
}

use async_trait::async_trait;
use chrono::Utc;
use harvest_core::{ContentQuery, ContentRecord, ContentStorage, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, ContentRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, mut record: ContentRecord) -> ContentRecord {
        record.ingested_at = Utc::now();
        self.records.insert(record.source_link.clone(), record.clone());
        record
    }

    pub fn query(&self, query: &ContentQuery) -> Vec<ContentRecord> {
        let mut records = self
            .records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect::<Vec<_>>();
        records.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        records.truncate(query.limit);
        records
    }

    pub fn get(&self, source_link: &str) -> Option<ContentRecord> {
        self.records.get(source_link).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Process-local store. Writes are serialized by the lock, so concurrent
/// upserts to one link end up as one of the written records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStorage for MemoryStorage {
    async fn upsert(&self, record: ContentRecord) -> Result<ContentRecord> {
        let mut store = self.store.write().await;
        Ok(store.upsert(record))
    }

    async fn query(&self, query: &ContentQuery) -> Result<Vec<ContentRecord>> {
        let store = self.store.read().await;
        Ok(store.query(query))
    }

    async fn get(&self, source_link: &str) -> Result<Option<ContentRecord>> {
        let store = self.store.read().await;
        Ok(store.get(source_link))
    }

    async fn count(&self) -> Result<usize> {
        let store = self.store.read().await;
        Ok(store.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::record;
    use harvest_core::ContentType;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage
            .upsert(record("https://a.test/1", "First", ContentType::News, 1))
            .await
            .unwrap();

        let stored = storage.get("https://a.test/1").await.unwrap().unwrap();
        assert_eq!(stored.title, "First");
        assert_eq!(storage.count().await.unwrap(), 1);
        assert!(storage.get("https://a.test/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_link() {
        let storage = MemoryStorage::new();
        let first = storage
            .upsert(record("https://a.test/1", "First", ContentType::News, 1))
            .await
            .unwrap();
        let mut second = record("https://a.test/1", "Second", ContentType::Research, 2);
        second.tags = vec!["AI".to_string()];
        let second = storage.upsert(second).await.unwrap();

        assert_eq!(storage.count().await.unwrap(), 1);
        let stored = storage.get("https://a.test/1").await.unwrap().unwrap();
        assert_eq!(stored.title, "Second");
        assert_eq!(stored.content_type, ContentType::Research);
        assert_eq!(stored.tags, vec!["AI".to_string()]);
        assert!(second.ingested_at >= first.ingested_at);
    }

    #[tokio::test]
    async fn test_query_filters_and_order() {
        let storage = MemoryStorage::new();
        storage.upsert(record("https://a.test/1", "Old news", ContentType::News, 1)).await.unwrap();
        storage.upsert(record("https://a.test/2", "Paper", ContentType::Research, 2)).await.unwrap();
        storage.upsert(record("https://a.test/3", "New news", ContentType::News, 3)).await.unwrap();

        let news = storage
            .query(&ContentQuery::new().with_type(ContentType::News))
            .await
            .unwrap();
        let titles: Vec<_> = news.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["New news", "Old news"]);

        let limited = storage.query(&ContentQuery::new().with_limit(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].title, "New news");
    }

    #[tokio::test]
    async fn test_tag_filter_is_exact_membership() {
        let storage = MemoryStorage::new();
        let mut tagged = record("https://a.test/1", "Tagged", ContentType::News, 1);
        tagged.tags = vec!["AI".to_string(), "machine learning".to_string()];
        storage.upsert(tagged).await.unwrap();

        let hit = storage.query(&ContentQuery::new().with_tag("machine learning")).await.unwrap();
        assert_eq!(hit.len(), 1);
        let miss = storage.query(&ContentQuery::new().with_tag("A")).await.unwrap();
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_same_link() {
        let storage = MemoryStorage::new();
        let writes = (0..16).map(|i| {
            let storage = storage.clone();
            tokio::spawn(async move {
                storage
                    .upsert(record("https://a.test/same", &format!("v{}", i), ContentType::News, i))
                    .await
            })
        });
        for handle in futures::future::join_all(writes).await {
            handle.unwrap().unwrap();
        }

        assert_eq!(storage.count().await.unwrap(), 1);
        let stored = storage.get("https://a.test/same").await.unwrap().unwrap();
        assert!(stored.title.starts_with('v'));
    }
}

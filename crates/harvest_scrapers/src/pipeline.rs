//! Runs every configured source through extract -> normalize -> store.
//!
//! A failing source never affects the others. The run itself always
//! completes and reports what happened in a [`RunSummary`].

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use harvest_core::{normalize, ContentStorage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::extractors::Extractor;
use crate::fetcher::Fetcher;
use crate::logging::Logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Store => write!(f, "store"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceError {
    pub source: String,
    pub stage: Stage,
    pub message: String,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed during {}: {}", self.source, self.stage, self.message)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records stored per source. Every source of the run has an entry.
    pub ingested: BTreeMap<String, usize>,
    /// Raw items rejected by normalization, per source.
    pub dropped: BTreeMap<String, usize>,
    pub errors: Vec<SourceError>,
}

impl RunSummary {
    pub fn total_ingested(&self) -> usize {
        self.ingested.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug)]
struct SourceOutcome {
    source: String,
    ingested: usize,
    dropped: usize,
    error: Option<SourceError>,
}

impl SourceOutcome {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ingested: 0,
            dropped: 0,
            error: None,
        }
    }

    fn fail(mut self, stage: Stage, message: String) -> Self {
        self.error = Some(SourceError {
            source: self.source.clone(),
            stage,
            message,
        });
        self
    }
}

pub struct Pipeline {
    storage: Arc<dyn ContentStorage>,
    fetcher: Arc<dyn Fetcher>,
    concurrency: usize,
    logger: Logger,
}

impl Pipeline {
    pub fn new(storage: Arc<dyn ContentStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            storage,
            fetcher,
            concurrency: 1,
            logger: Logger::new(),
        }
    }

    /// Number of sources processed at once. `1` keeps sources sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub async fn run(&self, extractors: &[Extractor]) -> RunSummary {
        let started_at = Utc::now();
        self.logger
            .info(&format!("🚀 starting run over {} sources", extractors.len()));

        let mut outcomes: Vec<(usize, SourceOutcome)> = if self.concurrency > 1 {
            stream::iter(extractors.iter().enumerate())
                .map(|(i, extractor)| async move { (i, self.run_source(extractor).await) })
                .buffer_unordered(self.concurrency)
                .collect()
                .await
        } else {
            let mut outcomes = Vec::with_capacity(extractors.len());
            for (i, extractor) in extractors.iter().enumerate() {
                outcomes.push((i, self.run_source(extractor).await));
            }
            outcomes
        };
        outcomes.sort_by_key(|(i, _)| *i);

        let mut summary = RunSummary {
            started_at,
            finished_at: started_at,
            ingested: BTreeMap::new(),
            dropped: BTreeMap::new(),
            errors: Vec::new(),
        };
        for (_, outcome) in outcomes {
            *summary.ingested.entry(outcome.source.clone()).or_default() += outcome.ingested;
            if outcome.dropped > 0 {
                *summary.dropped.entry(outcome.source.clone()).or_default() += outcome.dropped;
            }
            if let Some(error) = outcome.error {
                summary.errors.push(error);
            }
        }
        summary.finished_at = Utc::now();

        self.logger.info(&format!(
            "✅ run finished: {} records stored, {} sources failed",
            summary.total_ingested(),
            summary.errors.len()
        ));
        summary
    }

    async fn run_source(&self, extractor: &Extractor) -> SourceOutcome {
        let name = extractor.name();
        let log = self.logger.clone().with_new_prefixes(format!("[{}]", name));
        let mut outcome = SourceOutcome::new(name);

        log.info("🔍 extracting");
        let items = match extractor.fetch(self.fetcher.as_ref(), &log).await {
            Ok(items) => items,
            Err(e) => {
                log.error(&format!("extraction failed: {}", e));
                return outcome.fail(Stage::Extract, e.to_string());
            }
        };

        let ctx = extractor.context();
        for raw in items {
            let record = match normalize(raw, &ctx) {
                Ok(record) => record,
                Err(e) => {
                    log.debug(&format!("dropping item: {}", e));
                    outcome.dropped += 1;
                    continue;
                }
            };

            if let Err(e) = self.storage.upsert(record).await {
                log.error(&format!("storage failed, stopping source: {}", e));
                return outcome.fail(Stage::Store, e.to_string());
            }
            outcome.ingested += 1;
        }

        log.info(&format!("💾 stored {} records", outcome.ingested));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::build_extractors;
    use crate::test_utils::{StaticFetcher, ARXIV_FEED, NEWS_PAGE};
    use async_trait::async_trait;
    use harvest_core::{
        ContentQuery, ContentRecord, ContentType, Error, Result, SelectorStrategy, SourceConfig,
    };
    use harvest_storage::MemoryStorage;

    const ARXIV_URL: &str = "http://export.arxiv.org/api/query";
    const TECHCRUNCH_URL: &str = "https://techcrunch.com/category/artificial-intelligence/";
    const WIRED_URL: &str = "https://www.wired.com/category/gear/artificial-intelligence/";

    fn sources() -> Vec<SourceConfig> {
        vec![
            SourceConfig::arxiv("ArXiv", ARXIV_URL, &["machine learning"]),
            SourceConfig::html(
                "TechCrunch",
                TECHCRUNCH_URL,
                vec![SelectorStrategy::new(
                    "div.post-block",
                    "h2.post-block__title",
                    Some("div.post-block__content"),
                )],
            ),
            SourceConfig::html(
                "Wired",
                WIRED_URL,
                vec![SelectorStrategy::new("div.content-list-item", "h2", None)],
            ),
        ]
    }

    fn healthy_fetcher() -> StaticFetcher {
        StaticFetcher::new()
            .with_body(ARXIV_URL, ARXIV_FEED)
            .with_body(TECHCRUNCH_URL, NEWS_PAGE)
    }

    struct FailingStorage;

    #[async_trait]
    impl ContentStorage for FailingStorage {
        async fn upsert(&self, _record: ContentRecord) -> Result<ContentRecord> {
            Err(Error::Storage("disk full".to_string()))
        }

        async fn query(&self, _query: &ContentQuery) -> Result<Vec<ContentRecord>> {
            Ok(Vec::new())
        }

        async fn get(&self, _source_link: &str) -> Result<Option<ContentRecord>> {
            Ok(None)
        }

        async fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(healthy_fetcher().with_timeout(WIRED_URL));
        let pipeline = Pipeline::new(storage.clone(), fetcher);

        let summary = pipeline.run(&build_extractors(&sources()).unwrap()).await;

        assert_eq!(summary.ingested["ArXiv"], 2);
        assert_eq!(summary.ingested["TechCrunch"], 2);
        assert_eq!(summary.ingested["Wired"], 0);
        assert_eq!(summary.total_ingested(), 4);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].source, "Wired");
        assert_eq!(summary.errors[0].stage, Stage::Extract);
        assert!(summary.errors[0].message.contains("timed out"));
        assert!(summary.finished_at >= summary.started_at);
        assert_eq!(storage.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_all_sources_failing() {
        let storage = Arc::new(MemoryStorage::new());
        let pipeline = Pipeline::new(storage.clone(), Arc::new(StaticFetcher::new()));

        let summary = pipeline.run(&build_extractors(&sources()).unwrap()).await;

        assert_eq!(summary.ingested.len(), 3);
        assert_eq!(summary.total_ingested(), 0);
        assert_eq!(summary.errors.len(), 3);
        assert!(!summary.is_clean());
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rerun_replaces_records() {
        let storage = Arc::new(MemoryStorage::new());
        let pipeline = Pipeline::new(storage.clone(), Arc::new(healthy_fetcher()));
        let extractors = build_extractors(&sources()[..2]).unwrap();

        let first = pipeline.run(&extractors).await;
        assert!(first.is_clean());
        let before = storage
            .get("https://techcrunch.com/2024/05/01/chips/")
            .await
            .unwrap()
            .unwrap();

        let second = pipeline.run(&extractors).await;
        assert_eq!(second.total_ingested(), 4);
        assert_eq!(storage.count().await.unwrap(), 4);

        let after = storage
            .get("https://techcrunch.com/2024/05/01/chips/")
            .await
            .unwrap()
            .unwrap();
        assert!(after.ingested_at >= before.ingested_at);
        assert_eq!(after.title, "Chip startup raises funds");
    }

    #[tokio::test]
    async fn test_records_are_queryable_by_type() {
        let storage = Arc::new(MemoryStorage::new());
        let pipeline = Pipeline::new(storage.clone(), Arc::new(healthy_fetcher()));
        pipeline.run(&build_extractors(&sources()[..2]).unwrap()).await;

        let research = storage
            .query(&ContentQuery::new().with_type(ContentType::Research))
            .await
            .unwrap();
        assert_eq!(research.len(), 2);
        assert!(research.iter().all(|r| r.source_name == "ArXiv"));
        assert!(research[0].has_tag("AI"));
        assert!(research[0].has_tag("machine learning"));

        let news = storage
            .query(&ContentQuery::new().with_type(ContentType::News).with_tag("TechCrunch"))
            .await
            .unwrap();
        assert_eq!(news.len(), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_stops_source() {
        let fetcher = Arc::new(healthy_fetcher());
        let pipeline = Pipeline::new(Arc::new(FailingStorage), fetcher);

        let summary = pipeline.run(&build_extractors(&sources()[..2]).unwrap()).await;

        assert_eq!(summary.total_ingested(), 0);
        assert_eq!(summary.errors.len(), 2);
        assert!(summary.errors.iter().all(|e| e.stage == Stage::Store));
        assert_eq!(summary.errors[0].source, "ArXiv");
    }

    #[tokio::test]
    async fn test_concurrent_run_matches_sequential() {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(healthy_fetcher().with_timeout(WIRED_URL));
        let pipeline = Pipeline::new(storage.clone(), fetcher).with_concurrency(3);

        let summary = pipeline.run(&build_extractors(&sources()).unwrap()).await;

        assert_eq!(summary.total_ingested(), 4);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].source, "Wired");
        assert_eq!(storage.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_summary_serializes() {
        let pipeline = Pipeline::new(Arc::new(MemoryStorage::new()), Arc::new(StaticFetcher::new()));
        let summary = pipeline.run(&build_extractors(&sources()[2..]).unwrap()).await;

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["ingested"]["Wired"], 0);
        assert_eq!(json["errors"][0]["stage"], "extract");
    }
}

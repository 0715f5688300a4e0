//! TOML configuration for the harvester.
//!
//! ```toml
//! [storage]
//! backend = "sqlite"
//! path = "ai_info_database.sqlite"
//!
//! [http]
//! timeout_secs = 10
//!
//! [[sources]]
//! kind = "arxiv"
//! name = "ArXiv"
//! base_url = "http://export.arxiv.org/api/query"
//! search_terms = ["machine learning"]
//!
//! [[sources]]
//! kind = "html"
//! name = "Wired"
//! base_url = "https://www.wired.com/category/gear/artificial-intelligence/"
//! [[sources.strategies]]
//! item = "div.content-list-item"
//! title = "h2"
//! ```
//!
//! Every section is optional. A missing `sources` list means the built-in
//! source set.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            http: HttpConfig::default(),
            pipeline: PipelineConfig::default(),
            schedule: ScheduleConfig::default(),
            sources: default_sources(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_kind")]
    pub backend: StorageKind,
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_kind(),
            path: default_db_path(),
        }
    }
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Sqlite
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ai_info_database.sqlite")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sources processed at the same time. 1 means strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local wall-clock time of the daily run, `HH:MM`.
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_at: default_daily_at(),
        }
    }
}

fn default_daily_at() -> String {
    "09:00".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[serde(alias = "structured-api")]
    Arxiv,
    #[serde(alias = "html-scraped")]
    Html,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Arxiv => "arxiv",
            SourceKind::Html => "html",
        }
    }

    /// Content type declared for sources that do not set one.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            SourceKind::Arxiv => "research",
            SourceKind::Html => "news",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorStrategy {
    /// Container selector, one match per item.
    pub item: String,
    pub title: String,
    #[serde(default = "default_link_selector")]
    pub link: String,
    #[serde(default)]
    pub summary: Option<String>,
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}

impl SelectorStrategy {
    pub fn new(item: &str, title: &str, summary: Option<&str>) -> Self {
        Self {
            item: item.to_string(),
            title: title.to_string(),
            link: default_link_selector(),
            summary: summary.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub name: String,
    pub base_url: String,
    /// Category/tag override for items of this source.
    #[serde(default)]
    pub label: Option<String>,
    /// Declared content type for every item of this source. Left out, it is
    /// filled from the source kind on load; an unknown value makes items
    /// fall back to keyword categorization.
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default)]
    pub strategies: Vec<SelectorStrategy>,
}

fn default_max_results() -> u32 {
    100
}

fn default_lookback_days() -> i64 {
    30
}

pub const MAX_LOOKBACK_DAYS: i64 = 36500;

impl SourceConfig {
    pub fn arxiv(name: &str, base_url: &str, search_terms: &[&str]) -> Self {
        Self {
            kind: SourceKind::Arxiv,
            name: name.to_string(),
            base_url: base_url.to_string(),
            label: None,
            content_type: Some(SourceKind::Arxiv.default_content_type().to_string()),
            search_terms: search_terms.iter().map(|t| t.to_string()).collect(),
            max_results: default_max_results(),
            lookback_days: default_lookback_days(),
            strategies: Vec::new(),
        }
    }

    pub fn html(name: &str, base_url: &str, strategies: Vec<SelectorStrategy>) -> Self {
        Self {
            kind: SourceKind::Html,
            name: name.to_string(),
            base_url: base_url.to_string(),
            label: None,
            content_type: Some(SourceKind::Html.default_content_type().to_string()),
            search_terms: Vec::new(),
            max_results: default_max_results(),
            lookback_days: default_lookback_days(),
            strategies,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("source name must not be empty".to_string()));
        }
        Url::parse(&self.base_url).map_err(|e| {
            Error::Config(format!("source {}: invalid base_url {}: {}", self.name, self.base_url, e))
        })?;
        match self.kind {
            SourceKind::Arxiv if self.search_terms.is_empty() => Err(Error::Config(format!(
                "source {}: arxiv sources need at least one search term",
                self.name
            ))),
            SourceKind::Arxiv if self.max_results == 0 => Err(Error::Config(format!(
                "source {}: max_results must be positive",
                self.name
            ))),
            SourceKind::Arxiv if !(1..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days) => {
                Err(Error::Config(format!(
                    "source {}: lookback_days must be between 1 and {}",
                    self.name, MAX_LOOKBACK_DAYS
                )))
            }
            SourceKind::Html if self.strategies.is_empty() => Err(Error::Config(format!(
                "source {}: html sources need at least one selector strategy",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::arxiv(
            "ArXiv",
            "http://export.arxiv.org/api/query",
            &[
                "artificial intelligence",
                "machine learning",
                "deep learning",
                "natural language processing",
                "computer vision",
            ],
        ),
        SourceConfig::html(
            "VentureBeat",
            "https://venturebeat.com/category/ai/",
            vec![
                SelectorStrategy::new(
                    "article.article, article.article-content, article.post, div.article, div.article-content, div.post",
                    "h1.article-title, h2.article-title, h3.article-title, h1.title, h2.title, h3.title",
                    Some("p.article-excerpt, div.article-excerpt, p.excerpt, div.excerpt"),
                ),
                SelectorStrategy::new("article", "h2, h3", None),
            ],
        ),
        SourceConfig::html(
            "TechCrunch",
            "https://techcrunch.com/category/artificial-intelligence/",
            vec![
                SelectorStrategy::new(
                    "div.post-block",
                    "h2.post-block__title",
                    Some("div.post-block__content"),
                ),
                SelectorStrategy::new("article", "h2, h3", None),
            ],
        ),
        SourceConfig::html(
            "Wired",
            "https://www.wired.com/category/gear/artificial-intelligence/",
            vec![SelectorStrategy::new(
                "div.content-list-item",
                "h2",
                Some("p.summary"),
            )],
        ),
    ]
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(raw).map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        for source in &mut config.sources {
            if source.content_type.is_none() {
                source.content_type = Some(source.kind.default_content_type().to_string());
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(Error::Config("http.timeout_secs must be positive".to_string()));
        }
        if self.pipeline.concurrency == 0 {
            return Err(Error::Config("pipeline.concurrency must be positive".to_string()));
        }
        let mut names = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(Error::Config(format!("duplicate source name: {}", source.name)));
            }
        }
        Ok(())
    }
}

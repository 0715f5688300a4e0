use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Canonical unit of storage. `source_link` is the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title: String,
    pub body: String,
    pub source_name: String,
    pub source_link: String,
    pub content_type: ContentType,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub summary: String,
    pub reading_minutes: u32,
    pub complexity_tier: ComplexityTier,
}

impl ContentRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Research,
    Product,
    News,
    Blog,
    Analysis,
    General,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Research => "research",
            ContentType::Product => "product",
            ContentType::News => "news",
            ContentType::Blog => "blog",
            ContentType::Analysis => "analysis",
            ContentType::General => "general",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "research" => Ok(ContentType::Research),
            "product" => Ok(ContentType::Product),
            "news" => Ok(ContentType::News),
            "blog" => Ok(ContentType::Blog),
            "analysis" => Ok(ContentType::Analysis),
            "general" => Ok(ContentType::General),
            other => Err(Error::Normalization(format!("Unknown content type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl ComplexityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityTier::Beginner => "beginner",
            ComplexityTier::Intermediate => "intermediate",
            ComplexityTier::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplexityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(ComplexityTier::Beginner),
            "intermediate" => Ok(ComplexityTier::Intermediate),
            "advanced" => Ok(ComplexityTier::Advanced),
            other => Err(Error::Storage(format!("Unknown complexity tier: {}", other))),
        }
    }
}

/// Whatever one upstream element carried, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub authors: Vec<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    /// Timestamp exactly as the source printed it.
    pub published: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    /// Overrides the configured source name for aggregating sources.
    pub source: Option<String>,
}

/// Filters for read-only retrieval. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentQuery {
    pub content_type: Option<ContentType>,
    pub tag: Option<String>,
    pub limit: usize,
}

pub const DEFAULT_QUERY_LIMIT: usize = 10;

impl Default for ContentQuery {
    fn default() -> Self {
        Self {
            content_type: None,
            tag: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl ContentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, record: &ContentRecord) -> bool {
        if let Some(content_type) = self.content_type {
            if record.content_type != content_type {
                return false;
            }
        }
        match &self.tag {
            Some(tag) => record.has_tag(tag),
            None => true,
        }
    }
}

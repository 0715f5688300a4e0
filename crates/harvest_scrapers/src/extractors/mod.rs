use async_trait::async_trait;
use harvest_core::{Result, RawItem, SourceConfig, SourceContext, SourceKind};

use crate::fetcher::Fetcher;
use crate::logging::Logger;

pub mod arxiv;
pub mod html;
use arxiv::ArxivExtractor;
use html::HtmlExtractor;

#[async_trait]
pub trait Extract: Send + Sync {
    /// The source definition this extractor was built from
    fn config(&self) -> &SourceConfig;

    /// Fetches every raw item the source currently offers.
    /// Any network or parse failure fails the whole source.
    async fn fetch(&self, fetcher: &dyn Fetcher, log: &Logger) -> Result<Vec<RawItem>>;
}

/// Enum that holds all supported source kinds
#[derive(Debug, Clone)]
pub enum Extractor {
    Arxiv(ArxivExtractor),
    Html(HtmlExtractor),
}

impl Extractor {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        config.validate()?;
        match config.kind {
            SourceKind::Arxiv => Ok(Extractor::Arxiv(ArxivExtractor::new(config.clone())?)),
            SourceKind::Html => Ok(Extractor::Html(HtmlExtractor::new(config.clone())?)),
        }
    }

    pub fn config(&self) -> &SourceConfig {
        match self {
            Extractor::Arxiv(e) => e.config(),
            Extractor::Html(e) => e.config(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config().name
    }

    pub fn context(&self) -> SourceContext {
        let config = self.config();
        let ctx = SourceContext::new(config.name.clone(), config.kind);
        match &config.label {
            Some(label) => ctx.with_label(label.clone()),
            None => ctx,
        }
    }

    pub async fn fetch(&self, fetcher: &dyn Fetcher, log: &Logger) -> Result<Vec<RawItem>> {
        match self {
            Extractor::Arxiv(e) => e.fetch(fetcher, log).await,
            Extractor::Html(e) => e.fetch(fetcher, log).await,
        }
    }
}

/// Builds one extractor per configured source, failing on the first bad one.
pub fn build_extractors(sources: &[SourceConfig]) -> Result<Vec<Extractor>> {
    sources.iter().map(Extractor::from_config).collect()
}

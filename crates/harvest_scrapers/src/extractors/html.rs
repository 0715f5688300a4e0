use async_trait::async_trait;
use harvest_core::{Error, RawItem, Result, SelectorStrategy, SourceConfig};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use super::Extract;
use crate::fetcher::{FetchProfile, Fetcher};
use crate::logging::Logger;

#[derive(Debug, Clone)]
struct CompiledStrategy {
    item: Selector,
    title: Selector,
    link: Selector,
    summary: Option<Selector>,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::Config(format!("invalid selector `{}`: {:?}", selector, e)))
}

impl CompiledStrategy {
    fn new(strategy: &SelectorStrategy) -> Result<Self> {
        Ok(Self {
            item: compile(&strategy.item)?,
            title: compile(&strategy.title)?,
            link: compile(&strategy.link)?,
            summary: strategy.summary.as_deref().map(compile).transpose()?,
        })
    }
}

/// Scrapes a listing page with an ordered list of selector strategies.
/// The first strategy whose item selector matches anything is the only one used.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    config: SourceConfig,
    base: Url,
    strategies: Vec<CompiledStrategy>,
}

impl HtmlExtractor {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        let strategies = config
            .strategies
            .iter()
            .map(CompiledStrategy::new)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            base,
            strategies,
        })
    }

    fn text_of(element: ElementRef<'_>) -> Option<String> {
        let text = element.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (!text.is_empty()).then_some(text)
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let url = self.base.join(href.trim()).ok()?;
        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }

    fn extract_link(&self, item: ElementRef<'_>, strategy: &CompiledStrategy) -> Option<String> {
        let href = item
            .select(&strategy.link)
            .find_map(|a| a.value().attr("href"))
            .or_else(|| {
                // the item itself may be the anchor
                (item.value().name() == "a")
                    .then(|| item.value().attr("href"))
                    .flatten()
            })?;
        self.resolve(href)
    }

    /// Parses one listing page. Items without a usable link are skipped and
    /// repeated links keep their first occurrence.
    pub fn parse_items(&self, html: &str, log: &Logger) -> Vec<RawItem> {
        let document = Html::parse_document(html);

        let Some((index, strategy)) = self
            .strategies
            .iter()
            .enumerate()
            .find(|(_, s)| document.select(&s.item).next().is_some())
        else {
            log.warn("no selector strategy matched the page");
            return Vec::new();
        };
        log.debug(&format!("using selector strategy #{}", index));

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for element in document.select(&strategy.item) {
            let Some(link) = self.extract_link(element, strategy) else {
                log.debug("skipping item without a link");
                continue;
            };
            if !seen.insert(link.clone()) {
                continue;
            }

            let title = element.select(&strategy.title).next().and_then(Self::text_of);
            let summary = strategy
                .summary
                .as_ref()
                .and_then(|s| element.select(s).next())
                .and_then(Self::text_of);

            items.push(RawItem {
                title,
                link: Some(link),
                summary,
                category: self.config.label.clone(),
                content_type: self.config.content_type.clone(),
                ..Default::default()
            });
        }
        items
    }
}

#[async_trait]
impl Extract for HtmlExtractor {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch(&self, fetcher: &dyn Fetcher, log: &Logger) -> Result<Vec<RawItem>> {
        let page = fetcher
            .fetch(self.base.as_str(), FetchProfile::Browser)
            .await
            .map_err(Error::into_extraction)?;
        let items = self.parse_items(&page, log);
        log.info(&format!("found {} articles", items.len()));
        Ok(items)
    }
}

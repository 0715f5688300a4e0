//! arXiv search API extractor.
//!
//! One Atom query per search term, restricted to papers submitted in the
//! last `lookback_days`. Every entry is attributed to the term that found it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use harvest_core::{Error, RawItem, Result, SourceConfig};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use super::Extract;
use crate::fetcher::{FetchProfile, Fetcher};
use crate::logging::Logger;

#[derive(Debug, Clone)]
pub struct ArxivExtractor {
    config: SourceConfig,
}

impl ArxivExtractor {
    pub fn new(config: SourceConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        Ok(Self { config })
    }

    pub fn query_url(&self, term: &str, now: DateTime<Utc>) -> Result<Url> {
        let start = Duration::try_days(self.config.lookback_days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                Error::Config(format!(
                    "source {}: lookback_days {} is out of range",
                    self.config.name, self.config.lookback_days
                ))
            })?
            .format("%Y%m%d");
        let search = format!(
            "ti:\"{}\" AND submittedDate:[{}000000 TO 999912312359]",
            term, start
        );

        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", self.config.base_url, e)))?;
        url.query_pairs_mut()
            .append_pair("search_query", &search)
            .append_pair("start", "0")
            .append_pair("max_results", &self.config.max_results.to_string());
        Ok(url)
    }

    fn to_raw_item(&self, entry: Entry, term: &str) -> RawItem {
        RawItem {
            title: entry.title,
            link: entry.alternate.or(entry.first_link).or(entry.id),
            authors: entry.authors,
            summary: entry.summary,
            body: None,
            published: entry.published.or(entry.updated),
            category: Some(self.config.label.clone().unwrap_or_else(|| term.to_string())),
            content_type: self.config.content_type.clone(),
            source: None,
        }
    }
}

#[async_trait]
impl Extract for ArxivExtractor {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch(&self, fetcher: &dyn Fetcher, log: &Logger) -> Result<Vec<RawItem>> {
        let mut items = Vec::new();
        let now = Utc::now();

        for term in &self.config.search_terms {
            let log = log.clone().with_prefix(format!("[{}]", term));
            let url = self.query_url(term, now)?;
            log.debug(&format!("querying {}", url));

            let xml = fetcher
                .fetch(url.as_str(), FetchProfile::Api)
                .await
                .map_err(Error::into_extraction)?;
            let entries = parse_feed(&xml)?;

            let total = entries.len();
            let before = items.len();
            items.extend(
                entries
                    .into_iter()
                    .map(|entry| self.to_raw_item(entry, term))
                    .filter(|item| item.link.is_some()),
            );
            let kept = items.len() - before;
            if kept < total {
                log.warn(&format!("dropped {} entries without a link", total - kept));
            }
            log.info(&format!("found {} papers", kept));
        }

        Ok(items)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Entry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub authors: Vec<String>,
    pub alternate: Option<String>,
    pub first_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Updated,
    AuthorName,
}

impl Entry {
    fn set(&mut self, field: Field, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        match field {
            Field::Id => self.id = Some(value),
            Field::Title => self.title = Some(value),
            Field::Summary => self.summary = Some(value),
            Field::Published => self.published = Some(value),
            Field::Updated => self.updated = Some(value),
            Field::AuthorName => self.authors.push(value),
        }
    }

    fn add_link(&mut self, element: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        for attr in element.attributes().flatten() {
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => continue,
            };
            match attr.key.as_ref() {
                b"href" => href = Some(value),
                b"rel" => rel = Some(value),
                _ => {}
            }
        }

        let Some(href) = href.filter(|h| !h.trim().is_empty()) else {
            return;
        };
        // Atom: a link without rel is an alternate link
        if rel.as_deref().map_or(true, |r| r == "alternate") && self.alternate.is_none() {
            self.alternate = Some(href.clone());
        }
        if self.first_link.is_none() {
            self.first_link = Some(href);
        }
    }
}

/// Parses the entries of an Atom feed. Feed-level metadata is ignored.
pub fn parse_feed(xml: &str) -> Result<Vec<Entry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut in_author = false;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"entry" => entry = Some(Entry::default()),
                    b"author" => in_author = true,
                    b"link" => {
                        if let Some(entry) = entry.as_mut() {
                            entry.add_link(&e);
                        }
                    }
                    other if entry.is_some() => {
                        field = match other {
                            b"id" => Some(Field::Id),
                            b"title" => Some(Field::Title),
                            b"summary" => Some(Field::Summary),
                            b"published" => Some(Field::Published),
                            b"updated" => Some(Field::Updated),
                            b"name" if in_author => Some(Field::AuthorName),
                            _ => None,
                        };
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(entry) = entry.as_mut() {
                        entry.add_link(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    match t.unescape() {
                        Ok(value) => text.push_str(&value),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(done) = entry.take() {
                        entries.push(done);
                    }
                    field = None;
                }
                b"author" => in_author = false,
                _ => {
                    if let (Some(f), Some(entry)) = (field.take(), entry.as_mut()) {
                        entry.set(f, std::mem::take(&mut text));
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Extraction(format!(
                    "malformed feed at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}

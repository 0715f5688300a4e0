//! Raw item -> [`ContentRecord`].
//!
//! Normalization never consults the network or the store. The only raw item
//! it rejects is one without an identity link.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::config::SourceKind;
use crate::text;
use crate::types::{ContentRecord, ContentType, RawItem};
use crate::{Error, Result};

pub const AI_TAG: &str = "AI";
pub const UNTITLED: &str = "Untitled";

/// What the normalizer knows about the source an item came from.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub kind: SourceKind,
    /// Tag used when the item carries no category of its own.
    pub label: Option<String>,
}

impl SourceContext {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

pub fn normalize(raw: RawItem, ctx: &SourceContext) -> Result<ContentRecord> {
    normalize_at(raw, ctx, Utc::now())
}

/// Same as [`normalize`] with an explicit notion of "now".
pub fn normalize_at(raw: RawItem, ctx: &SourceContext, now: DateTime<Utc>) -> Result<ContentRecord> {
    let link = raw
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| Error::Normalization("item has no source link".to_string()))?
        .to_string();

    let title = raw
        .title
        .as_deref()
        .map(text::clean_text)
        .filter(|t| !t.is_empty());
    let provided_summary = raw
        .summary
        .as_deref()
        .map(text::clean_text)
        .filter(|s| !s.is_empty());
    let authors: Vec<String> = raw
        .authors
        .iter()
        .map(|a| text::clean_text(a))
        .filter(|a| !a.is_empty())
        .collect();
    let source_name = raw
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&ctx.name)
        .to_string();
    let category = raw
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| ctx.label.clone())
        .unwrap_or_else(|| source_name.clone());

    let body = match raw.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        Some(body) => body.to_string(),
        None if title.is_none() && provided_summary.is_none() => String::new(),
        None => render_body(
            ctx.kind,
            title.as_deref().unwrap_or(UNTITLED),
            &authors,
            provided_summary.as_deref().unwrap_or_default(),
            &link,
            &category,
            &source_name,
        ),
    };
    let title = title.unwrap_or_else(|| UNTITLED.to_string());

    let summary = match provided_summary {
        Some(summary) => summary,
        None => {
            let derived = text::summarize(&body);
            if derived.is_empty() {
                text::summarize(&title)
            } else {
                derived
            }
        }
    };

    let content_type = resolve_content_type(raw.content_type.as_deref(), &title, &body);

    let published_at = match raw.published.as_deref() {
        Some(value) => parse_timestamp(value).unwrap_or_else(|| {
            debug!(%link, value, "unparseable published timestamp, using ingestion time");
            now
        }),
        None => now,
    };

    let mut tags = vec![AI_TAG.to_string()];
    if !tags.contains(&category) {
        tags.push(category);
    }

    Ok(ContentRecord {
        reading_minutes: text::reading_minutes(&body),
        complexity_tier: text::complexity_tier(&body),
        title,
        body,
        source_name,
        source_link: link,
        content_type,
        tags,
        published_at,
        ingested_at: now,
        summary,
    })
}

fn resolve_content_type(declared: Option<&str>, title: &str, body: &str) -> ContentType {
    if let Some(declared) = declared {
        match declared.parse::<ContentType>() {
            Ok(content_type) => return content_type,
            Err(e) => debug!(error = %e, "ignoring declared content type"),
        }
    }
    text::categorize(&format!("{} {}", title, body))
}

fn render_body(
    kind: SourceKind,
    title: &str,
    authors: &[String],
    summary: &str,
    link: &str,
    category: &str,
    source: &str,
) -> String {
    match kind {
        SourceKind::Arxiv => format!(
            "# {title}\n\n**Authors:** {authors}\n\n## Abstract\n{summary}\n\n## Details\n- Link: {link}\n- Category: {category}\n",
            authors = authors.join(", "),
        ),
        SourceKind::Html => format!(
            "# {title}\n\n## Article Summary\n{summary}\n\n## Full Details\n- Source: {source}\n- Link: {link}\n"
        ),
    }
}

/// Accepts RFC 3339, RFC 2822 and bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComplexityTier;
    use chrono::TimeZone;

    fn paper() -> RawItem {
        RawItem {
            title: Some("Sparse  attention\n at scale".to_string()),
            link: Some("http://arxiv.org/abs/2401.00001v1".to_string()),
            authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
            summary: Some("We propose a method for sparse attention.".to_string()),
            published: Some("2024-01-02T03:04:05Z".to_string()),
            category: Some("machine learning".to_string()),
            content_type: Some("research".to_string()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_normalize_research_item() {
        let ctx = SourceContext::new("ArXiv", SourceKind::Arxiv);
        let record = normalize_at(paper(), &ctx, now()).unwrap();

        assert_eq!(record.title, "Sparse attention at scale");
        assert_eq!(record.source_name, "ArXiv");
        assert_eq!(record.source_link, "http://arxiv.org/abs/2401.00001v1");
        assert_eq!(record.content_type, ContentType::Research);
        assert_eq!(record.tags, vec!["AI".to_string(), "machine learning".to_string()]);
        assert_eq!(record.summary, "We propose a method for sparse attention.");
        assert_eq!(
            record.published_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
        assert!(record.body.contains("**Authors:** Ada Lovelace, Alan Turing"));
        assert!(record.body.contains("## Abstract"));
        assert!(record.body.contains("- Category: machine learning"));
        assert_eq!(record.reading_minutes, 1);
        assert_eq!(record.complexity_tier, ComplexityTier::Beginner);
    }

    #[test]
    fn test_missing_link_is_rejected() {
        let ctx = SourceContext::new("ArXiv", SourceKind::Arxiv);
        let mut raw = paper();
        raw.link = Some("   ".to_string());
        assert!(matches!(normalize_at(raw, &ctx, now()), Err(Error::Normalization(_))));
    }

    #[test]
    fn test_defaults_for_sparse_news_item() {
        let ctx = SourceContext::new("Wired", SourceKind::Html);
        let raw = RawItem {
            title: Some("Robots learn to fold laundry".to_string()),
            link: Some("https://www.wired.com/story/robots".to_string()),
            ..Default::default()
        };
        let record = normalize_at(raw, &ctx, now()).unwrap();

        assert_eq!(record.published_at, now());
        assert_eq!(record.tags, vec!["AI".to_string(), "Wired".to_string()]);
        assert!(!record.summary.is_empty());
        assert!(record.body.contains("- Source: Wired"));
        assert_eq!(record.content_type, ContentType::General);
    }

    #[test]
    fn test_link_only_item_gets_placeholders() {
        let ctx = SourceContext::new("TechCrunch", SourceKind::Html).with_label("startups");
        let raw = RawItem {
            link: Some("https://techcrunch.com/a".to_string()),
            ..Default::default()
        };
        let record = normalize_at(raw, &ctx, now()).unwrap();

        assert_eq!(record.title, UNTITLED);
        assert!(record.body.is_empty());
        assert_eq!(record.summary, UNTITLED);
        assert_eq!(record.reading_minutes, 1);
        assert_eq!(record.tags, vec!["AI".to_string(), "startups".to_string()]);
    }

    #[test]
    fn test_derived_summary_respects_word_boundary() {
        let ctx = SourceContext::new("VentureBeat", SourceKind::Html);
        let body = "Transformers ".repeat(60);
        let raw = RawItem {
            title: Some("Long read".to_string()),
            link: Some("https://venturebeat.com/ai/long".to_string()),
            body: Some(body),
            ..Default::default()
        };
        let record = normalize_at(raw, &ctx, now()).unwrap();
        let kept = record.summary.trim_end_matches(text::ELLIPSIS);

        assert!(record.summary.ends_with(text::ELLIPSIS));
        assert!(kept.chars().count() <= text::SUMMARY_MAX_CHARS);
        assert!(kept.split(' ').all(|w| w == "Transformers"));
    }

    #[test]
    fn test_undeclared_type_is_categorized() {
        let ctx = SourceContext::new("VentureBeat", SourceKind::Html);
        let raw = RawItem {
            title: Some("Vendor announces product launch".to_string()),
            link: Some("https://venturebeat.com/ai/launch".to_string()),
            content_type: Some("editorial".to_string()),
            ..Default::default()
        };
        let record = normalize_at(raw, &ctx, now()).unwrap();
        assert_eq!(record.content_type, ContentType::Product);
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_now() {
        let ctx = SourceContext::new("ArXiv", SourceKind::Arxiv);
        let mut raw = paper();
        raw.published = Some("last tuesday".to_string());
        let record = normalize_at(raw, &ctx, now()).unwrap();
        assert_eq!(record.published_at, now());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-02T03:04:05+02:00").is_some());
        assert!(parse_timestamp("Tue, 02 Jan 2024 03:04:05 GMT").is_some());
        assert_eq!(
            parse_timestamp("2024-01-02"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert!(parse_timestamp("soon").is_none());
    }
}

//! Markdown blog-post export of stored records.

use anyhow::{Context, Result};
use harvest_core::ContentRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXPORT_LIMIT: usize = 100;
const MAX_FILE_STEM: usize = 50;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-_\. ]").expect("valid filename regex"));

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_post(record: &ContentRecord) -> String {
    format!(
        "# {title}\n\n\
         **Published:** {published}\n\
         **Source:** [{source}]({link})\n\
         **Reading Time:** {minutes} min\n\
         **Complexity:** {complexity}\n\
         **Tags:** {tags}\n\n\
         ## Summary\n{summary}\n\n\
         ## Full Content\n{body}\n",
        title = record.title,
        published = record.published_at.format("%Y-%m-%d %H:%M:%S"),
        source = record.source_name,
        link = record.source_link,
        minutes = record.reading_minutes,
        complexity = capitalize(record.complexity_tier.as_str()),
        tags = record.tags.join(", "),
        summary = record.summary,
        body = record.body,
    )
}

/// `<title with unsafe characters replaced, at most 50 chars>.md`
pub fn file_name(title: &str) -> String {
    let safe = UNSAFE_FILENAME_CHARS.replace_all(title, "_");
    let stem: String = safe.chars().take(MAX_FILE_STEM).collect();
    format!("{}.md", stem)
}

/// Writes one file per record into `dir`, creating it if needed.
/// Records whose titles sanitize to the same name overwrite each other.
pub fn export_records(records: &[ContentRecord], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(records.len());
    for record in records {
        let path = dir.join(file_name(&record.title));
        std::fs::write(&path, render_post(record))
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

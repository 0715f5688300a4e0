//! Canned-response fetcher for tests.

use async_trait::async_trait;
use harvest_core::{Error, Result};
use std::sync::Mutex;

use crate::fetcher::{FetchProfile, Fetcher};

#[derive(Debug, Clone)]
pub enum Canned {
    Body(String),
    Timeout,
}

/// Answers by URL prefix; unknown URLs are an extraction failure.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    routes: Vec<(String, Canned)>,
    calls: Mutex<Vec<(String, FetchProfile)>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, prefix: &str, body: &str) -> Self {
        self.routes.push((prefix.to_string(), Canned::Body(body.to_string())));
        self
    }

    pub fn with_timeout(mut self, prefix: &str) -> Self {
        self.routes.push((prefix.to_string(), Canned::Timeout));
        self
    }

    pub fn calls(&self) -> Vec<(String, FetchProfile)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str, profile: FetchProfile) -> Result<String> {
        self.calls.lock().unwrap().push((url.to_string(), profile));
        match self.routes.iter().find(|(prefix, _)| url.starts_with(prefix.as_str())) {
            Some((_, Canned::Body(body))) => Ok(body.clone()),
            Some((_, Canned::Timeout)) => {
                Err(Error::Extraction(format!("request timed out: {}", url)))
            }
            None => Err(Error::Extraction(format!("404 Not Found: {}", url))),
        }
    }
}

pub const ARXIV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=ti:"machine learning"</title>
  <id>http://arxiv.org/api/query-id</id>
  <link href="http://arxiv.org/api/query?search_query=x" rel="self" type="application/atom+xml"/>
  <updated>2024-05-01T00:00:00-04:00</updated>
  <entry>
    <id>http://arxiv.org/abs/2405.00001v1</id>
    <updated>2024-05-01T17:59:59Z</updated>
    <published>2024-05-01T17:59:59Z</published>
    <title>Scaling Laws for
      Sparse Models</title>
    <summary>We study scaling behaviour of sparse mixture &amp; dense models.</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name><arxiv:affiliation>Bletchley</arxiv:affiliation></author>
    <link href="http://arxiv.org/abs/2405.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2405.00001v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2405.00002v2</id>
    <published>2024-04-30T10:00:00Z</published>
    <title>A Benchmark Without Links</title>
    <summary><![CDATA[Abstract with <b>markup</b>.]]></summary>
    <author><name>Grace Hopper</name></author>
  </entry>
</feed>
"#;

pub const NEWS_PAGE: &str = r#"<html><body>
  <div class="post-block">
    <h2 class="post-block__title">OpenAI ships a new model</h2>
    <a href="/2024/05/01/openai-model/">read</a>
    <div class="post-block__content">The release adds tools.</div>
  </div>
  <div class="post-block">
    <h2 class="post-block__title">Chip startup raises funds</h2>
    <a href="https://techcrunch.com/2024/05/01/chips/">read</a>
  </div>
  <div class="post-block">
    <h2 class="post-block__title">Broken card without a link</h2>
  </div>
  <article><h2>Fallback strategy item</h2><a href="/fallback">x</a></article>
</body></html>"#;

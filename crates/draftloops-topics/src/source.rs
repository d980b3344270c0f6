use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::Category;

/// Headlines offered per search
pub const DEFAULT_LIMIT: usize = 5;

const GOOGLE_NEWS_RSS: &str = "https://news.google.com/rss/search";

#[derive(Error, Debug)]
pub enum TopicError {
    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("Feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Feed returned HTTP {0}")]
    Status(u16),

    #[error("No headlines found for {0:?}")]
    NoResults(String),
}

/// A headline that can become a loop topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub category: Category,
}

/// Somewhere topic candidates come from
#[async_trait]
pub trait TopicSource: Send + Sync {
    /// Up to `limit` candidates for `query`, tagged with `category`
    async fn search(
        &self,
        query: &str,
        category: Category,
        limit: usize,
    ) -> Result<Vec<Candidate>, TopicError>;
}

/// Google News RSS search
pub struct GoogleNewsSource {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleNewsSource {
    pub fn new() -> Result<Self, TopicError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            base_url: GOOGLE_NEWS_RSS.to_string(),
        })
    }

    /// Point at a different feed endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn search_url(&self, query: &str) -> Result<Url, TopicError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TopicError::InvalidQuery("query is empty".into()));
        }
        Url::parse_with_params(
            &self.base_url,
            &[("q", query), ("hl", "en-US"), ("gl", "US"), ("ceid", "US:en")],
        )
        .map_err(|e| TopicError::InvalidQuery(e.to_string()))
    }
}

#[async_trait]
impl TopicSource for GoogleNewsSource {
    async fn search(
        &self,
        query: &str,
        category: Category,
        limit: usize,
    ) -> Result<Vec<Candidate>, TopicError> {
        let url = self.search_url(query)?;
        debug!(url = %url, "Fetching news feed");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "News feed request failed");
            return Err(TopicError::Status(status.as_u16()));
        }
        let body = response.text().await?;

        let candidates: Vec<Candidate> = parse_rss_titles(&body, limit)
            .into_iter()
            .map(|title| Candidate { title, category })
            .collect();
        if candidates.is_empty() {
            return Err(TopicError::NoResults(query.trim().to_string()));
        }
        debug!(count = candidates.len(), "Parsed headlines");
        Ok(candidates)
    }
}

/// Titles of the first `limit` `<item>` elements of an RSS document.
///
/// The channel's own `<title>` is skipped. Empty titles are dropped.
pub fn parse_rss_titles(xml: &str, limit: usize) -> Vec<String> {
    let mut titles = Vec::new();
    let mut rest = xml;

    while titles.len() < limit {
        let Some(start) = item_body_start(rest) else {
            break;
        };
        let after = &rest[start..];
        let end = after.find("</item>").unwrap_or(after.len());
        let item = &after[..end];

        if let Some(title) = element_text(item, "title") {
            if !title.is_empty() {
                titles.push(title);
            }
        }
        rest = &after[end..];
    }
    titles
}

/// Offset just past the next `<item>` open tag, attributes allowed.
/// `<items>` and self-closing `<item/>` do not count
fn item_body_start(text: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find("<item") {
        let name_end = offset + pos + "<item".len();
        let tag_end = name_end + text[name_end..].find('>')?;
        let attrs = &text[name_end..tag_end];
        let is_item = attrs.is_empty() || attrs.starts_with(|c: char| c.is_ascii_whitespace());
        if is_item && !attrs.ends_with('/') {
            return Some(tag_end + 1);
        }
        offset = name_end;
    }
    None
}

fn element_text(fragment: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = fragment.find(&open)? + open.len();
    let end = start + fragment[start..].find(&close)?;
    let raw = fragment[start..end].trim();

    let text = match raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
    {
        Some(cdata) => cdata.to_string(),
        None => decode_entities(raw),
    };
    Some(text.trim().to_string())
}

/// Decode XML entities in one pass, so "&amp;lt;" becomes "&lt;".
/// Unknown or malformed references are kept as written
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 12)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let reference = name.strip_prefix('#')?;
            let code = match reference
                .strip_prefix('x')
                .or_else(|| reference.strip_prefix('X'))
            {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None if reference.bytes().all(|b| b.is_ascii_digit()) => reference.parse().ok()?,
                None => return None,
            };
            char::from_u32(code)
        }
    }
}

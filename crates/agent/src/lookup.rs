//! Knowledge lookup bridge (Wikipedia).
//!
//! Advisory context only: a hit enriches the generative prompt, a miss or a
//! failure is logged and silently omitted. Never a required answer path.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

const LOOKUP_KEYWORDS: [&str; 7] =
    ["what", "who", "where", "when", "why", "how", "tell me about"];

/// Heuristic gate in front of the bridge: interrogative keyword or a
/// trailing question mark.
pub fn should_lookup(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.trim_end().ends_with('?')
        || LOOKUP_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupContext {
    pub topic: String,
    pub extract: String,
    pub source_url: String,
}

impl LookupContext {
    /// Context block injected into the system instruction.
    pub fn as_prompt_block(&self) -> String {
        format!(
            "Reference material on \"{}\":\n{}\nSource: {}",
            self.topic, self.extract, self.source_url
        )
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup call timed out")]
    Timeout,
    #[error("lookup transport failure: {0}")]
    Http(reqwest::Error),
    #[error("lookup response was malformed: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(error)
        }
    }
}

#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    /// Best-topic search followed by a plain-text intro extract fetch.
    /// `Ok(None)` means no topic matched the query.
    async fn lookup(&self, query: &str) -> Result<Option<LookupContext>, LookupError>;
}

/// Two-step MediaWiki client: `list=search` for the best title, then
/// `prop=extracts` for the plain-text introduction.
pub struct WikipediaClient {
    http: reqwest::Client,
    api_url: String,
    max_extract_chars: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    pages: std::collections::HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    extract: Option<String>,
}

impl WikipediaClient {
    pub fn new(timeout: Duration, max_extract_chars: usize) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            max_extract_chars,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn search_best_title(&self, query: &str) -> Result<Option<String>, LookupError> {
        let response: SearchResponse = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|err| LookupError::MalformedResponse(err.to_string()))?;

        Ok(response.query.and_then(|q| q.search.into_iter().next()).map(|hit| hit.title))
    }

    async fn fetch_intro_extract(&self, title: &str) -> Result<Option<String>, LookupError> {
        let response: ExtractResponse = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|err| LookupError::MalformedResponse(err.to_string()))?;

        Ok(response
            .query
            .and_then(|q| q.pages.into_values().next())
            .and_then(|page| page.extract)
            .filter(|extract| !extract.trim().is_empty()))
    }
}

#[async_trait]
impl KnowledgeLookup for WikipediaClient {
    async fn lookup(&self, query: &str) -> Result<Option<LookupContext>, LookupError> {
        let Some(title) = self.search_best_title(query).await? else {
            return Ok(None);
        };
        let Some(extract) = self.fetch_intro_extract(&title).await? else {
            return Ok(None);
        };

        let source_url =
            format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_"));
        Ok(Some(LookupContext {
            extract: truncate_at_word_boundary(&extract, self.max_extract_chars),
            topic: title,
            source_url,
        }))
    }
}

/// Cut at the last whole word inside `max_chars` and mark the cut with an
/// ellipsis. Short extracts pass through untouched.
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let head: String = text.chars().take(max_chars).collect();
    let cut = head.rfind(char::is_whitespace).unwrap_or(head.len());
    let mut truncated = head[..cut].trim_end().to_string();
    truncated.push_str("...");
    truncated
}

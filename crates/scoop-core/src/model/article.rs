use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix for identifiers derived from article content.
const DERIVED_ID_PREFIX: &str = "art-";

/// Number of hex characters of the content digest kept in a derived id.
const DERIVED_ID_HEX_LEN: usize = 16;

const MAX_ID_LEN: usize = 128;

/// Stable article identifier.
///
/// Ordering is plain lexicographic string order; every ranking in the
/// workspace breaks score ties by ascending `ArticleId`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    /// Validate and wrap a caller-supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty, contains whitespace, or is longer
    /// than 128 bytes.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("article id must not be empty");
        }
        if trimmed.len() > MAX_ID_LEN {
            bail!("article id '{trimmed}' exceeds {MAX_ID_LEN} bytes");
        }
        if trimmed.chars().any(char::is_whitespace) {
            bail!("article id '{trimmed}' must not contain whitespace");
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Derive a deterministic id from the article body.
    ///
    /// The same body always yields the same id, which is what makes repeated
    /// ingestion of an unlabelled feed idempotent.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(body.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Self(format!(
            "{DERIVED_ID_PREFIX}{}",
            &digest[..DERIVED_ID_HEX_LEN]
        ))
    }

    /// Wrap a string without validation. Intended for tests and trusted rows.
    #[must_use]
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored news article. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
    /// Embedding of [`Article::search_text`]; length equals the store dimension.
    pub embedding: Vec<f32>,
}

impl Article {
    /// Text submitted to the embedding gateway and the full-text index.
    #[must_use]
    pub fn search_text(&self) -> String {
        compose_search_text(&self.title, &self.body)
    }
}

/// An article under assessment. Not persisted as an [`Article`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingArticle {
    pub id: ArticleId,
    #[serde(default)]
    pub title: String,
    pub body: String,
}

impl IncomingArticle {
    /// Build an incoming article whose id is derived from its body.
    #[must_use]
    pub fn from_text(body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            id: ArticleId::from_body(&body),
            title: String::new(),
            body,
        }
    }

    #[must_use]
    pub fn search_text(&self) -> String {
        compose_search_text(&self.title, &self.body)
    }
}

fn compose_search_text(title: &str, body: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        body.trim().to_string()
    } else {
        format!("{title}\n\n{}", body.trim())
    }
}

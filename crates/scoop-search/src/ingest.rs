//! Article ingestion: clean, identify, embed, insert.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use scoop_core::text::clean_article_text;
use scoop_core::{Article, ArticleId, ErrorCode, IncomingArticle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::semantic::EmbeddingGateway;
use crate::store::ArticleStore;

/// One input record. `text` is accepted as an alias of `body`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngestRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "text")]
    pub body: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl IngestRecord {
    #[must_use]
    pub fn from_text(body: impl Into<String>) -> Self {
        Self {
            id: None,
            title: String::new(),
            body: body.into(),
            published_at: None,
        }
    }

    /// Clean the record into an article to assess.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is empty after cleaning or the supplied id
    /// is invalid.
    pub fn to_incoming(&self) -> Result<IncomingArticle> {
        let body = clean_article_text(&self.body);
        if body.is_empty() {
            bail!("record has an empty body");
        }
        let id = match self.id.as_deref() {
            Some(raw) => ArticleId::parse(raw)?,
            None => ArticleId::from_body(&body),
        };
        Ok(IncomingArticle {
            id,
            title: clean_article_text(&self.title),
            body,
        })
    }
}

/// A record or a bare string of article text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecord {
    Text(String),
    Record(IngestRecord),
}

impl From<RawRecord> for IngestRecord {
    fn from(raw: RawRecord) -> Self {
        match raw {
            RawRecord::Text(text) => Self::from_text(text),
            RawRecord::Record(record) => record,
        }
    }
}

#[derive(Deserialize)]
struct TextList {
    text_list: Vec<RawRecord>,
}

/// Parse an input document into records.
///
/// Accepts a JSON array, an object with a `text_list` array, JSON Lines, or
/// CSV with a header row. Array and line entries may be record objects or bare
/// strings. A document whose first non-blank line is not JSON is read as CSV.
///
/// # Errors
///
/// Returns an error naming the first entry that cannot be read.
pub fn parse_records(content: &str) -> Result<Vec<IngestRecord>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let raw: Vec<RawRecord> =
            serde_json::from_str(trimmed).context("input is not a JSON array of records")?;
        return Ok(raw.into_iter().map(Into::into).collect());
    }
    if trimmed.starts_with('{') {
        if let Ok(list) = serde_json::from_str::<TextList>(trimmed) {
            return Ok(list.text_list.into_iter().map(Into::into).collect());
        }
    }
    if !first_line_is_json(content) {
        return parse_csv_records(content);
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<RawRecord>(line)
                .map(Into::into)
                .with_context(|| format!("line {}: not a JSON record", idx + 1))
        })
        .collect()
}

fn first_line_is_json(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .is_none_or(|line| {
            line.starts_with('{') || serde_json::from_str::<serde_json::Value>(line).is_ok()
        })
}

/// Parse CSV with a header row.
///
/// The article text comes from a `text` (or `body`) column; `id`, `title` and
/// `published_at` (RFC 3339) columns are optional and other columns are
/// ignored. Empty cells in optional columns count as absent.
///
/// # Errors
///
/// Returns an error if the header has no text column or a row is malformed.
pub fn parse_csv_records(content: &str) -> Result<Vec<IngestRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("read CSV header")?;
    if !headers.iter().any(|h| h == "text" || h == "body") {
        bail!("CSV input needs a `text` column");
    }

    reader
        .deserialize::<IngestRecord>()
        .enumerate()
        .map(|(idx, row)| row.with_context(|| format!("CSV row {}: malformed record", idx + 1)))
        .collect()
}

/// Result of ingesting one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Inserted { article_id: ArticleId },
    /// The id was already stored; nothing was embedded or written.
    Skipped { article_id: ArticleId },
    Failed {
        article_id: Option<ArticleId>,
        code: String,
        reason: String,
    },
}

/// Totals over one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub outcomes: Vec<IngestOutcome>,
}

impl IngestReport {
    pub fn record(&mut self, outcome: IngestOutcome) {
        match &outcome {
            IngestOutcome::Inserted { .. } => self.inserted += 1,
            IngestOutcome::Skipped { .. } => self.skipped_existing += 1,
            IngestOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

fn failed(article_id: Option<ArticleId>, code: ErrorCode, reason: impl Into<String>) -> IngestOutcome {
    IngestOutcome::Failed {
        article_id,
        code: code.code().to_string(),
        reason: reason.into(),
    }
}

/// Writes articles into a store through the embedding gateway.
#[derive(Debug)]
pub struct Ingestor<'a, S: ArticleStore> {
    store: &'a S,
    gateway: &'a EmbeddingGateway,
}

impl<'a, S: ArticleStore> Ingestor<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, gateway: &'a EmbeddingGateway) -> Self {
        Self { store, gateway }
    }

    /// Ingest one record.
    ///
    /// Invalid records and embedding failures are reported in the outcome;
    /// only store failures are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn ingest(&self, record: IngestRecord) -> Result<IngestOutcome> {
        let body = clean_article_text(&record.body);
        let title = clean_article_text(&record.title);
        if body.is_empty() {
            return Ok(failed(None, ErrorCode::InvalidInput, "record has an empty body"));
        }

        let id = match record.id.as_deref() {
            Some(raw) => match ArticleId::parse(raw) {
                Ok(id) => id,
                Err(err) => return Ok(failed(None, ErrorCode::InvalidInput, err.to_string())),
            },
            None => ArticleId::from_body(&body),
        };

        if !self.store.fetch_articles(std::slice::from_ref(&id))?.is_empty() {
            debug!(article_id = %id, "already stored");
            return Ok(IngestOutcome::Skipped { article_id: id });
        }

        let mut article = Article {
            id,
            title,
            body,
            published_at: record.published_at.unwrap_or_else(Utc::now),
            embedding: Vec::new(),
        };
        article.embedding = match self.gateway.embed(&article.search_text()) {
            Ok(vector) => vector,
            Err(err) => {
                warn!(article_id = %article.id, error = %err, "skipping article");
                return Ok(failed(Some(article.id), err.code(), err.to_string()));
            }
        };

        if self.store.insert_article(&article)? {
            Ok(IngestOutcome::Inserted {
                article_id: article.id,
            })
        } else {
            Ok(IngestOutcome::Skipped {
                article_id: article.id,
            })
        }
    }

    /// Ingest a sequence of records, continuing past per-record failures.
    ///
    /// # Errors
    ///
    /// Returns an error on the first store failure.
    pub fn ingest_all(&self, records: impl IntoIterator<Item = IngestRecord>) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for record in records {
            report.record(self.ingest(record)?);
        }
        info!(
            inserted = report.inserted,
            skipped_existing = report.skipped_existing,
            failed = report.failed,
            "ingestion finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{HashedEmbedder, RetryPolicy};
    use crate::store::SqliteStore;

    fn setup() -> (SqliteStore, EmbeddingGateway) {
        let store = SqliteStore::open_in_memory(32, "hashed-bow-v1").unwrap();
        let gateway = EmbeddingGateway::new(
            Box::new(HashedEmbedder::new(32)),
            RetryPolicy::default(),
            512,
        );
        (store, gateway)
    }

    #[test]
    fn record_accepts_text_alias_and_defaults() {
        let record: IngestRecord = serde_json::from_str(r#"{"text":"Body"}"#).unwrap();
        assert_eq!(record, IngestRecord::from_text("Body"));

        let record: IngestRecord = serde_json::from_str(
            r#"{"id":"a1","title":"T","body":"B","published_at":"2025-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(record.id.as_deref(), Some("a1"));
        assert!(record.published_at.is_some());
    }

    #[test]
    fn parse_records_accepts_every_input_shape() {
        let array = parse_records(r#"[{"id":"a","body":"One"}, "Two"]"#).unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0].id.as_deref(), Some("a"));
        assert_eq!(array[1], IngestRecord::from_text("Two"));

        let list = parse_records(r#"{"text_list": ["One", "Two", "Three"]}"#).unwrap();
        assert_eq!(list.len(), 3);

        let lines = parse_records("{\"text\":\"One\"}\n\n\"Two\"\n").unwrap();
        assert_eq!(lines, vec![IngestRecord::from_text("One"), IngestRecord::from_text("Two")]);
    }

    #[test]
    fn parse_records_reads_csv_with_text_column() {
        let csv = "text\n\"Tottenham's Lucas Bergvall suffered a high ankle sprain, says Frank.\"\n\
                   Chelsea agree a fee for a Brazilian winger\n";
        let records = parse_records(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].body,
            "Tottenham's Lucas Bergvall suffered a high ankle sprain, says Frank."
        );
        assert_eq!(records[1], IngestRecord::from_text("Chelsea agree a fee for a Brazilian winger"));
    }

    #[test]
    fn csv_optional_columns_and_extra_columns() {
        let csv = ",id,title,text,published_at,source\n\
                   0,spurs-1,Injury news,\"Bergvall out, scans due\",2025-03-01T10:00:00Z,bbc\n\
                   1,,,Snow postpones the derby,,sky\n";
        let records = parse_csv_records(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("spurs-1"));
        assert_eq!(records[0].title, "Injury news");
        assert_eq!(records[0].body, "Bergvall out, scans due");
        assert!(records[0].published_at.is_some());
        assert_eq!(records[1].id, None);
        assert_eq!(records[1].published_at, None);
        assert_eq!(records[1].body, "Snow postpones the derby");
    }

    #[test]
    fn csv_without_text_column_is_rejected() {
        let err = parse_csv_records("headline,source\nBergvall injured,bbc\n").unwrap_err();
        assert!(err.to_string().contains("`text` column"));
    }

    #[test]
    fn parse_records_reports_bad_line() {
        let err = parse_records("{\"text\":\"ok\"}\n{not json}\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn to_incoming_cleans_and_derives_id() {
        let incoming = IngestRecord::from_text("  \"Keeper signs **new** deal[1]\" ")
            .to_incoming()
            .unwrap();
        assert_eq!(incoming.body, "Keeper signs new deal");
        assert_eq!(incoming.id, ArticleId::from_body("Keeper signs new deal"));
        assert!(IngestRecord::from_text(" [3] ").to_incoming().is_err());
    }

    #[test]
    fn derived_ids_make_reingestion_idempotent() {
        let (store, gateway) = setup();
        let ingestor = Ingestor::new(&store, &gateway);
        let records = vec![
            IngestRecord::from_text("\"Keeper signs **new** deal[1]\""),
            IngestRecord::from_text("Keeper signs new deal"),
            IngestRecord::from_text("Derby postponed due to weather"),
        ];

        let report = ingestor.ingest_all(records.clone()).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped_existing, 1);

        let again = ingestor.ingest_all(records).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.skipped_existing, 3);
        assert_eq!(store.count_articles().unwrap(), 2);
    }

    #[test]
    fn stored_body_is_cleaned() {
        let (store, gateway) = setup();
        let ingestor = Ingestor::new(&store, &gateway);
        let outcome = ingestor
            .ingest(IngestRecord {
                id: Some("a1".into()),
                title: "*Breaking*".into(),
                body: "Striker   **signs**[12] today".into(),
                published_at: None,
            })
            .unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Inserted {
                article_id: ArticleId::new_unchecked("a1")
            }
        );
        let stored = store
            .fetch_articles(&[ArticleId::new_unchecked("a1")])
            .unwrap();
        assert_eq!(stored[0].title, "Breaking");
        assert_eq!(stored[0].body, "Striker signs today");
        assert_eq!(stored[0].embedding.len(), 32);
    }

    #[test]
    fn invalid_records_fail_locally() {
        let (store, gateway) = setup();
        let ingestor = Ingestor::new(&store, &gateway);
        let report = ingestor
            .ingest_all(vec![
                IngestRecord::from_text("   "),
                IngestRecord {
                    id: Some("has space".into()),
                    ..IngestRecord::from_text("Body")
                },
                IngestRecord::from_text("Valid article body"),
            ])
            .unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.inserted, 1);
        assert!(matches!(
            &report.outcomes[0],
            IngestOutcome::Failed { code, .. } if code == "E3001"
        ));
    }
}

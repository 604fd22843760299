//! Storage boundary used by the retrieval and novelty pipelines.

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use scoop_core::db::{self, articles, verdicts};
use scoop_core::{Article, ArticleId, NoveltyVerdict, RankedCandidate};

use crate::lexical::lexical_search;
use crate::semantic::knn_search;

/// Everything the pipeline needs from persistent storage.
///
/// Articles are immutable and verdicts append-only; there is no update or
/// delete operation.
pub trait ArticleStore {
    /// Embedding dimension fixed for the life of the store.
    fn dimension(&self) -> usize;

    /// Insert an article; `false` when the id already exists.
    ///
    /// # Errors
    ///
    /// Returns an error on dimension mismatch or a storage failure.
    fn insert_article(&self, article: &Article) -> Result<bool>;

    /// Nearest neighbours of `query` by cosine similarity.
    ///
    /// # Errors
    ///
    /// Returns an error on dimension mismatch, zero `top_k`, or a storage failure.
    fn search_semantic(&self, query: &[f32], top_k: usize) -> Result<Vec<RankedCandidate>>;

    /// BM25 ranking for free text.
    ///
    /// # Errors
    ///
    /// Returns an error on zero `top_k` or a storage failure.
    fn search_lexical(&self, text: &str, top_k: usize) -> Result<Vec<RankedCandidate>>;

    /// Append a verdict and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error on a storage failure.
    fn insert_verdict(&self, verdict: &NoveltyVerdict) -> Result<i64>;

    /// All verdicts, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error on a storage failure.
    fn list_verdicts(&self) -> Result<Vec<NoveltyVerdict>>;

    /// Articles for `ids` in the given order; unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error on a storage failure.
    fn fetch_articles(&self, ids: &[ArticleId]) -> Result<Vec<Article>>;

    /// Number of stored articles.
    ///
    /// # Errors
    ///
    /// Returns an error on a storage failure.
    fn count_articles(&self) -> Result<u64>;
}

/// [`ArticleStore`] over a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    dimension: usize,
}

impl SqliteStore {
    /// Open the store at `path`, binding it to the embedding space on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated, or if it
    /// was created with a different embedding dimension or model.
    pub fn open(path: &Path, dimension: usize, model: &str) -> Result<Self> {
        let conn = db::open_store(path)?;
        Self::with_connection(conn, dimension, model)
    }

    /// Fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub fn open_in_memory(dimension: usize, model: &str) -> Result<Self> {
        let conn = db::open_in_memory()?;
        Self::with_connection(conn, dimension, model)
    }

    fn with_connection(conn: Connection, dimension: usize, model: &str) -> Result<Self> {
        db::bind_embedding_space(&conn, dimension, model)?;
        Ok(Self { conn, dimension })
    }
}

impl ArticleStore for SqliteStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn insert_article(&self, article: &Article) -> Result<bool> {
        articles::insert_article(&self.conn, article)
    }

    fn search_semantic(&self, query: &[f32], top_k: usize) -> Result<Vec<RankedCandidate>> {
        knn_search(&self.conn, query, self.dimension, top_k)
    }

    fn search_lexical(&self, text: &str, top_k: usize) -> Result<Vec<RankedCandidate>> {
        lexical_search(&self.conn, text, top_k)
    }

    fn insert_verdict(&self, verdict: &NoveltyVerdict) -> Result<i64> {
        verdicts::insert_verdict(&self.conn, verdict)
    }

    fn list_verdicts(&self) -> Result<Vec<NoveltyVerdict>> {
        verdicts::list_verdicts(&self.conn)
    }

    fn fetch_articles(&self, ids: &[ArticleId]) -> Result<Vec<Article>> {
        articles::fetch_articles(&self.conn, ids)
    }

    fn count_articles(&self) -> Result<u64> {
        articles::count_articles(&self.conn)
    }
}

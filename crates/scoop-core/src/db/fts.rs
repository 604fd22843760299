//! FTS5 full-text search with BM25 ranking.
//!
//! The `articles_fts` table indexes the normalized `search_text` column (see
//! [`crate::text::index_text`]) with the Porter stemmer on top of the
//! `unicode61` tokenizer. Callers build `MATCH` expressions with
//! [`crate::text::build_match_query`] so index and query terms are produced
//! by the same normalization.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::model::ArticleId;

/// One BM25 hit. SQLite's `bm25()` is lower-is-better; `score` is negated so
/// that higher is better, like every other ranking in the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    pub article_id: ArticleId,
    pub score: f64,
}

/// Search the FTS5 index with BM25 ranking.
///
/// Results are ordered by BM25 (best first) with ties broken by ascending
/// article id.
///
/// # Errors
///
/// Returns an error if the FTS5 query is malformed or the store is not
/// initialized.
pub fn search_bm25(conn: &Connection, match_query: &str, limit: u32) -> Result<Vec<LexicalHit>> {
    let sql = "SELECT article_id, bm25(articles_fts) AS rank \
               FROM articles_fts \
               WHERE articles_fts MATCH ?1 \
               ORDER BY rank ASC, article_id ASC \
               LIMIT ?2";

    let mut stmt = conn
        .prepare(sql)
        .context("prepare FTS5 BM25 search query")?;

    let rows = stmt
        .query_map(params![match_query, limit], |row| {
            let bm25: f64 = row.get(1)?;
            Ok(LexicalHit {
                article_id: ArticleId::new_unchecked(row.get::<_, String>(0)?),
                score: -bm25,
            })
        })
        .with_context(|| format!("execute FTS5 search for '{match_query}'"))?;

    let mut hits = Vec::new();
    for row in rows {
        hits.push(row.context("read FTS5 search hit")?);
    }
    Ok(hits)
}

/// Number of rows in the FTS5 index.
///
/// # Errors
///
/// Returns an error if the count query fails.
pub fn fts_row_count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM articles_fts", [], |row| row.get(0))
        .context("count FTS5 rows")?;
    u64::try_from(count).context("negative FTS5 row count")
}

//! Lexical search: free text to a BM25 ranking.

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use scoop_core::RankedCandidate;
use scoop_core::db::fts::search_bm25;
use scoop_core::text::build_match_query;
use tracing::debug;

/// Rank stored articles against `text` by BM25.
///
/// The text goes through the same normalization as the indexed column, so an
/// article's own text always matches it. Text that normalizes to nothing
/// yields an empty ranking rather than an error.
///
/// # Errors
///
/// Returns an error if `top_k` is zero or the FTS5 query fails.
pub fn lexical_search(conn: &Connection, text: &str, top_k: usize) -> Result<Vec<RankedCandidate>> {
    if top_k == 0 {
        bail!("top_k must be positive");
    }
    let Some(match_query) = build_match_query(text) else {
        debug!("lexical query normalized to nothing");
        return Ok(Vec::new());
    };

    let limit = u32::try_from(top_k).unwrap_or(u32::MAX);
    let hits = search_bm25(conn, &match_query, limit).context("lexical search")?;

    Ok(hits
        .into_iter()
        .enumerate()
        .map(|(idx, hit)| RankedCandidate {
            article_id: hit.article_id,
            rank: idx + 1,
            score: hit.score,
        })
        .collect())
}

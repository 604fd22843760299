//! Semantic KNN search over stored article embeddings.
//!
//! The query is embedded by the caller; this module only compares vectors.

use anyhow::{Result, bail};
use rusqlite::Connection;
use scoop_core::RankedCandidate;
use scoop_core::db::articles::load_embeddings;
use tracing::debug;

/// Cosine similarity in `[-1, 1]`, or `None` for mismatched or zero vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Rank stored articles by cosine similarity to `query`.
///
/// Ordered by descending similarity, ties by ascending article id. Returns at
/// most `top_k` rows and never pads. Rows whose vector is zero are skipped.
///
/// # Errors
///
/// Returns an error if `top_k` is zero, the query dimension differs from
/// `dimension`, or the embedding scan fails.
pub fn knn_search(
    conn: &Connection,
    query: &[f32],
    dimension: usize,
    top_k: usize,
) -> Result<Vec<RankedCandidate>> {
    if top_k == 0 {
        bail!("top_k must be positive");
    }
    if query.len() != dimension {
        bail!(
            "query embedding dimension mismatch: expected {dimension}, got {}",
            query.len()
        );
    }

    let mut scored = Vec::new();
    for (article_id, embedding) in load_embeddings(conn)? {
        if embedding.len() != dimension {
            debug!(%article_id, dim = embedding.len(), "skipping embedding of foreign dimension");
            continue;
        }
        let Some(score) = cosine_similarity(query, &embedding) else {
            continue;
        };
        scored.push((article_id, score));
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .enumerate()
        .map(|(idx, (article_id, score))| RankedCandidate {
            article_id,
            rank: idx + 1,
            score,
        })
        .collect())
}

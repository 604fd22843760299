//! Article rows: idempotent insert, lookup, and embedding scans.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::{StoreError, embedding_space, from_micros, to_micros};
use crate::model::{Article, ArticleId};
use crate::text;

/// Encode an embedding as a little-endian `f32` BLOB.
#[must_use]
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a little-endian `f32` BLOB.
///
/// Returns `None` if the byte length is not a multiple of four.
#[must_use]
pub fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Insert an article unless its id already exists.
///
/// Returns `true` when a row was written. The full-text index is updated by
/// trigger in the same statement, so a skipped insert never touches it.
///
/// # Errors
///
/// Returns [`StoreError::DimensionMismatch`] if the embedding length differs
/// from the store's bound dimension, or an error if the write fails.
pub fn insert_article(conn: &Connection, article: &Article) -> Result<bool> {
    if let Some(space) = embedding_space(conn)? {
        if space.dimension != article.embedding.len() {
            return Err(StoreError::DimensionMismatch {
                expected: space.dimension,
                actual: article.embedding.len(),
            }
            .into());
        }
    }

    let dim = i64::try_from(article.embedding.len()).context("embedding length out of range")?;
    let search_text = text::index_text(&article.search_text());
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO articles (
                article_id, title, body, search_text, published_at_us,
                embedding, embedding_dim, ingested_at_us
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                article.id.as_str(),
                article.title,
                article.body,
                search_text,
                to_micros(article.published_at),
                encode_embedding(&article.embedding),
                dim,
                to_micros(Utc::now()),
            ],
        )
        .with_context(|| format!("insert article {}", article.id))?;

    debug!(article_id = %article.id, inserted = inserted > 0, "article insert");
    Ok(inserted > 0)
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<(Article, usize)> {
    let id: String = row.get(0)?;
    let blob: Vec<u8> = row.get(4)?;
    let dim: i64 = row.get(5)?;
    let embedding = decode_embedding(&blob).unwrap_or_default();
    let expected = usize::try_from(dim).unwrap_or(0);
    Ok((
        Article {
            id: ArticleId::new_unchecked(id),
            title: row.get(1)?,
            body: row.get(2)?,
            published_at: from_micros(row.get(3)?)?,
            embedding,
        },
        expected,
    ))
}

fn check_row((article, expected): (Article, usize)) -> Result<Article> {
    if article.embedding.len() != expected {
        return Err(StoreError::CorruptRow {
            article_id: article.id.to_string(),
            reason: format!(
                "embedding blob holds {} values, row says {expected}",
                article.embedding.len()
            ),
        }
        .into());
    }
    Ok(article)
}

const ARTICLE_COLUMNS: &str =
    "article_id, title, body, published_at_us, embedding, embedding_dim";

/// Fetch one article by id.
///
/// # Errors
///
/// Returns an error if the query fails or the row is corrupt.
pub fn get_article(conn: &Connection, id: &ArticleId) -> Result<Option<Article>> {
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE article_id = ?1");
    let row = conn
        .query_row(&sql, [id.as_str()], article_from_row)
        .optional()
        .with_context(|| format!("load article {id}"))?;
    row.map(check_row).transpose()
}

/// Fetch articles in the order of `ids`, skipping unknown ids.
///
/// # Errors
///
/// Returns an error if any lookup fails.
pub fn fetch_articles(conn: &Connection, ids: &[ArticleId]) -> Result<Vec<Article>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(article) = get_article(conn, id)? {
            out.push(article);
        }
    }
    Ok(out)
}

/// Number of stored articles.
///
/// # Errors
///
/// Returns an error if the count query fails.
pub fn count_articles(conn: &Connection) -> Result<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))
        .context("count articles")?;
    u64::try_from(count).context("negative article count")
}

/// Load every stored embedding, ordered by article id.
///
/// # Errors
///
/// Returns an error if the scan fails or a BLOB is malformed.
pub fn load_embeddings(conn: &Connection) -> Result<Vec<(ArticleId, Vec<f32>)>> {
    let mut stmt = conn
        .prepare("SELECT article_id, embedding FROM articles ORDER BY article_id")
        .context("prepare embedding scan")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })
        .context("scan embeddings")?;

    let mut out = Vec::new();
    for row in rows {
        let (id, blob) = row.context("read embedding row")?;
        let vector = decode_embedding(&blob).ok_or_else(|| StoreError::CorruptRow {
            article_id: id.clone(),
            reason: format!("embedding blob of {} bytes", blob.len()),
        })?;
        out.push((ArticleId::new_unchecked(id), vector));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{bind_embedding_space, open_in_memory};
    use chrono::TimeZone;

    fn article(id: &str, body: &str, embedding: Vec<f32>) -> Article {
        Article {
            id: ArticleId::new_unchecked(id),
            title: String::new(),
            body: body.to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            embedding,
        }
    }

    #[test]
    fn embedding_blob_is_little_endian() {
        let blob = encode_embedding(&[1.0, -0.5]);
        assert_eq!(blob.len(), 8);
        assert_eq!(&blob[..4], &1.0_f32.to_le_bytes());
        assert_eq!(decode_embedding(&blob), Some(vec![1.0, -0.5]));
        assert_eq!(decode_embedding(&blob[..5]), None);
    }

    #[test]
    fn insert_is_idempotent_by_id() {
        let conn = open_in_memory().unwrap();
        let first = article("a1", "Club confirms striker signing", vec![0.1, 0.2]);
        assert!(insert_article(&conn, &first).unwrap());

        let second = article("a1", "Completely different body", vec![0.3, 0.4]);
        assert!(!insert_article(&conn, &second).unwrap());

        assert_eq!(count_articles(&conn).unwrap(), 1);
        let stored = get_article(&conn, &first.id).unwrap().unwrap();
        assert_eq!(stored, first);

        let fts_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM articles_fts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fts_rows, 1);
    }

    #[test]
    fn insert_rejects_wrong_dimension_once_bound() {
        let conn = open_in_memory().unwrap();
        bind_embedding_space(&conn, 3, "test").unwrap();
        let err = insert_article(&conn, &article("a1", "body", vec![0.1, 0.2])).unwrap_err();
        assert!(err.downcast_ref::<StoreError>().is_some());
        assert_eq!(count_articles(&conn).unwrap(), 0);
    }

    #[test]
    fn fetch_articles_keeps_requested_order_and_skips_unknown() {
        let conn = open_in_memory().unwrap();
        for id in ["a", "b", "c"] {
            insert_article(&conn, &article(id, "some body text", vec![1.0])).unwrap();
        }
        let ids = vec![
            ArticleId::new_unchecked("c"),
            ArticleId::new_unchecked("missing"),
            ArticleId::new_unchecked("a"),
        ];
        let fetched: Vec<String> = fetch_articles(&conn, &ids)
            .unwrap()
            .into_iter()
            .map(|a| a.id.to_string())
            .collect();
        assert_eq!(fetched, vec!["c", "a"]);
    }

    #[test]
    fn load_embeddings_orders_by_id() {
        let conn = open_in_memory().unwrap();
        insert_article(&conn, &article("b", "x", vec![2.0])).unwrap();
        insert_article(&conn, &article("a", "y", vec![1.0])).unwrap();
        let loaded = load_embeddings(&conn).unwrap();
        assert_eq!(loaded[0], (ArticleId::new_unchecked("a"), vec![1.0]));
        assert_eq!(loaded[1], (ArticleId::new_unchecked("b"), vec![2.0]));
    }
}

//! Append-only verdict log.

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};

use super::{from_micros, to_micros};
use crate::model::{ArticleId, Label, NoveltyVerdict, TopMatch};

/// Append a verdict and return its assigned id.
///
/// # Errors
///
/// Returns an error if serialization of the list columns or the insert fails.
pub fn insert_verdict(conn: &Connection, verdict: &NoveltyVerdict) -> Result<i64> {
    let matched =
        serde_json::to_string(&verdict.matched_article_ids).context("encode matched ids")?;
    let new_information =
        serde_json::to_string(&verdict.new_information).context("encode new information")?;

    conn.execute(
        "INSERT INTO verdicts (
            incoming_article_id, incoming_text, label, model_label, confidence,
            reasoning, matched_article_ids_json, new_information_json,
            status_change_detected, top_match_id, top_match_relevance, created_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            verdict.incoming_article_id.as_str(),
            verdict.incoming_text,
            verdict.label.as_str(),
            verdict.model_label.map(Label::as_str),
            verdict.confidence,
            verdict.reasoning,
            matched,
            new_information,
            verdict.status_change_detected,
            verdict.top_match.as_ref().map(|m| m.article_id.as_str()),
            verdict.top_match.as_ref().map(|m| m.relevance_score),
            to_micros(verdict.created_at),
        ],
    )
    .with_context(|| format!("insert verdict for {}", verdict.incoming_article_id))?;

    Ok(conn.last_insert_rowid())
}

fn parse_label(raw: &str, column: usize) -> rusqlite::Result<Label> {
    raw.parse::<Label>().map_err(|reason| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            reason.into(),
        )
    })
}

fn parse_json_list<T: serde::de::DeserializeOwned>(
    raw: &str,
    column: usize,
) -> rusqlite::Result<Vec<T>> {
    serde_json::from_str(raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}

fn verdict_from_row(row: &Row<'_>) -> rusqlite::Result<NoveltyVerdict> {
    let label: String = row.get(3)?;
    let model_label: Option<String> = row.get(4)?;
    let matched: String = row.get(7)?;
    let new_information: String = row.get(8)?;
    let top_match_id: Option<String> = row.get(10)?;
    let top_match_relevance: Option<f64> = row.get(11)?;

    Ok(NoveltyVerdict {
        verdict_id: Some(row.get(0)?),
        incoming_article_id: ArticleId::new_unchecked(row.get::<_, String>(1)?),
        incoming_text: row.get(2)?,
        label: parse_label(&label, 3)?,
        model_label: model_label.map(|raw| parse_label(&raw, 4)).transpose()?,
        confidence: row.get(5)?,
        reasoning: row.get(6)?,
        matched_article_ids: parse_json_list(&matched, 7)?,
        new_information: parse_json_list(&new_information, 8)?,
        status_change_detected: row.get(9)?,
        top_match: top_match_id.map(|id| TopMatch {
            article_id: ArticleId::new_unchecked(id),
            relevance_score: top_match_relevance.unwrap_or(0.0),
        }),
        created_at: from_micros(row.get(12)?)?,
    })
}

/// All verdicts, most recent first.
///
/// # Errors
///
/// Returns an error if the query fails or a row cannot be decoded.
pub fn list_verdicts(conn: &Connection) -> Result<Vec<NoveltyVerdict>> {
    let mut stmt = conn
        .prepare(
            "SELECT verdict_id, incoming_article_id, incoming_text, label, model_label,
                    confidence, reasoning, matched_article_ids_json, new_information_json,
                    status_change_detected, top_match_id, top_match_relevance, created_at_us
             FROM verdicts
             ORDER BY created_at_us DESC, verdict_id DESC",
        )
        .context("prepare verdict listing")?;

    let rows = stmt
        .query_map([], verdict_from_row)
        .context("list verdicts")?;

    let mut verdicts = Vec::new();
    for row in rows {
        verdicts.push(row.context("decode verdict row")?);
    }
    Ok(verdicts)
}

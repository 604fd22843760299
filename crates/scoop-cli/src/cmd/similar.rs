//! `scoop similar`: top-k stored articles for a query text.
//!
//! Semantic and lexical rankings fused with RRF; no LLM calls.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use scoop_core::text::{clean_article_text, excerpt};
use scoop_core::{ArticleId, ErrorCode};
use scoop_search::fusion::{LEXICAL_SOURCE, SEMANTIC_SOURCE};
use scoop_search::{ArticleStore, HybridRetriever};
use serde::Serialize;

use super::Session;
use crate::output::{pretty_rule, render_mode};

const EXCERPT_CHARS: usize = 160;

#[derive(Args, Debug)]
#[command(
    about = "Find stored articles similar to a text",
    long_about = "Rank stored articles against a query text by fusing semantic (cosine) and\n\
                  lexical (BM25) rankings with Reciprocal Rank Fusion.",
    after_help = "EXAMPLES:\n    # Five most similar articles\n    scoop similar --query \"Bergvall ankle sprain\"\n\n\
                  # Ten results as JSON\n    scoop similar --query \"transfer fee\" --top-k 10 --json"
)]
pub struct SimilarArgs {
    /// Query text.
    #[arg(short, long)]
    pub query: String,

    /// Number of results; defaults to `retrieval.top_k`.
    #[arg(short = 'k', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SimilarHit {
    rank: usize,
    article_id: ArticleId,
    title: String,
    rrf_score: f64,
    semantic_rank: Option<usize>,
    lexical_rank: Option<usize>,
    excerpt: String,
}

#[derive(Debug, Serialize)]
struct SimilarOutput {
    query: String,
    top_k: usize,
    count: usize,
    results: Vec<SimilarHit>,
}

pub fn run_similar(args: &SimilarArgs, session: &Session) -> Result<()> {
    let query = clean_article_text(&args.query);
    if query.is_empty() {
        return Err(anyhow::anyhow!("query text is empty").context(ErrorCode::InvalidInput));
    }

    let top_k = args
        .top_k
        .map_or(session.config.retrieval.top_k, |k| {
            usize::try_from(k).unwrap_or(usize::MAX)
        });
    let gateway = session.gateway()?;
    let store = session.open_store()?;

    let outcome = HybridRetriever::new(&store, &gateway, &session.config.retrieval)
        .with_top_k(top_k)
        .retrieve(&query)?;

    let ids: Vec<ArticleId> = outcome
        .fused
        .iter()
        .map(|c| c.article_id.clone())
        .collect();
    let articles = store
        .fetch_articles(&ids)
        .context(ErrorCode::SearchFailed)?;

    let results: Vec<SimilarHit> = outcome
        .fused
        .iter()
        .enumerate()
        .map(|(idx, fused)| {
            let article = articles.iter().find(|a| a.id == fused.article_id);
            SimilarHit {
                rank: idx + 1,
                article_id: fused.article_id.clone(),
                title: article.map(|a| a.title.clone()).unwrap_or_default(),
                rrf_score: fused.rrf_score,
                semantic_rank: fused.rank_in(SEMANTIC_SOURCE),
                lexical_rank: fused.rank_in(LEXICAL_SOURCE),
                excerpt: article
                    .map(|a| excerpt(&a.body, EXCERPT_CHARS))
                    .unwrap_or_default(),
            }
        })
        .collect();

    let output = SimilarOutput {
        query,
        top_k,
        count: results.len(),
        results,
    };
    render_mode(session.output, &output, render_text, render_pretty)
}

fn rank_cell(rank: Option<usize>) -> String {
    rank.map_or_else(|| "-".to_string(), |r| r.to_string())
}

fn render_text(out: &SimilarOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for hit in &out.results {
        writeln!(
            w,
            "{}\t{}\t{:.6}\t{}\t{}",
            hit.rank,
            hit.article_id,
            hit.rrf_score,
            rank_cell(hit.semantic_rank),
            rank_cell(hit.lexical_rank)
        )?;
    }
    Ok(())
}

fn render_pretty(out: &SimilarOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "Query: {}", excerpt(&out.query, EXCERPT_CHARS))?;
    if out.results.is_empty() {
        writeln!(w, "No similar articles found. Run `scoop ingest` to populate the store.")?;
        return Ok(());
    }

    writeln!(w, "Results: {} (top {})", out.count, out.top_k)?;
    pretty_rule(w)?;
    writeln!(w, "{:>4}  {:<20}  {:>9}  {:>4}  {:>4}  TITLE", "RANK", "ID", "RRF", "SEM", "LEX")?;
    for hit in &out.results {
        writeln!(
            w,
            "{:>4}  {:<20}  {:>9.6}  {:>4}  {:>4}  {}",
            hit.rank,
            hit.article_id.as_str(),
            hit.rrf_score,
            rank_cell(hit.semantic_rank),
            rank_cell(hit.lexical_rank),
            hit.title
        )?;
        writeln!(w, "      {}", hit.excerpt)?;
    }
    Ok(())
}

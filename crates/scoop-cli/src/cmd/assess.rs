//! `scoop assess`: PUBLISH / SKIP / REVIEW verdicts for incoming articles.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use scoop_core::text::excerpt;
use scoop_core::{ArticleId, ErrorCode, IncomingArticle, Label};
use scoop_novelty::{BatchEntry, LlmNoveltyClassifier, NoveltyPipeline, Reranker};
use serde::Serialize;

use super::{Session, load_records};
use crate::output::{pretty_kv, pretty_rule, render_mode, write_json_file};

#[derive(Args, Debug)]
#[command(
    about = "Decide whether incoming articles add new information",
    long_about = "For each incoming article: retrieve similar stored articles, ask the model which\n\
                  ones cover the same story, then ask whether the article adds material new\n\
                  information. Low-confidence calls are routed to REVIEW. Every verdict is recorded.",
    after_help = "EXAMPLES:\n    # Assess a batch and keep the decisions for `scoop evaluate`\n    \
                  scoop assess --input data/incoming.json --output outputs/decisions.json\n\n\
                  # Machine-readable output\n    scoop assess --input data/incoming.json --json"
)]
pub struct AssessArgs {
    /// Path to the incoming articles (same formats as `scoop ingest`).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Also write the per-article results as a JSON array to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
struct AssessSummary {
    total: usize,
    publish: usize,
    skip: usize,
    review: usize,
    failed: usize,
}

impl AssessSummary {
    fn from_entries(entries: &[BatchEntry]) -> Self {
        let mut summary = Self {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            match entry.verdict().map(|v| v.label) {
                Some(Label::Publish) => summary.publish += 1,
                Some(Label::Skip) => summary.skip += 1,
                Some(Label::Review) => summary.review += 1,
                None => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Serialize)]
struct AssessOutput {
    summary: AssessSummary,
    entries: Vec<BatchEntry>,
}

pub fn run_assess(args: &AssessArgs, session: &Session) -> Result<()> {
    let records = load_records(&args.input)?;

    // Invalid records are reported in place; the rest go through the pipeline.
    let prepared: Vec<Result<IncomingArticle, BatchEntry>> = records
        .iter()
        .map(|record| {
            record.to_incoming().map_err(|err| BatchEntry::Failed {
                incoming_article_id: record
                    .id
                    .as_deref()
                    .and_then(|raw| ArticleId::parse(raw).ok())
                    .unwrap_or_else(|| ArticleId::from_body(&record.body)),
                code: ErrorCode::InvalidInput.code().to_string(),
                reason: err.to_string(),
            })
        })
        .collect();
    let valid: Vec<IncomingArticle> = prepared
        .iter()
        .filter_map(|p| p.as_ref().ok().cloned())
        .collect();

    let gateway = session.gateway()?;
    let store = session.open_store()?;
    let model = session.language_model()?;
    let config = &session.config;
    let classifier = LlmNoveltyClassifier::new(&model, config.novelty.max_attempts);
    let pipeline = NoveltyPipeline::new(
        &store,
        &gateway,
        Reranker::new(&model, &config.reranker, config.rerank_budget()),
        &classifier,
        config,
    );

    let mut decided = pipeline.assess_batch(&valid)?.into_iter();
    let mut entries = Vec::with_capacity(prepared.len());
    for item in prepared {
        match item {
            Ok(_) => entries.push(
                decided
                    .next()
                    .context("batch returned fewer entries than articles")?,
            ),
            Err(failed) => entries.push(failed),
        }
    }

    if let Some(path) = &args.output {
        write_json_file(path, &entries)?;
    }

    let output = AssessOutput {
        summary: AssessSummary::from_entries(&entries),
        entries,
    };
    render_mode(session.output, &output, render_text, render_pretty)
}

fn render_text(out: &AssessOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for entry in &out.entries {
        match entry {
            BatchEntry::Decided(v) => writeln!(
                w,
                "{}\t{}\t{:.2}\t{}",
                v.label, v.incoming_article_id, v.confidence, v.reasoning
            )?,
            BatchEntry::Failed {
                incoming_article_id,
                code,
                reason,
            } => writeln!(w, "FAILED\t{incoming_article_id}\t{code}\t{reason}")?,
        }
    }
    Ok(())
}

fn render_pretty(out: &AssessOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "Decisions ({} articles)", out.summary.total)?;
    pretty_rule(w)?;
    for (idx, entry) in out.entries.iter().enumerate() {
        match entry {
            BatchEntry::Decided(v) => {
                writeln!(
                    w,
                    "[{}] Article {} {} (confidence: {:.2})",
                    v.label,
                    idx + 1,
                    v.incoming_article_id,
                    v.confidence
                )?;
                if let Some(model_label) = v.model_label.filter(|l| *l != v.label) {
                    writeln!(w, "     Model said {model_label}; below the confidence threshold")?;
                }
                writeln!(w, "     {}", v.reasoning)?;
                if !v.new_information.is_empty() {
                    writeln!(w, "     New info: {}", v.new_information.join(", "))?;
                }
                if let Some(top) = &v.top_match {
                    writeln!(
                        w,
                        "     Top match: {} (relevance {:.2})",
                        top.article_id, top.relevance_score
                    )?;
                }
            }
            BatchEntry::Failed {
                incoming_article_id,
                code,
                reason,
            } => {
                writeln!(w, "[FAILED] Article {} {incoming_article_id} ({code})", idx + 1)?;
                writeln!(w, "     {}", excerpt(reason, 200))?;
            }
        }
        writeln!(w)?;
    }
    pretty_rule(w)?;
    pretty_kv(
        w,
        "Summary",
        format!(
            "{} publish, {} skip, {} review, {} failed",
            out.summary.publish, out.summary.skip, out.summary.review, out.summary.failed
        ),
    )
}

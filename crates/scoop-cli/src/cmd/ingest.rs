//! `scoop ingest`: embed and store articles from a JSON, JSONL or CSV file.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use scoop_core::ErrorCode;
use scoop_search::{ArticleStore, IngestOutcome, IngestReport, Ingestor};
use serde::Serialize;

use super::{Session, load_records};
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
#[command(
    about = "Ingest articles into the store",
    long_about = "Clean, embed and store articles. Records whose id is already stored are skipped,\n\
                  so re-running the same file is safe.\n\n\
                  Input is a JSON array, an object with a `text_list` array, JSON Lines, or CSV\n\
                  with a `text` column. Entries are objects {id?, title?, body|text, published_at?}\n\
                  or bare strings; CSV may carry the same optional columns.",
    after_help = "EXAMPLES:\n    # Ingest a JSONL feed\n    scoop ingest --input data/articles.jsonl\n\n\
                  # Ingest a CSV export with a `text` column\n    scoop ingest --input data/news.csv\n\n\
                  # Machine-readable summary\n    scoop ingest --input data/articles.json --json"
)]
pub struct IngestArgs {
    /// Path to the input file.
    #[arg(short, long)]
    pub input: PathBuf,
}

#[derive(Debug, Serialize)]
struct IngestOutput {
    input: String,
    #[serde(flatten)]
    report: IngestReport,
    stored_total: u64,
}

pub fn run_ingest(args: &IngestArgs, session: &Session) -> Result<()> {
    let records = load_records(&args.input)?;

    let gateway = session.gateway()?;
    let store = session.open_store()?;
    let report = Ingestor::new(&store, &gateway)
        .ingest_all(records)
        .context(ErrorCode::StoreUnavailable)?;

    let output = IngestOutput {
        input: args.input.display().to_string(),
        report,
        stored_total: store
            .count_articles()
            .context(ErrorCode::StoreUnavailable)?,
    };
    render_mode(session.output, &output, render_text, render_pretty)
}

fn render_text(out: &IngestOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for outcome in &out.report.outcomes {
        match outcome {
            IngestOutcome::Inserted { article_id } => writeln!(w, "inserted\t{article_id}")?,
            IngestOutcome::Skipped { article_id } => writeln!(w, "skipped\t{article_id}")?,
            IngestOutcome::Failed {
                article_id,
                code,
                reason,
            } => {
                let id = article_id.as_ref().map_or("-", |id| id.as_str());
                writeln!(w, "failed\t{id}\t{code}\t{reason}")?;
            }
        }
    }
    Ok(())
}

fn render_pretty(out: &IngestOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Ingested {}", out.input))?;
    pretty_kv(w, "Inserted", out.report.inserted.to_string())?;
    pretty_kv(w, "Skipped", out.report.skipped_existing.to_string())?;
    pretty_kv(w, "Failed", out.report.failed.to_string())?;
    pretty_kv(w, "Stored", out.stored_total.to_string())?;
    for outcome in &out.report.outcomes {
        if let IngestOutcome::Failed {
            article_id,
            code,
            reason,
        } = outcome
        {
            let id = article_id.as_ref().map_or("(no id)", |id| id.as_str());
            writeln!(w, "  [{code}] {id}: {reason}")?;
        }
    }
    Ok(())
}

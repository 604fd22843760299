//! `scoop report`: every recorded verdict plus summary statistics.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use scoop_core::ErrorCode;
use scoop_core::text::excerpt;
use scoop_novelty::VerdictReport;
use scoop_search::ArticleStore;

use super::Session;
use crate::output::{pretty_kv, pretty_section, render_mode, write_json_file};

#[derive(Args, Debug)]
#[command(
    about = "Summarize recorded verdicts",
    long_about = "List every recorded verdict, most recent first, with label counts and\n\
                  confidence statistics.",
    after_help = "EXAMPLES:\n    # Human-readable report\n    scoop report\n\n\
                  # Save the full report as JSON\n    scoop report --output outputs/analysis.json"
)]
pub struct ReportArgs {
    /// Also write the report as JSON to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run_report(args: &ReportArgs, session: &Session) -> Result<()> {
    let store = session.open_store()?;
    let verdicts = store.list_verdicts().context(ErrorCode::StoreUnavailable)?;
    let report = VerdictReport::from_verdicts(verdicts);

    if let Some(path) = &args.output {
        write_json_file(path, &report)?;
    }
    render_mode(session.output, &report, render_text, render_pretty)
}

fn render_text(report: &VerdictReport, w: &mut dyn Write) -> std::io::Result<()> {
    for v in &report.verdicts {
        writeln!(
            w,
            "{}\t{}\t{}\t{:.2}\t{}",
            v.verdict_id.unwrap_or_default(),
            v.label,
            v.incoming_article_id,
            v.confidence,
            v.created_at.to_rfc3339()
        )?;
    }
    Ok(())
}

fn render_pretty(report: &VerdictReport, w: &mut dyn Write) -> std::io::Result<()> {
    if report.is_empty() {
        writeln!(w, "No verdicts recorded yet. Run `scoop assess` first.")?;
        return Ok(());
    }

    pretty_section(w, &format!("Decision analysis ({} verdicts)", report.counts.total))?;
    for v in &report.verdicts {
        writeln!(
            w,
            "[{}] Verdict #{} (confidence: {:.2})",
            v.label,
            v.verdict_id.unwrap_or_default(),
            v.confidence
        )?;
        writeln!(w, "     Text: {}", excerpt(&v.incoming_text, 200))?;
        writeln!(w, "     Reasoning: {}", v.reasoning)?;
        if let Some(top) = &v.top_match {
            writeln!(
                w,
                "     Matched {} (relevance: {:.2})",
                top.article_id, top.relevance_score
            )?;
        }
        writeln!(w, "     Recorded: {}", v.created_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(w)?;
    }

    let counts = &report.counts;
    pretty_kv(
        w,
        "Decisions",
        format!(
            "{} publish, {} skip, {} review ({} downgraded)",
            counts.publish, counts.skip, counts.review, counts.downgraded
        ),
    )?;
    if let Some(stats) = &report.confidence {
        pretty_kv(
            w,
            "Confidence",
            format!("avg {:.2}, min {:.2}, max {:.2}", stats.mean, stats.min, stats.max),
        )?;
    }
    if let Some(relevance) = report.mean_top_match_relevance {
        pretty_kv(w, "Relevance", format!("avg {relevance:.2} over matched verdicts"))?;
    }
    pretty_kv(w, "Status", format!("{} status changes", counts.status_changes))
}

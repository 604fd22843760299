//! `scoop evaluate`: accuracy of a decisions file against ground truth.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use scoop_core::ErrorCode;
use scoop_novelty::{EvaluationReport, evaluate};

use super::{Session, read_input};
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
#[command(
    about = "Score recorded decisions against expected labels",
    long_about = "Compare a decisions file written by `scoop assess --output` with a ground-truth\n\
                  file (a JSON array of {expected_decision}) entry by entry.",
    after_help = "EXAMPLES:\n    scoop evaluate --decisions outputs/decisions.json --ground-truth data/ground_truth.json"
)]
pub struct EvaluateArgs {
    #[arg(short, long)]
    pub decisions: PathBuf,

    #[arg(short, long)]
    pub ground_truth: PathBuf,
}

pub fn run_evaluate(args: &EvaluateArgs, session: &Session) -> Result<()> {
    let decisions = read_input(&args.decisions)?;
    let truth = read_input(&args.ground_truth)?;
    let report = evaluate(&decisions, &truth).context(ErrorCode::InvalidInput)?;
    render_mode(session.output, &report, render_text, render_pretty)
}

fn label_cell(label: Option<scoop_core::Label>) -> String {
    label.map_or_else(|| "-".to_string(), |l| l.to_string())
}

fn render_text(report: &EvaluationReport, w: &mut dyn Write) -> std::io::Result<()> {
    for row in &report.rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            row.index,
            row.expected,
            label_cell(row.got),
            if row.correct { "ok" } else { "miss" }
        )?;
    }
    writeln!(w, "accuracy\t{}/{}\t{:.3}", report.correct, report.total, report.accuracy)
}

fn render_pretty(report: &EvaluationReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Evaluation: {} articles", report.total))?;
    for row in &report.rows {
        writeln!(
            w,
            "Article {}: expected {}, got {}{}",
            row.index,
            row.expected,
            label_cell(row.got),
            if row.correct { "" } else { "  ✗" }
        )?;
    }
    writeln!(w)?;
    pretty_kv(
        w,
        "Result",
        format!(
            "{}/{} correct ({:.0}%)",
            report.correct,
            report.total,
            report.accuracy * 100.0
        ),
    )
}

//! E2E tests for the `scoop` binary using the offline local embedder.
//!
//! Covers: JSONL and CSV ingestion, similar ranking and JSON schema, report on
//! an empty store, assess against an empty store, evaluate, and error codes.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test harness helpers
// ---------------------------------------------------------------------------

fn scoop_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scoop"));
    cmd.current_dir(dir);
    cmd.env("SCOOP_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("SCOOP_FORMAT");
    cmd.env_remove("OPENROUTER_API_KEY");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("scoop should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

const CORPUS: &str = r#"{"id": "spurs-injury", "title": "Bergvall injury", "body": "Tottenham midfielder Lucas Bergvall suffered a high ankle sprain against Borussia Dortmund."}
{"id": "spurs-return", "body": "Bergvall ankle sprain could be a longer one, says Thomas Frank after scans."}
{"id": "chelsea-transfer", "body": "Chelsea agree a fee with Palmeiras for a Brazilian winger."}
"Snow forces postponement of the Merseyside derby."
"#;

fn ingest_corpus(dir: &Path) {
    fs::write(dir.join("articles.jsonl"), CORPUS).unwrap();
    let json = json_stdout(scoop_cmd(dir).args(["ingest", "--input", "articles.jsonl", "--json"]));
    assert_eq!(json["inserted"], 4);
    assert_eq!(json["failed"], 0);
}

// ---------------------------------------------------------------------------
// ingest / similar
// ---------------------------------------------------------------------------

#[test]
fn ingest_twice_skips_existing_articles() {
    let dir = TempDir::new().unwrap();
    ingest_corpus(dir.path());
    assert!(dir.path().join(".scoop/scoop.db").exists());

    let again = json_stdout(scoop_cmd(dir.path()).args([
        "ingest",
        "--input",
        "articles.jsonl",
        "--json",
    ]));
    assert_eq!(again["inserted"], 0);
    assert_eq!(again["skipped_existing"], 4);
    assert_eq!(again["stored_total"], 4);
}

#[test]
fn ingest_reads_csv_with_text_column() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("news.csv"),
        "text\n\
         \"Tottenham's Lucas Bergvall suffered a high ankle sprain against Dortmund, says Frank.\"\n\
         Chelsea agree a fee with Palmeiras for a Brazilian winger\n\
         \"Snow forces **postponement** of the Merseyside derby[1]\"\n",
    )
    .unwrap();

    let json = json_stdout(scoop_cmd(dir.path()).args(["ingest", "--input", "news.csv", "--json"]));
    assert_eq!(json["inserted"], 3);
    assert_eq!(json["failed"], 0);
    assert_eq!(json["stored_total"], 3);

    let hits = json_stdout(scoop_cmd(dir.path()).args([
        "similar",
        "--query",
        "Merseyside derby snow postponement",
        "--top-k",
        "1",
        "--json",
    ]));
    let excerpt = hits["results"][0]["excerpt"].as_str().unwrap();
    assert_eq!(excerpt, "Snow forces postponement of the Merseyside derby");
}

#[test]
fn similar_ranks_related_articles_first() {
    let dir = TempDir::new().unwrap();
    ingest_corpus(dir.path());

    let json = json_stdout(scoop_cmd(dir.path()).args([
        "similar",
        "--query",
        "Bergvall ankle sprain Tottenham",
        "--top-k",
        "3",
        "--json",
    ]));
    assert_eq!(json["top_k"], 3);
    let results = json["results"].as_array().expect("results array");
    assert_eq!(results.len(), 3);

    let top_two: Vec<&str> = results[..2]
        .iter()
        .map(|r| r["article_id"].as_str().unwrap())
        .collect();
    assert!(top_two.contains(&"spurs-injury"));
    assert!(top_two.contains(&"spurs-return"));
    assert_eq!(results[0]["rank"], 1);
    assert!(results[0]["rrf_score"].as_f64().unwrap() >= results[1]["rrf_score"].as_f64().unwrap());
}

#[test]
fn similar_is_deterministic() {
    let dir = TempDir::new().unwrap();
    ingest_corpus(dir.path());

    let run = || {
        scoop_cmd(dir.path())
            .args(["similar", "--query", "ankle sprain", "--format", "text"])
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn similar_on_empty_store_returns_no_results() {
    let dir = TempDir::new().unwrap();
    let json = json_stdout(scoop_cmd(dir.path()).args(["similar", "-q", "anything", "--json"]));
    assert_eq!(json["count"], 0);
}

// ---------------------------------------------------------------------------
// assess / report / evaluate
// ---------------------------------------------------------------------------

#[test]
fn report_on_empty_store() {
    let dir = TempDir::new().unwrap();
    let json = json_stdout(scoop_cmd(dir.path()).args(["report", "--json"]));
    assert_eq!(json["counts"]["total"], 0);
    assert!(json["confidence"].is_null());

    scoop_cmd(dir.path())
        .args(["report", "--format", "pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No verdicts recorded yet"));
}

#[test]
fn assess_against_empty_store_publishes_and_records() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("incoming.json"),
        r#"{"text_list": ["Arsenal sign a new goalkeeper on a five-year deal.", "   "]}"#,
    )
    .unwrap();

    // Nothing is stored, so no model call is made and the key is never used.
    let json = json_stdout(
        scoop_cmd(dir.path())
            .env("OPENROUTER_API_KEY", "unused")
            .args([
                "assess",
                "--input",
                "incoming.json",
                "--output",
                "out/decisions.json",
                "--json",
            ]),
    );
    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["summary"]["publish"], 1);
    assert_eq!(json["summary"]["failed"], 1);
    let first = &json["entries"][0];
    assert_eq!(first["status"], "decided");
    assert_eq!(first["label"], "PUBLISH");
    assert!((first["confidence"].as_f64().unwrap() - 0.95).abs() < 1e-9);
    assert!(first["model_label"].is_null());
    assert_eq!(json["entries"][1]["code"], "E3001");

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/decisions.json")).unwrap())
            .unwrap();
    assert_eq!(saved.as_array().unwrap().len(), 2);

    let report = json_stdout(scoop_cmd(dir.path()).args(["report", "--json"]));
    assert_eq!(report["counts"]["total"], 1);
    assert_eq!(report["counts"]["publish"], 1);

    fs::write(
        dir.path().join("truth.json"),
        r#"[{"expected_decision": "PUBLISH"}, {"expected_decision": "SKIP"}]"#,
    )
    .unwrap();
    let eval = json_stdout(scoop_cmd(dir.path()).args([
        "evaluate",
        "--decisions",
        "out/decisions.json",
        "--ground-truth",
        "truth.json",
        "--json",
    ]));
    assert_eq!(eval["total"], 2);
    assert_eq!(eval["correct"], 1);
}

#[test]
fn assess_without_api_key_fails_with_config_code() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("incoming.json"), r#"["Some article"]"#).unwrap();

    scoop_cmd(dir.path())
        .args(["assess", "--input", "incoming.json", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"))
        .stderr(predicate::str::contains("OPENROUTER_API_KEY"));
}

// ---------------------------------------------------------------------------
// errors
// ---------------------------------------------------------------------------

#[test]
fn missing_input_file_reports_invalid_input() {
    let dir = TempDir::new().unwrap();
    let output = scoop_cmd(dir.path())
        .args(["ingest", "--input", "nope.jsonl", "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("JSON error on stderr");
    assert_eq!(err["error"]["error_code"], "E3001");
    assert!(err["error"]["message"].as_str().unwrap().contains("nope.jsonl"));
}

#[test]
fn changing_embedding_dimension_is_rejected() {
    let dir = TempDir::new().unwrap();
    ingest_corpus(dir.path());

    fs::write(
        dir.path().join("scoop.toml"),
        "[store]\nembedding_dimension = 64\n",
    )
    .unwrap();
    scoop_cmd(dir.path())
        .args(["similar", "--query", "ankle", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2002]"));
}

#[test]
fn changing_embedding_model_is_rejected() {
    let dir = TempDir::new().unwrap();
    ingest_corpus(dir.path());

    // Same dimension as the local store, different model.
    fs::write(
        dir.path().join("scoop.toml"),
        "[embedding]\nprovider = \"remote\"\nmodel = \"openai/text-embedding-3-small\"\n",
    )
    .unwrap();
    scoop_cmd(dir.path())
        .args(["report", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2002]"))
        .stderr(predicate::str::contains("hashed-bow-v1"));
}

#[test]
fn malformed_config_reports_parse_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scoop.toml"), "[retrieval\ntop_k = ").unwrap();
    scoop_cmd(dir.path())
        .args(["report", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"));
}

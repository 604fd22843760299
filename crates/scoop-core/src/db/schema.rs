//! SQLite schema for the article store.
//!
//! - `articles` holds immutable ingested articles and their embeddings
//! - `articles_fts` indexes the normalized `search_text` column; an insert
//!   trigger keeps it in sync (articles are never updated or deleted)
//! - `verdicts` is an append-only log of novelty assessments
//! - `store_meta` records schema version and the embedding space

/// Migration v1: articles, full-text index, verdicts, and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS articles (
    article_id TEXT PRIMARY KEY CHECK (length(article_id) > 0),
    title TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL,
    search_text TEXT NOT NULL,
    published_at_us INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    embedding_dim INTEGER NOT NULL CHECK (embedding_dim > 0),
    ingested_at_us INTEGER NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts USING fts5(
    search_text,
    article_id UNINDEXED,
    tokenize = 'porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS articles_fts_ai AFTER INSERT ON articles BEGIN
    INSERT INTO articles_fts(rowid, search_text, article_id)
    VALUES (new.rowid, new.search_text, new.article_id);
END;

CREATE TABLE IF NOT EXISTS verdicts (
    verdict_id INTEGER PRIMARY KEY AUTOINCREMENT,
    incoming_article_id TEXT NOT NULL,
    incoming_text TEXT NOT NULL,
    label TEXT NOT NULL CHECK (label IN ('PUBLISH', 'SKIP', 'REVIEW')),
    model_label TEXT CHECK (model_label IS NULL OR model_label IN ('PUBLISH', 'SKIP')),
    confidence REAL NOT NULL,
    reasoning TEXT NOT NULL,
    matched_article_ids_json TEXT NOT NULL DEFAULT '[]',
    new_information_json TEXT NOT NULL DEFAULT '[]',
    status_change_detected INTEGER NOT NULL DEFAULT 0 CHECK (status_change_detected IN (0, 1)),
    top_match_id TEXT,
    top_match_relevance REAL,
    created_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_verdicts_created
    ON verdicts(created_at_us DESC, verdict_id DESC);

CREATE INDEX IF NOT EXISTS idx_verdicts_incoming
    ON verdicts(incoming_article_id);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    embedding_dim INTEGER,
    embedding_model TEXT
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 0);
";

/// Indexes expected after all migrations have run.
pub const REQUIRED_INDEXES: &[&str] = &["idx_verdicts_created", "idx_verdicts_incoming"];

pub mod assess;
pub mod evaluate;
pub mod ingest;
pub mod report;
pub mod similar;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use scoop_core::config::{EmbeddingProviderKind, ScoopConfig, load_config};
use scoop_core::ErrorCode;
use scoop_novelty::OpenAiChatClient;
use scoop_search::{
    EmbeddingGateway, IngestRecord, SqliteStore, configured_model_id, parse_csv_records,
    parse_records,
};
use tracing::debug;

use crate::output::OutputMode;

/// Resolved configuration and locations shared by every subcommand.
#[derive(Debug)]
pub struct Session {
    pub config: ScoopConfig,
    pub db_path: PathBuf,
    pub output: OutputMode,
}

impl Session {
    /// Load configuration; `--db` overrides `store.path`.
    pub fn load(
        config_path: Option<&Path>,
        db_override: Option<PathBuf>,
        output: OutputMode,
        project_root: &Path,
    ) -> Result<Self> {
        let config = load_config(config_path, project_root).context(ErrorCode::ConfigInvalid)?;
        let db_path = db_override.map_or_else(
            || config.resolved_store_path(project_root),
            |path| {
                if path.is_absolute() {
                    path
                } else {
                    project_root.join(path)
                }
            },
        );
        debug!(db = %db_path.display(), "session ready");
        Ok(Self {
            config,
            db_path,
            output,
        })
    }

    /// Embedding gateway for the configured provider.
    pub fn gateway(&self) -> Result<EmbeddingGateway> {
        let embedding = &self.config.embedding;
        let api_key = match embedding.provider {
            EmbeddingProviderKind::Local => None,
            EmbeddingProviderKind::Remote => api_key(&embedding.api_key_env),
        };
        EmbeddingGateway::from_config(embedding, self.config.store.embedding_dimension, api_key)
            .context(ErrorCode::ConfigInvalid)
    }

    /// Open (creating if needed) the store bound to the configured embedding space.
    ///
    /// The store records the id of the provider that actually embeds, so a
    /// local store cannot be reopened with a remote model of the same size.
    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(
            &self.db_path,
            self.config.store.embedding_dimension,
            configured_model_id(&self.config.embedding),
        )
        .with_context(|| format!("open store {}", self.db_path.display()))
        .context(ErrorCode::StoreUnavailable)
    }

    /// Chat client for reranking and adjudication.
    pub fn language_model(&self) -> Result<OpenAiChatClient> {
        let llm = &self.config.llm;
        let key = api_key(&llm.api_key_env)
            .with_context(|| format!("set ${} to call {}", llm.api_key_env, llm.model))
            .context(ErrorCode::ConfigInvalid)?;
        Ok(OpenAiChatClient::new(llm, key))
    }
}

fn api_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.trim().is_empty())
}

/// Read an input file as UTF-8.
pub fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))
        .context(ErrorCode::InvalidInput)
}

/// Read and parse an input file of article records.
///
/// A `.csv` extension forces CSV; anything else is detected from the content.
pub fn load_records(path: &Path) -> Result<Vec<IngestRecord>> {
    let content = read_input(path)?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let records = if is_csv {
        parse_csv_records(&content)
    } else {
        parse_records(&content)
    };
    records
        .with_context(|| format!("parse {}", path.display()))
        .context(ErrorCode::InvalidInput)
}

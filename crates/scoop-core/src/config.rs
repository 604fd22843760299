//! `scoop.toml` configuration.
//!
//! Every component receives its section explicitly through its constructor;
//! nothing below the CLI reads process state. Secrets are never stored in the
//! file, only the names of the environment variables holding them.

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the project directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "scoop.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoopConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub novelty: NoveltyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database path; relative paths resolve against the project directory.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Embedding dimension recorded when the store is created.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            embedding_dimension: default_embedding_dimension(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// Deterministic in-process hashed embedding model.
    Local,
    /// OpenAI-compatible `/embeddings` HTTP endpoint.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProviderKind,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per text, including the first call.
    #[serde(default = "default_embedding_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles on each further retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Leading whitespace tokens kept before a text is embedded.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_embedding_timeout_secs(),
            max_attempts: default_embedding_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_input_tokens: default_max_input_tokens(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: f32,
    /// Ask the provider for `response_format = json_object`.
    #[serde(default = "default_true")]
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout_secs(),
            temperature: 0.0,
            json_mode: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// RRF constant; higher values flatten the advantage of top ranks.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rrf_k: default_rrf_k(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankerConfig {
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
    /// Upper bound on LLM calls per article; `None` means `retrieval.top_k`.
    #[serde(default)]
    pub max_candidates: Option<usize>,
    /// Concurrent rerank calls; `1` keeps them sequential.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
            max_candidates: None,
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoveltyConfig {
    /// Verdicts below this confidence are downgraded to REVIEW.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Total adjudication attempts when the model output cannot be parsed.
    #[serde(default = "default_novelty_max_attempts")]
    pub max_attempts: u32,
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_attempts: default_novelty_max_attempts(),
        }
    }
}

impl ScoopConfig {
    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.store.embedding_dimension > 0,
            "store.embedding_dimension must be positive"
        );
        ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be positive");
        ensure!(self.retrieval.rrf_k > 0, "retrieval.rrf_k must be positive");
        ensure!(
            self.embedding.max_attempts > 0,
            "embedding.max_attempts must be positive"
        );
        ensure!(
            self.embedding.max_input_tokens > 0,
            "embedding.max_input_tokens must be positive"
        );
        ensure!(self.reranker.workers > 0, "reranker.workers must be positive");
        if self.reranker.max_candidates == Some(0) {
            bail!("reranker.max_candidates must be positive when set");
        }
        ensure!(
            self.novelty.max_attempts > 0,
            "novelty.max_attempts must be positive"
        );
        check_unit_interval(
            "reranker.relevance_threshold",
            self.reranker.relevance_threshold,
        )?;
        check_unit_interval(
            "novelty.confidence_threshold",
            self.novelty.confidence_threshold,
        )?;
        Ok(())
    }

    /// Number of fused candidates the reranker may send to the model.
    #[must_use]
    pub fn rerank_budget(&self) -> usize {
        self.reranker.max_candidates.unwrap_or(self.retrieval.top_k)
    }

    /// Database path with relative paths anchored at `project_root`.
    #[must_use]
    pub fn resolved_store_path(&self, project_root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            project_root.join(&self.store.path)
        }
    }
}

fn check_unit_interval(key: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{key} must lie in [0, 1], got {value}");
    }
    Ok(())
}

/// Parse and validate a configuration document.
///
/// # Errors
///
/// Returns an error on TOML syntax errors, unknown value types, or values
/// rejected by [`ScoopConfig::validate`].
pub fn parse_config(content: &str) -> Result<ScoopConfig> {
    let config: ScoopConfig = toml::from_str(content).context("Failed to parse scoop config")?;
    config.validate()?;
    Ok(config)
}

/// Resolve and load the effective configuration.
///
/// Lookup order: `explicit` (must exist), `<project_root>/scoop.toml`,
/// `<user config dir>/scoop/scoop.toml`, then built-in defaults.
///
/// # Errors
///
/// Returns an error if an explicit path is missing or a found file does not
/// parse or validate.
pub fn load_config(explicit: Option<&Path>, project_root: &Path) -> Result<ScoopConfig> {
    if let Some(path) = explicit {
        ensure!(path.exists(), "config file {} does not exist", path.display());
        return load_file(path);
    }

    let project_path = project_root.join(CONFIG_FILE_NAME);
    if project_path.exists() {
        return load_file(&project_path);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_path = config_dir.join("scoop").join(CONFIG_FILE_NAME);
        if user_path.exists() {
            return load_file(&user_path);
        }
    }

    Ok(ScoopConfig::default())
}

fn load_file(path: &Path) -> Result<ScoopConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config {}", path.display()))
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".scoop/scoop.db")
}

const fn default_embedding_dimension() -> usize {
    384
}

const fn default_embedding_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::Local
}

fn default_embedding_model() -> String {
    "hashed-bow-v1".to_string()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

const fn default_embedding_timeout_secs() -> u64 {
    30
}

const fn default_embedding_max_attempts() -> u32 {
    3
}

const fn default_retry_base_delay_ms() -> u64 {
    250
}

const fn default_max_input_tokens() -> usize {
    512
}

fn default_llm_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

const fn default_llm_timeout_secs() -> u64 {
    60
}

const fn default_true() -> bool {
    true
}

const fn default_top_k() -> usize {
    5
}

const fn default_rrf_k() -> usize {
    60
}

const fn default_relevance_threshold() -> f64 {
    0.5
}

const fn default_workers() -> usize {
    1
}

const fn default_confidence_threshold() -> f64 {
    0.6
}

const fn default_novelty_max_attempts() -> u32 {
    2
}

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "HANDBOOK_CONFIG_PATH";
pub const CONFIG_FILENAME: &str = "handbook_chat.toml";
const ENV_PREFIX: &str = "HANDBOOK_";
const MAX_BACKOFF_FACTOR: f64 = 10.0;
const MAX_INDEXING_TIMEOUT_SECS: u64 = 24 * 60 * 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the OpenAI-compatible REST API, without a trailing slash.
    pub base_url: String,
    /// Name of the environment variable holding the API secret.
    pub api_key_env: String,
    pub chat_model: String,
    pub request_timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DocumentsConfig {
    /// Directory scanned (non-recursively) for documents to upload.
    pub dir: PathBuf,
    pub extension: String,
    /// Name given to the remote vector store.
    pub store_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexingConfig {
    pub poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub backoff_factor: f64,
    pub timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Chunks must score strictly above this to reach the prompt.
    pub score_threshold: f32,
    pub max_results: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub system_prompt_path: PathBuf,
    /// Carry previous turns into each new chat request.
    pub keep_history: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_SECRET".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("documents"),
            extension: "pdf".to_string(),
            store_name: "FreeBSD Handbook".to_string(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_poll_interval_ms: 5_000,
            backoff_factor: 1.5,
            timeout_secs: 600,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            max_results: 10,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt_path: PathBuf::from("prompts/system.txt"),
            keep_history: true,
        }
    }
}

impl ApiConfig {
    /// Reads the API secret from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        let key = std::env::var(&self.api_key_env)
            .with_context(|| format!("API key environment variable {} is not set", self.api_key_env))?;
        if key.trim().is_empty() {
            return Err(anyhow::anyhow!("API key environment variable {} is empty", self.api_key_env));
        }
        Ok(key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl IndexingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Picks the TOML file to merge: the explicit env path, the working directory
/// file, or the per-user config directory, in that order.
fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
        if !Path::new(&env_path).exists() {
            return Err(anyhow::anyhow!("Config file not found at {}: {}", CONFIG_PATH_ENV, env_path));
        }
        log::info!("{} is set: {}", CONFIG_PATH_ENV, env_path);
        return Ok(PathBuf::from(env_path));
    }

    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Ok(local);
    }

    let user = ProjectDirs::from("org", "handbook", "handbook-chat")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME));
    match user {
        Some(path) if path.exists() => Ok(path),
        _ => {
            log::info!("No config file found, using defaults and environment");
            Ok(local)
        }
    }
}

pub fn load_config() -> Result<AppConfig> {
    let config_path = resolve_config_path()?;

    let figment = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: AppConfig = figment.extract().context("Failed to extract AppConfig")?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<()> {
    if config.api.base_url.trim().is_empty() {
        return Err(anyhow::anyhow!("api.base_url cannot be empty"));
    }
    if config.api.chat_model.trim().is_empty() {
        return Err(anyhow::anyhow!("api.chat_model cannot be empty"));
    }
    if config.documents.store_name.trim().is_empty() {
        return Err(anyhow::anyhow!("documents.store_name cannot be empty"));
    }
    if !(0.0..=1.0).contains(&config.retrieval.score_threshold) {
        return Err(anyhow::anyhow!(
            "retrieval.score_threshold must be within [0, 1], got {}",
            config.retrieval.score_threshold
        ));
    }
    if config.retrieval.max_results == 0 {
        return Err(anyhow::anyhow!("retrieval.max_results must be greater than zero"));
    }
    if config.indexing.poll_interval_ms == 0 {
        return Err(anyhow::anyhow!("indexing.poll_interval_ms must be greater than zero"));
    }
    // Written so NaN fails the range check too.
    if !(1.0..=MAX_BACKOFF_FACTOR).contains(&config.indexing.backoff_factor) {
        return Err(anyhow::anyhow!(
            "indexing.backoff_factor must be within [1, {}], got {}",
            MAX_BACKOFF_FACTOR,
            config.indexing.backoff_factor
        ));
    }
    if config.indexing.timeout_secs == 0 || config.indexing.timeout_secs > MAX_INDEXING_TIMEOUT_SECS {
        return Err(anyhow::anyhow!(
            "indexing.timeout_secs must be within [1, {}], got {}",
            MAX_INDEXING_TIMEOUT_SECS,
            config.indexing.timeout_secs
        ));
    }
    Ok(())
}

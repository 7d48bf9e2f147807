//! Configuration management
//!
//! Layered loading: optional `config/default` + environment-specific files,
//! then `APP__`-prefixed environment variables (e.g. `APP__SERVER__PORT=8081`,
//! `APP__EMBEDDING__API_KEY=sk-...`). A missing embedding API key is valid
//! configuration: the pipeline runs lexical-only.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub corpus: CorpusConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres URL, or the literal `"memory"` for the in-process store
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: `openai` or `mock`
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key; absent means embeddings are skipped, not an error
    pub api_key: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds; a timeout is an ordinary provider failure
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    /// Root directory with one subdirectory per subject
    #[serde(default = "default_corpus_root")]
    pub root: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_database_url() -> String {
    "memory".to_string()
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
    crate::DEFAULT_EMBEDDING_MODEL.to_string()
}
fn default_embedding_dimension() -> usize {
    1536
}
fn default_embedding_timeout() -> u64 {
    15
}
fn default_corpus_root() -> PathBuf {
    PathBuf::from("kb")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: default_api_base(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            embedding: EmbeddingConfig::default(),
            corpus: CorpusConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Whether the database URL selects the in-process store
    pub fn uses_memory_store(&self) -> bool {
        self.database.url == "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_keyless_and_in_memory() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.uses_memory_store());
        assert!(config.embedding.api_key.is_none());
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.corpus.root, PathBuf::from("kb"));
    }
}

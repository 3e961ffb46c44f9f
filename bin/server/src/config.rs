//! Centralized server configuration.
//!
//! Loaded via the `config` crate from an optional `switchboard.toml`
//! (path overridable with `SWITCHBOARD_CONFIG`) and environment variables
//! using `__` as the section separator, e.g. `LLM__API_KEY` or
//! `SERVER__BIND_ADDR`. Environment variables win over the file.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use switchboard_ai::OpenAiConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SWITCHBOARD_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "switchboard.toml";

/// Server configuration composed from the per-concern sections.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpConfig,

    /// Model provider settings. The API key has no default.
    pub llm: LlmConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub lead_generation: LeadGenerationConfig,

    #[serde(default)]
    pub sales: SalesConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Listener and HTTP behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Step limit for the call-center graph.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: u32,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_recursion_limit() -> u32 {
    15
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origins: Vec::new(),
            recursion_limit: default_recursion_limit(),
        }
    }
}

/// OpenAI-compatible provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    switchboard_ai::openai::DEFAULT_BASE_URL.to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl LlmConfig {
    /// Backend settings for [`switchboard_ai::OpenAiBackend`].
    #[must_use]
    pub fn backend_config(&self) -> OpenAiConfig {
        OpenAiConfig::new(self.api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_chat_model(self.chat_model.clone())
            .with_embedding_model(self.embedding_model.clone())
            .with_timeout(Duration::from_secs(self.timeout_seconds))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory holding one `<collection>.json` file per collection.
    #[serde(default = "default_knowledge_dir")]
    pub dir: PathBuf,
}

fn default_knowledge_dir() -> PathBuf {
    PathBuf::from("data/knowledge")
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: default_knowledge_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeadGenerationConfig {
    /// SQLite connection URL; created and seeded when missing.
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    "sqlite://leads.db".to_string()
}

impl Default for LeadGenerationConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SalesConfig {
    /// SQLite connection URL of the store database; created and seeded when
    /// missing.
    #[serde(default = "default_sales_database_url")]
    pub database_url: String,
}

fn default_sales_database_url() -> String {
    "sqlite://sales.db".to_string()
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            database_url: default_sales_database_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    /// JSON employee roster. The built-in sample is used when unset.
    #[serde(default)]
    pub roster_path: Option<PathBuf>,
}

fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.allowed_origins")
}

impl ServerConfig {
    /// Loads the configuration file (if present) overlaid with the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        config::Config::builder()
            .add_source(config::File::new(&path, config::FileFormat::Toml).required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Parses a TOML document without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_toml(raw: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_api_key_is_required() {
        let config = ServerConfig::from_toml("[llm]\napi_key = \"sk-test\"").expect("config");
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.server.recursion_limit, 15);
        assert!(config.server.allowed_origins.is_empty());
        assert_eq!(config.llm.chat_model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout_seconds, 120);
        assert_eq!(config.knowledge.dir, PathBuf::from("data/knowledge"));
        assert_eq!(config.lead_generation.database_url, "sqlite://leads.db");
        assert_eq!(config.sales.database_url, "sqlite://sales.db");
        assert!(config.policy.roster_path.is_none());
    }

    #[test]
    fn missing_api_key_is_an_error() {
        assert!(ServerConfig::from_toml("[server]\nbind_addr = \"127.0.0.1:9000\"").is_err());
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            [server]
            allowed_origins = ["http://localhost:5173"]
            recursion_limit = 8

            [llm]
            api_key = "sk-test"
            base_url = "http://localhost:11434"
            timeout_seconds = 30

            [sales]
            database_url = "sqlite::memory:"

            [policy]
            roster_path = "employees.json"
            "#,
        )
        .expect("config");
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.server.recursion_limit, 8);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.policy.roster_path, Some(PathBuf::from("employees.json")));
        assert_eq!(config.sales.database_url, "sqlite::memory:");

        let backend = config.llm.backend_config();
        assert_eq!(backend.timeout, Duration::from_secs(30));
        assert_eq!(backend.base_url, "http://localhost:11434");
    }
}

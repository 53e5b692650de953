//! Configuration management for ragchat.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults (local development friendly)
//! - Config file (`.ragchat/config.yaml` in the workspace, or `RAGCHAT_CONFIG`)
//! - Environment variables (a `.env` file in the working directory is loaded first)
//! - Command-line flags
//!
//! Secrets (API keys) are only ever read from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default Pinecone index holding the company-data records.
pub const DEFAULT_INDEX_NAME: &str = "infyndcompanydata";

/// Default Groq OpenAI-compatible endpoint.
pub const DEFAULT_GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1";

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector: VectorSettings,
    pub history: HistorySettings,
    pub extraction: ExtractionSettings,

    /// Secrets resolved from the environment; never written back out.
    #[serde(skip)]
    pub secrets: Secrets,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Answer generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// "groq" or "ollama"
    pub provider: String,

    /// Model identifier; provider default when unset
    pub model: Option<String>,

    /// Endpoint override; provider default when unset
    pub endpoint: Option<String>,

    /// Sampling temperature; provider default when unset
    pub temperature: Option<f32>,

    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,

    #[serde(rename = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: None,
            endpoint: None,
            temperature: None,
            max_tokens: 500,
            request_timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    /// Model to use, falling back to the provider's default.
    pub fn resolved_model(&self) -> &str {
        match self.model.as_deref() {
            Some(model) => model,
            None if self.provider == "ollama" => "phi3:mini",
            None => "llama-3.1-8b-instant",
        }
    }

    /// Endpoint to use, falling back to the provider's default.
    pub fn resolved_endpoint(&self) -> &str {
        match self.endpoint.as_deref() {
            Some(endpoint) => endpoint,
            None if self.provider == "ollama" => DEFAULT_OLLAMA_ENDPOINT,
            None => DEFAULT_GROQ_ENDPOINT,
        }
    }

    /// Temperature to use, falling back to the provider's default.
    pub fn resolved_temperature(&self) -> f32 {
        match self.temperature {
            Some(t) => t,
            None if self.provider == "ollama" => 0.3,
            None => 0.4,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// "huggingface", "ollama" or "mock"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "huggingface".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    /// "pinecone" or "memory"
    pub backend: String,

    #[serde(rename = "indexName")]
    pub index_name: String,

    /// Pinecone data-plane host, e.g. `https://<index>-<project>.svc.<env>.pinecone.io`
    #[serde(rename = "indexHost")]
    pub index_host: Option<String>,

    pub namespace: Option<String>,

    /// Matches retrieved for `/get`
    #[serde(rename = "topK")]
    pub top_k: usize,

    /// Matches retrieved for `/structured`
    #[serde(rename = "structuredTopK")]
    pub structured_top_k: usize,

    /// Folder of JSON records loaded into the memory backend at startup
    #[serde(rename = "dataDir")]
    pub data_dir: Option<PathBuf>,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            backend: "pinecone".to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            index_host: None,
            namespace: None,
            top_k: 3,
            structured_top_k: 20,
            data_dir: None,
        }
    }
}

/// Chat history store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// SQLite file; `<workspace>/.ragchat/history.db` when unset
    pub path: Option<PathBuf>,

    /// Entries returned by `GET /history`
    #[serde(rename = "recentLimit")]
    pub recent_limit: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            path: None,
            recent_limit: 10,
        }
    }
}

/// Output extraction policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Fail instead of defaulting to empty filters when repair fails
    pub strict: bool,
}

/// API keys and tokens, read from the environment only.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub groq_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
    pub hf_api_token: Option<String>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    server: Option<ServerSettings>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    vector: Option<VectorSettings>,
    history: Option<HistorySettings>,
    extraction: Option<ExtractionSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            server: ServerSettings::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            vector: VectorSettings::default(),
            history: HistorySettings::default(),
            extraction: ExtractionSettings::default(),
            secrets: Secrets::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and the process environment.
    ///
    /// A `.env` file in the current directory is loaded into the environment
    /// first; variables already set take precedence over it. `Some` values
    /// take the place of `RAGCHAT_WORKSPACE` and `RAGCHAT_CONFIG`.
    pub fn load_from(workspace: Option<&Path>, config_file: Option<&Path>) -> AppResult<Self> {
        dotenv::dotenv().ok();
        Self::load_with(|key| {
            let explicit = match key {
                "RAGCHAT_WORKSPACE" => workspace,
                "RAGCHAT_CONFIG" => config_file,
                _ => None,
            };
            match explicit {
                Some(path) => Some(path.to_string_lossy().into_owned()),
                None => std::env::var(key).ok(),
            }
        })
    }

    /// Load configuration using `lookup` for environment variables.
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = lookup("RAGCHAT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = lookup("RAGCHAT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.ragchat_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        config.apply_env(&lookup)?;

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(server) = file.server {
            self.server = server;
        }
        if let Some(llm) = file.llm {
            self.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(vector) = file.vector {
            self.vector = vector;
        }
        if let Some(history) = file.history {
            self.history = history;
        }
        if let Some(extraction) = file.extraction {
            self.extraction = extraction;
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("RAGCHAT_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("RAGCHAT_MODEL") {
            self.llm.model = Some(model);
        }
        if self.llm.provider == "ollama" {
            if let Some(url) = lookup("OLLAMA_URL") {
                self.llm.endpoint = Some(url);
            }
        }

        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            self.vector.index_host = Some(host);
        }
        if let Some(name) = lookup("PINECONE_INDEX_NAME") {
            self.vector.index_name = name;
        }
        if let Some(namespace) = lookup("PINECONE_NAMESPACE") {
            self.vector.namespace = Some(namespace);
        }

        if let Some(path) = lookup("HISTORY_DB") {
            self.history.path = Some(PathBuf::from(path));
        }

        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid PORT value: {}", port)))?;
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        self.secrets = Secrets {
            groq_api_key: lookup("GROQ_API_KEY"),
            pinecone_api_key: lookup("PINECONE_API_KEY"),
            hf_api_token: lookup("HF_API_TOKEN"),
        };

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = Some(model);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .ragchat directory.
    pub fn ragchat_dir(&self) -> PathBuf {
        self.workspace.join(".ragchat")
    }

    /// Ensure the .ragchat directory exists.
    pub fn ensure_ragchat_dir(&self) -> AppResult<()> {
        let dir = self.ragchat_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .ragchat directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path of the SQLite chat history file.
    pub fn history_path(&self) -> PathBuf {
        self.history
            .path
            .clone()
            .unwrap_or_else(|| self.ragchat_dir().join("history.db"))
    }

    /// Validate configuration for the selected providers.
    pub fn validate(&self) -> AppResult<()> {
        let llm_providers = ["groq", "ollama"];
        if !llm_providers.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                llm_providers.join(", ")
            )));
        }
        if self.llm.provider == "groq" && self.secrets.groq_api_key.is_none() {
            return Err(AppError::Config(
                "API key not found in environment variable: GROQ_API_KEY".to_string(),
            ));
        }

        let embedding_providers = ["huggingface", "ollama", "mock"];
        if !embedding_providers.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                embedding_providers.join(", ")
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be positive".to_string(),
            ));
        }

        match self.vector.backend.as_str() {
            "pinecone" => {
                if self.secrets.pinecone_api_key.is_none() {
                    return Err(AppError::Config(
                        "API key not found in environment variable: PINECONE_API_KEY".to_string(),
                    ));
                }
                if self.vector.index_host.is_none() {
                    return Err(AppError::Config(format!(
                        "Index host for '{}' not set (PINECONE_INDEX_HOST)",
                        self.vector.index_name
                    )));
                }
            }
            "memory" => {}
            other => {
                return Err(AppError::Config(format!(
                    "Unknown vector backend: {}. Supported: pinecone, memory",
                    other
                )));
            }
        }

        if self.vector.top_k == 0 || self.vector.structured_top_k == 0 {
            return Err(AppError::Config("topK must be positive".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn dev_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".to_string();
        config.embedding.provider = "mock".to_string();
        config.vector.backend = "memory".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.llm.resolved_model(), "llama-3.1-8b-instant");
        assert_eq!(config.llm.max_tokens, 500);
        assert_eq!(config.vector.index_name, DEFAULT_INDEX_NAME);
        assert_eq!(config.vector.top_k, 3);
        assert_eq!(config.history.recent_limit, 10);
        assert_eq!(config.server.port, 8080);
        assert!(!config.extraction.strict);
    }

    #[test]
    fn test_provider_defaults_follow_provider() {
        let mut llm = LlmSettings {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert_eq!(llm.resolved_model(), "phi3:mini");
        assert_eq!(llm.resolved_endpoint(), DEFAULT_OLLAMA_ENDPOINT);
        assert!((llm.resolved_temperature() - 0.3).abs() < f32::EPSILON);

        llm.model = Some("mistral".to_string());
        assert_eq!(llm.resolved_model(), "mistral");
    }

    #[test]
    fn test_load_with_env_overrides() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().to_string_lossy().to_string();
        let config = AppConfig::load_with(env_of(&[
            ("RAGCHAT_WORKSPACE", workspace.as_str()),
            ("RAGCHAT_PROVIDER", "ollama"),
            ("OLLAMA_URL", "http://gpu-box:11434"),
            ("PINECONE_API_KEY", "pc-key"),
            ("PINECONE_INDEX_HOST", "https://idx.pinecone.io"),
            ("PORT", "9090"),
        ]))
        .unwrap();

        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.resolved_endpoint(), "http://gpu-box:11434");
        assert_eq!(config.secrets.pinecone_api_key.as_deref(), Some("pc-key"));
        assert_eq!(
            config.vector.index_host.as_deref(),
            Some("https://idx.pinecone.io")
        );
        assert_eq!(config.server.port, 9090);
        assert!(config.history_path().ends_with(".ragchat/history.db"));
    }

    #[test]
    fn test_load_merges_yaml_then_env() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".ragchat");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.yaml"),
            "llm:\n  provider: ollama\n  maxTokens: 256\nvector:\n  backend: memory\n  topK: 5\nlogging:\n  color: false\n",
        )
        .unwrap();

        let workspace = temp.path().to_string_lossy().to_string();
        let config = AppConfig::load_with(env_of(&[
            ("RAGCHAT_WORKSPACE", workspace.as_str()),
            ("RAGCHAT_MODEL", "llama3"),
        ]))
        .unwrap();

        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.max_tokens, 256);
        assert_eq!(config.llm.resolved_model(), "llama3");
        assert_eq!(config.vector.backend, "memory");
        assert_eq!(config.vector.top_k, 5);
        // Unset keys in a partial section keep their defaults
        assert_eq!(config.vector.structured_top_k, 20);
        assert!(config.no_color);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().to_string_lossy().to_string();
        let result = AppConfig::load_with(env_of(&[
            ("RAGCHAT_WORKSPACE", workspace.as_str()),
            ("PORT", "eighty"),
        ]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().to_string_lossy().to_string();
        let result = AppConfig::load_with(env_of(&[
            ("RAGCHAT_WORKSPACE", workspace.as_str()),
            ("RAGCHAT_CONFIG", "/nonexistent/ragchat.yaml"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            None,
            Some("ollama".to_string()),
            Some("llama3".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.resolved_model(), "llama3");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_dev_config() {
        assert!(dev_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_groq_key() {
        let mut config = dev_config();
        config.llm.provider = "groq".to_string();
        assert!(config.validate().is_err());

        config.secrets.groq_api_key = Some("gsk".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_pinecone_requires_host() {
        let mut config = dev_config();
        config.vector.backend = "pinecone".to_string();
        config.secrets.pinecone_api_key = Some("key".to_string());
        assert!(config.validate().is_err());

        config.vector.index_host = Some("https://idx.pinecone.io".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = dev_config();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_paths() {
        let dir = TempDir::new().unwrap();
        let config_file = dir.path().join("custom.yaml");
        std::fs::write(&config_file, "history:\n  recentLimit: 25\n").unwrap();

        let config = AppConfig::load_from(Some(dir.path()), Some(&config_file)).unwrap();
        assert_eq!(config.workspace, dir.path());
        assert_eq!(config.history.recent_limit, 25);
    }
}

//! Configuration management for AskPolicy.
//!
//! Configuration is an explicit struct handed to each component's
//! constructor. It is assembled from, in increasing precedence:
//! - Built-in defaults
//! - The workspace config file (`.askpolicy/config.yaml`)
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".askpolicy";

/// Embedding providers the knowledge crate knows how to build.
pub const EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// In-process generation backends usable as the fallback.
pub const FALLBACK_BACKENDS: [&str; 1] = ["extractive"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains `.askpolicy/`)
    #[serde(skip)]
    pub workspace: PathBuf,

    /// Optional config file path
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Log filter override
    #[serde(skip)]
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    #[serde(skip)]
    pub verbose: bool,

    /// Disable colored output
    #[serde(skip)]
    pub no_color: bool,

    /// Emit logs as JSON
    #[serde(skip)]
    pub log_json: bool,

    #[serde(default)]
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub insights: InsightsConfig,

    #[serde(default)]
    pub answer: AnswerPolicyConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where the policy documents live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CorpusConfig {
    /// Directory with policy documents, relative to the workspace
    pub data_dir: PathBuf,

    /// File extensions to load (without the dot)
    pub extensions: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/policies"),
            extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }
}

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Number of passages retrieved per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

impl RetrievalConfig {
    /// Passages to retrieve for one question: `requested` when given,
    /// otherwise the configured `topK`. Zero is rejected.
    pub fn resolve_top_k(&self, requested: Option<usize>) -> AppResult<usize> {
        match requested.unwrap_or(self.top_k) {
            0 => Err(AppError::InvalidInput("top-k must be at least 1".to_string())),
            top_k => Ok(top_k),
        }
    }
}

/// Embedding model selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint for network providers
    pub endpoint: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: "http://localhost:11434".to_string(),
        }
    }
}

/// Generation backends and the liveness probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Base URL of the preferred Ollama backend
    pub endpoint: String,

    /// Model served by the preferred backend
    pub model: String,

    pub temperature: f32,

    /// Timeout for a single generation request, in seconds
    pub request_timeout_secs: u64,

    /// Timeout for the liveness probe, in seconds
    pub probe_timeout_secs: u64,

    /// In-process fallback backend name
    pub fallback: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            temperature: 0.0,
            request_timeout_secs: 120,
            probe_timeout_secs: 2,
            fallback: "extractive".to_string(),
        }
    }
}

/// FAQ clustering parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct InsightsConfig {
    /// Cosine similarity at or above which two questions are near-duplicates
    pub similarity_threshold: f32,

    /// Number of clusters reported
    pub top_k: usize,

    /// How many recent questions are clustered
    pub history_limit: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            top_k: 5,
            history_limit: 500,
        }
    }
}

/// Fixed answer policies baked into the constrained prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AnswerPolicyConfig {
    /// Returned verbatim when the question is a greeting
    pub greeting_response: String,

    /// Returned verbatim when the context does not contain the answer
    pub not_specified_response: String,

    /// Inputs treated as greetings (compared case- and punctuation-insensitively)
    pub greetings: Vec<String>,
}

impl Default for AnswerPolicyConfig {
    fn default() -> Self {
        Self {
            greeting_response: "Hello! How can I help you today? You can ask me questions about \
                                Acme's leave policies and employee benefits programs."
                .to_string(),
            not_specified_response:
                "Sorry, I don't have an answer to this as it is not specified in the policy"
                    .to_string(),
            greetings: [
                "hi",
                "hello",
                "hey",
                "hi there",
                "hello there",
                "good morning",
                "good afternoon",
                "good evening",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// On-disk locations, relative to the workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub index_path: PathBuf,
    pub history_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(STATE_DIR).join("index.sqlite"),
            history_path: PathBuf::from(STATE_DIR).join("history.sqlite"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            corpus: CorpusConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            insights: InsightsConfig::default(),
            answer: AnswerPolicyConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the workspace YAML file and the environment.
    ///
    /// Environment variables:
    /// - `ASKPOLICY_WORKSPACE`: Override workspace path
    /// - `ASKPOLICY_CONFIG`: Path to config file
    /// - `ASKPOLICY_MODEL`: Generation model
    /// - `ASKPOLICY_OLLAMA_URL`: Base URL of the Ollama backend
    /// - `RUST_LOG`: Log filter
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use askpolicy_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        if let Ok(ws) = std::env::var("ASKPOLICY_WORKSPACE") {
            workspace = PathBuf::from(ws);
        }
        let config_file = std::env::var("ASKPOLICY_CONFIG").ok().map(PathBuf::from);

        let mut config = Self::load_from(&workspace, config_file.as_deref())?;

        if let Ok(model) = std::env::var("ASKPOLICY_MODEL") {
            config.generation.model = model;
        }

        if let Ok(url) = std::env::var("ASKPOLICY_OLLAMA_URL") {
            config.generation.endpoint = url;
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Load configuration for an explicit workspace, without consulting the environment.
    pub fn load_from(workspace: &Path, config_file: Option<&Path>) -> AppResult<Self> {
        if !workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                workspace
            )));
        }

        let config_path = config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace.join(STATE_DIR).join("config.yaml"));

        let mut config = if config_path.exists() {
            Self::from_yaml_file(&config_path)?
        } else {
            tracing::debug!("No config file at {:?}, using defaults", config_path);
            Self::default()
        };

        config.workspace = workspace.to_path_buf();
        config.config_file = config_file.map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse a YAML config file. Missing sections fall back to defaults.
    fn from_yaml_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Loaded config file {:?}", path);
        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        model: Option<String>,
        ollama_url: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(model) = model {
            self.generation.model = model;
        }

        if let Some(url) = ollama_url {
            self.generation.endpoint = url;
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

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Get the path to the `.askpolicy` directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the `.askpolicy` directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Absolute path of the corpus directory.
    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.corpus.data_dir)
    }

    /// Absolute path of the persisted passage index.
    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.storage.index_path)
    }

    /// Absolute path of the question history database.
    pub fn history_path(&self) -> PathBuf {
        self.resolve(&self.storage.history_path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunking.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be positive".to_string()));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be positive".to_string()));
        }

        let threshold = self.insights.similarity_threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(AppError::Config(format!(
                "similarityThreshold must be within [-1, 1], got {}",
                threshold
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be positive".to_string(),
            ));
        }

        if !FALLBACK_BACKENDS.contains(&self.generation.fallback.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown fallback backend: {}. Supported: {}",
                self.generation.fallback,
                FALLBACK_BACKENDS.join(", ")
            )));
        }

        if self.generation.probe_timeout_secs == 0 {
            return Err(AppError::Config(
                "generation.probeTimeoutSecs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.insights.similarity_threshold, 0.85);
        assert_eq!(config.insights.top_k, 5);
        assert_eq!(config.generation.model, "mistral");
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_top_k() {
        let retrieval = RetrievalConfig::default();
        assert_eq!(retrieval.resolve_top_k(None).unwrap(), 4);
        assert_eq!(retrieval.resolve_top_k(Some(2)).unwrap(), 2);
        assert!(matches!(
            retrieval.resolve_top_k(Some(0)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_state_dir() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(STATE_DIR));
        assert!(config.index_path().ends_with("index.sqlite"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            None,
            None,
            Some("llama3.2".to_string()),
            Some("http://gpu-box:11434".to_string()),
            None,
            true,
            false,
            true,
        );

        assert_eq!(config.generation.model, "llama3.2");
        assert_eq!(config.generation.endpoint, "http://gpu-box:11434");
        assert!(config.verbose);
        assert!(config.log_json);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_load_from_yaml_merges_defaults() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().join(STATE_DIR);
        std::fs::create_dir_all(&state).unwrap();
        std::fs::write(
            state.join("config.yaml"),
            "chunking:\n  chunkSize: 800\n  chunkOverlap: 50\ninsights:\n  similarityThreshold: 0.9\n  topK: 3\n  historyLimit: 100\n",
        )
        .unwrap();

        let config = AppConfig::load_from(temp.path(), None).unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.insights.top_k, 3);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.workspace, temp.path());
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let result = AppConfig::load_from(Path::new("/definitely/not/here"), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_overlap_must_be_smaller() {
        let mut config = AppConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_embedding_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "word2vec".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = AppConfig::default();
        config.insights.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}

//! Configuration for folio-rag.
//!
//! Loaded from a JSON file with per-field defaults, then overlaid with
//! environment variables (after `.env` has been read).
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

// ── Default value functions ──────────────────────────────────────────

fn default_data_path() -> String {
    "data".to_string()
}

fn default_index_path() -> String {
    "vector_index.db".to_string()
}

fn default_chunk_size() -> usize {
    1500
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_retrieval_k() -> usize {
    6
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_batch_size() -> usize {
    64
}

fn default_generation_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_assistant_name() -> String {
    "Viag".to_string()
}

fn default_subject_name() -> String {
    "Ganesh".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "https://ganesh-portfolio-site.vercel.app".to_string(),
    ]
}

fn default_app_name() -> String {
    "Ganesh's AI Assistant".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Corpus directory scanned by the loader.
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Location of the persisted vector index artifact.
    #[serde(default = "default_index_path")]
    pub index_path: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub persona: PersonaConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Chunk texts sent per embeddings request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Only ever read from the environment or an explicit config file; never written back.
    #[serde(default, skip_serializing)]
    pub api_key: String,
}

/// Who the assistant is and whom it speaks for.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    #[serde(default = "default_subject_name")]
    pub subject_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Extra allowed origin, appended to `cors_origins` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_environment")]
    pub environment: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            index_path: default_index_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            retrieval_k: default_retrieval_k(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            openai: OpenAiConfig::default(),
            persona: PersonaConfig::default(),
            server: ServerConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            temperature: default_temperature(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            subject_name: default_subject_name(),
            contact_email: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            frontend_url: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_environment(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and generates a
    /// template when the default path is in use.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        match serde_json::from_str(&data) {
            Ok(cfg) => {
                info!("Loaded configuration from {path}");
                Ok(cfg)
            }
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Save configuration to a JSON file. The API key is never written.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable source. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = var("OPENAI_API_KEY") {
            self.openai.api_key = v;
        }
        if let Some(v) = var("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = var("OPENAI_MODEL") {
            self.generation.model = v;
        }
        if let Some(v) = var("OPENAI_TEMPERATURE") {
            self.generation.temperature = v
                .parse()
                .with_context(|| format!("OPENAI_TEMPERATURE is not a number: {v}"))?;
        }
        if let Some(v) = var("OPENAI_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = var("BACKEND_HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("BACKEND_PORT") {
            self.server.port = v
                .parse()
                .with_context(|| format!("BACKEND_PORT is not a valid port: {v}"))?;
        }
        if let Some(v) = var("CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = var("FRONTEND_URL") {
            self.server.frontend_url = Some(v);
        }
        if let Some(v) = var("ENVIRONMENT") {
            self.app.environment = v;
        }
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.chunk_overlap,
            self.chunk_size
        );
        anyhow::ensure!(self.retrieval_k > 0, "retrieval_k must be positive");
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be positive"
        );
        anyhow::ensure!(
            self.embedding.batch_size > 0,
            "embedding.batch_size must be positive"
        );
        anyhow::ensure!(
            (0.0..=2.0).contains(&self.generation.temperature),
            "generation.temperature must be within [0, 2]"
        );
        Ok(())
    }
}

impl ServerConfig {
    /// Configured origins plus `frontend_url` when it is not already listed.
    #[must_use]
    pub fn cors_origins_list(&self) -> Vec<String> {
        let mut origins: Vec<String> = self
            .cors_origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if let Some(url) = self.frontend_url.as_deref().map(str::trim)
            && !url.is_empty()
            && !origins.iter().any(|o| o == url)
        {
            origins.push(url.to_string());
        }
        origins
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data_path, "data");
        assert_eq!(config.chunk_size, 1500);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.retrieval_k, 6);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.app.environment, "development");
        assert!(config.openai.api_key.is_empty());
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"chunk_size": 800, "persona": {"subject_name": "Ada"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.persona.subject_name, "Ada");
        // Other fields should have defaults
        assert_eq!(config.persona.assistant_name, "Viag");
        assert_eq!(config.retrieval_k, 6);
    }

    #[test]
    fn test_load_missing_custom_path_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.chunk_size, 1500);
        // Templates are only generated for the default path.
        assert!(!path.exists());
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.retrieval_k, 6);
    }

    #[test]
    fn test_save_omits_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.openai.api_key = "sk-secret".to_string();
        config.save(path.to_str().unwrap()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("sk-secret"));
        let reloaded = Config::load(path.to_str().unwrap()).unwrap();
        assert!(reloaded.openai.api_key.is_empty());
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_overlap_not_smaller_than_size() {
        let mut config = Config::default();
        config.chunk_overlap = config.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_values() {
        let mut config = Config::default();
        config.retrieval_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.embedding.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_MODEL", "gpt-4o-mini"),
                ("OPENAI_TEMPERATURE", "0.2"),
                ("BACKEND_PORT", "9000"),
                ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
                ("ENVIRONMENT", "production"),
                ("BACKEND_HOST", "   "),
            ]))
            .unwrap();

        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.app.environment, "production");
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_env_override_bad_port() {
        let mut config = Config::default();
        assert!(config.apply_overrides(env(&[("BACKEND_PORT", "eighty")])).is_err());
    }

    #[test]
    fn test_cors_origins_list_appends_frontend_once() {
        let mut server = ServerConfig {
            cors_origins: vec!["http://localhost:3000".to_string()],
            frontend_url: Some("https://site.test".to_string()),
            ..ServerConfig::default()
        };
        assert_eq!(
            server.cors_origins_list(),
            vec!["http://localhost:3000", "https://site.test"]
        );

        server.frontend_url = Some("http://localhost:3000".to_string());
        assert_eq!(server.cors_origins_list(), vec!["http://localhost:3000"]);
    }
}

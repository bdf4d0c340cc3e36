//! Configuration management for docctx
//!
//! Loads a TOML file, applies `DOCCTX_SECTION__KEY` environment overrides and
//! validates the result before anything is built from it.

use crate::error::{DocctxError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Chunker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Boundaries tried coarsest first; "" means character-level
    pub separators: Vec<String>,
    pub separators_are_regex: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: crate::chunking::DEFAULT_SEPARATORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            separators_are_regex: false,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "fastembed" (local ONNX model) or "hashing" (offline feature hashing)
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            batch_size: 32,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// "flat" (exact scan) or "hnsw"
    pub backend: String,
    /// "cosine" or "l2"
    pub metric: String,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: "flat".to_string(),
            metric: "cosine".to_string(),
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 64,
        }
    }
}

/// Retrieval pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub mmr_enabled: bool,
    /// Candidates fetched from the index before reranking/MMR
    pub mmr_fetch_k: usize,
    /// Passages returned
    pub mmr_top_k: usize,
    /// 1.0 = pure relevance, 0.0 = pure diversity
    pub mmr_lambda_mult: f32,
    pub reranking_enabled: bool,
    pub reranking_model_identifier: String,
    /// Pool size kept after reranking, before MMR
    pub rerank_pool_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            mmr_enabled: true,
            mmr_fetch_k: 15,
            mmr_top_k: 5,
            mmr_lambda_mult: 0.7,
            reranking_enabled: false,
            reranking_model_identifier: "BAAI/bge-reranker-base".to_string(),
            rerank_pool_size: 15,
        }
    }
}

/// Document text extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Below this many extracted characters a PDF is treated as scanned
    pub min_text_chars: usize,
    pub ocr_enabled: bool,
    pub pdftoppm_command: String,
    pub tesseract_command: String,
    pub ocr_dpi: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 100,
            ocr_enabled: true,
            pdftoppm_command: "pdftoppm".to_string(),
            tesseract_command: "tesseract".to_string(),
            ocr_dpi: 200,
        }
    }
}

/// Web search settings (Google Custom Search)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub enabled: bool,
    pub max_results: usize,
    pub api_key_env: String,
    pub cse_id_env: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_results: 5,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            cse_id_env: "GOOGLE_CSE_ID".to_string(),
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Async service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Retrieval jobs allowed on the blocking pool at once
    pub max_concurrent_jobs: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DocctxError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DocctxError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse, apply environment overrides and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a config file
    pub fn from_env() -> Result<Self> {
        Self::from_overrides(std::env::vars())
    }

    /// Defaults plus `DOCCTX_`-prefixed overrides, validated
    pub fn from_overrides<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Config::default();
        config.apply_overrides(vars);

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| DocctxError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: DOCCTX_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `DOCCTX_`-prefixed overrides from an arbitrary source
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("DOCCTX_") {
                if let Err(e) = self.set_value(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "CHUNKING__CHUNK_SIZE" => self.chunking.chunk_size = parse_value(path, value)?,
            "CHUNKING__CHUNK_OVERLAP" => self.chunking.chunk_overlap = parse_value(path, value)?,
            "EMBEDDING__PROVIDER" => self.embedding.provider = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "INDEX__BACKEND" => self.index.backend = value.to_string(),
            "INDEX__METRIC" => self.index.metric = value.to_string(),
            "RETRIEVAL__MMR_ENABLED" => self.retrieval.mmr_enabled = parse_value(path, value)?,
            "RETRIEVAL__MMR_FETCH_K" => self.retrieval.mmr_fetch_k = parse_value(path, value)?,
            "RETRIEVAL__MMR_TOP_K" => self.retrieval.mmr_top_k = parse_value(path, value)?,
            "RETRIEVAL__MMR_LAMBDA_MULT" => {
                self.retrieval.mmr_lambda_mult = parse_value(path, value)?
            }
            "RETRIEVAL__RERANKING_ENABLED" => {
                self.retrieval.reranking_enabled = parse_value(path, value)?
            }
            "RETRIEVAL__RERANKING_MODEL_IDENTIFIER" => {
                self.retrieval.reranking_model_identifier = value.to_string()
            }
            "EXTRACTION__OCR_ENABLED" => self.extraction.ocr_enabled = parse_value(path, value)?,
            "WEB_SEARCH__ENABLED" => self.web_search.enabled = parse_value(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DocctxError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("docctx").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| DocctxError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalSettings::default(),
            extraction: ExtractionConfig::default(),
            web_search: WebSearchConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

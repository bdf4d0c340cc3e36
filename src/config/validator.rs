use crate::config::Config;
use crate::error::{DocctxError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem before failing
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_extraction(config, &mut errors);
        Self::validate_web_search(config, &mut errors);

        if config.service.max_concurrent_jobs == 0 {
            errors.push(ValidationError::new(
                "service.max_concurrent_jobs",
                "Must allow at least one concurrent job",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DocctxError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        let chunking = &config.chunking;

        if chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if chunking.chunk_overlap >= chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.chunk_overlap",
                format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    chunking.chunk_overlap, chunking.chunk_size
                ),
            ));
        }

        if chunking.separators.is_empty() {
            errors.push(ValidationError::new(
                "chunking.separators",
                "At least one separator is required",
            ));
        }

        if chunking.separators_are_regex {
            for sep in chunking.separators.iter().filter(|s| !s.is_empty()) {
                if let Err(e) = regex::Regex::new(sep) {
                    errors.push(ValidationError::new(
                        "chunking.separators",
                        format!("Invalid pattern '{}': {}", sep, e),
                    ));
                }
            }
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        if provider != "fastembed" && provider != "hashing" {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!("Provider must be 'fastembed' or 'hashing', got '{}'", provider),
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Embedding dimension must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        let index = &config.index;

        if index.backend != "flat" && index.backend != "hnsw" {
            errors.push(ValidationError::new(
                "index.backend",
                format!("Backend must be 'flat' or 'hnsw', got '{}'", index.backend),
            ));
        }

        if index.metric != "cosine" && index.metric != "l2" {
            errors.push(ValidationError::new(
                "index.metric",
                format!("Metric must be 'cosine' or 'l2', got '{}'", index.metric),
            ));
        }

        if index.hnsw_m == 0 {
            errors.push(ValidationError::new("index.hnsw_m", "HNSW M must be greater than 0"));
        }

        if index.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.mmr_top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.mmr_top_k",
                "top_k must be greater than 0",
            ));
        }

        if retrieval.mmr_fetch_k < retrieval.mmr_top_k {
            errors.push(ValidationError::new(
                "retrieval.mmr_fetch_k",
                format!(
                    "fetch_k ({}) must be at least top_k ({})",
                    retrieval.mmr_fetch_k, retrieval.mmr_top_k
                ),
            ));
        }

        let lambda = retrieval.mmr_lambda_mult;
        if !(0.0..=1.0).contains(&lambda) {
            errors.push(ValidationError::new(
                "retrieval.mmr_lambda_mult",
                format!("lambda_mult must be between 0.0 and 1.0, got {}", lambda),
            ));
        }

        if retrieval.rerank_pool_size == 0 {
            errors.push(ValidationError::new(
                "retrieval.rerank_pool_size",
                "Rerank pool size must be greater than 0",
            ));
        }

        if retrieval.reranking_enabled && retrieval.reranking_model_identifier.is_empty() {
            errors.push(ValidationError::new(
                "retrieval.reranking_model_identifier",
                "Reranking is enabled but no model identifier is set",
            ));
        }
    }

    fn validate_extraction(config: &Config, errors: &mut Vec<ValidationError>) {
        let extraction = &config.extraction;
        if extraction.ocr_enabled {
            if extraction.pdftoppm_command.is_empty() {
                errors.push(ValidationError::new(
                    "extraction.pdftoppm_command",
                    "Command cannot be empty when OCR is enabled",
                ));
            }
            if extraction.tesseract_command.is_empty() {
                errors.push(ValidationError::new(
                    "extraction.tesseract_command",
                    "Command cannot be empty when OCR is enabled",
                ));
            }
            if extraction.ocr_dpi == 0 {
                errors.push(ValidationError::new(
                    "extraction.ocr_dpi",
                    "DPI must be greater than 0",
                ));
            }
        }
    }

    fn validate_web_search(config: &Config, errors: &mut Vec<ValidationError>) {
        let web = &config.web_search;

        // Google Custom Search returns at most 10 results per request
        if web.max_results == 0 || web.max_results > 10 {
            errors.push(ValidationError::new(
                "web_search.max_results",
                format!("max_results must be between 1 and 10, got {}", web.max_results),
            ));
        }

        if web.enabled && web.endpoint.is_empty() {
            errors.push(ValidationError::new(
                "web_search.endpoint",
                "Endpoint cannot be empty when web search is enabled",
            ));
        }
    }
}

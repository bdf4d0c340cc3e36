//! Cross-encoder reranking using FastEmbed

use crate::chunking::Chunk;
use crate::embedding::Candidate;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RerankError {
    #[error("Reranker initialization failed: {0}")]
    InitializationError(String),

    #[error("Reranking failed: {0}")]
    RerankingError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A chunk with its reranker score; scores only compare within one query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub rerank_score: f32,
}

/// Pairwise (query, passage) relevance model
pub trait Reranker: Send + Sync {
    /// One score per document, in input order
    fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>, RerankError>;

    fn model_name(&self) -> &str;

    /// Score and sort candidates, highest first
    ///
    /// Equal scores keep the incoming candidate order.
    fn rerank(
        &self,
        query: &str,
        candidates: &[Candidate],
    ) -> Result<Vec<ScoredCandidate>, RerankError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        let scores = self.score(query, &documents)?;

        if scores.len() != candidates.len() {
            return Err(RerankError::RerankingError(format!(
                "Score count mismatch: expected {}, got {}",
                candidates.len(),
                scores.len()
            )));
        }

        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .zip(scores)
            .map(|(candidate, rerank_score)| ScoredCandidate {
                chunk: candidate.chunk.clone(),
                rerank_score,
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(Ordering::Equal)
        });

        Ok(scored)
    }
}

/// Cross-encoder reranker for improving result precision
pub struct CrossEncoderReranker {
    model: Arc<TextRerank>,
    model_name: String,
}

impl CrossEncoderReranker {
    /// Create a new reranker with specified model
    ///
    /// # Arguments
    /// * `model_name` - Model identifier (e.g., "BAAI/bge-reranker-base")
    pub fn new(model_name: &str) -> Result<Self, RerankError> {
        let model = match model_name {
            "BAAI/bge-reranker-base" | "bge-reranker-base" => RerankerModel::BGERerankerBase,
            "BAAI/bge-reranker-v2-m3" | "rozgo/bge-reranker-v2-m3" | "bge-reranker-v2-m3" => {
                RerankerModel::BGERerankerV2M3
            }
            _ => {
                return Err(RerankError::InitializationError(format!(
                    "Unsupported reranker model: {}. Supported: BAAI/bge-reranker-base, BAAI/bge-reranker-v2-m3",
                    model_name
                )));
            }
        };

        tracing::info!("Initializing reranker model: {}", model_name);

        let init_options = RerankInitOptions::new(model).with_show_download_progress(true);

        let model = TextRerank::try_new(init_options)
            .map_err(|e| RerankError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
        })
    }

    /// Create reranker with default model
    pub fn with_default_model() -> Result<Self, RerankError> {
        Self::new("BAAI/bge-reranker-base")
    }
}

impl Reranker for CrossEncoderReranker {
    fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>, RerankError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        if query.is_empty() {
            return Err(RerankError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let results = self
            .model
            .rerank(query, documents.to_vec(), false, None)
            .map_err(|e| RerankError::RerankingError(e.to_string()))?;

        // FastEmbed returns results sorted by score; put them back in input order
        let mut scores = vec![f32::NAN; documents.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.score;
            }
        }

        if scores.iter().any(|s| s.is_nan()) {
            return Err(RerankError::RerankingError(
                "Reranker did not score every document".to_string(),
            ));
        }

        Ok(scores)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

//! Context retrieval
//!
//! Search over the active document's index, optional cross-encoder
//! reranking, MMR diversification and assembly of the final context string.

mod assembler;
mod mmr;
mod orchestrator;
mod reranker;

pub use assembler::{assemble, PASSAGE_SEPARATOR};
pub use mmr::diversify;
pub use orchestrator::{IndexedDocument, RetrievalOrchestrator};
pub use reranker::{CrossEncoderReranker, RerankError, Reranker, ScoredCandidate};

use crate::chunking::Chunk;
use crate::config::RetrievalSettings;
use crate::ingest::DocumentKind;
use crate::outcome::StageStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-query retrieval parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages returned
    pub top_k: usize,
    /// Candidates fetched from the index; raised to `top_k` when smaller
    pub fetch_k: usize,
    pub use_mmr: bool,
    pub use_reranking: bool,
    /// 1.0 = pure relevance, 0.0 = pure diversity
    pub lambda_mult: f32,
    /// Candidates kept after reranking
    pub rerank_pool_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::from(&RetrievalSettings::default())
    }
}

impl From<&RetrievalSettings> for RetrievalConfig {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            top_k: settings.mmr_top_k,
            fetch_k: settings.mmr_fetch_k,
            use_mmr: settings.mmr_enabled,
            use_reranking: settings.reranking_enabled,
            lambda_mult: settings.mmr_lambda_mult,
            rerank_pool_size: settings.rerank_pool_size,
        }
    }
}

/// What one query produced
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    /// Index that answered, `None` when no document was loaded
    pub index_id: Option<Uuid>,
    /// Name of the document that answered
    pub file_name: Option<String>,
    /// Selected passages in final order
    pub chunks: Vec<Chunk>,
    pub context: Option<String>,
    /// Reranking stage status; `None` when reranking was not requested
    pub rerank: Option<StageStatus>,
    pub rerank_reason: Option<String>,
    pub mmr_applied: bool,
}

impl Retrieval {
    pub fn empty(index_id: Option<Uuid>) -> Self {
        Self {
            index_id,
            file_name: None,
            chunks: Vec::new(),
            context: None,
            rerank: None,
            rerank_reason: None,
            mmr_applied: false,
        }
    }

    /// No passages, but attributed to `document`
    pub fn for_document(document: &IndexedDocument) -> Self {
        Self {
            file_name: Some(document.file_name.clone()),
            ..Self::empty(Some(document.id()))
        }
    }
}

/// Result of ingesting a document
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub index_id: Uuid,
    pub file_name: String,
    pub kind: DocumentKind,
    /// blake3 hex digest of the uploaded bytes
    pub fingerprint: String,
    pub chunk_count: usize,
    pub extraction: StageStatus,
    pub extraction_reason: Option<String>,
    /// A newer upload finished first, so this index never became active
    pub superseded: bool,
    /// Extracted page texts
    #[serde(skip_serializing)]
    pub pages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = RetrievalSettings {
            mmr_top_k: 2,
            mmr_fetch_k: 8,
            mmr_enabled: false,
            reranking_enabled: true,
            ..RetrievalSettings::default()
        };
        let config = RetrievalConfig::from(&settings);
        assert_eq!(config.top_k, 2);
        assert_eq!(config.fetch_k, 8);
        assert!(!config.use_mmr);
        assert!(config.use_reranking);
        assert_eq!(config.rerank_pool_size, 15);
    }

    #[test]
    fn test_default_matches_reference_settings() {
        let config = RetrievalConfig::default();
        assert_eq!((config.top_k, config.fetch_k), (5, 15));
        assert!(config.use_mmr);
        assert!(!config.use_reranking);
        assert!((config.lambda_mult - 0.7).abs() < f32::EPSILON);
    }
}

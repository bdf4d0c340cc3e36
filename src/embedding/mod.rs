/// Embedding & Indexing
///
/// - EmbeddingProvider trait for abstraction over embedding backends
/// - FastEmbedProvider for local ONNX embedding (all-MiniLM-L6-v2, 384-dim)
/// - HashingEmbedder for offline, model-free embedding
/// - VectorIndex: per-document exact (flat) or HNSW nearest-neighbor search
mod hashing;
mod provider;
mod vector_index;

pub use hashing::HashingEmbedder;
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use vector_index::{
    Candidate, DistanceMetric, IndexBackend, IndexOptions, VectorIndex, VectorIndexError,
};

use crate::config::EmbeddingConfig;
use std::sync::Arc;

/// Build the provider named in the configuration
///
/// Called once at startup; the returned handle is shared by every index and
/// query.
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider.as_str() {
        "fastembed" => Ok(Arc::new(FastEmbedProvider::new(&config.model)?)),
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dimension)?)),
        other => Err(EmbeddingError::InitializationError(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

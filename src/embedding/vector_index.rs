/// Per-document vector index over chunk embeddings
use super::{EmbeddingError, EmbeddingProvider};
use crate::chunking::Chunk;
use crate::vector_math::{cosine_similarity, l2_distance};
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Maximum HNSW layer count supported by hnsw_rs
const HNSW_MAX_LAYER: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Cannot build an index from zero chunks")]
    NoChunks,

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Unknown distance metric: {0}")]
    UnknownMetric(String),

    #[error("Unknown index backend: {0}")]
    UnknownBackend(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Similarity metric, fixed for the lifetime of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Cosine,
    L2,
}

impl DistanceMetric {
    /// Higher is more similar. L2 distances map to `1 / (1 + d)`.
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::L2 => 1.0 / (1.0 + l2_distance(a, b)),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = VectorIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            other => Err(VectorIndexError::UnknownMetric(other.to_string())),
        }
    }
}

/// Nearest-neighbor structure used by an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    /// Exact linear scan
    Flat,
    /// HNSW graph; queried with ef >= chunk count and rescored exactly
    Hnsw {
        m: usize,
        ef_construction: usize,
        ef_search: usize,
    },
}

/// Options fixed at build time
#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    pub metric: DistanceMetric,
    pub backend: IndexBackend,
    /// Texts per embedding call
    pub batch_size: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            backend: IndexBackend::Flat,
            batch_size: 32,
        }
    }
}

impl IndexOptions {
    pub fn from_config(
        index: &crate::config::IndexConfig,
        embedding: &crate::config::EmbeddingConfig,
    ) -> Result<Self, VectorIndexError> {
        let metric = index.metric.parse()?;
        let backend = match index.backend.as_str() {
            "flat" => IndexBackend::Flat,
            "hnsw" => IndexBackend::Hnsw {
                m: index.hnsw_m,
                ef_construction: index.hnsw_ef_construction,
                ef_search: index.hnsw_ef_search,
            },
            other => return Err(VectorIndexError::UnknownBackend(other.to_string())),
        };

        Ok(Self {
            metric,
            backend,
            batch_size: embedding.batch_size.max(1),
        })
    }
}

/// A chunk retrieved by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub chunk: Chunk,
    pub score: f32,
}

enum HnswGraph {
    Cosine(Hnsw<'static, f32, DistCosine>),
    L2(Hnsw<'static, f32, DistL2>),
}

impl HnswGraph {
    fn build(metric: DistanceMetric, m: usize, ef_construction: usize, vectors: &[Vec<f32>]) -> Self {
        let capacity = vectors.len().max(1);
        let graph = match metric {
            DistanceMetric::Cosine => HnswGraph::Cosine(Hnsw::<f32, DistCosine>::new(
                m,
                capacity,
                HNSW_MAX_LAYER,
                ef_construction,
                DistCosine,
            )),
            DistanceMetric::L2 => HnswGraph::L2(Hnsw::<f32, DistL2>::new(
                m,
                capacity,
                HNSW_MAX_LAYER,
                ef_construction,
                DistL2,
            )),
        };

        for (id, vector) in vectors.iter().enumerate() {
            match &graph {
                HnswGraph::Cosine(h) => h.insert((vector, id)),
                HnswGraph::L2(h) => h.insert((vector, id)),
            }
        }

        graph
    }

    fn neighbours(&self, query: &[f32], k: usize, ef: usize) -> Vec<usize> {
        let found = match self {
            HnswGraph::Cosine(h) => h.search(query, k, ef),
            HnswGraph::L2(h) => h.search(query, k, ef),
        };
        found.into_iter().map(|n| n.d_id).collect()
    }
}

/// Vector index for one ingested document
///
/// Holds every chunk with its embedding. Built in one shot and never mutated
/// afterwards; replacing the document means building a new index.
pub struct VectorIndex {
    id: Uuid,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
    options: IndexOptions,
    provider: Arc<dyn EmbeddingProvider>,
    graph: Option<HnswGraph>,
}

impl VectorIndex {
    /// Embed every chunk and build the index
    ///
    /// Any embedding failure aborts the build.
    pub fn build(
        chunks: Vec<Chunk>,
        provider: Arc<dyn EmbeddingProvider>,
        options: IndexOptions,
    ) -> Result<Self, VectorIndexError> {
        if chunks.is_empty() {
            return Err(VectorIndexError::NoChunks);
        }

        let start = std::time::Instant::now();
        let dimension = provider.dimension();
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(options.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = provider.embed_batch(&texts)?;

            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "Embedding count mismatch: expected {}, got {}",
                    batch.len(),
                    embeddings.len()
                ))
                .into());
            }

            for embedding in embeddings {
                if embedding.len() != dimension {
                    return Err(VectorIndexError::InvalidDimension {
                        expected: dimension,
                        actual: embedding.len(),
                    });
                }
                vectors.push(embedding);
            }
        }

        let graph = match options.backend {
            IndexBackend::Flat => None,
            IndexBackend::Hnsw {
                m, ef_construction, ..
            } => Some(HnswGraph::build(options.metric, m, ef_construction, &vectors)),
        };

        tracing::info!(
            "Built vector index: {} chunks, {}D, {:?}/{:?}, {}ms",
            chunks.len(),
            dimension,
            options.backend,
            options.metric,
            start.elapsed().as_millis()
        );

        Ok(Self {
            id: Uuid::new_v4(),
            chunks,
            vectors,
            dimension,
            options,
            provider,
            graph,
        })
    }

    /// Embed the query and return the `k` most similar chunks
    pub fn search(&self, query_text: &str, k: usize) -> Result<Vec<Candidate>, VectorIndexError> {
        let query = self.provider.embed(query_text)?;
        self.search_by_vector(&query, k)
    }

    /// Top-k by the index metric, descending; `k` is clamped to the chunk count
    pub fn search_by_vector(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<Candidate>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.chunks.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let pool: Vec<usize> = match (&self.graph, self.options.backend) {
            (Some(graph), IndexBackend::Hnsw { ef_search, .. }) => {
                // Ask for the whole beam so exact rescoring sees every near tie
                let ef = ef_search.max(self.chunks.len());
                graph.neighbours(query, ef, ef)
            }
            _ => (0..self.chunks.len()).collect(),
        };

        let mut scored: Vec<(usize, f32)> = pool
            .into_iter()
            .filter(|&i| i < self.vectors.len())
            .map(|i| (i, self.options.metric.similarity(query, &self.vectors[i])))
            .collect();

        // Stable sort on pre-ordered ids keeps ties in chunk order
        scored.sort_by_key(|(i, _)| *i);
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| Candidate {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }

    /// Stored embedding of a chunk by its index
    pub fn vector(&self, chunk_index: usize) -> Option<&[f32]> {
        self.vectors.get(chunk_index).map(Vec::as_slice)
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.options.metric
    }
}

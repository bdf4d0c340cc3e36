//! Per-document retrieval pipeline
//!
//! Owns the active index and runs search → rerank → MMR → assembly for each
//! query. One orchestrator serves one chat session.

use super::{
    assemble, diversify, CrossEncoderReranker, IngestReport, Reranker, Retrieval, RetrievalConfig,
};
use crate::chunking::{Chunk, Chunker};
use crate::config::Config;
use crate::embedding::{provider_from_config, Candidate, EmbeddingProvider, IndexOptions, VectorIndex};
use crate::error::{DocctxError, Result};
use crate::ingest::{Document, Extractor};
use crate::outcome::StageOutcome;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// The index of the currently loaded document
pub struct IndexedDocument {
    pub file_name: String,
    /// blake3 hex digest of the uploaded bytes
    pub fingerprint: String,
    pub index: VectorIndex,
}

impl IndexedDocument {
    pub fn id(&self) -> Uuid {
        self.index.id()
    }
}

/// Sequences retrieval stages and manages the per-document index
pub struct RetrievalOrchestrator {
    provider: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn Reranker>>,
    chunker: Chunker,
    extractor: Extractor,
    index_options: IndexOptions,
    active: RwLock<Option<Arc<IndexedDocument>>>,
    /// Held across extract, build and swap so uploads replace each other in order
    ingest_lock: Mutex<()>,
    /// Last generation handed out to an upload or clear
    generation: AtomicU64,
    /// Generation of whatever is in `active`
    installed: AtomicU64,
}

impl RetrievalOrchestrator {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        chunker: Chunker,
        extractor: Extractor,
        index_options: IndexOptions,
    ) -> Self {
        Self {
            provider,
            reranker: None,
            chunker,
            extractor,
            index_options,
            active: RwLock::new(None),
            ingest_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            installed: AtomicU64::new(0),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build every collaborator from configuration
    ///
    /// Models load here, once. A reranker that fails to load is logged and
    /// left out; queries asking for reranking then report a degraded stage.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = provider_from_config(&config.embedding)?;
        let chunker = Chunker::from_config(&config.chunking)?;
        let extractor = Extractor::from_config(&config.extraction);
        let index_options = IndexOptions::from_config(&config.index, &config.embedding)?;

        let mut orchestrator = Self::new(provider, chunker, extractor, index_options);

        if config.retrieval.reranking_enabled {
            match CrossEncoderReranker::new(&config.retrieval.reranking_model_identifier) {
                Ok(reranker) => orchestrator = orchestrator.with_reranker(Arc::new(reranker)),
                Err(e) => tracing::warn!("Reranker unavailable, continuing without it: {}", e),
            }
        }

        Ok(orchestrator)
    }

    /// Ingest an uploaded file and make it the active document
    ///
    /// Unsupported types and embedding failures leave the previous index in
    /// place. Overlapping uploads are serialized; the one started last wins.
    pub fn process_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<IngestReport> {
        let (report, _) = self.ingest(Document::new(file_name, bytes)?)?;
        Ok(report)
    }

    /// Ingest a file from disk
    pub fn process_path(&self, path: &Path) -> Result<IngestReport> {
        let (report, _) = self.ingest(Document::from_path(path)?)?;
        Ok(report)
    }

    /// Ingest a file and answer `query` from the index just built
    ///
    /// The answer comes from this upload even if another one replaces it
    /// before retrieval runs.
    pub fn process_file_and_retrieve(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        query: &str,
        config: &RetrievalConfig,
    ) -> Result<(IngestReport, Retrieval)> {
        let (report, document) = self.ingest(Document::new(file_name, bytes)?)?;
        let retrieval = self.retrieve_from(&document, query, config)?;
        Ok((report, retrieval))
    }

    fn ingest(&self, document: Document) -> Result<(IngestReport, Arc<IndexedDocument>)> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _serial = self.ingest_lock.lock().unwrap_or_else(|e| e.into_inner());

        let start = std::time::Instant::now();
        let fingerprint = blake3::hash(&document.bytes).to_hex().to_string();

        let extraction = self.extractor.extract(&document);
        if let Some(reason) = extraction.reason() {
            tracing::warn!(
                "Extraction of '{}' fell back ({:?}): {}",
                document.file_name,
                extraction.status(),
                reason
            );
        }

        let chunks = self.chunker.chunk(extraction.value());
        let chunk_count = chunks.len();

        // Readers keep using the old index until the swap
        let index = VectorIndex::build(chunks, Arc::clone(&self.provider), self.index_options)?;
        let indexed = Arc::new(IndexedDocument {
            file_name: document.file_name.clone(),
            fingerprint: fingerprint.clone(),
            index,
        });
        let index_id = indexed.id();

        // A newer upload or clear that ran first while we waited keeps the slot
        let superseded = self.installed.load(Ordering::SeqCst) > generation;
        if superseded {
            tracing::debug!(
                "Discarding index for '{}', a newer upload is active",
                document.file_name
            );
        } else {
            self.installed.store(generation, Ordering::SeqCst);
            self.swap_index(Some(Arc::clone(&indexed)));
        }

        tracing::info!(
            "Indexed '{}': {} chunk(s), {}ms",
            document.file_name,
            chunk_count,
            start.elapsed().as_millis()
        );

        let report = IngestReport {
            index_id,
            file_name: document.file_name,
            kind: document.kind,
            fingerprint,
            chunk_count,
            extraction: extraction.status(),
            extraction_reason: extraction.reason().map(str::to_string),
            superseded,
            pages: extraction.into_value(),
        };
        Ok((report, indexed))
    }

    /// Replace the active document in a single exclusive scope
    ///
    /// Returns the document that was active before.
    pub fn swap_index(&self, next: Option<Arc<IndexedDocument>>) -> Option<Arc<IndexedDocument>> {
        let mut guard = self.active.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    /// Drop the active document
    ///
    /// Waits for a running upload; uploads started before the clear are discarded.
    pub fn clear(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _serial = self.ingest_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.installed.store(generation, Ordering::SeqCst);
        if let Some(previous) = self.swap_index(None) {
            tracing::debug!("Cleared index for '{}'", previous.file_name);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_some()
    }

    /// The active document, if any
    pub fn snapshot(&self) -> Option<Arc<IndexedDocument>> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(Arc::clone)
    }

    /// Just the assembled context; `None` when nothing is indexed
    pub fn get_relevant_context(
        &self,
        query: &str,
        config: &RetrievalConfig,
    ) -> Result<Option<String>> {
        Ok(self.retrieve(query, config)?.context)
    }

    /// Run the full pipeline against a snapshot of the active index
    pub fn retrieve(&self, query: &str, config: &RetrievalConfig) -> Result<Retrieval> {
        match self.snapshot() {
            Some(document) => self.retrieve_from(&document, query, config),
            None => {
                tracing::debug!("No document indexed, returning no context");
                Ok(Retrieval::empty(None))
            }
        }
    }

    fn retrieve_from(
        &self,
        document: &IndexedDocument,
        query: &str,
        config: &RetrievalConfig,
    ) -> Result<Retrieval> {
        if query.trim().is_empty() || config.top_k == 0 {
            return Ok(Retrieval::for_document(document));
        }

        let index = &document.index;
        let top_k = config.top_k;
        let fetch_k = config.fetch_k.max(top_k);

        let query_embedding = index.provider().embed(query)?;
        let candidates = index.search_by_vector(&query_embedding, fetch_k)?;
        let pool_size = config.rerank_pool_size.min(candidates.len());

        tracing::debug!(
            "Fetched {} candidate(s) (fetch_k={}, top_k={})",
            candidates.len(),
            fetch_k,
            top_k
        );

        let (pool, rerank) = if config.use_reranking {
            let outcome = self.rerank_stage(query, candidates, pool_size);
            let status = outcome.status();
            let reason = outcome.reason().map(str::to_string);
            (outcome.into_value(), Some((status, reason)))
        } else {
            (passthrough(candidates, pool_size), None)
        };

        let chunks: Vec<Chunk> = if config.use_mmr {
            let vectors = pool
                .iter()
                .map(|chunk| match index.vector(chunk.index) {
                    Some(v) => Ok(v.to_vec()),
                    None => index.provider().embed(&chunk.text).map_err(DocctxError::from),
                })
                .collect::<Result<Vec<_>>>()?;

            diversify(&query_embedding, &vectors, top_k, config.lambda_mult)
                .into_iter()
                .map(|i| pool[i].clone())
                .collect()
        } else {
            let mut pool = pool;
            pool.truncate(top_k);
            pool
        };

        let context = assemble(&chunks);
        let (rerank_status, rerank_reason) = match rerank {
            Some((status, reason)) => (Some(status), reason),
            None => (None, None),
        };

        Ok(Retrieval {
            index_id: Some(document.id()),
            file_name: Some(document.file_name.clone()),
            chunks,
            context,
            rerank: rerank_status,
            rerank_reason,
            mmr_applied: config.use_mmr,
        })
    }

    fn rerank_stage(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        pool_size: usize,
    ) -> StageOutcome<Vec<Chunk>> {
        let Some(reranker) = &self.reranker else {
            tracing::warn!("Reranking requested but no reranker is loaded, keeping search order");
            return StageOutcome::degraded(
                passthrough(candidates, pool_size),
                "no reranker loaded",
            );
        };

        match reranker.rerank(query, &candidates) {
            Ok(scored) => StageOutcome::Success(
                scored
                    .into_iter()
                    .take(pool_size)
                    .map(|s| s.chunk)
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(
                    "Reranking with {} failed, keeping search order: {}",
                    reranker.model_name(),
                    e
                );
                StageOutcome::degraded(passthrough(candidates, pool_size), e.to_string())
            }
        }
    }
}

fn passthrough(candidates: Vec<Candidate>, pool_size: usize) -> Vec<Chunk> {
    candidates
        .into_iter()
        .take(pool_size)
        .map(|c| c.chunk)
        .collect()
}

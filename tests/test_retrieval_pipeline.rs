//! Integration tests: ingest → chunk → index → search → rerank → MMR → assemble
//!
//! Uses the offline hashing embedder so every path runs without model downloads.

use docctx::chunking::Chunker;
use docctx::embedding::{EmbeddingProvider, HashingEmbedder, IndexBackend, IndexOptions};
use docctx::ingest::Extractor;
use docctx::outcome::StageStatus;
use docctx::retrieval::{
    diversify, RerankError, Reranker, RetrievalConfig, RetrievalOrchestrator,
};
use docctx::vector_math::cosine_similarity;
use docctx::DocctxError;
use std::sync::Arc;
use tempfile::TempDir;

/// Scores documents so that input order is preserved
struct OrderPreservingReranker;

impl Reranker for OrderPreservingReranker {
    fn score(&self, _query: &str, documents: &[&str]) -> Result<Vec<f32>, RerankError> {
        Ok((0..documents.len()).map(|i| -(i as f32)).collect())
    }

    fn model_name(&self) -> &str {
        "order-preserving"
    }
}

/// Reverses the incoming order
struct ReversingReranker;

impl Reranker for ReversingReranker {
    fn score(&self, _query: &str, documents: &[&str]) -> Result<Vec<f32>, RerankError> {
        Ok((0..documents.len()).map(|i| i as f32).collect())
    }

    fn model_name(&self) -> &str {
        "reversing"
    }
}

fn provider() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashingEmbedder::new(384).unwrap())
}

fn orchestrator(chunk_size: usize, overlap: usize, options: IndexOptions) -> RetrievalOrchestrator {
    RetrievalOrchestrator::new(
        provider(),
        Chunker::new(chunk_size, overlap).unwrap(),
        Extractor::new(100, None),
        options,
    )
}

/// About `target` characters of varied sentences on a handful of topics
fn article(target: usize) -> String {
    let sentences = [
        "Solar panels convert sunlight into electricity using photovoltaic cells",
        "Wind turbines generate power when moving air spins their blades",
        "Battery storage smooths out the supply from intermittent renewable sources",
        "Hydroelectric dams release water through turbines to produce energy",
        "Geothermal plants tap heat from deep underground reservoirs",
        "Grid operators balance demand and supply every few seconds",
        "Heat pumps move warmth from outside air into buildings efficiently",
    ];

    let mut text = String::new();
    let mut i = 0;
    while text.chars().count() < target {
        text.push_str(&format!("{} (note {}). ", sentences[i % sentences.len()], i));
        i += 1;
    }
    text.chars().take(target).collect()
}

fn paragraphs() -> Vec<u8> {
    [
        "Sourdough bread relies on a starter of wild yeast and lactic bacteria.",
        "Knead the dough until it passes the windowpane test for gluten strength.",
        "The Rust compiler rejects programs that would cause data races.",
        "Ownership and borrowing let Rust manage memory without a garbage collector.",
        "Marathon training plans increase weekly mileage gradually to avoid injury.",
        "Long slow runs build aerobic capacity for endurance races.",
        "Proofing dough overnight in the fridge deepens the bread's flavor.",
        "Cargo builds Rust crates and resolves their dependencies.",
    ]
    .join("\n\n")
    .into_bytes()
}

fn shared_overlap(prev: &str, next: &str) -> usize {
    let next_chars: Vec<char> = next.chars().collect();
    (1..=next_chars.len())
        .rev()
        .find(|&n| {
            let prefix: String = next_chars[..n].iter().collect();
            prev.ends_with(&prefix)
        })
        .unwrap_or(0)
}

#[test]
fn test_end_to_end_text_document() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("energy.txt");
    let text = article(3000);
    assert_eq!(text.chars().count(), 3000);
    std::fs::write(&path, &text).unwrap();

    let orch = orchestrator(1000, 200, IndexOptions::default());
    let report = orch.process_path(&path).unwrap();

    println!("✓ Indexed {} chunks from {}", report.chunk_count, report.file_name);
    assert!(report.chunk_count >= 3);
    assert_eq!(report.extraction, StageStatus::Success);

    let document = orch.snapshot().unwrap();
    let chunks = document.index.chunks();
    for chunk in chunks {
        assert!(chunk.char_len() <= 1000);
    }
    for pair in chunks.windows(2) {
        assert!(shared_overlap(&pair[0].text, &pair[1].text) >= 200);
    }

    let config = RetrievalConfig {
        top_k: 2,
        fetch_k: 5,
        use_mmr: true,
        use_reranking: false,
        lambda_mult: 0.7,
        rerank_pool_size: 15,
    };
    let retrieval = orch
        .retrieve("How do wind turbines generate power?", &config)
        .unwrap();

    assert!(!retrieval.chunks.is_empty());
    assert!(retrieval.chunks.len() <= 2);
    let mut ids: Vec<usize> = retrieval.chunks.iter().map(|c| c.index).collect();
    ids.dedup();
    assert_eq!(ids.len(), retrieval.chunks.len());

    let context = retrieval.context.unwrap();
    for chunk in &retrieval.chunks {
        assert!(context.contains(&chunk.text));
    }
    println!("✓ Context assembled from {} chunk(s)", retrieval.chunks.len());
}

#[test]
fn test_empty_index_returns_no_context() {
    let orch = orchestrator(200, 20, IndexOptions::default());
    for query in ["anything", "", "what is in the document?"] {
        let context = orch
            .get_relevant_context(query, &RetrievalConfig::default())
            .unwrap();
        assert!(context.is_none());
    }
}

#[test]
fn test_unsupported_file_keeps_previous_index() {
    let orch = orchestrator(200, 20, IndexOptions::default());
    let report = orch.process_file("notes.txt", paragraphs()).unwrap();

    let result = orch.process_file("report.DOCX", b"PK\x03\x04 fake docx".to_vec());
    assert!(matches!(result, Err(DocctxError::UnsupportedFileType { .. })));

    let active = orch.snapshot().unwrap();
    assert_eq!(active.id(), report.index_id);
    assert_eq!(active.file_name, "notes.txt");
    assert!(orch
        .get_relevant_context("Rust compiler", &RetrievalConfig::default())
        .unwrap()
        .is_some());
}

#[test]
fn test_lambda_one_matches_similarity_order() {
    let orch = orchestrator(120, 0, IndexOptions::default());
    orch.process_file("mixed.txt", paragraphs()).unwrap();

    let plain = RetrievalConfig {
        top_k: 4,
        fetch_k: 8,
        use_mmr: false,
        ..RetrievalConfig::default()
    };
    let mmr = RetrievalConfig {
        use_mmr: true,
        lambda_mult: 1.0,
        ..plain.clone()
    };

    let query = "Rust ownership and borrowing";
    let by_similarity = orch.retrieve(query, &plain).unwrap();
    let by_mmr = orch.retrieve(query, &mmr).unwrap();

    assert_eq!(by_similarity.chunks, by_mmr.chunks);
    assert!(by_mmr.mmr_applied);
}

#[test]
fn test_lambda_zero_second_pick_is_not_nearest_to_first() {
    let embedder = HashingEmbedder::new(384).unwrap();
    let texts = [
        "bread dough starter yeast",
        "bread dough starter yeast flour",
        "rust compiler borrow checker",
        "marathon training long runs",
    ];
    let vectors: Vec<Vec<f32>> = texts.iter().map(|t| embedder.embed(t).unwrap()).collect();
    let query = embedder.embed("bread dough").unwrap();

    let picks = diversify(&query, &vectors, 2, 0.0);
    assert_eq!(picks.len(), 2);

    let first = picks[0];
    let nearest = (0..vectors.len())
        .filter(|&i| i != first)
        .max_by(|&a, &b| {
            cosine_similarity(&vectors[first], &vectors[a])
                .partial_cmp(&cosine_similarity(&vectors[first], &vectors[b]))
                .unwrap()
        })
        .unwrap();
    assert_ne!(picks[1], nearest);
}

#[test]
fn test_reranking_disabled_equals_order_preserving_reranker() {
    let plain_orch = orchestrator(120, 0, IndexOptions::default());
    let rerank_orch = orchestrator(120, 0, IndexOptions::default())
        .with_reranker(Arc::new(OrderPreservingReranker));
    plain_orch.process_file("mixed.txt", paragraphs()).unwrap();
    rerank_orch.process_file("mixed.txt", paragraphs()).unwrap();

    for use_mmr in [false, true] {
        let base = RetrievalConfig {
            top_k: 3,
            fetch_k: 6,
            use_mmr,
            ..RetrievalConfig::default()
        };
        let reranked_config = RetrievalConfig {
            use_reranking: true,
            ..base.clone()
        };

        let plain = plain_orch.retrieve("bread flavor", &base).unwrap();
        let reranked = rerank_orch.retrieve("bread flavor", &reranked_config).unwrap();

        assert_eq!(reranked.rerank, Some(StageStatus::Success));
        assert_eq!(plain.chunks, reranked.chunks);
        assert_eq!(plain.context, reranked.context);
    }
}

#[test]
fn test_reranker_order_is_used_without_mmr() {
    let orch = orchestrator(120, 0, IndexOptions::default())
        .with_reranker(Arc::new(ReversingReranker));
    orch.process_file("mixed.txt", paragraphs()).unwrap();

    let base = RetrievalConfig {
        top_k: 8,
        fetch_k: 8,
        use_mmr: false,
        ..RetrievalConfig::default()
    };
    let plain = orch.retrieve("marathon", &base).unwrap();
    let reversed = orch
        .retrieve(
            "marathon",
            &RetrievalConfig {
                use_reranking: true,
                ..base.clone()
            },
        )
        .unwrap();

    let mut expected = plain.chunks.clone();
    expected.reverse();
    assert_eq!(reversed.chunks, expected);
}

#[test]
fn test_rerank_pool_truncation() {
    let orch = orchestrator(120, 0, IndexOptions::default())
        .with_reranker(Arc::new(OrderPreservingReranker));
    orch.process_file("mixed.txt", paragraphs()).unwrap();

    let config = RetrievalConfig {
        top_k: 5,
        fetch_k: 8,
        use_mmr: false,
        use_reranking: true,
        rerank_pool_size: 2,
        ..RetrievalConfig::default()
    };
    let retrieval = orch.retrieve("bread", &config).unwrap();
    assert_eq!(retrieval.chunks.len(), 2);
}

#[test]
fn test_hnsw_backend_agrees_with_flat() {
    let flat = orchestrator(120, 0, IndexOptions::default());
    let hnsw = orchestrator(
        120,
        0,
        IndexOptions {
            backend: IndexBackend::Hnsw {
                m: 16,
                ef_construction: 200,
                ef_search: 64,
            },
            ..IndexOptions::default()
        },
    );
    flat.process_file("mixed.txt", paragraphs()).unwrap();
    hnsw.process_file("mixed.txt", paragraphs()).unwrap();

    let config = RetrievalConfig {
        top_k: 3,
        fetch_k: 6,
        use_mmr: false,
        ..RetrievalConfig::default()
    };
    let a = flat.retrieve("Cargo crates dependencies", &config).unwrap();
    let b = hnsw.retrieve("Cargo crates dependencies", &config).unwrap();
    assert_eq!(a.chunks, b.chunks);
}

#[test]
fn test_readers_never_see_partial_index() {
    let orch = Arc::new(orchestrator(120, 0, IndexOptions::default()));
    orch.process_file("first.txt", paragraphs()).unwrap();

    let second: Vec<u8> = (0..12)
        .map(|i| format!("Tide pool {} holds sea anemones, hermit crabs, starfish and small silver fish.", i))
        .collect::<Vec<_>>()
        .join("\n\n")
        .into_bytes();

    std::thread::scope(|scope| {
        let writer = {
            let orch = Arc::clone(&orch);
            let second = second.clone();
            scope.spawn(move || {
                for round in 0..5 {
                    let (name, bytes) = if round % 2 == 0 {
                        ("second.txt", second.clone())
                    } else {
                        ("first.txt", paragraphs())
                    };
                    orch.process_file(name, bytes).unwrap();
                }
            })
        };

        for _ in 0..4 {
            let orch = Arc::clone(&orch);
            scope.spawn(move || {
                for _ in 0..20 {
                    let snapshot = orch.snapshot().unwrap();
                    let expected = if snapshot.file_name == "second.txt" { 12 } else { 8 };
                    assert_eq!(snapshot.index.len(), expected);

                    let retrieval = orch.retrieve("crabs", &RetrievalConfig::default()).unwrap();
                    assert!(retrieval.context.is_some());
                }
            });
        }

        writer.join().unwrap();
    });
}

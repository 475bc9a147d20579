//! End-to-end tests: build an index from pages, persist it, reload it, and
//! run hybrid queries against it.

use manualdex::chunking::Page;
use manualdex::embedding::EmbeddingProvider;
use manualdex::pipeline::IndexBuilder;
use manualdex::search::{HybridRanker, MatchSource, MergePolicy};
use manualdex::storage::{IndexStore, StoreError};
use manualdex::test_utils::HashEmbedder;
use std::sync::Arc;
use tempfile::TempDir;

const DIM: usize = 128;

fn manual_pages() -> Vec<Page> {
    vec![
        Page::new(
            41,
            "Engine oil and oil filter replacement. Drain the engine oil with \
             the engine warm, then remove the oil filter with a filter wrench. \
             Lubricate the new filter gasket before installation.",
        ),
        Page::new(
            42,
            "Refill with 4.2 liters of SAE 5W-30 engine oil. Run the engine \
             and check for leaks around the drain plug.",
        ),
        Page::new(
            88,
            "Brake pad inspection. Replace the pads when the friction material \
             is worn below 2 mm.",
        ),
        Page::new(
            120,
            "Coolant replacement. Drain the radiator and refill with the \
             specified coolant mixture.",
        ),
    ]
}

/// Relaxed merge policy for the hash embedder, whose sparse vectors sit
/// closer to orthogonal than a trained model's.
fn test_policy() -> MergePolicy {
    MergePolicy {
        min_semantic_score: 0.0,
        ..MergePolicy::default()
    }
}

fn build_ranker(pages: &[Page]) -> HybridRanker {
    let embedder = Arc::new(HashEmbedder::new(DIM));
    let built = IndexBuilder::default()
        .build(pages, embedder.as_ref())
        .unwrap();
    HybridRanker::new(embedder, built.chunks, built.embeddings, test_policy()).unwrap()
}

#[test]
fn test_oil_filter_query_end_to_end() {
    let ranker = build_ranker(&manual_pages());

    let results = ranker.hybrid_search("oil filter", 3).unwrap();
    assert!(!results.is_empty());

    // The oil filter procedure page must win: it matches both query words
    // lexically and shares the most vocabulary semantically
    assert_eq!(results[0].page_number, 41);
    assert_eq!(results[0].source, MatchSource::Both);
    assert!(results[0].text.contains("oil filter"));

    // Scores descend
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_three_page_manual_finds_oil_filter_page() {
    let pages = vec![
        Page::new(1, "Table of contents and general safety precautions."),
        Page::new(
            2,
            "Replace the oil filter at every second oil change. Use only the \
             approved oil filter cartridge.",
        ),
        Page::new(3, "Tire rotation pattern and wheel torque values."),
    ];
    let ranker = build_ranker(&pages);

    let results = ranker.hybrid_search("oil filter change", 3).unwrap();
    assert!(results.iter().any(|r| r.page_number == 2));
}

#[test]
fn test_results_deduplicated_and_bounded() {
    let ranker = build_ranker(&manual_pages());
    let results = ranker.hybrid_search("engine oil drain", 10).unwrap();

    let mut ids: Vec<u64> = results.iter().map(|r| r.chunk_id.as_u64()).collect();
    let before = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), before, "no chunk may appear twice");
    assert!(results.len() <= 10);
}

#[test]
fn test_k_zero_returns_empty() {
    let ranker = build_ranker(&manual_pages());
    assert!(ranker.hybrid_search("oil filter", 0).unwrap().is_empty());
}

#[test]
fn test_semantic_only_when_no_keyword_overlap() {
    let ranker = build_ranker(&manual_pages());

    // No corpus chunk contains either word, so the lexical leg is empty but
    // vector search still produces nearest neighbors
    let results = ranker.hybrid_search("zzkw qqrv", 3).unwrap();
    assert!(!results.is_empty());
    for result in &results {
        assert_eq!(result.source, MatchSource::Semantic);
    }
}

#[test]
fn test_spanish_query_reaches_english_chunk() {
    let ranker = build_ranker(&manual_pages());

    let results = ranker.hybrid_search("cambiar filtro aceite", 3).unwrap();
    assert!(!results.is_empty());
    // Expansion maps cambiar/filtro/aceite onto the English procedure text
    assert_eq!(results[0].page_number, 41);
}

#[test]
fn test_persisted_index_answers_like_in_memory() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::new(dir.path());
    let embedder = Arc::new(HashEmbedder::new(DIM));

    IndexBuilder::default()
        .build_and_save(&manual_pages(), embedder.as_ref(), &store)
        .unwrap();

    let artifact = store
        .load(embedder.model_id(), embedder.dimension())
        .unwrap();
    let reloaded =
        HybridRanker::from_artifact(Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>, artifact, test_policy())
            .unwrap();
    let in_memory = build_ranker(&manual_pages());

    let from_disk = reloaded.hybrid_search("oil filter", 5).unwrap();
    let from_memory = in_memory.hybrid_search("oil filter", 5).unwrap();

    assert_eq!(from_disk.len(), from_memory.len());
    for (a, b) in from_disk.iter().zip(&from_memory) {
        assert_eq!(a.chunk_id, b.chunk_id);
        assert_eq!(a.page_number, b.page_number);
        assert!((a.score - b.score).abs() < 1e-6);
    }
}

#[test]
fn test_load_rejects_foreign_model() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::new(dir.path());
    let embedder = HashEmbedder::new(DIM);

    IndexBuilder::default()
        .build_and_save(&manual_pages(), &embedder, &store)
        .unwrap();

    assert!(matches!(
        store.load("some/other-model", DIM),
        Err(StoreError::ModelMismatch { .. })
    ));
    assert!(matches!(
        store.load(embedder.model_id(), 384),
        Err(StoreError::DimensionMismatch {
            expected: 384,
            found: DIM
        })
    ));
}

#[test]
fn test_missing_artifact_reports_missing() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::new(dir.path().join("nothing-here"));
    assert!(matches!(
        store.load("test/hash-embedder", DIM),
        Err(StoreError::Missing { .. })
    ));
}

#[test]
fn test_rebuild_replaces_artifact() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::new(dir.path());
    let embedder = Arc::new(HashEmbedder::new(DIM));

    IndexBuilder::default()
        .build_and_save(&manual_pages(), embedder.as_ref(), &store)
        .unwrap();

    let smaller = vec![Page::new(1, "Wiper blade replacement only.")];
    IndexBuilder::default()
        .build_and_save(&smaller, embedder.as_ref(), &store)
        .unwrap();

    let artifact = store
        .load(embedder.model_id(), embedder.dimension())
        .unwrap();
    assert_eq!(artifact.chunks.len(), 1);
    assert!(artifact.chunks[0].text.contains("Wiper"));
}

#[test]
fn test_long_page_produces_overlapping_citable_chunks() {
    let procedure = "Step: check the torque of every caliper bolt. ".repeat(60);
    let pages = vec![Page::new(200, procedure)];
    let ranker = build_ranker(&pages);

    let results = ranker.hybrid_search("caliper bolt torque", 5).unwrap();
    assert!(results.len() > 1, "a long page should yield several chunks");
    for result in &results {
        assert_eq!(result.page_number, 200);
    }
}

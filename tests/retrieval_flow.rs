//! End-to-end flow over the in-process store: corpus ingestion, hybrid
//! retrieval, and the deterministic tutor reply built from the results.

use std::fs;
use std::sync::Arc;
use tutorkb::db::MemoryStore;
use tutorkb::embeddings::{MockEmbedder, UnavailableReason};
use tutorkb::services::fallback::{self, Language};
use tutorkb::services::ingest::IngestService;
use tutorkb::services::search::SearchService;

const PERCENT_NOTES: &str = "\
Percent means out of one hundred. 10% means 10 out of every 100.

Q: What does percent mean? A: Out of one hundred.
Q: How do you find 10% of a number? A: Divide it by 10.

Practice time!
What is 20% of 50?
What is 25% of 80?
";

const PLANT_NOTES: &str = "\
Plants make food from sunlight. This is called photosynthesis.

Leaves are green because of chlorophyll.
";

fn corpus() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("math")).unwrap();
    fs::create_dir(dir.path().join("science")).unwrap();
    fs::write(dir.path().join("math/percentages.md"), PERCENT_NOTES).unwrap();
    fs::write(dir.path().join("science/plants.md"), PLANT_NOTES).unwrap();
    // Not a note file, must be skipped
    fs::write(dir.path().join("math/notes.json"), "{}").unwrap();
    dir
}

fn services(store: Arc<MemoryStore>) -> (IngestService, SearchService) {
    let embedder = Arc::new(MockEmbedder::new(16));
    (
        IngestService::new(store.clone(), embedder.clone()),
        SearchService::new(store, embedder),
    )
}

#[tokio::test]
async fn corpus_to_tutor_reply() {
    let store = Arc::new(MemoryStore::new());
    let (ingest, search) = services(store.clone());

    let dir = corpus();
    let report = ingest.ingest_dir(dir.path()).await.unwrap();
    assert_eq!(report.files_ok, 2);
    assert_eq!(report.files_failed, 0);
    assert!(report.chunks_inserted >= 2);
    assert_eq!(store.doc_count(), 2);

    let results = search.search("what does percent mean", "math", 6).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|c| c.subject == "math"));
    assert!(results[0].content.to_lowercase().contains("percent"));

    let reply = fallback::extract(&results, Language::En);
    assert_eq!(reply.intent, "explain");
    assert_eq!(reply.flashcards.len(), 2);
    assert_eq!(reply.flashcards[0].front, "What does percent mean?");
    let quiz_qs: Vec<&str> = reply.quiz.iter().map(|q| q.q.as_str()).collect();
    assert!(quiz_qs.contains(&"What is 20% of 50?"));
    let twenty = reply.quiz.iter().find(|q| q.q.contains("20%")).unwrap();
    assert_eq!(twenty.a, "10");
}

#[tokio::test]
async fn reingesting_corpus_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let (ingest, _) = services(store.clone());

    let dir = corpus();
    ingest.ingest_dir(dir.path()).await.unwrap();
    let docs = store.doc_count();
    let chunks = store.chunk_count();

    ingest.ingest_dir(dir.path()).await.unwrap();
    assert_eq!(store.doc_count(), docs);
    assert_eq!(store.chunk_count(), chunks);
}

#[tokio::test]
async fn missing_corpus_root_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let (ingest, _) = services(store.clone());

    let report = ingest
        .ingest_dir(std::path::Path::new("/nonexistent/corpus"))
        .await
        .unwrap();
    assert_eq!(report.files_ok, 0);
    assert_eq!(report.files_failed, 0);
    assert_eq!(report.chunks_inserted, 0);
    assert_eq!(store.doc_count(), 0);
}

#[tokio::test]
async fn search_results_are_stable_across_runs() {
    let store = Arc::new(MemoryStore::new());
    let (ingest, search) = services(store.clone());

    let dir = corpus();
    ingest.ingest_dir(dir.path()).await.unwrap();

    let first = search.search("percent of a number", "math", 6).await.unwrap();
    let second = search.search("percent of a number", "math", 6).await.unwrap();

    let a: Vec<_> = first.iter().map(|c| (c.chunk_id, c.final_score)).collect();
    let b: Vec<_> = second.iter().map(|c| (c.chunk_id, c.final_score)).collect();
    assert_eq!(a, b);
}

#[tokio::test]
async fn subjects_stay_isolated() {
    // Lexical-only so the match is attributable to the query terms
    let store = Arc::new(MemoryStore::new());
    let embedder = Arc::new(
        MockEmbedder::new(16).with_outage(UnavailableReason::Provider("offline".into())),
    );
    let ingest = IngestService::new(store.clone(), embedder.clone());
    let search = SearchService::new(store, embedder);

    let dir = corpus();
    ingest.ingest_dir(dir.path()).await.unwrap();

    let results = search.search("photosynthesis sunlight", "math", 6).await.unwrap();
    assert!(results.is_empty());

    let results = search.search("photosynthesis sunlight", "science", 6).await.unwrap();
    assert!(!results.is_empty());
}

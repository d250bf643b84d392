use std::sync::Arc;
use std::time::Duration;

use crate::config::ChunkingConfig;
use crate::engine::cancel::{CancelToken, SearchCoordinator};
use crate::engine::dispatch::{SearchDispatcher, SearchError, SearchMode, SearchOutcome, SearchResultItem};
use crate::engine::embeddings::Embedder;
use crate::engine::sync::Indexer;
use crate::tests::{document, test_store, topic_vector, StubProvider};

const TOPICS: &[&str] = &["rust", "cooking", "music"];

fn topic_provider() -> StubProvider {
    StubProvider::new(TOPICS.len()).with_embed_fn(|text| topic_vector(text, TOPICS))
}

/// Index the given documents and hand back a dispatcher over the result.
/// The temp dir guard rides along so the dataset file stays alive.
async fn indexed_dispatcher(
    provider: Arc<StubProvider>,
    documents: &[crate::bookmarks::SourceDocument],
    top_n: usize,
    debounce: Duration,
) -> (SearchDispatcher, tempfile::TempDir) {
    let embedder = Embedder::new(provider.clone());
    let (store, storage, tmp) = test_store(&embedder);

    let indexer = Indexer::new(
        Embedder::new(provider.clone()),
        ChunkingConfig {
            max_chunk_size: 100,
            overlap: 10,
        },
        store.clone(),
        storage,
    );
    match indexer
        .sync(documents, &CancelToken::detached())
        .await
        .expect("sync failed")
    {
        crate::engine::sync::SyncOutcome::Completed(_) => {}
        crate::engine::sync::SyncOutcome::Aborted => panic!("sync unexpectedly aborted"),
    }

    (
        SearchDispatcher::new(store, Embedder::new(provider), top_n, debounce),
        tmp,
    )
}

fn completed(outcome: SearchOutcome) -> Vec<SearchResultItem> {
    match outcome {
        SearchOutcome::Completed(results) => results,
        SearchOutcome::Aborted => panic!("search unexpectedly aborted"),
    }
}

fn library() -> Vec<crate::bookmarks::SourceDocument> {
    vec![
        document(
            "https://rust-lang.org/book",
            "The Rust Book",
            "rust rust rust ownership and borrowing in rust",
            &["dev", "rust"],
        ),
        document(
            "https://recipes.example/bread",
            "Bread Recipes",
            "cooking cooking bread at home cooking",
            &["kitchen"],
        ),
        document(
            "https://music.example/jazz",
            "Jazz Standards",
            "music music jazz music theory",
            &[],
        ),
    ]
}

#[tokio::test]
async fn test_semantic_search_ranks_by_similarity() {
    let provider = Arc::new(topic_provider());
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider, &library(), 5, Duration::ZERO).await;

    let token = CancelToken::detached();
    let results = completed(
        dispatcher
            .search("rust programming", SearchMode::Semantic, &token)
            .await
            .expect("search failed"),
    );

    assert!(!results.is_empty());
    assert_eq!(results[0].url, "https://rust-lang.org/book");
    assert_eq!(results[0].title, "The Rust Book");
    assert_eq!(results[0].folder, "dev / rust");
    assert!(results[0].score.is_some());
    assert!(!results[0].snippet.is_empty());
}

#[tokio::test]
async fn test_semantic_search_collapses_to_one_result_per_source() {
    let provider = Arc::new(topic_provider());
    // Long body, so this source indexes as several chunks.
    let body = "rust ".repeat(100);
    let documents = vec![
        document("https://rust-lang.org", "Rust", &body, &[]),
        document("https://music.example", "Music", "music music theory", &[]),
    ];
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider, &documents, 5, Duration::ZERO).await;

    let token = CancelToken::detached();
    let results = completed(
        dispatcher
            .search("rust", SearchMode::Semantic, &token)
            .await
            .expect("search failed"),
    );

    let rust_hits = results
        .iter()
        .filter(|r| r.url == "https://rust-lang.org")
        .count();
    assert_eq!(rust_hits, 1);
}

#[tokio::test]
async fn test_semantic_search_honors_top_n() {
    let provider = Arc::new(topic_provider());
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider, &library(), 2, Duration::ZERO).await;

    let token = CancelToken::detached();
    let results = completed(
        dispatcher
            .search("rust cooking music", SearchMode::Semantic, &token)
            .await
            .expect("search failed"),
    );

    assert!(results.len() <= 2);
}

#[tokio::test]
async fn test_semantic_search_without_index_is_an_error() {
    let provider = Arc::new(topic_provider());
    let embedder = Embedder::new(provider.clone());
    let (store, _storage, _tmp) = test_store(&embedder);
    let dispatcher = SearchDispatcher::new(store, embedder, 5, Duration::ZERO);

    let token = CancelToken::detached();
    let err = dispatcher
        .search("rust", SearchMode::Semantic, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::NoIndexedData));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_empty_query_completes_without_provider_call() {
    let provider = Arc::new(topic_provider());
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider.clone(), &library(), 5, Duration::ZERO).await;
    let calls_after_sync = provider.calls();

    let token = CancelToken::detached();
    for query in ["", "   ", "\n\t"] {
        let results = completed(
            dispatcher
                .search(query, SearchMode::Semantic, &token)
                .await
                .expect("search failed"),
        );
        assert!(results.is_empty());
    }
    assert_eq!(provider.calls(), calls_after_sync);
}

#[tokio::test]
async fn test_exact_search_matches_all_terms_without_scores() {
    let provider = Arc::new(topic_provider());
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider.clone(), &library(), 5, Duration::ZERO).await;
    let calls_after_sync = provider.calls();

    let token = CancelToken::detached();
    let results = completed(
        dispatcher
            .search("RUST book", SearchMode::Exact, &token)
            .await
            .expect("search failed"),
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, "https://rust-lang.org/book");
    assert_eq!(results[0].score, None);

    let none = completed(
        dispatcher
            .search("rust jazz", SearchMode::Exact, &token)
            .await
            .expect("search failed"),
    );
    assert!(none.is_empty());

    // Exact and fuzzy never touch the embedder.
    assert_eq!(provider.calls(), calls_after_sync);
}

#[tokio::test]
async fn test_exact_search_matches_folder_names() {
    let provider = Arc::new(topic_provider());
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider, &library(), 5, Duration::ZERO).await;

    let token = CancelToken::detached();
    let results = completed(
        dispatcher
            .search("kitchen", SearchMode::Exact, &token)
            .await
            .expect("search failed"),
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, "https://recipes.example/bread");
}

#[tokio::test]
async fn test_fuzzy_search_scores_partial_matches() {
    let provider = Arc::new(topic_provider());
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider, &library(), 5, Duration::ZERO).await;

    let token = CancelToken::detached();
    let results = completed(
        dispatcher
            .search("jazz zebra", SearchMode::Fuzzy, &token)
            .await
            .expect("search failed"),
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, "https://music.example/jazz");
    assert_eq!(results[0].score, Some(0.5));

    let (dispatcher2, _tmp2) =
        indexed_dispatcher(Arc::new(topic_provider()), &library(), 5, Duration::ZERO).await;
    let none = completed(
        dispatcher2
            .search("zebra quagga", SearchMode::Fuzzy, &token)
            .await
            .expect("search failed"),
    );
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_search_superseded_during_debounce_aborts() {
    let provider = Arc::new(topic_provider());
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider.clone(), &library(), 5, Duration::from_millis(20)).await;
    let calls_after_sync = provider.calls();

    let coordinator = SearchCoordinator::new();
    let stale = coordinator.issue();
    let _newer = coordinator.issue();

    let outcome = dispatcher
        .search("rust", SearchMode::Semantic, &stale)
        .await
        .expect("search failed");
    assert!(outcome.is_aborted());

    // The stale query never reached the provider.
    assert_eq!(provider.calls(), calls_after_sync);
}

#[tokio::test]
async fn test_search_superseded_mid_embedding_discards_result() {
    let provider = Arc::new(
        StubProvider::new(TOPICS.len())
            .with_embed_fn(|text| topic_vector(text, TOPICS))
            .with_delay(Duration::from_millis(50)),
    );
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider.clone(), &library(), 5, Duration::ZERO).await;
    let calls_after_sync = provider.calls();
    let dispatcher = Arc::new(dispatcher);

    let coordinator = SearchCoordinator::new();
    let first = coordinator.issue();

    let task = {
        let dispatcher = dispatcher.clone();
        let token = first.clone();
        tokio::spawn(async move {
            dispatcher
                .search("rust", SearchMode::Semantic, &token)
                .await
        })
    };

    // Let the first query reach the provider, then supersede it.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let _newer = coordinator.issue();

    let outcome = task.await.expect("task panicked").expect("search failed");
    assert!(outcome.is_aborted());

    // The in-flight call ran to completion; only its result was dropped.
    assert_eq!(provider.calls(), calls_after_sync + 1);
}

#[tokio::test]
async fn test_latest_query_wins_under_rapid_fire() {
    let provider = Arc::new(topic_provider());
    let (dispatcher, _tmp) =
        indexed_dispatcher(provider, &library(), 5, Duration::from_millis(10)).await;
    let dispatcher = Arc::new(dispatcher);

    let coordinator = SearchCoordinator::new();
    let queries = ["rust", "cooking", "music"];
    let mut tasks = Vec::new();
    for query in queries {
        let dispatcher = dispatcher.clone();
        let token = coordinator.issue();
        tasks.push(tokio::spawn(async move {
            dispatcher
                .search(query, SearchMode::Semantic, &token)
                .await
        }));
    }

    let mut completed_queries = Vec::new();
    for (task, query) in tasks.into_iter().zip(queries) {
        let outcome = task.await.expect("task panicked").expect("search failed");
        if let SearchOutcome::Completed(results) = outcome {
            completed_queries.push((query, results));
        }
    }

    // Only the last issued query may complete.
    assert!(completed_queries.len() <= 1);
    if let Some((query, results)) = completed_queries.first() {
        assert_eq!(*query, "music");
        assert_eq!(results[0].url, "https://music.example/jazz");
    }
}

#[tokio::test]
async fn test_rejects_unknown_mode_before_searching() {
    let err = "phonetic".parse::<SearchMode>().unwrap_err();
    assert!(matches!(err, SearchError::UnsupportedMode(ref m) if m == "phonetic"));
}

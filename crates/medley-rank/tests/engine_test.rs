//! End-to-end engine tests against an in-memory catalog.

mod helpers;

use std::sync::Arc;

use medley_core::{EngineConfig, Error, MediaRecord, MediaType};
use medley_rank::{
    field_search, RecommendationRequest, Recommender, SearchField, SemanticRanker,
    SemanticSearchOptions,
};

use helpers::{InMemoryCatalog, StubEmbedder};

const QUERY: &str = "requirements for a valid contract";

fn law_corpus() -> Vec<MediaRecord> {
    vec![
        MediaRecord::new("Elements of a Valid Contract", MediaType::Text)
            .with_embedding(vec![0.9, 0.1, 0.0]),
        MediaRecord::new("Contract Formation and Offer", MediaType::Text)
            .with_embedding(vec![0.85, 0.2, 0.0]),
        MediaRecord::new("Breach of Contract Remedies", MediaType::Text)
            .with_embedding(vec![0.8, 0.15, 0.0]),
        MediaRecord::new("Property Law Overview", MediaType::Text)
            .with_embedding(vec![0.1, 0.95, 0.0]),
    ]
}

fn law_ranker(records: Vec<MediaRecord>) -> SemanticRanker {
    let catalog = Arc::new(InMemoryCatalog::new(records));
    let embedder = Arc::new(
        StubEmbedder::new(3).with_vector(QUERY, vec![1.0, 0.15, 0.0]),
    );
    SemanticRanker::new(
        embedder,
        catalog.clone(),
        catalog,
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn contract_records_outrank_property_law() {
    let ranker = law_ranker(law_corpus());
    let response = ranker
        .semantic_search(QUERY, 4, SemanticSearchOptions::default())
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    let property_position = response
        .results
        .iter()
        .position(|r| r.record.title == "Property Law Overview");
    for (i, result) in response.results.iter().enumerate() {
        if result.record.title.contains("Contract") {
            if let Some(p) = property_position {
                assert!(i < p, "contract record ranked below property law");
            }
        }
    }
    assert_eq!(response.metadata.total_candidates, 4);
}

#[tokio::test]
async fn empty_corpus_returns_diagnostic_not_error() {
    let catalog = Arc::new(InMemoryCatalog::empty());
    let embedder = Arc::new(StubEmbedder::new(3).with_default(vec![1.0, 0.0, 0.0]));
    let ranker = SemanticRanker::new(
        embedder,
        catalog.clone(),
        catalog,
        EngineConfig::default(),
    );

    let response = ranker
        .semantic_search("anything at all", 10, SemanticSearchOptions::default())
        .await
        .unwrap();

    assert!(response.results.is_empty());
    assert_eq!(response.metadata.total_candidates, 0);
    assert!(response.message.is_some());
    assert!(!response.message.unwrap().is_empty());
}

#[tokio::test]
async fn empty_query_is_invalid_input() {
    let ranker = law_ranker(law_corpus());
    let err = ranker
        .semantic_search("   ", 10, SemanticSearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn low_similarity_corpus_falls_back_with_message() {
    // Every record is nearly orthogonal to the query
    let records = vec![
        MediaRecord::new("Gardening Tips", MediaType::Text)
            .with_embedding(vec![0.0, 0.0, 1.0]),
        MediaRecord::new("Bread Recipes", MediaType::Text)
            .with_embedding(vec![0.05, 0.0, 0.99]),
    ];
    let ranker = law_ranker(records);

    let response = ranker
        .semantic_search(QUERY, 5, SemanticSearchOptions::default())
        .await
        .unwrap();

    assert!(!response.results.is_empty(), "fallback should surface something");
    assert_eq!(response.metadata.effective_threshold, 0.0);
    assert!(response.results.iter().all(|r| !r.semantic_match));
    assert!(response.message.is_some());
}

#[tokio::test]
async fn records_without_embeddings_never_retrieved() {
    let mut records = law_corpus();
    records.push(MediaRecord::new("Unembedded Contract Notes", MediaType::Text));
    let ranker = law_ranker(records);

    let response = ranker
        .semantic_search(QUERY, 10, SemanticSearchOptions::default())
        .await
        .unwrap();

    assert!(response
        .results
        .iter()
        .all(|r| r.record.title != "Unembedded Contract Notes"));
}

#[tokio::test]
async fn find_similar_excludes_anchor() {
    let records = law_corpus();
    let anchor_id = records[0].id;
    let ranker = law_ranker(records);

    let results = ranker.find_similar(anchor_id, 10, None, None).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.record.id != anchor_id));
}

#[tokio::test]
async fn find_similar_honors_max_distance() {
    let records = law_corpus();
    let anchor_id = records[0].id;
    let ranker = law_ranker(records);

    // Nothing in the corpus sits at exactly zero distance from the anchor
    let results = ranker
        .find_similar(anchor_id, 10, Some(0.0), None)
        .await
        .unwrap();
    assert!(results.is_empty());

    let results = ranker.find_similar(anchor_id, 10, Some(2.0), None).await.unwrap();
    assert!(!results.is_empty());
}

#[tokio::test]
async fn find_similar_missing_embedding_is_typed_error() {
    let record = MediaRecord::new("No Vector", MediaType::Text);
    let id = record.id;
    let ranker = law_ranker(vec![record]);

    let err = ranker.find_similar(id, 5, None, None).await.unwrap_err();
    assert!(matches!(err, Error::MissingEmbedding(_)));
}

#[tokio::test]
async fn find_similar_unknown_id_is_not_found() {
    let ranker = law_ranker(law_corpus());
    let err = ranker
        .find_similar(uuid::Uuid::new_v4(), 5, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn fuzzy_high_min_score_rejects_unrelated_typo() {
    let records = vec![MediaRecord::new("Property Rights", MediaType::Text)];
    let config = EngineConfig::default();
    let results = field_search(
        &records,
        "contarct",
        0.9,
        &SearchField::ALL,
        config.fuzzy_word_threshold,
        config.snippet_len,
        10,
    );
    assert!(results.is_empty());
}

#[test]
fn fuzzy_finds_typo_of_present_word() {
    let records = vec![
        MediaRecord::new("Contract Law Basics", MediaType::Text),
        MediaRecord::new("Property Rights", MediaType::Text),
    ];
    let config = EngineConfig::default();
    let results = field_search(
        &records,
        "contarct",
        config.fuzzy_min_score,
        &SearchField::ALL,
        config.fuzzy_word_threshold,
        config.snippet_len,
        10,
    );
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.title, "Contract Law Basics");
}

#[tokio::test]
async fn fuzzy_search_reads_corpus_from_store() {
    let ranker = law_ranker(law_corpus());
    let matches = ranker
        .fuzzy_search("contarct", 10, None, &SearchField::ALL)
        .await
        .unwrap();

    assert!(!matches.is_empty());
    assert!(matches.iter().all(|m| m.record.title.contains("Contract")));
}

#[tokio::test]
async fn fuzzy_search_empty_query_is_invalid_input() {
    let ranker = law_ranker(law_corpus());
    let err = ranker
        .fuzzy_search("   ", 10, None, &SearchField::ALL)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

fn recommender(records: Vec<MediaRecord>, embedder: StubEmbedder) -> Recommender {
    let catalog = Arc::new(InMemoryCatalog::new(records));
    Recommender::new(
        Arc::new(embedder),
        catalog.clone(),
        catalog,
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn item_based_excludes_source_and_names_it() {
    let records = law_corpus();
    let source_id = records[0].id;
    let rec = recommender(records, StubEmbedder::new(3));

    let response = rec
        .recommend(&RecommendationRequest::for_item(source_id, 5))
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    assert!(response.results.iter().all(|r| r.record.id != source_id));
    assert!(response
        .results
        .iter()
        .all(|r| r.reason.contains("Elements of a Valid Contract")));
}

#[tokio::test]
async fn multi_item_uses_centroid_and_excludes_all_sources() {
    let records = law_corpus();
    let ids = vec![records[0].id, records[1].id];
    let rec = recommender(records, StubEmbedder::new(3));

    let response = rec
        .recommend(&RecommendationRequest::for_items(ids.clone(), 5))
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    for r in &response.results {
        assert!(!ids.contains(&r.record.id));
        assert!(r.reason.contains("combined profile of 2 items"));
    }
}

#[tokio::test]
async fn multi_item_without_any_embedding_fails() {
    let records = vec![
        MediaRecord::new("Plain A", MediaType::Text),
        MediaRecord::new("Plain B", MediaType::Text),
    ];
    let ids = vec![records[0].id, records[1].id];
    let rec = recommender(records, StubEmbedder::new(3));

    let err = rec
        .recommend(&RecommendationRequest::for_items(ids, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingEmbedding(_)));
}

#[tokio::test]
async fn content_based_requires_query() {
    let rec = recommender(law_corpus(), StubEmbedder::new(3));
    let mut request = RecommendationRequest::for_query("", 5);
    request.query = Some("  ".to_string());

    let err = rec.recommend(&request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn content_based_reason_names_query() {
    let rec = recommender(
        law_corpus(),
        StubEmbedder::new(3).with_vector("contract law", vec![1.0, 0.1, 0.0]),
    );

    let response = rec
        .recommend(&RecommendationRequest::for_query("contract law", 3))
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    assert!(response
        .results
        .iter()
        .all(|r| r.reason.contains("contract law")));
}

#[tokio::test]
async fn hybrid_combines_weighted_scores() {
    // Candidate sits at cosine 0.6 from the source item and 0.8 from the
    // query vector; with weights 0.6/0.4 the merged score is 0.68.
    let source = MediaRecord::new("Anchor", MediaType::Text).with_embedding(vec![1.0, 0.0, 0.0]);
    let candidate =
        MediaRecord::new("Bridge", MediaType::Text).with_embedding(vec![0.6, 0.8, 0.0]);
    let source_id = source.id;

    let rec = recommender(
        vec![source, candidate],
        StubEmbedder::new(3).with_vector("more like this", vec![0.0, 1.0, 0.0]),
    );

    let response = rec
        .recommend(
            &RecommendationRequest::hybrid(vec![source_id], "more like this", 5)
                .with_weights(0.6, 0.4),
        )
        .await
        .unwrap();

    assert_eq!(response.results.len(), 1);
    let result = &response.results[0];
    assert_eq!(result.record.title, "Bridge");
    assert!(
        (result.recommendation_score - 0.68).abs() < 1e-3,
        "got {}",
        result.recommendation_score
    );
    // The raw retrieval similarity survives next to the merged score:
    // the stronger signal is the content side at cosine 0.8.
    assert!(
        (result.similarity - 0.8).abs() < 1e-3,
        "got {}",
        result.similarity
    );
    assert!((result.distance - 0.2).abs() < 1e-3);
    assert!(result.reason.contains("Anchor"));
    assert!(result.reason.contains("more like this"));
}

#[tokio::test]
async fn hybrid_negative_weights_rejected() {
    let rec = recommender(law_corpus(), StubEmbedder::new(3));
    let request =
        RecommendationRequest::hybrid(vec![uuid::Uuid::new_v4()], "q", 5).with_weights(-0.1, 0.5);

    let err = rec.recommend(&request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn recommend_respects_exclude_ids() {
    let records = law_corpus();
    let source_id = records[0].id;
    let excluded_id = records[1].id;
    let rec = recommender(records, StubEmbedder::new(3));

    let response = rec
        .recommend(
            &RecommendationRequest::for_item(source_id, 5).with_excluded(vec![excluded_id]),
        )
        .await
        .unwrap();

    assert!(response.results.iter().all(|r| r.record.id != excluded_id));
}

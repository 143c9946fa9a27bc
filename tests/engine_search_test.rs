use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use linnaea::{
    CodeRecord, Collection, Embedder, EmbeddedRecord, Engine, Language, LinnaeaError,
    MemoryFetcher, Result, ResultSource, SearchRequest, codec,
};

/// Embedder returning canned vectors keyed by query text.
struct CannedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl CannedEmbedder {
    fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl Embedder for CannedEmbedder {
    fn provider_id(&self) -> &str {
        "test"
    }
    fn model_id(&self) -> &str {
        "canned"
    }
    fn dimension(&self) -> usize {
        3
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| LinnaeaError::provider(format!("no canned vector for '{text}'")))
    }
}

/// Embedder standing in for a downed provider.
struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn provider_id(&self) -> &str {
        "test"
    }
    fn model_id(&self) -> &str {
        "canned"
    }
    fn dimension(&self) -> usize {
        3
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(LinnaeaError::provider("provider is down"))
    }
}

fn make_record(
    code: &str,
    label: &str,
    description: &str,
    keywords: &[&str],
    vector: Vec<f32>,
) -> EmbeddedRecord {
    EmbeddedRecord {
        record: CodeRecord {
            code: code.to_string(),
            label: label.to_string(),
            label_alt: None,
            description: description.to_string(),
            description_alt: None,
            group_id: "01".to_string(),
            section_id: "I".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            keywords_alt: None,
        },
        vector,
    }
}

fn make_collection() -> Collection {
    Collection {
        provider_id: "test".to_string(),
        model_id: "canned".to_string(),
        dimension: 3,
        records: vec![
            make_record(
                "010121",
                "Live horses",
                "Pure-bred breeding horses",
                &["horse", "stallion"],
                vec![1.0, 0.0, 0.0],
            ),
            make_record(
                "847130",
                "Portable computers",
                "Portable automatic data processing machines",
                &["laptop", "computer"],
                vec![0.0, 1.0, 0.0],
            ),
            make_record(
                "090210",
                "Green tea",
                "Green tea in immediate packings",
                &["tea", "beverage"],
                vec![0.0, 0.0, 1.0],
            ),
        ],
    }
}

const ARTIFACT_PATH: &str = "data/test-embeddings/canned.bin";
const BASIC_PATH: &str = "data/hs-codes-basic.json";

fn basic_dataset() -> Vec<u8> {
    let body = serde_json::json!({
        "hs_codes": [
            {
                "code": "010121",
                "menu": "Live horses",
                "description": "Pure-bred breeding horses",
                "chapter": "01",
                "section": "I",
                "keywords": ["horse", "stallion"]
            },
            {
                "code": "847130",
                "menu": "Portable computers",
                "description": "Portable automatic data processing machines",
                "description_vi": "Máy xử lý dữ liệu tự động loại xách tay",
                "chapter": "84",
                "section": "XVI",
                "keywords": ["laptop", "computer"],
                "keywords_vi": ["máy tính", "laptop"]
            },
            {
                "code": "090210",
                "menu": "Green tea",
                "description": "Green tea in immediate packings",
                "chapter": "09",
                "section": "II",
                "keywords": ["tea", "beverage"]
            }
        ],
        "metadata": { "total_codes": 3, "format": "basic" }
    });
    serde_json::to_vec(&body).unwrap()
}

/// Fetcher preloaded with the binary artifact and the basic dataset.
fn make_fetcher() -> Arc<MemoryFetcher> {
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.insert(ARTIFACT_PATH, codec::encode(&make_collection()).unwrap());
    fetcher.insert(BASIC_PATH, basic_dataset());
    fetcher
}

fn laptop_embedder() -> Arc<CannedEmbedder> {
    Arc::new(CannedEmbedder::new(&[(
        "laptop computer",
        vec![0.0, 1.0, 0.0],
    )]))
}

#[tokio::test]
async fn test_vector_search_ranks_by_similarity() {
    let engine = Engine::builder(make_fetcher())
        .embedder(laptop_embedder())
        .build();

    let response = engine
        .search(SearchRequest::new("test", "canned", "laptop computer"))
        .await
        .unwrap();

    assert_eq!(response.source, ResultSource::Vector);
    assert_eq!(response.generation, Some(1));
    assert_eq!(response.results.len(), 3);

    let first = &response.results[0];
    assert_eq!(first.record.code, "847130", "exact vector match ranks first");
    assert!((first.score - 1.0).abs() < 1e-6);
    assert!(response.results.iter().all(|r| r.source == ResultSource::Vector));

    // Tied zero scores keep collection order.
    assert_eq!(response.results[1].record.code, "010121");
    assert_eq!(response.results[2].record.code, "090210");
}

#[tokio::test]
async fn test_repeated_searches_reuse_cached_collection() {
    let engine = Engine::builder(make_fetcher())
        .embedder(laptop_embedder())
        .build();

    let first = engine
        .search(SearchRequest::new("test", "canned", "laptop computer"))
        .await
        .unwrap();
    let second = engine
        .search(SearchRequest::new("test", "canned", "laptop computer"))
        .await
        .unwrap();

    assert_eq!(first.generation, Some(1));
    assert_eq!(second.generation, Some(1));
    assert_eq!(engine.store().generation(), 1);
}

#[tokio::test]
async fn test_top_k_limits_results() {
    let engine = Engine::builder(make_fetcher())
        .embedder(laptop_embedder())
        .build();

    let response = engine
        .search(SearchRequest::new("test", "canned", "laptop computer").top_k(1))
        .await
        .unwrap();

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].record.code, "847130");
}

#[tokio::test]
async fn test_provider_failure_degrades_to_keywords() {
    let engine = Engine::builder(make_fetcher())
        .embedder(Arc::new(DownEmbedder))
        .build();

    let response = engine
        .search(SearchRequest::new("test", "canned", "laptop computer"))
        .await
        .unwrap();

    assert_eq!(response.source, ResultSource::Keyword);
    assert_eq!(response.generation, None);
    assert!(!response.results.is_empty());
    assert_eq!(response.results[0].record.code, "847130");
    assert!(response.results.iter().all(|r| r.source == ResultSource::Keyword));
}

#[tokio::test]
async fn test_missing_artifacts_degrade_to_keywords() {
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.insert(BASIC_PATH, basic_dataset());
    let engine = Engine::builder(fetcher).embedder(laptop_embedder()).build();

    let response = engine
        .search(SearchRequest::new("test", "canned", "laptop computer"))
        .await
        .unwrap();

    assert_eq!(response.source, ResultSource::Keyword);
    assert_eq!(response.results[0].record.code, "847130");
}

#[tokio::test]
async fn test_unregistered_provider_degrades_to_keywords() {
    let engine = Engine::builder(make_fetcher()).build();

    let response = engine
        .search(SearchRequest::new("openai", "text-embedding-3-small", "green tea"))
        .await
        .unwrap();

    assert_eq!(response.source, ResultSource::Keyword);
    assert_eq!(response.results[0].record.code, "090210");
}

#[tokio::test]
async fn test_dimension_mismatch_is_fatal() {
    // Embedder output does not match the collection dimension; the basic
    // dataset being available must not mask the configuration bug.
    let engine = Engine::builder(make_fetcher())
        .embedder(Arc::new(CannedEmbedder::new(&[(
            "laptop computer",
            vec![0.0, 1.0],
        )])))
        .build();

    let err = engine
        .search(SearchRequest::new("test", "canned", "laptop computer"))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            LinnaeaError::DimensionMismatch {
                expected: 3,
                actual: 2,
            }
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_both_paths_failed_reports_both() {
    let engine = Engine::builder(Arc::new(MemoryFetcher::new()))
        .embedder(Arc::new(DownEmbedder))
        .build();

    let err = engine
        .search(SearchRequest::new("test", "canned", "laptop computer"))
        .await
        .unwrap_err();

    match &err {
        LinnaeaError::SearchUnavailable { vector, keyword } => {
            assert!(vector.contains("provider is down"), "vector: {vector}");
            assert!(keyword.contains("hs-codes-basic.json"), "keyword: {keyword}");
        }
        other => panic!("expected SearchUnavailable, got {other:?}"),
    }
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_no_matches_is_empty_not_error() {
    let engine = Engine::builder(make_fetcher())
        .embedder(Arc::new(DownEmbedder))
        .build();

    let response = engine
        .search(SearchRequest::new("test", "canned", "quantum flux capacitor"))
        .await
        .unwrap();

    assert_eq!(response.source, ResultSource::Keyword);
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_alt_language_keyword_search() {
    let engine = Engine::builder(make_fetcher())
        .embedder(Arc::new(DownEmbedder))
        .build();

    let response = engine
        .search(
            SearchRequest::new("test", "canned", "máy tính xách tay").language(Language::Alt),
        )
        .await
        .unwrap();

    assert_eq!(response.source, ResultSource::Keyword);
    assert_eq!(response.results[0].record.code, "847130");
}

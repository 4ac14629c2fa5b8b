use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use index::{IndexRequest, IndexResponse, QueryKind, RawHit};
use prodsearch::{
    EmbeddingBackend, EmbeddingProvider, Filters, InMemoryIndex, IndexError, PipelineConfig,
    QueryParser, SearchError, SearchIndex, SearchOrchestrator, SearchTier, SemanticConfig,
    SemanticError,
};
use serde_json::{Value, json};

fn catalog() -> InMemoryIndex {
    InMemoryIndex::from_documents(vec![
        json!({
            "id": "shoe-40", "title": "Canvas Running Shoes", "description": "Budget trainer",
            "embeddings": [1.0, 0.0, 0.0, 0.0],
            "metadata": { "categories": "Shoes", "brand": "Nike", "final_price": 40.0 }
        }),
        json!({
            "id": "shoe-60", "title": "Trail Running Shoes", "description": "Grippy outsole",
            "embeddings": [0.8, 0.2, 0.0, 0.0],
            "metadata": { "categories": "Shoes", "brand": "Nike", "final_price": 60.0 }
        }),
        json!({
            "id": "shoe-adidas", "title": "Road Running Shoes", "description": "Light",
            "embeddings": [0.7, 0.3, 0.0, 0.0],
            "metadata": { "categories": "Shoes", "brand": "Adidas", "final_price": 90.0 }
        }),
        json!({
            "id": "laptop-1", "title": "Gaming Laptop", "description": "Fast GPU laptop",
            "embeddings": [0.0, 0.0, 1.0, 0.0],
            "metadata": { "categories": "Computers", "brand": "Dell", "final_price": 1500.0 }
        }),
        json!({
            "id": "laptop-2", "title": "Laptop Stand", "description": "Aluminium",
            "embeddings": [0.0, 0.0, 0.9, 0.1],
            "metadata": { "categories": "Accessories", "brand": "Acme", "final_price": 30.0 }
        }),
    ])
}

fn config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.semantic.dimension = 4;
    cfg
}

/// Fails the request kinds it is told to fail and records every request.
struct FlakyIndex {
    inner: InMemoryIndex,
    fail_knn: bool,
    fail_lexical: bool,
    fail_count: bool,
    seen: Mutex<Vec<IndexRequest>>,
}

impl FlakyIndex {
    fn new(fail_knn: bool, fail_lexical: bool, fail_count: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: catalog(),
            fail_knn,
            fail_lexical,
            fail_count,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<IndexRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchIndex for FlakyIndex {
    async fn query(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError> {
        self.seen.lock().unwrap().push(request.clone());
        let is_count = request.size == 0 && request.track_total_hits;
        match &request.query {
            QueryKind::Knn(_) if self.fail_knn => Err(IndexError::backend("knn circuit open")),
            QueryKind::Lexical(_) if is_count && self.fail_count => Err(IndexError::backend("count timed out")),
            QueryKind::Lexical(_) if !is_count && self.fail_lexical => {
                Err(IndexError::backend("cluster unavailable"))
            }
            _ => self.inner.query(request).await,
        }
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Always answers with the same vector, remembering the text it was asked for.
struct FixedEmbedding {
    vector: Vec<f32>,
    asked: Mutex<Vec<String>>,
}

#[async_trait]
impl EmbeddingBackend for FixedEmbedding {
    async fn invoke(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        self.asked.lock().unwrap().push(text.to_string());
        Ok(self.vector.clone())
    }
}

fn ids(result: &prodsearch::SearchResult) -> Vec<&str> {
    result.hits.iter().map(|hit| hit.id.as_str()).collect()
}

#[test]
fn scenario_a_brand_from_text() {
    let parsed = QueryParser::new().parse("running shoes from Nike", None);
    assert_eq!(parsed.cleaned_query, "running shoes");
    assert_eq!(parsed.filters, Filters::new().with_brand("Nike"));
}

#[test]
fn scenario_b_brand_and_category_from_text() {
    let parsed = QueryParser::new().parse("shoes in category footwear and brand Nike", None);
    assert_eq!(parsed.cleaned_query, "shoes");
    assert_eq!(parsed.filters.brand(), Some("Nike"));
    assert_eq!(parsed.filters.category(), Some("footwear"));
}

#[tokio::test]
async fn scenario_c_vector_failure_falls_back_to_lexical() {
    let index = FlakyIndex::new(true, false, false);
    let orchestrator = SearchOrchestrator::with_index(&config(), index.clone()).unwrap();

    let result = orchestrator.search("laptop", 10, 0, None).await.unwrap();

    assert_eq!(result.tier, SearchTier::Lexical);
    assert_eq!(ids(&result), vec!["laptop-1", "laptop-2"]);
    assert_eq!(result.total, 2);
    assert_eq!((result.limit, result.offset), (10, 0));

    let seen = index.seen();
    assert_eq!(seen.len(), 3, "knn, lexical, count");
    assert!(matches!(seen[0].query, QueryKind::Knn(_)));
    assert!(matches!(seen[1].query, QueryKind::Lexical(_)));
    assert_eq!(seen[2].size, 0);
}

#[tokio::test]
async fn scenario_d_blank_query_embeds_to_random_vectors() {
    let provider = EmbeddingProvider::from_config(&SemanticConfig {
        dimension: 64,
        ..SemanticConfig::default()
    })
    .unwrap();

    let first = provider.embed("").await;
    let second = provider.embed("").await;
    assert_eq!(first.dimension(), 64);
    assert_eq!(second.dimension(), 64);
    assert_ne!(first.vector, second.vector);
}

#[tokio::test]
async fn fallback_embeddings_are_deterministic() {
    let provider = EmbeddingProvider::from_config(&SemanticConfig::default()).unwrap();
    assert_eq!(provider.embed("laptop").await.vector, provider.embed("laptop").await.vector);
    assert_eq!(provider.embed("Laptop ").await.vector, provider.embed("laptop").await.vector);
}

#[tokio::test]
async fn filter_conjunction_is_a_hard_constraint() {
    let orchestrator = SearchOrchestrator::with_index(&config(), Arc::new(catalog())).unwrap();
    let filters = Filters::new().with_category("Shoes").with_price_min(50.0);

    let result = orchestrator.search("running shoes", 10, 0, Some(&filters)).await.unwrap();

    assert!(!ids(&result).contains(&"shoe-40"));
    assert!(ids(&result).contains(&"shoe-60"));
    assert!(result.hits.iter().all(|hit| hit.price >= 50.0));
    assert!(result.hits.iter().all(|hit| hit.category.as_deref() == Some("Shoes")));
}

#[tokio::test]
async fn live_vector_tier_ranks_by_similarity() {
    let backend = Arc::new(FixedEmbedding {
        vector: vec![0.0, 0.0, 1.0, 0.0],
        asked: Mutex::new(Vec::new()),
    });
    let cfg = config();
    let provider = EmbeddingProvider::with_backend(backend.clone(), &cfg.semantic).unwrap();
    let orchestrator = SearchOrchestrator::with_components(&cfg, Arc::new(catalog()), provider);

    let result = orchestrator.search("gaming laptop by Dell", 2, 0, None).await.unwrap();

    assert_eq!(result.tier, SearchTier::Vector);
    assert_eq!(ids(&result), vec!["laptop-1"]);
    assert_eq!(backend.asked.lock().unwrap().as_slice(), ["gaming laptop"]);
}

#[tokio::test]
async fn explicit_filters_win_over_text() {
    let orchestrator = SearchOrchestrator::with_index(&config(), Arc::new(catalog())).unwrap();
    let filters = Filters::new().with_brand("Adidas");

    let result = orchestrator
        .search("running shoes from Nike", 10, 0, Some(&filters))
        .await
        .unwrap();

    assert!(!result.hits.is_empty());
    assert!(result.hits.iter().all(|hit| hit.brand.as_deref() == Some("Adidas")));
}

#[tokio::test]
async fn paging_is_identical_across_tiers() {
    let index = FlakyIndex::new(true, false, false);
    let orchestrator = SearchOrchestrator::with_index(&config(), index.clone()).unwrap();

    let result = orchestrator.search("running shoes", 1, 1, None).await.unwrap();
    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.total, 3);

    let seen = index.seen();
    assert_eq!((seen[0].size, seen[0].from), (seen[1].size, seen[1].from));
    assert_eq!(seen[0].source, seen[1].source);
}

#[tokio::test]
async fn lexical_failure_is_fatal() {
    let orchestrator =
        SearchOrchestrator::with_index(&config(), FlakyIndex::new(true, true, false)).unwrap();

    let err = orchestrator.search("laptop", 10, 0, None).await.unwrap_err();
    let SearchError::Retrieval(inner) = err;
    assert!(inner.to_string().contains("cluster unavailable"));
}

#[tokio::test]
async fn count_failure_reports_zero_total() {
    let orchestrator =
        SearchOrchestrator::with_index(&config(), FlakyIndex::new(true, false, true)).unwrap();

    let result = orchestrator.search("laptop", 10, 0, None).await.unwrap();
    assert_eq!(result.total, 0);
    assert_eq!(result.hits.len(), 2);
}

#[tokio::test]
async fn no_match_is_empty_not_an_error() {
    let orchestrator =
        SearchOrchestrator::with_index(&config(), FlakyIndex::new(true, false, false)).unwrap();

    let result = orchestrator.search("submarine", 10, 0, None).await.unwrap();
    assert!(result.hits.is_empty());
    assert_eq!(result.total, 0);
}

/// Returns a fixed page regardless of the request.
struct FixedPage(Vec<RawHit>);

#[async_trait]
impl SearchIndex for FixedPage {
    async fn query(&self, _request: &IndexRequest) -> Result<IndexResponse, IndexError> {
        Ok(IndexResponse {
            hits: self.0.clone(),
            total: self.0.len() as u64,
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[tokio::test]
async fn malformed_hits_are_skipped_and_counted() {
    let raw = |id: Option<&str>, source: Value| RawHit {
        id: id.map(str::to_string),
        score: Some(1.0),
        source,
    };
    let page = FixedPage(vec![
        raw(Some("a"), json!({ "id": "p1", "title": "Mug" })),
        raw(Some("b"), json!("not a document")),
        raw(None, json!({ "title": "no id anywhere" })),
        raw(Some("d"), json!({ "asin": "B00MUG", "name": "Legacy Mug", "price": "12.5" })),
    ]);
    let orchestrator = SearchOrchestrator::with_index(&config(), Arc::new(page)).unwrap();

    let result = orchestrator.search("mug", 10, 0, None).await.unwrap();

    assert_eq!(ids(&result), vec!["p1", "B00MUG"]);
    assert_eq!(result.skipped, 2);
    assert_eq!(result.hits[1].price, 12.5);
}

#[tokio::test]
async fn repeated_searches_return_the_same_page() {
    let orchestrator = SearchOrchestrator::with_index(&config(), Arc::new(catalog())).unwrap();

    let first = orchestrator.search("running shoes", 10, 0, None).await.unwrap();
    let second = orchestrator.search("running shoes", 10, 0, None).await.unwrap();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.tier, SearchTier::Vector);
}

#[tokio::test]
async fn legacy_documents_keep_their_fields_through_the_pipeline() {
    let index = InMemoryIndex::from_documents(vec![json!({
        "asin": "B00X", "name": "Legacy Mug", "price": 19.5, "brand": "Acme",
        "category": "Kitchen", "imageUrl": "https://img/mug.jpg",
        "embeddings": [0.0, 0.0, 0.0, 1.0]
    })]);
    let orchestrator = SearchOrchestrator::with_index(&config(), Arc::new(index)).unwrap();

    let result = orchestrator.search("mug", 10, 0, None).await.unwrap();

    assert_eq!(result.tier, SearchTier::Vector);
    assert_eq!(result.skipped, 0);
    let hit = &result.hits[0];
    assert_eq!(hit.id, "B00X");
    assert_eq!(hit.name, "Legacy Mug");
    assert_eq!(hit.price, 19.5);
    assert_eq!(hit.brand.as_deref(), Some("Acme"));
    assert_eq!(hit.category.as_deref(), Some("Kitchen"));
    assert_eq!(hit.image_url.as_deref(), Some("https://img/mug.jpg"));
}

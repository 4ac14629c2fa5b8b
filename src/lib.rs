//! Workspace umbrella crate for hybrid product search.
//!
//! This crate stitches query understanding, query embeddings, and hybrid
//! retrieval together so callers can go from a shopper's free text to a page of
//! normalized products with a single API entry point:
//!
//! ```
//! use prodsearch::{InMemoryIndex, PipelineConfig, SearchOrchestrator};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let catalog = InMemoryIndex::from_documents(vec![json!({
//!     "id": "p1",
//!     "title": "Trail Running Shoes",
//!     "metadata": { "brand": "Nike", "categories": "Shoes", "final_price": 120.0 }
//! })]);
//!
//! let orchestrator = SearchOrchestrator::with_index(&PipelineConfig::default(), Arc::new(catalog)).unwrap();
//! let result = orchestrator.search("running shoes from Nike", 10, 0, None).await.unwrap();
//!
//! // The in-memory catalog has no vectors, so the lexical tier answers.
//! assert_eq!(result.hits[0].id, "p1");
//! assert_eq!(result.total, 1);
//! # }
//! ```

pub mod config;

pub use config::{ConfigLoadError, IndexYamlConfig, PipelineConfig, SearchYamlConfig};
pub use index::{
    BackendConfig, ElasticConfig, ElasticsearchIndex, FieldMapping, HybridSearchExecutor,
    InMemoryIndex, IndexError, ResultNormalizer, SearchHit, SearchIndex, SearchTier,
};
pub use query::{Filters, ParsedQuery, QueryParser};
pub use semantic::{EmbeddingBackend, EmbeddingProvider, SemanticConfig, SemanticError};

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while answering a search request.
///
/// Embedding and count failures degrade instead of erroring, so the only
/// fatal path is the retrieval chain running out of tiers.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),
}

/// Metrics observer for pipeline stages.
pub trait SearchMetrics: Send + Sync {
    /// Hit retrieval. On failure `tier` is the last tier attempted.
    fn record_retrieval(&self, tier: SearchTier, latency: Duration, ok: bool);
    fn record_count(&self, latency: Duration, ok: bool);
    /// The whole request, parse to assembled result.
    fn record_request(&self, latency: Duration, ok: bool);
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    /// Lexical/filter match count across all pages; 0 if counting failed.
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
    pub elapsed_ms: u64,
    /// Tier that served `hits`.
    pub tier: SearchTier,
    /// Hits dropped because their documents couldn't be normalized.
    pub skipped: usize,
}

struct MetricsSpan {
    recorder: Arc<dyn SearchMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start(recorder: &Option<Arc<dyn SearchMetrics>>) -> Option<Self> {
        recorder.as_ref().map(|recorder| Self {
            recorder: Arc::clone(recorder),
            start: Instant::now(),
        })
    }

    fn record_retrieval(self, tier: SearchTier, ok: bool) {
        self.recorder.record_retrieval(tier, self.start.elapsed(), ok);
    }

    fn record_count(self, ok: bool) {
        self.recorder.record_count(self.start.elapsed(), ok);
    }

    fn record_request(self, ok: bool) {
        self.recorder.record_request(self.start.elapsed(), ok);
    }
}

/// Parse, retrieve, count, normalize.
///
/// Every collaborator is read-only after construction, so one orchestrator
/// can be shared behind an `Arc` by any number of concurrent requests.
pub struct SearchOrchestrator {
    parser: QueryParser,
    executor: HybridSearchExecutor,
    normalizer: ResultNormalizer,
    metrics: Option<Arc<dyn SearchMetrics>>,
}

impl SearchOrchestrator {
    pub fn new(
        parser: QueryParser,
        executor: HybridSearchExecutor,
        normalizer: ResultNormalizer,
    ) -> Self {
        Self {
            parser,
            executor,
            normalizer,
            metrics: None,
        }
    }

    /// Build every stage from `cfg`, including the configured backend.
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self, ConfigLoadError> {
        let index = cfg.index.backend.build()?;
        Self::with_index(cfg, index)
    }

    /// Build from `cfg` but search `index` instead of the configured backend.
    pub fn with_index(
        cfg: &PipelineConfig,
        index: Arc<dyn SearchIndex>,
    ) -> Result<Self, ConfigLoadError> {
        let embeddings = EmbeddingProvider::from_config(&cfg.semantic)?;
        Ok(Self::with_components(cfg, index, embeddings))
    }

    /// Build from `cfg` with caller-supplied index and embedding provider.
    pub fn with_components(
        cfg: &PipelineConfig,
        index: Arc<dyn SearchIndex>,
        embeddings: EmbeddingProvider,
    ) -> Self {
        let fields = cfg.index.fields.clone();
        let normalizer = ResultNormalizer::new(&fields);
        let executor = HybridSearchExecutor::new(index, Arc::new(embeddings), fields);
        Self::new(QueryParser::new(), executor, normalizer)
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn executor(&self) -> &HybridSearchExecutor {
        &self.executor
    }

    /// Readiness of the underlying search backend.
    pub async fn ping(&self) -> Result<(), IndexError> {
        self.executor.index().ping().await
    }

    /// Answer `raw_query` with one page of normalized products.
    ///
    /// `filters` are explicit request filters; they win over brand/category
    /// phrases found in the text. The total comes from a lexical count with
    /// the same cleaned query and merged filters.
    pub async fn search(
        &self,
        raw_query: &str,
        limit: usize,
        offset: usize,
        filters: Option<&Filters>,
    ) -> Result<SearchResult, SearchError> {
        let started = Instant::now();
        let request_span = MetricsSpan::start(&self.metrics);

        let result = self.run(raw_query, limit, offset, filters, started).await;
        if let Some(span) = request_span {
            span.record_request(result.is_ok());
        }
        result
    }

    async fn run(
        &self,
        raw_query: &str,
        limit: usize,
        offset: usize,
        filters: Option<&Filters>,
        started: Instant,
    ) -> Result<SearchResult, SearchError> {
        let parsed = self.parser.parse(raw_query, filters);
        debug!(
            cleaned = %parsed.cleaned_query,
            brand = parsed.filters.brand(),
            category = parsed.filters.category(),
            "query parsed"
        );
        let merged = Some(&parsed.filters);

        let retrieval_span = MetricsSpan::start(&self.metrics);
        let outcome = match self
            .executor
            .search(&parsed.cleaned_query, limit, offset, merged)
            .await
        {
            Ok(outcome) => {
                if let Some(span) = retrieval_span {
                    span.record_retrieval(outcome.tier, true);
                }
                outcome
            }
            Err(err) => {
                if let Some(span) = retrieval_span {
                    span.record_retrieval(SearchTier::Lexical, false);
                }
                return Err(SearchError::Retrieval(err));
            }
        };

        let count_span = MetricsSpan::start(&self.metrics);
        let total = match self.executor.try_count(&parsed.cleaned_query, merged).await {
            Ok(total) => {
                if let Some(span) = count_span {
                    span.record_count(true);
                }
                total
            }
            Err(err) => {
                warn!(error = %err, "count query failed, reporting 0");
                if let Some(span) = count_span {
                    span.record_count(false);
                }
                0
            }
        };

        let batch = self.normalizer.normalize_batch(outcome.hits);
        if batch.skipped > 0 {
            warn!(skipped = batch.skipped, "dropped malformed hits");
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            tier = outcome.tier.as_str(),
            hits = batch.hits.len(),
            total,
            elapsed_ms,
            "search finished"
        );

        Ok(SearchResult {
            hits: batch.hits,
            total,
            limit,
            offset,
            elapsed_ms,
            tier: outcome.tier,
            skipped: batch.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMetrics {
        events: Mutex<Vec<(&'static str, bool)>>,
    }

    impl SearchMetrics for RecordingMetrics {
        fn record_retrieval(&self, tier: SearchTier, _latency: Duration, ok: bool) {
            self.events.lock().unwrap().push((tier.as_str(), ok));
        }

        fn record_count(&self, _latency: Duration, ok: bool) {
            self.events.lock().unwrap().push(("count", ok));
        }

        fn record_request(&self, _latency: Duration, ok: bool) {
            self.events.lock().unwrap().push(("request", ok));
        }
    }

    fn orchestrator() -> SearchOrchestrator {
        let catalog = InMemoryIndex::from_documents(vec![
            json!({ "id": "p1", "title": "Laptop Pro", "description": "Fast",
                    "metadata": { "brand": "Acme", "categories": "Computers", "final_price": 999.0 } }),
            json!({ "id": "p2", "title": "Laptop Sleeve",
                    "metadata": { "brand": "Other", "categories": "Accessories", "final_price": 25.0 } }),
            json!({ "title": "missing id" }),
        ]);
        SearchOrchestrator::with_index(&PipelineConfig::default(), Arc::new(catalog)).unwrap()
    }

    #[tokio::test]
    async fn echoes_paging_and_reports_tier() {
        let result = orchestrator().search("laptop", 1, 1, None).await.unwrap();

        assert_eq!(result.limit, 1);
        assert_eq!(result.offset, 1);
        assert_eq!(result.total, 2);
        assert_eq!(result.tier, SearchTier::Lexical);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].id, "p2");
    }

    #[tokio::test]
    async fn text_filters_reach_retrieval_and_count() {
        let result = orchestrator().search("laptop by Acme", 10, 0, None).await.unwrap();

        let ids: Vec<_> = result.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
        assert_eq!(result.total, 1);
    }

    #[tokio::test]
    async fn metrics_see_every_stage() {
        let metrics = Arc::new(RecordingMetrics::default());
        let orchestrator = orchestrator().with_metrics(metrics.clone());

        orchestrator.search("laptop", 10, 0, None).await.unwrap();

        let events = metrics.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![("lexical", true), ("count", true), ("request", true)]
        );
    }
}

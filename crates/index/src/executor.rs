use query::Filters;
use semantic::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    Constraint, FieldMapping, FilterBuilder, IndexError, IndexRequest, IndexResponse,
    LexicalQuerySpec, RawHit, SearchIndex, VectorQuerySpec,
};

/// Which retrieval tier produced a page of hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    Vector,
    Lexical,
}

impl SearchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTier::Vector => "vector",
            SearchTier::Lexical => "lexical",
        }
    }
}

impl fmt::Display for SearchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub hits: Vec<RawHit>,
    pub tier: SearchTier,
    /// Total reported by the tier that answered. For KNN this is bounded by `k`.
    pub tier_total: u64,
}

/// Vector-first retrieval with a lexical fallback.
///
/// Both tiers apply the same compiled filter as a hard constraint, page with the
/// same `size`/`from`, and project the same `_source` fields.
pub struct HybridSearchExecutor {
    index: Arc<dyn SearchIndex>,
    embeddings: Arc<EmbeddingProvider>,
    filters: FilterBuilder,
    fields: FieldMapping,
}

impl HybridSearchExecutor {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        embeddings: Arc<EmbeddingProvider>,
        fields: FieldMapping,
    ) -> Self {
        Self {
            index,
            embeddings,
            filters: FilterBuilder::new(&fields),
            fields,
        }
    }

    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    pub fn filter_builder(&self) -> &FilterBuilder {
        &self.filters
    }

    /// Embed `query` and run KNN over the vector field.
    pub async fn vector_attempt(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        constraint: &Constraint,
    ) -> Result<IndexResponse, IndexError> {
        let embedding = self.embeddings.embed(query).await;
        debug!(
            source = embedding.source.as_str(),
            dimension = embedding.dimension(),
            "query embedded"
        );
        let spec = VectorQuerySpec::for_page(
            self.fields.vector.as_str(),
            embedding.vector,
            limit,
            offset,
            constraint.clone(),
        )?;
        let request = IndexRequest::knn(spec, limit, offset, self.fields.projection());
        self.index.query(&request).await
    }

    /// `multi_match` over title and description, AND the constraint.
    pub async fn lexical_attempt(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        constraint: &Constraint,
    ) -> Result<IndexResponse, IndexError> {
        let request = IndexRequest::lexical(
            self.lexical_spec(query, constraint),
            limit,
            offset,
            self.fields.projection(),
        );
        self.index.query(&request).await
    }

    /// Vector tier, then the lexical tier if (and only if) the vector tier errors.
    /// A lexical failure is final.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        filters: Option<&Filters>,
    ) -> Result<SearchOutcome, IndexError> {
        let constraint = self.filters.compile(filters);

        let (response, tier) = match self.vector_attempt(query, limit, offset, &constraint).await {
            Ok(response) => (response, SearchTier::Vector),
            Err(err) => {
                warn!(error = %err, backend = self.index.name(), "vector search failed, falling back to lexical");
                let response = self.lexical_attempt(query, limit, offset, &constraint).await?;
                (response, SearchTier::Lexical)
            }
        };

        debug!(tier = tier.as_str(), hits = response.hits.len(), "retrieval finished");
        Ok(SearchOutcome {
            hits: response.hits,
            tier,
            tier_total: response.total,
        })
    }

    /// Total lexical/filter matches for the query, with failures surfaced.
    pub async fn try_count(&self, query: &str, filters: Option<&Filters>) -> Result<u64, IndexError> {
        let constraint = self.filters.compile(filters);
        let request = IndexRequest::count(self.lexical_spec(query, &constraint));
        Ok(self.index.query(&request).await?.total)
    }

    /// Total lexical/filter matches for the query. Failures count as zero.
    pub async fn count(&self, query: &str, filters: Option<&Filters>) -> u64 {
        match self.try_count(query, filters).await {
            Ok(total) => total,
            Err(err) => {
                warn!(error = %err, backend = self.index.name(), "count query failed, reporting 0");
                0
            }
        }
    }

    fn lexical_spec(&self, query: &str, constraint: &Constraint) -> LexicalQuerySpec {
        LexicalQuerySpec::new(query, self.fields.lexical_fields(), constraint.clone())
    }
}

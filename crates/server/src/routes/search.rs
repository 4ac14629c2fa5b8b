use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prodsearch::{Filters, SearchHit, SearchResult, SearchYamlConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /api/search/semantic`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,

    /// Page size; defaults to the configured `default_limit`
    #[serde(default)]
    pub limit: Option<i64>,

    #[serde(default)]
    pub offset: Option<i64>,

    #[serde(default)]
    pub filters: Option<Filters>,
}

/// Query string of `GET /api/search/semantic`, filters flattened
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price_min: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
}

impl From<SearchParams> for SearchRequest {
    fn from(params: SearchParams) -> Self {
        let filters = Filters {
            category: params.category,
            brand: params.brand,
            price_min: params.price_min,
            price_max: params.price_max,
        };
        Self {
            query: params.query,
            limit: params.limit,
            offset: params.offset,
            filters: (!filters.is_empty()).then_some(filters),
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSearch {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
    pub filters: Option<Filters>,
}

impl SearchRequest {
    pub fn validate(self, limits: &SearchYamlConfig) -> ServerResult<ValidSearch> {
        let query = self
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ServerError::BadRequest("query is required".into()))?;

        let limit = match self.limit {
            None => limits.default_limit,
            Some(limit) => usize::try_from(limit)
                .ok()
                .filter(|l| (1..=limits.max_limit).contains(l))
                .ok_or_else(|| {
                    ServerError::BadRequest(format!(
                        "limit must be between 1 and {}",
                        limits.max_limit
                    ))
                })?,
        };

        let offset = match self.offset {
            None => 0,
            Some(offset) => usize::try_from(offset)
                .map_err(|_| ServerError::BadRequest("offset must be >= 0".into()))?,
        };

        if let Some(filters) = &self.filters {
            validate_prices(filters)?;
        }

        Ok(ValidSearch {
            query,
            limit,
            offset,
            filters: self.filters,
        })
    }
}

fn validate_prices(filters: &Filters) -> ServerResult<()> {
    for (name, bound) in [("priceMin", filters.price_min), ("priceMax", filters.price_max)] {
        if let Some(value) = bound {
            if !value.is_finite() || value < 0.0 {
                return Err(ServerError::BadRequest(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
    }
    if let (Some(min), Some(max)) = (filters.price_min, filters.price_max) {
        if min > max {
            return Err(ServerError::BadRequest(
                "priceMin must not exceed priceMax".into(),
            ));
        }
    }
    Ok(())
}

/// Response body for both search routes
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub products: Vec<SearchHit>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
    pub processing_time_ms: u64,
}

impl From<SearchResult> for SearchResponse {
    fn from(result: SearchResult) -> Self {
        Self {
            products: result.hits,
            total: result.total,
            limit: result.limit,
            offset: result.offset,
            processing_time_ms: result.elapsed_ms,
        }
    }
}

/// `POST /api/search/semantic`
pub async fn search_post(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> ServerResult<Response> {
    let Json(request) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    run_search(&state, request).await
}

/// `GET /api/search/semantic?query=..&limit=..&offset=..`
pub async fn search_get(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ServerResult<Response> {
    let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    run_search(&state, params.into()).await
}

async fn run_search(state: &ServerState, request: SearchRequest) -> ServerResult<Response> {
    let search = request.validate(&state.limits)?;
    tracing::debug!(
        query = %search.query,
        limit = search.limit,
        offset = search.offset,
        "search request"
    );

    let result = state
        .orchestrator
        .search(&search.query, search.limit, search.offset, search.filters.as_ref())
        .await?;

    let tier = result.tier;
    if result.skipped > 0 {
        tracing::warn!(skipped = result.skipped, "search response omits malformed hits");
    }

    let mut response = Json(SearchResponse::from(result)).into_response();
    response
        .headers_mut()
        .insert("x-search-tier", HeaderValue::from_static(tier.as_str()));
    Ok(response)
}

//! Elasticsearch REST backend.
//!
//! Talks to `POST {endpoint}/{index}/_search` directly with `reqwest`; the request
//! body comes from [`IndexRequest::to_body`](crate::IndexRequest::to_body).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ElasticConfig, IndexResponse, RawHit, SearchIndex};
use crate::{IndexError, IndexRequest};

pub struct ElasticsearchIndex {
    client: reqwest::Client,
    search_url: String,
    index_url: String,
    api_key: Option<String>,
}

impl ElasticsearchIndex {
    pub fn new(cfg: &ElasticConfig) -> Result<Self, IndexError> {
        let endpoint = cfg.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(IndexError::Config("elasticsearch endpoint is empty".into()));
        }
        if cfg.index.trim().is_empty() {
            return Err(IndexError::Config("elasticsearch index name is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(IndexError::backend)?;

        let index_url = format!("{endpoint}/{}", cfg.index.trim());
        Ok(Self {
            client,
            search_url: format!("{index_url}/_search"),
            index_url,
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(reqwest::header::AUTHORIZATION, format!("ApiKey {key}")),
            None => request,
        }
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn query(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError> {
        let body = request.to_body();
        debug!(url = %self.search_url, size = request.size, from = request.from, "sending search request");

        let response = self
            .authorize(self.client.post(&self.search_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponseBody = response
            .json()
            .await
            .map_err(|e| IndexError::MalformedResponse(e.to_string()))?;
        Ok(parsed.into())
    }

    async fn ping(&self) -> Result<(), IndexError> {
        let response = self.authorize(self.client.head(&self.index_url)).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(IndexError::Http {
                status: response.status().as_u16(),
                body: String::new(),
            })
        }
    }

    fn name(&self) -> &str {
        "elasticsearch"
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<HitBody>,
}

/// `{"value": n, "relation": ..}` on 7.x+, a bare number on older clusters.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct HitBody {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
}

impl From<SearchResponseBody> for IndexResponse {
    fn from(body: SearchResponseBody) -> Self {
        let hits: Vec<RawHit> = body
            .hits
            .hits
            .into_iter()
            .map(|hit| RawHit {
                id: hit.id,
                score: hit.score,
                source: hit.source,
            })
            .collect();
        let total = match body.hits.total {
            Some(TotalHits::Object { value }) | Some(TotalHits::Count(value)) => value,
            None => hits.len() as u64,
        };
        IndexResponse { hits, total }
    }
}

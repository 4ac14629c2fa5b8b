//! In-memory search backend for tests, demos, and small catalogs.
//!
//! Behaves like a single-shard cluster: KNN uses cosine similarity scored as
//! `(1 + cos) / 2`, lexical search is a `best_fields` style term-overlap score, and
//! filters go through [`Constraint::matches`](crate::Constraint::matches). Asking
//! for KNN on a field no document has is an error, just as it is on a real cluster
//! without the vector mapping.

use async_trait::async_trait;
use hashbrown::HashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::RwLock;
use tracing::debug;

use super::{IndexResponse, RawHit, SearchIndex};
use crate::doc::{lookup, project, tokens};
use crate::fields::split_boost;
use crate::request::{LexicalQuerySpec, QueryKind, VectorQuerySpec};
use crate::{IndexError, IndexRequest};

#[derive(Default)]
pub struct InMemoryIndex {
    docs: RwLock<HashMap<String, Value>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents keyed by their top-level `id` (or `asin`). Documents without
    /// either get a positional id.
    pub fn from_documents(documents: impl IntoIterator<Item = Value>) -> Self {
        let index = Self::new();
        for (pos, doc) in documents.into_iter().enumerate() {
            let id = ["id", "asin"]
                .iter()
                .find_map(|key| doc.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| format!("doc-{pos}"));
            index.insert(id, doc);
        }
        index
    }

    /// Load a JSON array of documents, or one JSON document per line.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| IndexError::Config(format!("failed to read {}: {e}", path.display())))?;

        let documents: Vec<Value> = if raw.trim_start().starts_with('[') {
            serde_json::from_str(&raw)
                .map_err(|e| IndexError::Config(format!("invalid JSON in {}: {e}", path.display())))?
        } else {
            raw.lines()
                .filter(|line| !line.trim().is_empty())
                .map(serde_json::from_str)
                .collect::<Result<_, _>>()
                .map_err(|e| IndexError::Config(format!("invalid NDJSON in {}: {e}", path.display())))?
        };

        debug!(path = %path.display(), documents = documents.len(), "loaded in-memory catalog");
        Ok(Self::from_documents(documents))
    }

    pub fn insert(&self, id: impl Into<String>, doc: Value) {
        // A poisoned lock only means a writer panicked mid-insert; the map is still usable.
        let mut guard = self.docs.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(id.into(), doc);
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn knn(
        docs: &HashMap<String, Value>,
        spec: &VectorQuerySpec,
    ) -> Result<Vec<(String, f64)>, IndexError> {
        let mut saw_field = false;
        let mut scored = Vec::new();

        for (id, doc) in docs {
            let Some(stored) = lookup(doc, spec.field()).and_then(as_vector) else {
                continue;
            };
            saw_field = true;
            if stored.len() != spec.vector().len() {
                return Err(IndexError::invalid_query(format!(
                    "query vector has {} dimensions but field [{}] has {}",
                    spec.vector().len(),
                    spec.field(),
                    stored.len()
                )));
            }
            if spec.filter().matches(doc) {
                let cos = cosine_similarity(spec.vector(), &stored);
                scored.push((id.clone(), (1.0 + cos) / 2.0));
            }
        }

        if !saw_field && !docs.is_empty() {
            return Err(IndexError::invalid_query(format!(
                "field [{}] is not a dense_vector field",
                spec.field()
            )));
        }

        sort_by_score(&mut scored);
        scored.truncate(spec.k());
        Ok(scored)
    }

    fn lexical(docs: &HashMap<String, Value>, spec: &LexicalQuerySpec) -> Vec<(String, f64)> {
        let query_tokens = spec.text().map(tokens);
        let mut scored: Vec<(String, f64)> = docs
            .iter()
            .filter(|(_, doc)| spec.filter().matches(doc))
            .filter_map(|(id, doc)| {
                let score = match &query_tokens {
                    None => 1.0,
                    Some(wanted) => best_field_score(doc, spec.fields(), wanted),
                };
                (score > 0.0).then(|| (id.clone(), score))
            })
            .collect();
        sort_by_score(&mut scored);
        scored
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn query(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;

        let ranked = match &request.query {
            QueryKind::Knn(spec) => Self::knn(&docs, spec)?,
            QueryKind::Lexical(spec) => Self::lexical(&docs, spec),
        };

        let total = ranked.len() as u64;
        let hits = ranked
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .filter_map(|(id, score)| {
                docs.get(&id).map(|doc| RawHit {
                    source: project(doc, &request.source),
                    id: Some(id),
                    score: Some(score),
                })
            })
            .collect();

        Ok(IndexResponse { hits, total })
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

fn as_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0f64, 0f64, 0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Highest per-field score, where a field scores `boost * matched query tokens`.
fn best_field_score(doc: &Value, fields: &[String], wanted: &[String]) -> f64 {
    fields
        .iter()
        .map(|spec| {
            let (field, boost) = split_boost(spec);
            let field_tokens = lookup(doc, field)
                .and_then(Value::as_str)
                .map(tokens)
                .unwrap_or_default();
            let matched = wanted.iter().filter(|t| field_tokens.contains(t)).count();
            f64::from(boost) * matched as f64
        })
        .fold(0.0, f64::max)
}

/// Score descending, then id ascending so equal scores page deterministically.
fn sort_by_score(scored: &mut [(String, f64)]) {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

use serde_json::{json, Map, Value};

use crate::{Constraint, IndexError};

/// Lower bound on KNN candidates per shard, however small the page.
pub const MIN_NUM_CANDIDATES: usize = 100;

/// Validated KNN query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuerySpec {
    field: String,
    vector: Vec<f32>,
    k: usize,
    num_candidates: usize,
    filter: Constraint,
}

impl VectorQuerySpec {
    /// Rejects empty vectors, `k == 0`, and `num_candidates < k`.
    pub fn new(
        field: impl Into<String>,
        vector: Vec<f32>,
        k: usize,
        num_candidates: usize,
        filter: Constraint,
    ) -> Result<Self, IndexError> {
        if vector.is_empty() {
            return Err(IndexError::invalid_query("query vector is empty"));
        }
        if k == 0 {
            return Err(IndexError::invalid_query("k must be at least 1"));
        }
        if num_candidates < k {
            return Err(IndexError::invalid_query(format!(
                "num_candidates ({num_candidates}) must be >= k ({k})"
            )));
        }
        Ok(Self {
            field: field.into(),
            vector,
            k,
            num_candidates,
            filter,
        })
    }

    /// KNN sized for one page: `k = limit + offset`, `num_candidates = max(100, 2k)`.
    pub fn for_page(
        field: impl Into<String>,
        vector: Vec<f32>,
        limit: usize,
        offset: usize,
        filter: Constraint,
    ) -> Result<Self, IndexError> {
        let k = limit.saturating_add(offset);
        let num_candidates = MIN_NUM_CANDIDATES.max(k.saturating_mul(2));
        Self::new(field, vector, k, num_candidates, filter)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn num_candidates(&self) -> usize {
        self.num_candidates
    }

    pub fn filter(&self) -> &Constraint {
        &self.filter
    }

    fn to_dsl(&self) -> Value {
        let mut knn = json!({
            "field": self.field,
            "query_vector": self.vector,
            "k": self.k,
            "num_candidates": self.num_candidates,
        });
        if !self.filter.is_match_all() {
            knn["filter"] = self.filter.to_query_dsl();
        }
        knn
    }
}

/// Free-text query over weighted fields, AND the filter constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalQuerySpec {
    text: Option<String>,
    fields: Vec<String>,
    filter: Constraint,
}

impl LexicalQuerySpec {
    /// Blank text means "filter only".
    pub fn new(text: &str, fields: Vec<String>, filter: Constraint) -> Self {
        let text = Some(text.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Self {
            text,
            fields,
            filter,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn filter(&self) -> &Constraint {
        &self.filter
    }

    /// A lone clause is used as-is; two become a `bool.must`; none is `match_all`.
    pub fn to_query_dsl(&self) -> Value {
        let mut must = Vec::with_capacity(2);
        if let Some(text) = &self.text {
            must.push(json!({
                "multi_match": {
                    "query": text,
                    "fields": self.fields,
                    "type": "best_fields",
                }
            }));
        }
        if !self.filter.is_match_all() {
            must.push(self.filter.to_query_dsl());
        }

        match must.len() {
            0 => json!({ "match_all": {} }),
            1 => must.remove(0),
            _ => json!({ "bool": { "must": must } }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    Knn(VectorQuerySpec),
    Lexical(LexicalQuerySpec),
}

/// Everything a backend needs to run one search.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    pub query: QueryKind,
    pub size: usize,
    pub from: usize,
    /// `_source` includes; empty disables the source entirely.
    pub source: Vec<String>,
    /// Ask for an exact total instead of the default lower bound.
    pub track_total_hits: bool,
}

impl IndexRequest {
    pub fn knn(spec: VectorQuerySpec, size: usize, from: usize, source: Vec<String>) -> Self {
        Self {
            query: QueryKind::Knn(spec),
            size,
            from,
            source,
            track_total_hits: false,
        }
    }

    pub fn lexical(spec: LexicalQuerySpec, size: usize, from: usize, source: Vec<String>) -> Self {
        Self {
            query: QueryKind::Lexical(spec),
            size,
            from,
            source,
            track_total_hits: false,
        }
    }

    /// Total-only request: no hits, no source, exact count.
    pub fn count(spec: LexicalQuerySpec) -> Self {
        Self {
            query: QueryKind::Lexical(spec),
            size: 0,
            from: 0,
            source: Vec::new(),
            track_total_hits: true,
        }
    }

    /// The `_search` body. This is the only place query JSON is produced.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("size".into(), json!(self.size));
        if self.from > 0 {
            body.insert("from".into(), json!(self.from));
        }
        match &self.query {
            QueryKind::Knn(spec) => {
                body.insert("knn".into(), spec.to_dsl());
            }
            QueryKind::Lexical(spec) => {
                body.insert("query".into(), spec.to_query_dsl());
            }
        }
        if self.source.is_empty() {
            body.insert("_source".into(), Value::Bool(false));
        } else {
            body.insert("_source".into(), json!({ "includes": self.source }));
        }
        if self.track_total_hits {
            body.insert("track_total_hits".into(), Value::Bool(true));
        }
        Value::Object(body)
    }
}

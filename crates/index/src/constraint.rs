use query::Filters;
use serde_json::{json, Value};

use crate::doc::{as_f64, lookup, tokens};
use crate::FieldMapping;

/// A single hard constraint on a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Exact, case-sensitive equality (keyword field).
    Term { field: String, value: String },
    /// Analyzed match: any query token present in the field.
    Match { field: String, value: String },
    /// Inclusive numeric bounds; at least one bound is set.
    Range {
        field: String,
        gte: Option<f64>,
        lte: Option<f64>,
    },
}

impl Clause {
    fn to_query_dsl(&self) -> Value {
        match self {
            Clause::Term { field, value } => json!({ "term": { field: value } }),
            Clause::Match { field, value } => json!({ "match": { field: value } }),
            Clause::Range { field, gte, lte } => {
                let mut bounds = serde_json::Map::new();
                if let Some(min) = gte {
                    bounds.insert("gte".into(), json!(min));
                }
                if let Some(max) = lte {
                    bounds.insert("lte".into(), json!(max));
                }
                json!({ "range": { field: bounds } })
            }
        }
    }

    fn matches(&self, doc: &Value) -> bool {
        match self {
            Clause::Term { field, value } => lookup(doc, field).is_some_and(|v| term_eq(v, value)),
            Clause::Match { field, value } => {
                let wanted = tokens(value);
                lookup(doc, field).is_some_and(|v| any_token(v, &wanted))
            }
            Clause::Range { field, gte, lte } => lookup(doc, field)
                .and_then(as_f64)
                .is_some_and(|n| gte.map_or(true, |min| n >= min) && lte.map_or(true, |max| n <= max)),
        }
    }
}

fn term_eq(value: &Value, wanted: &str) -> bool {
    match value {
        Value::String(s) => s == wanted,
        Value::Array(items) => items.iter().any(|item| term_eq(item, wanted)),
        _ => false,
    }
}

fn any_token(value: &Value, wanted: &[String]) -> bool {
    match value {
        Value::String(s) => tokens(s).iter().any(|t| wanted.contains(t)),
        Value::Array(items) => items.iter().any(|item| any_token(item, wanted)),
        _ => false,
    }
}

/// Compiled filter: either no constraint at all or the AND of its clauses.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Constraint {
    #[default]
    MatchAll,
    All(Vec<Clause>),
}

impl Constraint {
    pub fn is_match_all(&self) -> bool {
        matches!(self, Constraint::MatchAll)
    }

    pub fn clauses(&self) -> &[Clause] {
        match self {
            Constraint::MatchAll => &[],
            Constraint::All(clauses) => clauses,
        }
    }

    /// Elasticsearch query DSL for this constraint.
    pub fn to_query_dsl(&self) -> Value {
        match self {
            Constraint::MatchAll => json!({ "match_all": {} }),
            Constraint::All(clauses) => {
                let must: Vec<Value> = clauses.iter().map(Clause::to_query_dsl).collect();
                json!({ "bool": { "must": must } })
            }
        }
    }

    /// Evaluate against a document source, with the same semantics the cluster applies.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses().iter().all(|clause| clause.matches(doc))
    }
}

/// Turns request [`Filters`] into a [`Constraint`].
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    category_field: String,
    brand_field: String,
    price_field: String,
}

impl FilterBuilder {
    pub fn new(fields: &FieldMapping) -> Self {
        Self {
            category_field: fields.category.clone(),
            brand_field: fields.brand.clone(),
            price_field: fields.price.clone(),
        }
    }

    /// Blank strings and absent fields add nothing; no clauses means `MatchAll`.
    pub fn compile(&self, filters: Option<&Filters>) -> Constraint {
        let Some(filters) = filters else {
            return Constraint::MatchAll;
        };

        let mut clauses = Vec::new();
        if let Some(category) = filters.category() {
            clauses.push(Clause::Term {
                field: self.category_field.clone(),
                value: category.to_string(),
            });
        }
        if let Some(brand) = filters.brand() {
            clauses.push(Clause::Match {
                field: self.brand_field.clone(),
                value: brand.to_string(),
            });
        }
        if filters.has_price_bounds() {
            clauses.push(Clause::Range {
                field: self.price_field.clone(),
                gte: filters.price_min,
                lte: filters.price_max,
            });
        }

        if clauses.is_empty() {
            Constraint::MatchAll
        } else {
            Constraint::All(clauses)
        }
    }
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self::new(&FieldMapping::default())
    }
}

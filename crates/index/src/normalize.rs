use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::doc::{as_f64, as_text, lookup};
use crate::fields::{
    BRAND_ALIASES, CATEGORY_ALIASES, ID_PATHS, IMAGE_ALIASES, PRICE_ALIASES, TITLE_ALIASES,
};
use crate::{FieldMapping, RawHit};

/// Stable, engine-independent product shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    /// Product title.
    pub name: String,
    pub description: String,
    /// 0.0 when the document carries no usable price.
    pub price: f64,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    /// Engine-native; not comparable between retrieval tiers.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("hit source is not a JSON object")]
    SourceNotObject,
    #[error("hit has no usable id")]
    MissingId,
}

/// Result of normalizing a page of hits. Malformed hits are dropped and counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub hits: Vec<SearchHit>,
    pub skipped: usize,
}

/// Maps raw engine hits onto [`SearchHit`], tolerating the schema drift seen across
/// catalog versions (`asin` ids, `name` titles, string prices, array categories).
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    fields: FieldMapping,
}

impl ResultNormalizer {
    pub fn new(fields: &FieldMapping) -> Self {
        Self {
            fields: fields.clone(),
        }
    }

    pub fn normalize(&self, hit: &RawHit) -> Result<SearchHit, NormalizeError> {
        let source = &hit.source;
        if !source.is_object() {
            return Err(NormalizeError::SourceNotObject);
        }

        let id = first_text(source, ID_PATHS)
            .or_else(|| source.get("id").and_then(Value::as_u64).map(|n| n.to_string()))
            .or_else(|| hit.id.clone().filter(|id| !id.trim().is_empty()))
            .ok_or(NormalizeError::MissingId)?;

        let f = &self.fields;
        Ok(SearchHit {
            id,
            name: mapped_text(source, &f.title, TITLE_ALIASES).unwrap_or_default(),
            description: first_text(source, &[f.description.as_str()]).unwrap_or_default(),
            price: std::iter::once(f.price.as_str())
                .chain(PRICE_ALIASES.iter().copied())
                .find_map(|path| lookup(source, path).and_then(as_f64))
                .unwrap_or(0.0),
            category: mapped_text(source, &f.category, CATEGORY_ALIASES),
            brand: mapped_text(source, &f.brand, BRAND_ALIASES),
            image_url: mapped_text(source, &f.image_url, IMAGE_ALIASES),
            score: hit.score.filter(|s| s.is_finite()).unwrap_or(0.0),
        })
    }

    /// Each hit stands alone: a bad one is skipped, never the whole page.
    pub fn normalize_batch(&self, hits: Vec<RawHit>) -> NormalizedBatch {
        let mut batch = NormalizedBatch {
            hits: Vec::with_capacity(hits.len()),
            skipped: 0,
        };
        for hit in &hits {
            match self.normalize(hit) {
                Ok(normalized) => batch.hits.push(normalized),
                Err(err) => {
                    debug!(engine_id = ?hit.id, error = %err, "skipping malformed hit");
                    batch.skipped += 1;
                }
            }
        }
        batch
    }
}

impl Default for ResultNormalizer {
    fn default() -> Self {
        Self::new(&FieldMapping::default())
    }
}

fn mapped_text(source: &Value, mapped: &str, aliases: &[&str]) -> Option<String> {
    first_text(source, &[mapped]).or_else(|| first_text(source, aliases))
}

fn first_text(source: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| lookup(source, path).and_then(as_text))
        .map(str::to_string)
}

use serde::{Deserialize, Serialize};

// Flat keys from older catalog versions, read after the mapped path.
pub(crate) const ID_PATHS: &[&str] = &["id", "asin"];
pub(crate) const TITLE_ALIASES: &[&str] = &["name"];
pub(crate) const PRICE_ALIASES: &[&str] = &["price"];
pub(crate) const CATEGORY_ALIASES: &[&str] = &["categories", "category"];
pub(crate) const BRAND_ALIASES: &[&str] = &["brand"];
pub(crate) const IMAGE_ALIASES: &[&str] = &["imageUrl"];

/// Where product attributes live inside an index document.
///
/// Paths are dot-separated (`metadata.final_price`) and resolved against the
/// document source. The defaults match the catalog mapping used in production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Dense vector field targeted by KNN.
    pub vector: String,
    pub title: String,
    /// Relative weight of `title` against `description` in lexical search.
    pub title_boost: f32,
    pub description: String,
    pub image_url: String,
    /// Exact-match (keyword) category field.
    pub category: String,
    /// Analyzed brand field.
    pub brand: String,
    pub price: String,
    /// Extra `_source` includes. [`FieldMapping::projection`] adds every path the
    /// result normalizer reads on top of these.
    pub source_includes: Vec<String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            vector: "embeddings".into(),
            title: "title".into(),
            title_boost: 2.0,
            description: "description".into(),
            image_url: "image_url".into(),
            category: "metadata.categories".into(),
            brand: "metadata.brand".into(),
            price: "metadata.final_price".into(),
            source_includes: ["id", "title", "url", "image_url", "description", "metadata"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl FieldMapping {
    /// Fields searched by `multi_match`, with the title boost applied.
    pub fn lexical_fields(&self) -> Vec<String> {
        vec![
            format!("{}^{}", self.title, self.title_boost),
            self.description.clone(),
        ]
    }

    /// `_source` includes sent by both retrieval tiers: the configured includes,
    /// then any mapped or legacy path they do not already cover.
    pub fn projection(&self) -> Vec<String> {
        let mapped = [
            &self.title,
            &self.description,
            &self.image_url,
            &self.category,
            &self.brand,
            &self.price,
        ];
        let legacy = [
            ID_PATHS,
            TITLE_ALIASES,
            PRICE_ALIASES,
            CATEGORY_ALIASES,
            BRAND_ALIASES,
            IMAGE_ALIASES,
        ];

        let mut out: Vec<String> = Vec::new();
        let paths = self
            .source_includes
            .iter()
            .map(String::as_str)
            .chain(mapped.into_iter().map(String::as_str))
            .chain(legacy.into_iter().flatten().copied());
        for path in paths {
            if !out.iter().any(|include| covers(include, path)) {
                out.push(path.to_string());
            }
        }
        out
    }
}

/// `metadata` covers `metadata.brand`; `meta` does not.
fn covers(include: &str, path: &str) -> bool {
    path.strip_prefix(include)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Split a `name^boost` field spec. Missing or unparsable boosts count as 1.
pub(crate) fn split_boost(spec: &str) -> (&str, f32) {
    match spec.split_once('^') {
        Some((name, boost)) => (name, boost.parse().unwrap_or(1.0)),
        None => (spec, 1.0),
    }
}

use serde::{Deserialize, Serialize};

/// Structured constraints attached to a product query.
///
/// Every field is optional; an absent (or blank) field leaves that dimension
/// unconstrained. Present fields always combine with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    /// Exact category the product must belong to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Brand name, matched loosely by the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Inclusive lower price bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    /// Inclusive upper price bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_price_min(mut self, min: f64) -> Self {
        self.price_min = Some(min);
        self
    }

    pub fn with_price_max(mut self, max: f64) -> Self {
        self.price_max = Some(max);
        self
    }

    /// Category, if present and non-blank.
    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    /// Brand, if present and non-blank.
    pub fn brand(&self) -> Option<&str> {
        non_blank(self.brand.as_deref())
    }

    pub fn has_price_bounds(&self) -> bool {
        self.price_min.is_some() || self.price_max.is_some()
    }

    /// True when no field constrains anything.
    pub fn is_empty(&self) -> bool {
        self.category().is_none() && self.brand().is_none() && !self.has_price_bounds()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

//! # Product Retrieval
//!
//! Everything between a cleaned query and a page of normalized products:
//!
//! - [`FilterBuilder`] compiles request [`Filters`](query::Filters) into a
//!   [`Constraint`], which renders to Elasticsearch DSL or evaluates directly
//!   against a JSON document.
//! - [`VectorQuerySpec`], [`LexicalQuerySpec`] and [`IndexRequest`] are typed,
//!   validated query payloads. JSON only appears in [`IndexRequest::to_body`].
//! - [`SearchIndex`] abstracts the engine. [`ElasticsearchIndex`] speaks REST;
//!   [`InMemoryIndex`] is a faithful stand-in for tests and demos.
//! - [`HybridSearchExecutor`] runs KNN first and drops to lexical search when the
//!   vector tier errors, keeping filters and paging identical.
//! - [`ResultNormalizer`] turns heterogeneous hits into [`SearchHit`]s, skipping
//!   (and counting) the ones it can't make sense of.
//!
//! ## Example
//!
//! ```
//! use index::{FilterBuilder, LexicalQuerySpec, IndexRequest, FieldMapping};
//! use query::Filters;
//!
//! let fields = FieldMapping::default();
//! let filters = Filters::new().with_brand("Nike").with_price_max(100.0);
//! let constraint = FilterBuilder::new(&fields).compile(Some(&filters));
//!
//! let spec = LexicalQuerySpec::new("running shoes", fields.lexical_fields(), constraint);
//! let body = IndexRequest::lexical(spec, 10, 0, fields.projection()).to_body();
//! assert_eq!(body["query"]["bool"]["must"][0]["multi_match"]["query"], "running shoes");
//! ```

mod backend;
mod constraint;
mod doc;
mod error;
mod executor;
mod fields;
mod normalize;
mod request;

pub use backend::{
    BackendConfig, ElasticConfig, ElasticsearchIndex, InMemoryIndex, IndexResponse, RawHit,
    SearchIndex,
};
pub use constraint::{Clause, Constraint, FilterBuilder};
pub use error::IndexError;
pub use executor::{HybridSearchExecutor, SearchOutcome, SearchTier};
pub use fields::FieldMapping;
pub use normalize::{NormalizeError, NormalizedBatch, ResultNormalizer, SearchHit};
pub use request::{IndexRequest, LexicalQuerySpec, QueryKind, VectorQuerySpec, MIN_NUM_CANDIDATES};

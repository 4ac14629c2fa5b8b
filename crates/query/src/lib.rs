//! Product query understanding.
//!
//! Shoppers type things like "running shoes from Nike" or "boots in category
//! hiking and brand Salomon". This crate pulls the brand and category phrases
//! out of that text into structured [`Filters`] and hands back the remaining
//! query for retrieval.
//!
//! ```
//! use query::{Filters, QueryParser};
//!
//! let parser = QueryParser::new();
//! let parsed = parser.parse("running shoes from Nike", None);
//! assert_eq!(parsed.cleaned_query, "running shoes");
//! assert_eq!(parsed.filters, Filters::new().with_brand("Nike"));
//! ```
//!
//! Filters supplied by the caller always win over phrases found in the text.

mod filters;
mod parser;

pub use crate::filters::Filters;
pub use crate::parser::{ParsedQuery, QueryParser};

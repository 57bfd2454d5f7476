//! catalog-text
//!
//! tantivy backed catalog. Products and categories live side by side in one
//! in-RAM index, told apart by the `doc_type` field. See `schema` for the
//! field layout, `mapping` for document conversion and `search` for query
//! and facet translation.

pub mod mapping;
pub mod repository;
pub mod schema;
pub mod search;

pub use repository::TantivyRepository;

//! catalog-memory
//!
//! Hand-rolled in-memory catalog backend: a product store with eagerly
//! maintained reverse indices, evaluated by intersecting candidate sets.

pub mod index;
pub mod query;
pub mod repository;
pub mod store;

pub use repository::InMemoryRepository;

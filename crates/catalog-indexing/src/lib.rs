//! catalog-indexing
//!
//! Ties loaders to a configured backend: [`Backend`] picks the repository
//! implementation, [`Indexer`] batches loader output into it and
//! [`IndexProcess`] serializes whole indexing runs.

pub mod backend;
pub mod indexer;
pub mod loader;
pub mod process;

pub use backend::Backend;
pub use indexer::{IndexStats, IndexUpdater, Indexer};
pub use loader::ProductFileLoader;
pub use process::IndexProcess;

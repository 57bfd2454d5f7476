use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use catalog_core::config::IndexingConfig;
use catalog_core::error::Result;
use catalog_core::traits::ProductRepository;

use crate::backend::Backend;
use crate::indexer::{IndexStats, IndexUpdater, Indexer};

/// One indexing run: prepare the backend, let the loader fill it, flush.
///
/// Runs are serialized by a lock owned by the process; reads go straight to
/// the backend and are not blocked by it.
pub struct IndexProcess {
    updater: Arc<dyn IndexUpdater>,
    backend: Backend,
    indexing: IndexingConfig,
    lock: Mutex<()>,
}

impl IndexProcess {
    pub fn new(updater: Arc<dyn IndexUpdater>, backend: Backend, indexing: IndexingConfig) -> Self {
        Self { updater, backend, indexing, lock: Mutex::new(()) }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn is_running(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn run(&self) -> Result<IndexStats> {
        if !self.indexing.enabled {
            tracing::info!("Indexing disabled, run skipped");
            return Ok(IndexStats::default());
        }
        let _guard = self.lock.lock();
        let started = Instant::now();
        tracing::info!(backend = ?self.backend.kind(), "Indexing run started");

        ProductRepository::prepare_index(&self.backend)?;
        let mut indexer = Indexer::new(self.backend.products(), Some(self.backend.categories()), self.indexing.batch_size);
        if let Err(e) = self.updater.index(&mut indexer).and_then(|()| indexer.flush()) {
            tracing::error!(error = %e, "Indexing run aborted");
            return Err(e);
        }

        let stats = indexer.stats();
        tracing::info!(
            products = stats.products,
            documents = self.backend.documents_count(),
            rejected_batches = stats.rejected_batches,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Indexing run finished"
        );
        Ok(stats)
    }
}

use std::mem;
use std::sync::Arc;

use catalog_core::error::Result;
use catalog_core::traits::{CategoryRepository, ProductRepository};
use catalog_core::types::{CategoryTeaser, Product};

/// A loader: reads some source and feeds products through the indexer.
pub trait IndexUpdater: Send + Sync {
    fn index(&self, indexer: &mut Indexer) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub products: usize,
    pub categories: usize,
    pub batches: usize,
    pub rejected_batches: usize,
}

/// Queues products and their category teasers, writing a batch whenever
/// `batch_size` products are waiting.
pub struct Indexer {
    products: Arc<dyn ProductRepository>,
    categories: Option<Arc<dyn CategoryRepository>>,
    product_queue: Vec<Product>,
    category_queue: Vec<CategoryTeaser>,
    batch_size: usize,
    stats: IndexStats,
}

impl Indexer {
    pub fn new(products: Arc<dyn ProductRepository>, categories: Option<Arc<dyn CategoryRepository>>, batch_size: usize) -> Self {
        Self {
            products,
            categories,
            product_queue: Vec::new(),
            category_queue: Vec::new(),
            batch_size: batch_size.max(1),
            stats: IndexStats::default(),
        }
    }

    pub fn update_product_and_category(&mut self, product: Product) -> Result<()> {
        self.category_queue.extend(product.base().all_categories().cloned());
        self.product_queue.push(product);
        if self.product_queue.len() >= self.batch_size {
            self.commit()?;
        }
        Ok(())
    }

    pub fn update_categories(&mut self, teasers: &[CategoryTeaser]) -> Result<()> {
        self.category_queue.extend_from_slice(teasers);
        Ok(())
    }

    /// Writes whatever is still queued.
    pub fn flush(&mut self) -> Result<()> {
        self.commit()
    }

    /// Lookups for loaders that resolve references between products.
    pub fn product_repository(&self) -> &Arc<dyn ProductRepository> {
        &self.products
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    fn commit(&mut self) -> Result<()> {
        if !self.product_queue.is_empty() {
            let batch = mem::take(&mut self.product_queue);
            tracing::debug!(size = batch.len(), "Writing product batch");
            let result = self.products.update_products(&batch);
            self.stats.products += batch.len();
            self.record(result)?;
        }
        if let Some(categories) = self.categories.clone() {
            if !self.category_queue.is_empty() {
                let batch = mem::take(&mut self.category_queue);
                let result = categories.update_by_category_teasers(&batch);
                self.stats.categories += batch.len();
                self.record(result)?;
            }
        } else {
            self.category_queue.clear();
        }
        Ok(())
    }

    // Rejected rows are logged and skipped; anything else aborts the run.
    fn record(&mut self, result: Result<()>) -> Result<()> {
        self.stats.batches += 1;
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_row_error() => {
                tracing::warn!(error = %e, "Batch had rejected rows");
                self.stats.rejected_batches += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

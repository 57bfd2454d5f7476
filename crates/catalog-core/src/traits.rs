use crate::error::Result;
use crate::types::{Category, CategoryTeaser, Filter, Product, SearchResult, Tree};

/// Product side of a catalog backend. Every read before `prepare_index`
/// fails with `Error::IndexNotPrepared`.
pub trait ProductRepository: Send + Sync {
    /// Discards all state and starts from an empty index.
    fn prepare_index(&self) -> Result<()>;
    /// Indexes every valid product of the batch. Rejected rows are skipped;
    /// the first rejection is returned once the batch is done.
    fn update_products(&self, products: &[Product]) -> Result<()>;
    fn clear_products(&self, marketplace_codes: &[String]) -> Result<()>;
    fn find_by_marketplace_code(&self, marketplace_code: &str) -> Result<Product>;
    fn find(&self, filters: &[Filter]) -> Result<SearchResult>;
    fn documents_count(&self) -> u64;
}

pub trait CategoryRepository: Send + Sync {
    fn prepare_index(&self) -> Result<()>;
    fn update_by_category_teasers(&self, teasers: &[CategoryTeaser]) -> Result<()>;
    /// Removes the categories and everything below them.
    fn clear_categories(&self, codes: &[String]) -> Result<()>;
    /// Subtree at `code`; `""` is the root.
    fn category_tree(&self, code: &str) -> Result<Tree>;
    fn category(&self, code: &str) -> Result<Category>;
}

use std::sync::Arc;

use catalog_core::config::{BackendKind, CatalogConfig};
use catalog_core::error::Result;
use catalog_core::traits::{CategoryRepository, ProductRepository};
use catalog_core::types::{Category, CategoryTeaser, Filter, Product, SearchResult, Tree};
use catalog_memory::InMemoryRepository;
use catalog_text::TantivyRepository;

/// The repository implementation selected by `catalog.backend`.
#[derive(Clone)]
pub enum Backend {
    Memory(Arc<InMemoryRepository>),
    Text(Arc<TantivyRepository>),
}

impl Backend {
    pub fn from_config(config: &CatalogConfig) -> Self {
        match config.backend {
            BackendKind::Memory => Self::Memory(Arc::new(InMemoryRepository::new(config.search.clone()))),
            BackendKind::Tantivy => Self::Text(Arc::new(TantivyRepository::new(config.search.clone()))),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Memory(_) => BackendKind::Memory,
            Self::Text(_) => BackendKind::Tantivy,
        }
    }

    pub fn products(&self) -> Arc<dyn ProductRepository> {
        match self {
            Self::Memory(repo) => Arc::clone(repo) as Arc<dyn ProductRepository>,
            Self::Text(repo) => Arc::clone(repo) as Arc<dyn ProductRepository>,
        }
    }

    pub fn categories(&self) -> Arc<dyn CategoryRepository> {
        match self {
            Self::Memory(repo) => Arc::clone(repo) as Arc<dyn CategoryRepository>,
            Self::Text(repo) => Arc::clone(repo) as Arc<dyn CategoryRepository>,
        }
    }
}

impl ProductRepository for Backend {
    fn prepare_index(&self) -> Result<()> {
        match self {
            Self::Memory(repo) => ProductRepository::prepare_index(repo.as_ref()),
            Self::Text(repo) => ProductRepository::prepare_index(repo.as_ref()),
        }
    }

    fn update_products(&self, products: &[Product]) -> Result<()> {
        match self {
            Self::Memory(repo) => repo.update_products(products),
            Self::Text(repo) => repo.update_products(products),
        }
    }

    fn clear_products(&self, marketplace_codes: &[String]) -> Result<()> {
        match self {
            Self::Memory(repo) => repo.clear_products(marketplace_codes),
            Self::Text(repo) => repo.clear_products(marketplace_codes),
        }
    }

    fn find_by_marketplace_code(&self, marketplace_code: &str) -> Result<Product> {
        match self {
            Self::Memory(repo) => repo.find_by_marketplace_code(marketplace_code),
            Self::Text(repo) => repo.find_by_marketplace_code(marketplace_code),
        }
    }

    fn find(&self, filters: &[Filter]) -> Result<SearchResult> {
        match self {
            Self::Memory(repo) => repo.find(filters),
            Self::Text(repo) => repo.find(filters),
        }
    }

    fn documents_count(&self) -> u64 {
        match self {
            Self::Memory(repo) => repo.documents_count(),
            Self::Text(repo) => repo.documents_count(),
        }
    }
}

impl CategoryRepository for Backend {
    fn prepare_index(&self) -> Result<()> {
        match self {
            Self::Memory(repo) => CategoryRepository::prepare_index(repo.as_ref()),
            Self::Text(repo) => CategoryRepository::prepare_index(repo.as_ref()),
        }
    }

    fn update_by_category_teasers(&self, teasers: &[CategoryTeaser]) -> Result<()> {
        match self {
            Self::Memory(repo) => repo.update_by_category_teasers(teasers),
            Self::Text(repo) => repo.update_by_category_teasers(teasers),
        }
    }

    fn clear_categories(&self, codes: &[String]) -> Result<()> {
        match self {
            Self::Memory(repo) => repo.clear_categories(codes),
            Self::Text(repo) => repo.clear_categories(codes),
        }
    }

    fn category_tree(&self, code: &str) -> Result<Tree> {
        match self {
            Self::Memory(repo) => repo.category_tree(code),
            Self::Text(repo) => repo.category_tree(code),
        }
    }

    fn category(&self, code: &str) -> Result<Category> {
        match self {
            Self::Memory(repo) => repo.category(code),
            Self::Text(repo) => repo.category(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_follows_config() {
        let mut config = CatalogConfig::default();
        assert_eq!(Backend::from_config(&config).kind(), BackendKind::Memory);
        config.backend = BackendKind::Tantivy;
        let backend = Backend::from_config(&config);
        assert_eq!(backend.kind(), BackendKind::Tantivy);
        assert_eq!(backend.products().documents_count(), 0);
    }
}

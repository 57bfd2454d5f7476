use std::collections::BTreeMap;

use parking_lot::RwLock;

use catalog_core::category_tree::CategoryTree;
use catalog_core::config::SearchSettings;
use catalog_core::error::{Error, Result};
use catalog_core::facets::{self, CATEGORY_FACET};
use catalog_core::query::{self, Constraint, QueryPlan};
use catalog_core::text;
use catalog_core::traits::{CategoryRepository, ProductRepository};
use catalog_core::types::{Category, CategoryTeaser, Facet, Filter, Product, SearchMeta, SearchResult, Tree};

use crate::index::{AttributeIndex, CategoryIndex, TextIndex};
use crate::query::CandidateSet;
use crate::store::ProductStore;

/// Everything an indexing run builds. Replaced wholesale on prepare.
#[derive(Debug)]
struct Catalog {
    products: ProductStore,
    attributes: AttributeIndex,
    categories: CategoryIndex,
    text: TextIndex,
    tree: Option<CategoryTree>,
}

impl Catalog {
    fn new(settings: &SearchSettings) -> Self {
        Self {
            products: ProductStore::new(),
            attributes: AttributeIndex::default(),
            categories: CategoryIndex::new(settings.products_to_parent_categories),
            text: TextIndex::default(),
            tree: None,
        }
    }

    fn add(&mut self, product: Product) -> Result<()> {
        let stored = self.products.add(product)?;
        self.attributes.add(stored);
        self.categories.add(stored);
        self.text.add(stored);
        let teasers: Vec<CategoryTeaser> = stored.base().all_categories().cloned().collect();
        for teaser in &teasers {
            self.merge_teaser(teaser);
        }
        Ok(())
    }

    fn merge_teaser(&mut self, teaser: &CategoryTeaser) {
        let chain = teaser.chain();
        match self.tree.as_mut() {
            Some(tree) => {
                tree.merge_chain(&chain);
            }
            None => self.tree = CategoryTree::from_chain(&chain),
        }
    }

    fn remove(&mut self, marketplace_code: &str) -> bool {
        if self.products.remove(marketplace_code).is_none() {
            return false;
        }
        self.attributes.remove_code(marketplace_code);
        self.categories.remove_code(marketplace_code);
        self.text.remove_code(marketplace_code);
        true
    }

    fn tree(&self) -> Result<&CategoryTree> {
        self.tree.as_ref().ok_or_else(|| Error::NotFound("category tree is empty".into()))
    }

    fn category_name(&self, code: &str) -> Option<String> {
        let node = self.tree.as_ref()?.get(code)?;
        (!node.name.is_empty()).then(|| node.name.clone())
    }
}

pub struct InMemoryRepository {
    settings: SearchSettings,
    state: RwLock<Option<Catalog>>,
}

impl InMemoryRepository {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings, state: RwLock::new(None) }
    }

    fn prepare(&self) {
        *self.state.write() = Some(Catalog::new(&self.settings));
        tracing::info!("In-memory catalog prepared");
    }

    fn facets(&self, catalog: &Catalog, plan: &QueryPlan, hits: &[Product]) -> BTreeMap<String, Facet> {
        let mut result = BTreeMap::new();
        for (position, config) in self.settings.facets.iter().enumerate() {
            let counts = facets::count_attribute_values(hits, &config.attribute_code);
            let facet = facets::attribute_facet(config, position, &counts, |value| {
                catalog.attributes.label(&config.attribute_code, value)
            });
            result.insert(config.attribute_code.clone(), facet);
        }
        if self.settings.enable_category_facet {
            let counts = facets::count_category_paths(hits);
            let facet = facets::category_facet(&counts, self.settings.facets.len(), |code| catalog.category_name(code));
            result.insert(CATEGORY_FACET.to_string(), facet);
        }
        facets::mark_active(plan, &mut result);
        result
    }
}

impl ProductRepository for InMemoryRepository {
    fn prepare_index(&self) -> Result<()> {
        self.prepare();
        Ok(())
    }

    fn update_products(&self, products: &[Product]) -> Result<()> {
        let mut guard = self.state.write();
        let catalog = guard.as_mut().ok_or(Error::IndexNotPrepared)?;
        let mut first_error = None;
        for product in products {
            if let Err(e) = catalog.add(product.clone()) {
                tracing::warn!(code = %product.marketplace_code(), error = %e, "Product rejected");
                first_error.get_or_insert(e);
            }
        }
        tracing::debug!(batch = products.len(), total = catalog.products.len(), "Products indexed");
        first_error.map_or(Ok(()), Err)
    }

    fn clear_products(&self, marketplace_codes: &[String]) -> Result<()> {
        let mut guard = self.state.write();
        let catalog = guard.as_mut().ok_or(Error::IndexNotPrepared)?;
        let removed = marketplace_codes.iter().filter(|code| catalog.remove(code)).count();
        tracing::debug!(requested = marketplace_codes.len(), removed, "Products cleared");
        Ok(())
    }

    fn find_by_marketplace_code(&self, marketplace_code: &str) -> Result<Product> {
        let guard = self.state.read();
        let catalog = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
        catalog
            .products
            .get(marketplace_code)
            .cloned()
            .ok_or_else(|| Error::NotFound(marketplace_code.to_string()))
    }

    fn find(&self, filters: &[Filter]) -> Result<SearchResult> {
        let guard = self.state.read();
        let catalog = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
        let plan = QueryPlan::from_filters(filters, self.settings.default_page_size);

        let mut candidates = CandidateSet::new();
        for constraint in &plan.constraints {
            let matches = match constraint {
                Constraint::Text(q) if text::is_match_all(q) => catalog.products.codes().map(str::to_string).collect(),
                Constraint::Text(q) => catalog.text.matching(q),
                Constraint::Attribute { key, values } => catalog.attributes.matching(key, values),
                Constraint::Category(codes) => catalog.categories.matching(codes),
            };
            candidates.apply(matches);
        }
        let hits: Vec<Product> = candidates
            .resolve(catalog.products.codes())
            .iter()
            .filter_map(|code| catalog.products.get(code))
            .cloned()
            .collect();

        let facets = self.facets(catalog, &plan, &hits);
        let sorted = query::sort_products(hits, &plan.sort_field, plan.sort_direction, &self.settings.sorts);
        let num_results = sorted.len();
        let (hits, num_pages) = query::paginate(sorted, plan.page, plan.page_size);
        Ok(SearchResult {
            hits,
            facets,
            meta: SearchMeta {
                num_results,
                num_pages,
                page: plan.page,
                sort_options: query::sort_options(&self.settings.sorts, &plan.sort_field, plan.sort_direction),
            },
        })
    }

    fn documents_count(&self) -> u64 {
        self.state.read().as_ref().map_or(0, |c| c.products.len() as u64)
    }
}

impl CategoryRepository for InMemoryRepository {
    fn prepare_index(&self) -> Result<()> {
        self.prepare();
        Ok(())
    }

    fn update_by_category_teasers(&self, teasers: &[CategoryTeaser]) -> Result<()> {
        let mut guard = self.state.write();
        let catalog = guard.as_mut().ok_or(Error::IndexNotPrepared)?;
        let mut first_error = None;
        for teaser in teasers {
            if let Err(e) = teaser.validate_standalone() {
                tracing::warn!(code = %teaser.code, error = %e, "Category teaser rejected");
                first_error.get_or_insert(e);
                continue;
            }
            catalog.merge_teaser(teaser);
        }
        first_error.map_or(Ok(()), Err)
    }

    fn clear_categories(&self, codes: &[String]) -> Result<()> {
        let mut guard = self.state.write();
        let catalog = guard.as_mut().ok_or(Error::IndexNotPrepared)?;
        for code in codes {
            let Some(tree) = catalog.tree.as_mut() else {
                break;
            };
            if tree.root_code() == code {
                catalog.tree = None;
            } else {
                tree.remove_subtree(code);
            }
        }
        Ok(())
    }

    fn category_tree(&self, code: &str) -> Result<Tree> {
        let guard = self.state.read();
        let catalog = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
        catalog
            .tree()?
            .subtree(code, |c| catalog.categories.document_count(c))
            .ok_or_else(|| Error::NotFound(code.to_string()))
    }

    fn category(&self, code: &str) -> Result<Category> {
        let guard = self.state.read();
        let catalog = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
        catalog.tree()?.category(code).ok_or_else(|| Error::NotFound(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::types::{CategoryRef, SimpleProduct};

    fn repository() -> InMemoryRepository {
        let repo = InMemoryRepository::new(SearchSettings::default());
        ProductRepository::prepare_index(&repo).unwrap();
        repo
    }

    fn product(code: &str, category: &str) -> Product {
        let mut p = SimpleProduct::default();
        p.base.marketplace_code = code.into();
        p.base.title = format!("title {code}");
        p.base.categories.push(CategoryTeaser::with_ancestors(
            category,
            category,
            vec![CategoryRef::new("root", "Root")],
        ));
        Product::Simple(p)
    }

    #[test]
    fn reads_before_prepare_fail() {
        let repo = InMemoryRepository::new(SearchSettings::default());
        assert!(matches!(repo.find(&[]), Err(Error::IndexNotPrepared)));
        assert!(matches!(repo.find_by_marketplace_code("p1"), Err(Error::IndexNotPrepared)));
        assert!(matches!(repo.category_tree(""), Err(Error::IndexNotPrepared)));
        assert!(matches!(repo.update_products(&[product("p1", "a")]), Err(Error::IndexNotPrepared)));
        assert_eq!(repo.documents_count(), 0);
    }

    #[test]
    fn batch_continues_past_rejected_rows() {
        let repo = repository();
        let result = repo.update_products(&[product("p1", "a"), product("", "a"), product("p2", "b")]);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(repo.documents_count(), 2);
        assert!(repo.find_by_marketplace_code("p2").is_ok());
    }

    #[test]
    fn prepare_discards_previous_state() {
        let repo = repository();
        repo.update_products(&[product("p1", "a")]).unwrap();
        CategoryRepository::prepare_index(&repo).unwrap();
        assert_eq!(repo.documents_count(), 0);
        assert!(matches!(repo.find_by_marketplace_code("p1"), Err(Error::NotFound(_))));
        assert!(matches!(repo.category(""), Err(Error::NotFound(_))));
    }

    #[test]
    fn clear_products_removes_hits_and_counts() {
        let repo = repository();
        repo.update_products(&[product("p1", "a"), product("p2", "a")]).unwrap();
        repo.clear_products(&["p1".to_string()]).unwrap();
        let result = repo.find(&[Filter::category("a")]).unwrap();
        assert_eq!(result.meta.num_results, 1);
        assert_eq!(repo.category_tree("a").unwrap().document_count, 1);
    }

    #[test]
    fn clear_categories_drops_subtrees() {
        let repo = repository();
        repo.update_products(&[product("p1", "a"), product("p2", "b")]).unwrap();
        repo.clear_categories(&["a".to_string()]).unwrap();
        let tree = repo.category_tree("").unwrap();
        assert!(tree.child("a").is_none());
        assert!(tree.child("b").is_some());
        repo.clear_categories(&["root".to_string()]).unwrap();
        assert!(matches!(repo.category_tree(""), Err(Error::NotFound(_))));
    }
}

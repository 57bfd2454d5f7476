use std::collections::HashMap;

use catalog_core::error::{Error, Result};
use catalog_core::types::Product;

/// Products keyed by marketplace code.
#[derive(Debug, Default)]
pub struct ProductStore {
    products: HashMap<String, Product>,
}

impl ProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new, valid product. The first write for a code wins.
    pub fn add(&mut self, product: Product) -> Result<&Product> {
        product.validate()?;
        let code = product.marketplace_code().to_string();
        if self.products.contains_key(&code) {
            return Err(Error::DuplicateKey(code));
        }
        Ok(self.products.entry(code).or_insert(product))
    }

    pub fn get(&self, marketplace_code: &str) -> Option<&Product> {
        self.products.get(marketplace_code)
    }

    pub fn remove(&mut self, marketplace_code: &str) -> Option<Product> {
        self.products.remove(marketplace_code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::types::SimpleProduct;

    fn product(code: &str, title: &str) -> Product {
        let mut p = SimpleProduct::default();
        p.base.marketplace_code = code.into();
        p.base.title = title.into();
        Product::Simple(p)
    }

    #[test]
    fn duplicate_keeps_first_write() {
        let mut store = ProductStore::new();
        store.add(product("p1", "first")).unwrap();
        let err = store.add(product("p1", "second")).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(code) if code == "p1"));
        assert_eq!(store.get("p1").map(Product::title), Some("first"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_code_is_rejected() {
        let mut store = ProductStore::new();
        assert!(matches!(store.add(product("", "x")), Err(Error::Validation(_))));
        assert!(store.is_empty());
    }
}

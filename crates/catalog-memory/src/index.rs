//! Reverse indices maintained on every product add.

use std::collections::{BTreeSet, HashMap};

use catalog_core::text;
use catalog_core::types::Product;

/// Value -> marketplace codes. Each code appears at most once per value.
#[derive(Debug, Default, Clone)]
pub struct ReverseIndex {
    postings: HashMap<String, BTreeSet<String>>,
}

impl ReverseIndex {
    pub fn insert(&mut self, value: &str, marketplace_code: &str) {
        self.postings
            .entry(value.to_string())
            .or_default()
            .insert(marketplace_code.to_string());
    }

    pub fn get(&self, value: &str) -> Option<&BTreeSet<String>> {
        self.postings.get(value)
    }

    pub fn count(&self, value: &str) -> usize {
        self.postings.get(value).map_or(0, BTreeSet::len)
    }

    /// Union of the postings of all `values`.
    pub fn union<'a, I>(&self, values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        values
            .into_iter()
            .filter_map(|v| self.postings.get(v))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn remove_code(&mut self, marketplace_code: &str) {
        self.postings.retain(|_, codes| {
            codes.remove(marketplace_code);
            !codes.is_empty()
        });
    }
}

/// Attribute code -> value -> codes, plus the display label first seen for
/// each value.
#[derive(Debug, Default)]
pub struct AttributeIndex {
    by_code: HashMap<String, ReverseIndex>,
    labels: HashMap<(String, String), String>,
}

impl AttributeIndex {
    pub fn add(&mut self, product: &Product) {
        let code = product.marketplace_code();
        for (attribute_code, attribute) in &product.base().attributes {
            let index = self.by_code.entry(attribute_code.clone()).or_default();
            for value in attribute.values() {
                index.insert(value, code);
                self.labels
                    .entry((attribute_code.clone(), value.to_string()))
                    .or_insert_with(|| attribute.display_label(value));
            }
        }
    }

    pub fn matching(&self, attribute_code: &str, values: &[String]) -> BTreeSet<String> {
        self.by_code
            .get(attribute_code)
            .map(|index| index.union(values.iter().map(String::as_str)))
            .unwrap_or_default()
    }

    pub fn label(&self, attribute_code: &str, value: &str) -> Option<String> {
        self.labels.get(&(attribute_code.to_string(), value.to_string())).cloned()
    }

    pub fn remove_code(&mut self, marketplace_code: &str) {
        for index in self.by_code.values_mut() {
            index.remove_code(marketplace_code);
        }
    }
}

/// Category code -> codes. With ancestor propagation a product is also
/// filed under every ancestor of its categories.
#[derive(Debug, Default)]
pub struct CategoryIndex {
    index: ReverseIndex,
    propagate_to_ancestors: bool,
}

impl CategoryIndex {
    pub fn new(propagate_to_ancestors: bool) -> Self {
        Self { index: ReverseIndex::default(), propagate_to_ancestors }
    }

    pub fn add(&mut self, product: &Product) {
        let code = product.marketplace_code();
        for teaser in product.base().all_categories() {
            if teaser.code.is_empty() {
                continue;
            }
            if self.propagate_to_ancestors {
                for link in teaser.chain() {
                    self.index.insert(&link.code, code);
                }
            } else {
                self.index.insert(&teaser.code, code);
            }
        }
    }

    pub fn matching(&self, category_codes: &[String]) -> BTreeSet<String> {
        self.index.union(category_codes.iter().map(String::as_str))
    }

    pub fn document_count(&self, category_code: &str) -> u64 {
        self.index.count(category_code) as u64
    }

    pub fn remove_code(&mut self, marketplace_code: &str) {
        self.index.remove_code(marketplace_code);
    }
}

/// Token -> codes over the product's searchable text.
#[derive(Debug, Default)]
pub struct TextIndex {
    index: ReverseIndex,
}

impl TextIndex {
    pub fn add(&mut self, product: &Product) {
        let code = product.marketplace_code();
        for field in product.searchable_text() {
            for token in text::tokenize(field) {
                self.index.insert(&token, code);
            }
        }
    }

    /// Products containing any token of `query`.
    pub fn matching(&self, query: &str) -> BTreeSet<String> {
        let tokens = text::tokenize(query);
        self.index.union(tokens.iter().map(String::as_str))
    }

    pub fn remove_code(&mut self, marketplace_code: &str) {
        self.index.remove_code(marketplace_code);
    }
}

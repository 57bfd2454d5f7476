//! Conversion between catalog values and tantivy documents.

use std::collections::BTreeSet;

use tantivy::schema::{Facet, Value};
use tantivy::TantivyDocument;

use catalog_core::category_tree::CategoryNode;
use catalog_core::codec;
use catalog_core::error::{Error, Result};
use catalog_core::types::Product;

use crate::schema::{CatalogFields, CATEGORY, PRODUCT};

/// A stored category record as read back from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
	pub code: String,
	pub name: String,
	pub parent_code: String,
	pub is_root: bool,
}

pub fn product_document(fields: &CatalogFields, product: &Product, propagate_to_ancestors: bool) -> Result<TantivyDocument> {
	let source = String::from_utf8(codec::encode(product)?).map_err(Error::backend)?;
	let mut doc = TantivyDocument::default();
	doc.add_text(fields.doc_type, PRODUCT);
	doc.add_text(fields.doc_id, product.marketplace_code());
	doc.add_text(fields.source, source);
	for text in product.searchable_text() {
		if !text.is_empty() {
			doc.add_text(fields.text, text);
		}
	}

	let mut category_codes = BTreeSet::new();
	let mut category_paths = BTreeSet::new();
	for teaser in product.base().all_categories() {
		let chain = teaser.chain();
		let Some(own) = chain.last() else {
			continue;
		};
		if propagate_to_ancestors {
			category_codes.extend(chain.iter().map(|c| c.code.clone()));
		} else {
			category_codes.insert(own.code.clone());
		}
		if chain.len() > 1 {
			category_paths.insert(chain.iter().skip(1).map(|c| c.code.clone()).collect::<Vec<_>>());
		}
	}
	for code in category_codes {
		doc.add_text(fields.category_codes, code);
	}
	for path in category_paths {
		doc.add_facet(fields.category_paths, Facet::from_path(path));
	}

	for (code, attribute) in &product.base().attributes {
		let values: BTreeSet<&str> = attribute.values().into_iter().collect();
		for value in values {
			doc.add_facet(fields.attributes, Facet::from_path([code.as_str(), value]));
		}
	}
	Ok(doc)
}

pub fn decode_product(fields: &CatalogFields, doc: &TantivyDocument) -> Result<Product> {
	let source = doc
		.get_first(fields.source)
		.and_then(|v| v.as_str())
		.ok_or_else(|| Error::Backend("product document without source".into()))?;
	codec::decode(source.as_bytes())
}

/// Root nodes point at themselves.
pub fn category_document(fields: &CatalogFields, node: &CategoryNode) -> TantivyDocument {
	let parent = node.parent.as_deref().unwrap_or(&node.code);
	let mut doc = TantivyDocument::default();
	doc.add_text(fields.doc_type, CATEGORY);
	doc.add_text(fields.category_code, &node.code);
	doc.add_text(fields.category_name, &node.name);
	doc.add_text(fields.parent_code, parent);
	doc.add_text(fields.is_root, if node.parent.is_none() { "true" } else { "false" });
	doc
}

pub fn category_record(fields: &CatalogFields, doc: &TantivyDocument) -> CategoryRecord {
	let text = |field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or_default().to_string();
	CategoryRecord {
		code: text(fields.category_code),
		name: text(fields.category_name),
		parent_code: text(fields.parent_code),
		is_root: text(fields.is_root) == "true",
	}
}

use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FacetOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

use catalog_core::error::{Error, Result};
use catalog_core::text::STOP_WORDS;

pub const TOKENIZER: &str = "catalog_text";
pub const PRODUCT: &str = "product";
pub const CATEGORY: &str = "category";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("doc_type", STRING);
	// product documents
	schema_builder.add_text_field("doc_id", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	schema_builder.add_text_field("text", TextOptions::default().set_indexing_options(text_field_indexing));
	schema_builder.add_text_field("category_codes", STRING);
	schema_builder.add_facet_field("category_paths", FacetOptions::default());
	schema_builder.add_facet_field("attributes", FacetOptions::default());
	schema_builder.add_text_field("source", STORED);
	// category documents
	schema_builder.add_text_field("category_code", STRING | STORED);
	schema_builder.add_text_field("category_name", STORED);
	schema_builder.add_text_field("parent_code", STRING | STORED);
	schema_builder.add_text_field("is_root", STRING | STORED);
	schema_builder.build()
}

/// Same analysis as `catalog_core::text::tokenize`.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TOKENIZER, tokenizer);
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogFields {
	pub doc_type: Field,
	pub doc_id: Field,
	pub text: Field,
	pub category_codes: Field,
	pub category_paths: Field,
	pub attributes: Field,
	pub source: Field,
	pub category_code: Field,
	pub category_name: Field,
	pub parent_code: Field,
	pub is_root: Field,
}

impl CatalogFields {
	pub fn from_schema(schema: &Schema) -> Result<Self> {
		let field = |name: &str| schema.get_field(name).map_err(Error::backend);
		Ok(Self {
			doc_type: field("doc_type")?,
			doc_id: field("doc_id")?,
			text: field("text")?,
			category_codes: field("category_codes")?,
			category_paths: field("category_paths")?,
			attributes: field("attributes")?,
			source: field("source")?,
			category_code: field("category_code")?,
			category_name: field("category_name")?,
			parent_code: field("parent_code")?,
			is_root: field("is_root")?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tantivy::tokenizer::TokenStream;

	#[test]
	fn schema_resolves_every_field() {
		assert!(CatalogFields::from_schema(&build_schema()).is_ok());
	}

	#[test]
	fn tokenizer_matches_core_analysis() {
		let index = Index::create_in_ram(build_schema());
		register_tokenizer(&index);
		let mut analyzer = index.tokenizers().get(TOKENIZER).expect("registered");
		let mut stream = analyzer.token_stream("The Green-Bag of Something");
		let mut tokens = Vec::new();
		while stream.advance() {
			tokens.push(stream.token().text.clone());
		}
		assert_eq!(tokens, catalog_core::text::tokenize("The Green-Bag of Something"));
	}
}

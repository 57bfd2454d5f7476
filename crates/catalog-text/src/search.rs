//! Query and facet translation onto tantivy.

use std::collections::{BTreeMap, BTreeSet};

use tantivy::collector::{Count, DocSetCollector, FacetCollector};
use tantivy::query::{AllQuery, BooleanQuery, EmptyQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Facet, IndexRecordOption};
use tantivy::{Index, Searcher, TantivyDocument, Term};

use catalog_core::error::{Error, Result};
use catalog_core::query::{Constraint, QueryPlan};
use catalog_core::text;
use catalog_core::types::Product;

use crate::mapping::decode_product;
use crate::schema::{CatalogFields, PRODUCT};

pub fn term_query(term: Term) -> Box<dyn Query> {
	Box::new(TermQuery::new(term, IndexRecordOption::Basic))
}

/// Every product document.
pub fn all_products(fields: &CatalogFields) -> Box<dyn Query> {
	term_query(Term::from_field_text(fields.doc_type, PRODUCT))
}

/// Disjunction of `terms`; matches nothing when empty.
fn any_of<I>(terms: I) -> Box<dyn Query>
where
	I: IntoIterator<Item = Term>,
{
	let clauses: Vec<(Occur, Box<dyn Query>)> = terms.into_iter().map(|t| (Occur::Should, term_query(t))).collect();
	if clauses.is_empty() {
		Box::new(EmptyQuery)
	} else {
		Box::new(BooleanQuery::new(clauses))
	}
}

/// The query string is normalized through the shared analyzer first, so
/// operators and punctuation never reach the parser.
fn text_query(index: &Index, fields: &CatalogFields, query: &str) -> Result<Box<dyn Query>> {
	let tokens = text::tokenize(query);
	if tokens.is_empty() {
		return Ok(Box::new(EmptyQuery));
	}
	let parser = QueryParser::for_index(index, vec![fields.text]);
	parser
		.parse_query(&tokens.join(" "))
		.map_err(|e| Error::Validation(format!("unparsable query '{query}': {e}")))
}

/// Conjunction of the plan's constraints, restricted to product documents.
pub fn product_query(index: &Index, fields: &CatalogFields, plan: &QueryPlan) -> Result<Box<dyn Query>> {
	let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, all_products(fields))];
	for constraint in &plan.constraints {
		let query: Box<dyn Query> = match constraint {
			Constraint::Text(q) if text::is_match_all(q) => Box::new(AllQuery),
			Constraint::Text(q) => text_query(index, fields, q)?,
			Constraint::Attribute { key, values } => any_of(
				values
					.iter()
					.map(|v| Term::from_facet(fields.attributes, &Facet::from_path([key.as_str(), v.as_str()]))),
			),
			Constraint::Category(codes) => any_of(codes.iter().map(|c| Term::from_field_text(fields.category_codes, c))),
		};
		clauses.push((Occur::Must, query));
	}
	Ok(Box::new(BooleanQuery::new(clauses)))
}

pub fn count(searcher: &Searcher, query: &dyn Query) -> Result<u64> {
	let n = searcher.search(query, &Count).map_err(Error::backend)?;
	Ok(n as u64)
}

/// Decodes every matching product.
pub fn matching_products(searcher: &Searcher, fields: &CatalogFields, query: &dyn Query) -> Result<Vec<Product>> {
	let addresses = searcher.search(query, &DocSetCollector).map_err(Error::backend)?;
	let mut products = Vec::with_capacity(addresses.len());
	for address in addresses {
		let doc: TantivyDocument = searcher.doc(address).map_err(Error::backend)?;
		products.push(decode_product(fields, &doc)?);
	}
	Ok(products)
}

/// Value counts per attribute code among the matching products.
pub fn attribute_counts(searcher: &Searcher, query: &dyn Query, attribute_codes: &[&str]) -> Result<BTreeMap<String, BTreeMap<String, u64>>> {
	let codes: BTreeSet<&str> = attribute_codes.iter().copied().collect();
	let mut result = BTreeMap::new();
	if codes.is_empty() {
		return Ok(result);
	}
	let mut facet_collector = FacetCollector::for_field("attributes");
	for code in &codes {
		facet_collector.add_facet(Facet::from_path([*code]));
	}
	let facet_counts = searcher.search(query, &facet_collector).map_err(Error::backend)?;
	for code in codes {
		let mut values = BTreeMap::new();
		for (facet, count) in facet_counts.get(Facet::from_path([code])) {
			if let Some(value) = facet.to_path().last() {
				values.insert((*value).to_string(), count);
			}
		}
		result.insert(code.to_string(), values);
	}
	Ok(result)
}

/// `(path, count)` for every category path under the matching products,
/// collected one tree level per pass.
pub fn category_path_counts(searcher: &Searcher, query: &dyn Query) -> Result<BTreeMap<String, u64>> {
	let mut result = BTreeMap::new();
	let mut frontier = vec![Facet::root()];
	while !frontier.is_empty() {
		let mut facet_collector = FacetCollector::for_field("category_paths");
		for facet in &frontier {
			facet_collector.add_facet(facet.clone());
		}
		let facet_counts = searcher.search(query, &facet_collector).map_err(Error::backend)?;
		let mut next = Vec::new();
		for facet in &frontier {
			for (child, count) in facet_counts.get(facet.clone()) {
				result.insert(format!("/{}", child.to_path().join("/")), count);
				next.push(child.clone());
			}
		}
		frontier = next;
	}
	Ok(result)
}

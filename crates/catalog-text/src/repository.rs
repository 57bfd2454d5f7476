use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tantivy::collector::DocSetCollector;
use tantivy::query::{BooleanQuery, Occur, Query};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use catalog_core::category_tree::{CategoryTree, CategoryTreeBuilder};
use catalog_core::config::SearchSettings;
use catalog_core::error::{Error, Result};
use catalog_core::facets::{self, CATEGORY_FACET};
use catalog_core::query::{self, QueryPlan};
use catalog_core::traits::{CategoryRepository, ProductRepository};
use catalog_core::types::{Category, CategoryRef, CategoryTeaser, Facet, Filter, Product, SearchMeta, SearchResult, Tree};

use crate::mapping::{category_document, category_record, decode_product, product_document};
use crate::schema::{build_schema, register_tokenizer, CatalogFields, CATEGORY};
use crate::search::{self, all_products, term_query};

struct IndexState {
	index: Index,
	reader: IndexReader,
	fields: CatalogFields,
	// (attribute code, value) -> facet label, first indexed product wins
	labels: HashMap<(String, String), String>,
}

impl IndexState {
	fn create() -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let fields = CatalogFields::from_schema(&schema)?;
		let reader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(Error::backend)?;
		Ok(Self { index, reader, fields, labels: HashMap::new() })
	}

	fn product_by_code(&self, searcher: &Searcher, marketplace_code: &str) -> Result<Option<TantivyDocument>> {
		let query = BooleanQuery::new(vec![
			(Occur::Must, all_products(&self.fields)),
			(Occur::Must, term_query(Term::from_field_text(self.fields.doc_id, marketplace_code))),
		]);
		let addresses = searcher.search(&query, &DocSetCollector).map_err(Error::backend)?;
		match addresses.into_iter().next() {
			Some(address) => Ok(Some(searcher.doc(address).map_err(Error::backend)?)),
			None => Ok(None),
		}
	}

	/// Rebuilds the taxonomy from the stored category documents.
	fn load_tree(&self) -> Result<Option<CategoryTree>> {
		let searcher = self.reader.searcher();
		let query = term_query(Term::from_field_text(self.fields.doc_type, CATEGORY));
		let addresses = searcher.search(query.as_ref(), &DocSetCollector).map_err(Error::backend)?;
		if addresses.is_empty() {
			return Ok(None);
		}
		let mut builder = CategoryTreeBuilder::new();
		for address in addresses {
			let doc: TantivyDocument = searcher.doc(address).map_err(Error::backend)?;
			let record = category_record(&self.fields, &doc);
			let parent = if record.is_root { &record.code } else { &record.parent_code };
			builder.add_category_data(&record.code, &record.name, parent);
		}
		builder.build_tree().map(Some)
	}

	fn document_count(&self, searcher: &Searcher, category_code: &str) -> Result<u64> {
		let query = BooleanQuery::new(vec![
			(Occur::Must, all_products(&self.fields)),
			(Occur::Must, term_query(Term::from_field_text(self.fields.category_codes, category_code))),
		]);
		search::count(searcher, &query)
	}
}

pub struct TantivyRepository {
	settings: SearchSettings,
	state: RwLock<Option<IndexState>>,
	tree_cache: RwLock<Option<Arc<CategoryTree>>>,
}

impl TantivyRepository {
	pub fn new(settings: SearchSettings) -> Self {
		Self { settings, state: RwLock::new(None), tree_cache: RwLock::new(None) }
	}

	fn prepare(&self) -> Result<()> {
		let state = IndexState::create()?;
		*self.state.write() = Some(state);
		*self.tree_cache.write() = None;
		tracing::info!("Tantivy catalog prepared");
		Ok(())
	}

	fn writer(&self, state: &IndexState) -> Result<IndexWriter> {
		state.index.writer(self.settings.writer_memory_bytes).map_err(Error::backend)
	}

	fn commit(&self, state: &IndexState, mut writer: IndexWriter) -> Result<()> {
		writer.commit().map_err(Error::backend)?;
		state.reader.reload().map_err(Error::backend)?;
		*self.tree_cache.write() = None;
		Ok(())
	}

	fn tree(&self, state: &IndexState) -> Result<Option<Arc<CategoryTree>>> {
		if let Some(tree) = self.tree_cache.read().as_ref() {
			return Ok(Some(Arc::clone(tree)));
		}
		let Some(tree) = state.load_tree()? else {
			return Ok(None);
		};
		let tree = Arc::new(tree);
		*self.tree_cache.write() = Some(Arc::clone(&tree));
		Ok(Some(tree))
	}

	/// Merges every chain into the taxonomy and writes documents for the
	/// categories it did not know yet.
	fn upsert_categories(&self, state: &IndexState, writer: &mut IndexWriter, chains: &[Vec<CategoryRef>]) -> Result<usize> {
		let current = self.tree(state)?;
		let known: HashSet<String> = current.iter().flat_map(|t| t.nodes().map(|n| n.code.clone())).collect();
		let mut tree = current.as_deref().cloned();
		for chain in chains {
			match tree.as_mut() {
				Some(tree) => {
					tree.merge_chain(chain);
				}
				None => tree = CategoryTree::from_chain(chain),
			}
		}
		let Some(tree) = tree else {
			return Ok(0);
		};
		let mut added = 0;
		for node in tree.nodes().filter(|n| !known.contains(&n.code)) {
			writer.add_document(category_document(&state.fields, node)).map_err(Error::backend)?;
			added += 1;
		}
		Ok(added)
	}

	fn index_product(&self, state: &IndexState, searcher: &Searcher, writer: &mut IndexWriter, seen: &mut HashSet<String>, product: &Product) -> Result<()> {
		product.validate()?;
		let code = product.marketplace_code();
		if seen.contains(code) || state.product_by_code(searcher, code)?.is_some() {
			return Err(Error::DuplicateKey(code.to_string()));
		}
		let doc = product_document(&state.fields, product, self.settings.products_to_parent_categories)?;
		writer.add_document(doc).map_err(Error::backend)?;
		seen.insert(code.to_string());
		Ok(())
	}

	fn facets(&self, state: &IndexState, searcher: &Searcher, query: &dyn Query, plan: &QueryPlan) -> Result<BTreeMap<String, Facet>> {
		let codes: Vec<&str> = self.settings.facets.iter().map(|f| f.attribute_code.as_str()).collect();
		let counts = search::attribute_counts(searcher, query, &codes)?;
		let no_counts = BTreeMap::new();
		let mut result = BTreeMap::new();
		for (position, config) in self.settings.facets.iter().enumerate() {
			let code = &config.attribute_code;
			let values = counts.get(code).unwrap_or(&no_counts);
			let facet = facets::attribute_facet(config, position, values, |value| {
				state.labels.get(&(code.clone(), value.to_string())).cloned()
			});
			result.insert(code.clone(), facet);
		}
		if self.settings.enable_category_facet {
			let paths = search::category_path_counts(searcher, query)?;
			let tree = self.tree(state)?;
			let facet = facets::category_facet(&paths, self.settings.facets.len(), |code| {
				let node = tree.as_ref()?.get(code)?;
				(!node.name.is_empty()).then(|| node.name.clone())
			});
			result.insert(CATEGORY_FACET.to_string(), facet);
		}
		facets::mark_active(plan, &mut result);
		Ok(result)
	}
}

impl ProductRepository for TantivyRepository {
	fn prepare_index(&self) -> Result<()> {
		self.prepare()
	}

	fn update_products(&self, products: &[Product]) -> Result<()> {
		let mut guard = self.state.write();
		let state = guard.as_mut().ok_or(Error::IndexNotPrepared)?;
		let searcher = state.reader.searcher();
		let mut writer = self.writer(state)?;
		let mut seen = HashSet::new();
		let mut chains = Vec::new();
		let mut first_error = None;
		for product in products {
			match self.index_product(state, &searcher, &mut writer, &mut seen, product) {
				Ok(()) => {
					chains.extend(product.base().all_categories().map(CategoryTeaser::chain).filter(|c| !c.is_empty()));
					for (code, attribute) in &product.base().attributes {
						for value in attribute.values() {
							state
								.labels
								.entry((code.clone(), value.to_string()))
								.or_insert_with(|| attribute.display_label(value));
						}
					}
				}
				Err(e) if e.is_row_error() => {
					tracing::warn!(code = %product.marketplace_code(), error = %e, "Product rejected");
					first_error.get_or_insert(e);
				}
				Err(e) => return Err(e),
			}
		}
		let categories = self.upsert_categories(state, &mut writer, &chains)?;
		self.commit(state, writer)?;
		tracing::debug!(batch = products.len(), indexed = seen.len(), categories, "Products committed");
		first_error.map_or(Ok(()), Err)
	}

	fn clear_products(&self, marketplace_codes: &[String]) -> Result<()> {
		let guard = self.state.write();
		let state = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
		let writer = self.writer(state)?;
		for code in marketplace_codes {
			writer.delete_term(Term::from_field_text(state.fields.doc_id, code));
		}
		self.commit(state, writer)
	}

	fn find_by_marketplace_code(&self, marketplace_code: &str) -> Result<Product> {
		let guard = self.state.read();
		let state = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
		let searcher = state.reader.searcher();
		let doc = state
			.product_by_code(&searcher, marketplace_code)?
			.ok_or_else(|| Error::NotFound(marketplace_code.to_string()))?;
		decode_product(&state.fields, &doc)
	}

	fn find(&self, filters: &[Filter]) -> Result<SearchResult> {
		let guard = self.state.read();
		let state = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
		let plan = QueryPlan::from_filters(filters, self.settings.default_page_size);
		let query = search::product_query(&state.index, &state.fields, &plan)?;
		let searcher = state.reader.searcher();

		let hits = search::matching_products(&searcher, &state.fields, query.as_ref())?;
		let facets = self.facets(state, &searcher, query.as_ref(), &plan)?;
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
		let guard = self.state.read();
		let Some(state) = guard.as_ref() else {
			return 0;
		};
		search::count(&state.reader.searcher(), all_products(&state.fields).as_ref()).unwrap_or_else(|e| {
			tracing::warn!(error = %e, "Counting product documents failed");
			0
		})
	}
}

impl CategoryRepository for TantivyRepository {
	fn prepare_index(&self) -> Result<()> {
		self.prepare()
	}

	fn update_by_category_teasers(&self, teasers: &[CategoryTeaser]) -> Result<()> {
		let guard = self.state.write();
		let state = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
		let mut first_error = None;
		let mut chains = Vec::new();
		for teaser in teasers {
			if let Err(e) = teaser.validate_standalone() {
				tracing::warn!(code = %teaser.code, error = %e, "Category teaser rejected");
				first_error.get_or_insert(e);
				continue;
			}
			chains.push(teaser.chain());
		}
		let mut writer = self.writer(state)?;
		let added = self.upsert_categories(state, &mut writer, &chains)?;
		self.commit(state, writer)?;
		tracing::debug!(teasers = teasers.len(), added, "Categories committed");
		first_error.map_or(Ok(()), Err)
	}

	fn clear_categories(&self, codes: &[String]) -> Result<()> {
		let guard = self.state.write();
		let state = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
		let Some(current) = self.tree(state)? else {
			return Ok(());
		};
		let mut tree = (*current).clone();
		let writer = self.writer(state)?;
		for code in codes {
			if code == tree.root_code() {
				writer.delete_term(Term::from_field_text(state.fields.doc_type, CATEGORY));
				break;
			}
			for removed in tree.remove_subtree(code) {
				writer.delete_term(Term::from_field_text(state.fields.category_code, &removed));
			}
		}
		self.commit(state, writer)
	}

	fn category_tree(&self, code: &str) -> Result<Tree> {
		let guard = self.state.read();
		let state = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
		let tree = self
			.tree(state)?
			.ok_or_else(|| Error::NotFound("category tree is empty".into()))?;
		let searcher = state.reader.searcher();
		let mut counts = HashMap::new();
		for node in tree.nodes() {
			counts.insert(node.code.clone(), state.document_count(&searcher, &node.code)?);
		}
		tree.subtree(code, |c| counts.get(c).copied().unwrap_or(0))
			.ok_or_else(|| Error::NotFound(code.to_string()))
	}

	fn category(&self, code: &str) -> Result<Category> {
		let guard = self.state.read();
		let state = guard.as_ref().ok_or(Error::IndexNotPrepared)?;
		let tree = self
			.tree(state)?
			.ok_or_else(|| Error::NotFound("category tree is empty".into()))?;
		tree.category(code).ok_or_else(|| Error::NotFound(code.to_string()))
	}
}

//! The same scenarios against both backends; results must agree.

use catalog_core::config::{AttributeType, BackendKind, CatalogConfig, FacetConfig, SearchSettings, SortConfig};
use catalog_core::error::Error;
use catalog_core::traits::{CategoryRepository, ProductRepository};
use catalog_core::types::{
    Attribute, AttributeValue, CategoryRef, CategoryTeaser, Filter, Price, Product, SimpleProduct, SortDirection,
};
use catalog_indexing::Backend;

fn settings() -> SearchSettings {
    SearchSettings {
        enable_category_facet: true,
        facets: vec![
            FacetConfig { attribute_code: "brand".into(), amount: 10 },
            FacetConfig { attribute_code: "color".into(), amount: 2 },
        ],
        sorts: vec![SortConfig { attribute_code: "weight".into(), attribute_type: AttributeType::Numeric, asc: true, desc: true }],
        ..SearchSettings::default()
    }
}

fn backends(search: &SearchSettings) -> Vec<Backend> {
    [BackendKind::Memory, BackendKind::Tantivy]
        .into_iter()
        .map(|backend| {
            let config = CatalogConfig { backend, search: search.clone(), ..CatalogConfig::default() };
            let backend = Backend::from_config(&config);
            ProductRepository::prepare_index(&backend).expect("prepare");
            backend
        })
        .collect()
}

fn teaser(code: &str, ancestors: &[&str]) -> CategoryTeaser {
    let mut refs: Vec<CategoryRef> = vec![CategoryRef::new("root", "Root")];
    refs.extend(ancestors.iter().map(|c| CategoryRef::new(c, &c.to_uppercase())));
    CategoryTeaser::with_ancestors(code, &code.to_uppercase(), refs)
}

fn product(code: &str, title: &str, price: f64, brand: &str, colors: &[&str], category: CategoryTeaser) -> Product {
    let mut p = SimpleProduct::default();
    p.base.marketplace_code = code.into();
    p.base.title = title.into();
    p.base.attributes.insert("brand".into(), Attribute::single("brand", brand).with_label(&format!("Brand {brand}")));
    p.base.attributes.insert(
        "color".into(),
        Attribute {
            code: "color".into(),
            code_label: "Color".into(),
            label: String::new(),
            value: AttributeValue::Multi(colors.iter().map(|c| (*c).to_string()).collect()),
        },
    );
    p.base.attributes.insert("weight".into(), Attribute::single("weight", &format!("{}", price * 10.0)));
    p.base.categories.push(category);
    p.teaser.price.default = Price::new(price, "€");
    Product::Simple(p)
}

fn catalog() -> Vec<Product> {
    vec![
        product("A", "Green bag", 7.99, "acme", &["green"], teaser("Sub2", &[])),
        product("B", "Red bag", 8.99, "globex", &["red"], teaser("Sub1_Sub2", &["Sub2"])),
        product("C", "Green shoe", 20.0, "acme", &["green", "white"], teaser("Sub1_Sub2", &["Sub2"])),
        product("D", "Blue hat", 5.0, "initech", &["blue"], teaser("Sub1", &[])),
        product("E", "Summer hat", 12.5, "acme", &["white", "blue"], teaser("Sub1_Sub1", &["Sub1"])),
    ]
}

fn loaded(search: &SearchSettings) -> Vec<Backend> {
    let backends = backends(search);
    for backend in &backends {
        backend.update_products(&catalog()).expect("index");
    }
    backends
}

fn codes(backend: &Backend, filters: &[Filter]) -> Vec<String> {
    backend
        .find(filters)
        .expect("find")
        .hits
        .iter()
        .map(|p| p.marketplace_code().to_string())
        .collect()
}

#[test]
fn reads_before_prepare_fail_everywhere() {
    for kind in [BackendKind::Memory, BackendKind::Tantivy] {
        let backend = Backend::from_config(&CatalogConfig { backend: kind, ..CatalogConfig::default() });
        assert!(matches!(backend.find(&[]), Err(Error::IndexNotPrepared)));
        assert!(matches!(backend.find_by_marketplace_code("A"), Err(Error::IndexNotPrepared)));
        assert!(matches!(backend.category_tree(""), Err(Error::IndexNotPrepared)));
        assert!(matches!(backend.category(""), Err(Error::IndexNotPrepared)));
    }
}

#[test]
fn lookup_returns_the_indexed_product() {
    for backend in loaded(&settings()) {
        for product in catalog() {
            assert_eq!(backend.find_by_marketplace_code(product.marketplace_code()).expect("found"), product);
        }
        assert!(matches!(backend.find_by_marketplace_code("nope"), Err(Error::NotFound(_))));
        assert_eq!(backend.documents_count(), 5);
    }
}

#[test]
fn readding_a_code_never_duplicates_hits() {
    for backend in loaded(&settings()) {
        let again = product("A", "Changed", 1.0, "acme", &[], teaser("Sub2", &[]));
        assert!(matches!(backend.update_products(&[again]), Err(Error::DuplicateKey(_))));
        let hits = codes(&backend, &[Filter::query("*")]);
        assert_eq!(hits.iter().filter(|c| *c == "A").count(), 1);
        assert_eq!(backend.find_by_marketplace_code("A").expect("found").title(), "Green bag");
    }
}

#[test]
fn category_filter_includes_descendants_when_propagating() {
    for backend in loaded(&settings()) {
        assert_eq!(codes(&backend, &[Filter::category("Sub2")]), vec!["A", "B", "C"]);
        assert_eq!(codes(&backend, &[Filter::category("Sub1_Sub2")]), vec!["B", "C"]);
        assert_eq!(codes(&backend, &[Filter::key_value("category", ["Sub1_Sub1", "Sub2"])]), vec!["A", "B", "C", "E"]);
    }
    let direct = SearchSettings { products_to_parent_categories: false, ..settings() };
    for backend in loaded(&direct) {
        assert_eq!(codes(&backend, &[Filter::category("Sub2")]), vec!["A"]);
        assert_eq!(codes(&backend, &[Filter::category("Sub1")]), vec!["D"]);
    }
}

#[test]
fn price_sort_reverses() {
    for backend in loaded(&settings()) {
        let filters = |direction| vec![Filter::key_value("brand", ["acme", "globex"]), Filter::query("bag"), Filter::sort("price", direction)];
        assert_eq!(codes(&backend, &filters(SortDirection::Ascending)), vec!["A", "B"]);
        assert_eq!(codes(&backend, &filters(SortDirection::Descending)), vec!["B", "A"]);
    }
}

#[test]
fn pagination_law_holds() {
    for backend in loaded(&settings()) {
        let all = codes(&backend, &[Filter::sort("price", SortDirection::Ascending)]);
        for page in 1..=4 {
            let result = backend
                .find(&[Filter::sort("price", SortDirection::Ascending), Filter::page(page), Filter::page_size(2)])
                .expect("find");
            let start = ((page - 1) * 2).min(all.len());
            let stop = (page * 2).min(all.len());
            let hits: Vec<String> = result.hits.iter().map(|p| p.marketplace_code().to_string()).collect();
            assert_eq!(hits, all[start..stop].to_vec());
            assert_eq!(result.meta.num_pages, 3);
            assert_eq!(result.meta.num_results, 5);
            assert_eq!(result.meta.page, page);
        }
    }
}

#[test]
fn category_facet_nests_paths() {
    for backend in loaded(&settings()) {
        let result = backend.find(&[Filter::category("Sub2")]).expect("find");
        let facet = &result.facets["category"];
        assert_eq!(facet.items.len(), 1);
        let sub2 = &facet.items[0];
        assert_eq!((sub2.value.as_str(), sub2.label.as_str(), sub2.count), ("Sub2", "SUB2", 3));
        assert!(sub2.active);
        assert_eq!(sub2.items.len(), 1);
        assert_eq!((sub2.items[0].value.as_str(), sub2.items[0].count), ("Sub1_Sub2", 2));
    }
}

#[test]
fn results_agree_between_backends() {
    let scenarios: Vec<Vec<Filter>> = vec![
        vec![],
        vec![Filter::query("green")],
        vec![Filter::query("HAT"), Filter::key_value("color", ["blue"])],
        vec![Filter::query("the of")],
        vec![Filter::key_value("color", ["white", "red"]), Filter::sort("weight", SortDirection::Descending)],
        vec![Filter::category("Sub1"), Filter::sort("title", SortDirection::Descending)],
        vec![Filter::key_value("brand", Vec::<String>::new()), Filter::query("*")],
        vec![Filter::key_value("size", ["xl"])],
        vec![Filter::query("bag"), Filter::page(2), Filter::page_size(1)],
    ];
    let backends = loaded(&settings());
    for filters in scenarios {
        let memory = backends[0].find(&filters).expect("memory");
        let text = backends[1].find(&filters).expect("tantivy");
        assert_eq!(memory, text, "filters: {filters:?}");
    }
}

#[test]
fn attribute_facets_truncate_and_label() {
    for backend in loaded(&settings()) {
        let result = backend.find(&[Filter::key_value("brand", ["acme"])]).expect("find");
        let brand = &result.facets["brand"];
        assert_eq!(brand.items.len(), 1);
        assert_eq!((brand.items[0].label.as_str(), brand.items[0].count), ("Brand acme", 3));
        assert!(brand.items[0].selected && brand.items[0].active);
        let color = &result.facets["color"];
        let values: Vec<(&str, u64)> = color.items.iter().map(|i| (i.value.as_str(), i.count)).collect();
        assert_eq!(values, vec![("white", 2), ("blue", 1)]);
    }
}

#[test]
fn trees_agree_between_backends() {
    let backends = loaded(&settings());
    for backend in &backends {
        backend
            .update_by_category_teasers(&[teaser("Sub3", &[]), teaser("Sub1_Sub1", &["Sub1"])])
            .expect("teasers");
    }
    let memory = backends[0].category_tree("").expect("memory tree");
    let text = backends[1].category_tree("").expect("tantivy tree");
    assert_eq!(memory, text);
    assert_eq!(memory.code, "root");
    let children: Vec<&str> = memory.children.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(children, vec!["Sub1", "Sub2", "Sub3"]);
    assert_eq!(memory.find("Sub1").map(|t| t.document_count), Some(2));
    assert_eq!(memory.find("Sub1_Sub1").map(|t| t.path.as_str()), Some("/Sub1/Sub1_Sub1"));
    for backend in &backends {
        assert_eq!(backend.category_tree("Sub2").expect("subtree").children.len(), 1);
        assert_eq!(backend.category("").expect("root").code, "root");
        assert!(matches!(backend.category("missing"), Err(Error::NotFound(_))));
    }
}

#[test]
fn non_finite_prices_are_rejected_rows() {
    for backend in backends(&settings()) {
        let mut discounted = product("I", "Infinite deal", 3.0, "acme", &[], teaser("Sub2", &[]));
        if let Product::Simple(p) = &mut discounted {
            p.teaser.price.discounted = Some(Price::new(f64::INFINITY, "€"));
            p.teaser.price.is_discounted = true;
        }
        let batch = [
            product("OK", "Fine bag", 1.0, "acme", &[], teaser("Sub2", &[])),
            product("NAN", "Broken bag", f64::NAN, "acme", &[], teaser("Sub2", &[])),
            discounted,
        ];
        assert!(matches!(backend.update_products(&batch), Err(Error::Validation(_))));

        let result = backend.find(&[]).expect("find");
        assert_eq!(codes(&backend, &[]), vec!["OK"]);
        assert_eq!(result.meta.num_results, 1);
        assert_eq!(backend.documents_count(), 1);
        assert!(matches!(backend.find_by_marketplace_code("NAN"), Err(Error::NotFound(_))));
    }
}

#[test]
fn slashes_in_category_codes_are_rejected() {
    for backend in loaded(&settings()) {
        let sliced = product("X", "Sliced", 1.0, "acme", &[], teaser("x/y", &[]));
        assert!(matches!(backend.update_products(&[sliced]), Err(Error::Validation(_))));
        assert!(matches!(backend.update_by_category_teasers(&[teaser("a/b", &[])]), Err(Error::Validation(_))));
        assert!(matches!(backend.update_by_category_teasers(&[teaser("leaf", &["p/q"])]), Err(Error::Validation(_))));

        let facet = &backend.find(&[]).expect("find").facets["category"];
        let top: Vec<&str> = facet.items.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(top, vec!["Sub1", "Sub2"]);
        assert!(matches!(backend.category("x"), Err(Error::NotFound(_))));
        assert!(matches!(backend.category("leaf"), Err(Error::NotFound(_))));
    }
}

#[test]
fn page_zero_reports_the_first_page() {
    for backend in loaded(&settings()) {
        let result = backend.find(&[Filter::page(0), Filter::page_size(2)]).expect("find");
        assert_eq!((result.hits.len(), result.meta.page, result.meta.num_pages), (2, 1, 3));
    }
}

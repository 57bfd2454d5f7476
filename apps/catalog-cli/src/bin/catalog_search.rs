use std::env;

use catalog_cli::{index_catalog, init_tracing, SearchArgs};
use catalog_core::traits::ProductRepository;
use catalog_core::types::FacetItem;

fn print_items(items: &[FacetItem], depth: usize) {
    for item in items {
        let marker = if item.selected { " *" } else { "" };
        println!("  {}- {} ({}): {}{}", "  ".repeat(depth), item.label, item.value, item.count, marker);
        print_items(&item.items, depth + 1);
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().skip(1).collect();
    let args = SearchArgs::parse(&args).map_err(|e| {
        eprintln!("Usage: catalog-search <products_dir> [query] [--category C] [--filter key=v1,v2] [--sort field:asc|desc] [--page N] [--page-size N] [--backend memory|tantivy]");
        e
    })?;

    let (catalog, backend) = index_catalog(&args.common)?;
    println!("🔍 catalog-search\n================");
    println!("Backend: {:?}", catalog.backend);
    println!("Documents: {}", backend.documents_count());

    let result = backend.find(&args.filters)?;
    let meta = &result.meta;
    println!("\n🔍 Found {} results (page {} of {})", meta.num_results, meta.page, meta.num_pages.max(1));
    for (i, hit) in result.hits.iter().enumerate() {
        let price = hit.teaser().price.final_price();
        println!("\n  {}. {}  {}", i + 1, hit.marketplace_code(), hit.title());
        println!("     💶 {:.2} {}", price.amount, price.currency);
    }

    if !result.facets.is_empty() {
        println!("\n📊 Facets:");
        let mut facets: Vec<_> = result.facets.values().collect();
        facets.sort_by_key(|f| f.position);
        for facet in facets {
            println!("  {} ({:?})", facet.label, facet.kind);
            print_items(&facet.items, 1);
        }
    }

    println!("\n↕️  Sort options:");
    for option in &meta.sort_options {
        let selected = match (option.selected_asc, option.selected_desc) {
            (true, _) => " [asc]",
            (_, true) => " [desc]",
            _ => "",
        };
        println!("  {} ({}){}", option.label, option.field, selected);
    }
    Ok(())
}

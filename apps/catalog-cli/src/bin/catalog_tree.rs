use std::env;

use catalog_cli::{index_catalog, init_tracing, TreeArgs};
use catalog_core::traits::CategoryRepository;
use catalog_core::types::Tree;

fn print_tree(tree: &Tree, depth: usize) {
    println!("{}{} ({})  {} products  {}", "  ".repeat(depth), tree.name, tree.code, tree.document_count, tree.path);
    for child in &tree.children {
        print_tree(child, depth + 1);
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().skip(1).collect();
    let args = TreeArgs::parse(&args).map_err(|e| {
        eprintln!("Usage: catalog-tree <products_dir> [category_code] [--backend memory|tantivy]");
        e
    })?;

    let (catalog, backend) = index_catalog(&args.common)?;
    let code = args.category.as_deref().unwrap_or("");
    println!("🌳 catalog-tree\n==============");
    println!("Backend: {:?}", catalog.backend);

    let category = backend.category(code)?;
    println!("Category: {} ({}) path={}\n", category.name, category.code, category.path);
    print_tree(&backend.category_tree(code)?, 0);
    Ok(())
}

//! Setup shared by the catalog binaries: logging, config, argument parsing
//! and the indexing run that fills the selected backend.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use catalog_core::config::{resolve_with_base, BackendKind, CatalogConfig, Config};
use catalog_core::types::{Filter, SortDirection};
use catalog_indexing::{Backend, IndexProcess, ProductFileLoader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_PRODUCTS_DIR: &str = "./data/products";

/// Logs go to stderr so result listings stay clean on stdout.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tantivy=warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Options common to every binary.
#[derive(Debug, Default, PartialEq)]
pub struct CommonArgs {
    pub products_dir: Option<PathBuf>,
    pub backend: Option<BackendKind>,
}

/// Arguments of `catalog-search`.
#[derive(Debug, Default, PartialEq)]
pub struct SearchArgs {
    pub common: CommonArgs,
    pub filters: Vec<Filter>,
}

impl SearchArgs {
    /// `<products_dir> [query] [--category C] [--filter key=v1,v2]
    /// [--sort field:asc|desc] [--page N] [--page-size N] [--backend B]`
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut positional = 0;
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                "--backend" | "-b" => parsed.common.backend = Some(parse_backend(value(args, &mut i, arg)?)?),
                "--category" | "-c" => parsed.filters.push(Filter::category(value(args, &mut i, arg)?)),
                "--filter" | "-f" => {
                    let raw = value(args, &mut i, arg)?;
                    let Some((key, values)) = raw.split_once('=') else {
                        bail!("--filter expects key=value[,value...], got '{raw}'");
                    };
                    parsed.filters.push(Filter::key_value(key, values.split(',').filter(|v| !v.is_empty())));
                }
                "--sort" | "-s" => {
                    let raw = value(args, &mut i, arg)?;
                    let (field, direction) = raw.split_once(':').unwrap_or((raw, "asc"));
                    let direction: SortDirection = direction.parse()?;
                    parsed.filters.push(Filter::sort(field, direction));
                }
                "--page" | "-p" => parsed.filters.push(Filter::page(number(value(args, &mut i, arg)?, arg)?)),
                "--page-size" => parsed.filters.push(Filter::page_size(number(value(args, &mut i, arg)?, arg)?)),
                _ if arg.starts_with('-') => bail!("unknown option '{arg}'"),
                _ => {
                    match positional {
                        0 => parsed.common.products_dir = Some(PathBuf::from(arg)),
                        1 => parsed.filters.push(Filter::query(arg)),
                        _ => bail!("unexpected argument '{arg}'"),
                    }
                    positional += 1;
                }
            }
            i += 1;
        }
        Ok(parsed)
    }
}

/// Arguments of `catalog-tree`: `<products_dir> [category_code] [--backend B]`.
#[derive(Debug, Default, PartialEq)]
pub struct TreeArgs {
    pub common: CommonArgs,
    pub category: Option<String>,
}

impl TreeArgs {
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                "--backend" | "-b" => parsed.common.backend = Some(parse_backend(value(args, &mut i, arg)?)?),
                _ if arg.starts_with('-') => bail!("unknown option '{arg}'"),
                _ if parsed.common.products_dir.is_none() => parsed.common.products_dir = Some(PathBuf::from(arg)),
                _ if parsed.category.is_none() => parsed.category = Some(arg.to_string()),
                _ => bail!("unexpected argument '{arg}'"),
            }
            i += 1;
        }
        Ok(parsed)
    }
}

fn value<'a>(args: &'a [String], i: &mut usize, option: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    args.get(*i).map(String::as_str).with_context(|| format!("{option} requires a value"))
}

fn number(raw: &str, option: &str) -> anyhow::Result<usize> {
    raw.parse().with_context(|| format!("{option} requires a number, got '{raw}'"))
}

fn parse_backend(raw: &str) -> anyhow::Result<BackendKind> {
    match raw.to_ascii_lowercase().as_str() {
        "memory" | "mem" => Ok(BackendKind::Memory),
        "tantivy" | "text" => Ok(BackendKind::Tantivy),
        other => bail!("unknown backend '{other}' (expected memory or tantivy)"),
    }
}

/// Loads config, applies the command line overrides and runs one indexing
/// pass over the products directory.
pub fn index_catalog(common: &CommonArgs) -> anyhow::Result<(CatalogConfig, Backend)> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let mut catalog = config.catalog()?;
    if let Some(backend) = common.backend {
        catalog.backend = backend;
    }

    let products_dir = match &common.products_dir {
        Some(dir) => dir.clone(),
        None => {
            let dir: String = config.get("data.products_dir").unwrap_or_else(|_| DEFAULT_PRODUCTS_DIR.to_string());
            resolve_with_base(&env::current_dir()?, dir)
        }
    };
    if !products_dir.is_dir() {
        bail!("products directory {} does not exist", products_dir.display());
    }

    let loader = ProductFileLoader::new(&products_dir).with_progress(true);
    let process = IndexProcess::new(Arc::new(loader), Backend::from_config(&catalog), catalog.indexing.clone());
    let stats = process.run().context("indexing run failed")?;
    tracing::info!(dir = %products_dir.display(), products = stats.products, "Catalog loaded");
    Ok((catalog, process.backend().clone()))
}

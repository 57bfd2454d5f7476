use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.catalog()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// The `[catalog]` section, defaulted when absent, validated.
    pub fn catalog(&self) -> Result<CatalogConfig> {
        let catalog = if self.figment.find_value("catalog").is_ok() {
            self.get::<CatalogConfig>("catalog")?
        } else {
            CatalogConfig::default()
        };
        catalog.validate()?;
        Ok(catalog)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Tantivy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub backend: BackendKind,
    pub indexing: IndexingConfig,
    pub search: SearchSettings,
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.indexing.batch_size == 0 {
            return Err(Error::InvalidConfig("indexing.batch_size must be positive".into()));
        }
        for facet in &self.search.facets {
            if facet.attribute_code.is_empty() {
                return Err(Error::InvalidConfig("facet attribute_code must not be empty".into()));
            }
            if facet.amount == 0 {
                return Err(Error::InvalidConfig(format!("facet {} needs a positive amount", facet.attribute_code)));
            }
        }
        if let Some(sort) = self.search.sorts.iter().find(|s| s.attribute_code.is_empty()) {
            return Err(Error::InvalidConfig(format!("sort config {sort:?} has no attribute_code")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub enabled: bool,
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self { enabled: true, batch_size: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Also file products under every ancestor of their categories.
    pub products_to_parent_categories: bool,
    pub enable_category_facet: bool,
    pub default_page_size: usize,
    pub writer_memory_bytes: usize,
    pub facets: Vec<FacetConfig>,
    pub sorts: Vec<SortConfig>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            products_to_parent_categories: true,
            enable_category_facet: false,
            default_page_size: 100,
            writer_memory_bytes: 50_000_000,
            facets: Vec::new(),
            sorts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetConfig {
    pub attribute_code: String,
    pub amount: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Numeric,
    Bool,
    #[default]
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub attribute_code: String,
    #[serde(default)]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub asc: bool,
    #[serde(default)]
    pub desc: bool,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> Config {
        Config::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn missing_section_uses_defaults() {
        let catalog = config("").catalog().expect("catalog");
        assert_eq!(catalog, CatalogConfig::default());
        assert!(catalog.search.products_to_parent_categories);
        assert_eq!(catalog.search.default_page_size, 100);
    }

    #[test]
    fn reads_facet_and_sort_config() {
        let catalog = config(
            r#"
            [catalog]
            backend = "tantivy"
            [catalog.search]
            enable_category_facet = true
            facets = [{ attribute_code = "brand", amount = 10 }]
            sorts = [{ attribute_code = "weight", attribute_type = "numeric", asc = true, desc = true }]
            "#,
        )
        .catalog()
        .expect("catalog");
        assert_eq!(catalog.backend, BackendKind::Tantivy);
        assert!(catalog.search.enable_category_facet);
        assert_eq!(catalog.search.facets[0].attribute_code, "brand");
        assert_eq!(catalog.search.sorts[0].attribute_type, AttributeType::Numeric);
        assert_eq!(catalog.indexing.batch_size, 100);
    }

    #[test]
    fn rejects_zero_facet_amount() {
        let result = config(
            r#"
            [catalog.search]
            facets = [{ attribute_code = "brand", amount = 0 }]
            "#,
        )
        .catalog();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn resolve_with_base_keeps_absolute_paths() {
        let base = Path::new("/srv/catalog");
        assert_eq!(resolve_with_base(base, "/data/products"), PathBuf::from("/data/products"));
        assert_eq!(resolve_with_base(base, "products"), PathBuf::from("/srv/catalog/products"));
    }
}

//! Domain types shared by both catalog backends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

pub type MarketplaceCode = String;

/// A product as handed to the engine by a loader.
///
/// The concrete variant survives encoding (see `codec`), which is why the
/// enum is internally tagged instead of untagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Product {
    Simple(SimpleProduct),
    Configurable(ConfigurableProduct),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleProduct {
    #[serde(flatten)]
    pub base: BasicProductData,
    #[serde(default)]
    pub teaser: TeaserData,
    #[serde(default)]
    pub saleable: Saleable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurableProduct {
    #[serde(flatten)]
    pub base: BasicProductData,
    #[serde(default)]
    pub teaser: TeaserData,
    #[serde(default)]
    pub variation_attributes: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(flatten)]
    pub base: BasicProductData,
    #[serde(default)]
    pub saleable: Saleable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicProductData {
    pub marketplace_code: MarketplaceCode,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default)]
    pub categories: Vec<CategoryTeaser>,
    #[serde(default)]
    pub main_category: Option<CategoryTeaser>,
}

impl BasicProductData {
    pub fn attribute(&self, code: &str) -> Option<&Attribute> {
        self.attributes.get(code)
    }

    /// Direct categories followed by the main category.
    pub fn all_categories(&self) -> impl Iterator<Item = &CategoryTeaser> {
        self.categories.iter().chain(self.main_category.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeaserData {
    #[serde(default)]
    pub short_title: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub price: PriceInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Saleable {
    #[serde(default)]
    pub is_saleable: bool,
    #[serde(default)]
    pub active_price: PriceInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
}

impl Price {
    pub fn new(amount: f64, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    #[serde(default)]
    pub default: Price,
    #[serde(default)]
    pub discounted: Option<Price>,
    #[serde(default)]
    pub is_discounted: bool,
}

impl PriceInfo {
    pub fn final_price(&self) -> &Price {
        match (&self.discounted, self.is_discounted) {
            (Some(discounted), true) => discounted,
            _ => &self.default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub code: String,
    #[serde(default)]
    pub code_label: String,
    #[serde(default)]
    pub label: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multi(Vec<String>),
}

impl Attribute {
    pub fn single(code: &str, value: &str) -> Self {
        Self {
            code: code.to_string(),
            code_label: String::new(),
            label: String::new(),
            value: AttributeValue::Single(value.to_string()),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn values(&self) -> Vec<&str> {
        match &self.value {
            AttributeValue::Single(v) => vec![v.as_str()],
            AttributeValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// First value, used when a single comparable value is needed (sorting).
    pub fn first_value(&self) -> Option<&str> {
        match &self.value {
            AttributeValue::Single(v) => Some(v.as_str()),
            AttributeValue::Multi(vs) => vs.first().map(String::as_str),
        }
    }

    /// Display label for one of the attribute's values in a facet.
    pub fn display_label(&self, value: &str) -> String {
        match &self.value {
            AttributeValue::Single(_) if !self.label.is_empty() => self.label.clone(),
            _ => value.to_string(),
        }
    }
}

impl Product {
    pub fn base(&self) -> &BasicProductData {
        match self {
            Self::Simple(p) => &p.base,
            Self::Configurable(p) => &p.base,
        }
    }

    pub fn teaser(&self) -> &TeaserData {
        match self {
            Self::Simple(p) => &p.teaser,
            Self::Configurable(p) => &p.teaser,
        }
    }

    pub fn marketplace_code(&self) -> &str {
        &self.base().marketplace_code
    }

    pub fn title(&self) -> &str {
        &self.base().title
    }

    /// Row checks both backends apply before storing a product: a
    /// marketplace code, finite prices and category codes usable as path
    /// segments.
    pub fn validate(&self) -> Result<()> {
        let code = self.marketplace_code();
        if code.is_empty() {
            return Err(Error::Validation("product without marketplace code".into()));
        }
        if let Some(price) = self.prices().into_iter().find(|p| !p.amount.is_finite()) {
            return Err(Error::Validation(format!("product {code} has a non-finite price {}", price.amount)));
        }
        for teaser in self.base().all_categories() {
            teaser.validate()?;
        }
        Ok(())
    }

    fn prices(&self) -> Vec<&Price> {
        let mut infos = vec![&self.teaser().price];
        match self {
            Self::Simple(p) => infos.push(&p.saleable.active_price),
            Self::Configurable(p) => infos.extend(p.variants.iter().map(|v| &v.saleable.active_price)),
        }
        infos
            .into_iter()
            .flat_map(|info| std::iter::once(&info.default).chain(info.discounted.as_ref()))
            .collect()
    }

    /// All free text the engines tokenize for text queries.
    pub fn searchable_text(&self) -> Vec<&str> {
        let base = self.base();
        let teaser = self.teaser();
        let mut text = vec![
            base.marketplace_code.as_str(),
            base.title.as_str(),
            base.short_description.as_str(),
            teaser.short_title.as_str(),
            teaser.short_description.as_str(),
        ];
        text.extend(base.keywords.iter().map(String::as_str));
        text
    }
}

/// One `(code, name)` link of an ancestor chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl CategoryRef {
    pub fn new(code: &str, name: &str) -> Self {
        Self { code: code.to_string(), name: name.to_string() }
    }
}

/// Denormalized category snapshot carried by a product.
///
/// `ancestors` is root-first and excludes the category itself, except for a
/// self-parented root whose only ancestor is its own code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTeaser {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub ancestors: Vec<CategoryRef>,
}

impl CategoryTeaser {
    pub fn new(code: &str, name: &str) -> Self {
        Self { code: code.to_string(), name: name.to_string(), ..Self::default() }
    }

    /// Builds a teaser from root-first ancestors and sets its materialized path.
    pub fn with_ancestors(code: &str, name: &str, ancestors: Vec<CategoryRef>) -> Self {
        let mut teaser = Self { code: code.to_string(), name: name.to_string(), path: String::new(), ancestors };
        teaser.path = teaser.category_path();
        teaser
    }

    pub fn is_root(&self) -> bool {
        match self.ancestors.last() {
            None => true,
            Some(parent) => parent.code == self.code,
        }
    }

    pub fn parent(&self) -> Option<&CategoryRef> {
        if self.is_root() {
            return None;
        }
        self.ancestors.last()
    }

    /// Root-first chain including the category itself. Empty for a teaser
    /// without a code.
    pub fn chain(&self) -> Vec<CategoryRef> {
        if self.code.is_empty() {
            return Vec::new();
        }
        let mut chain: Vec<CategoryRef> = self
            .ancestors
            .iter()
            .filter(|a| a.code != self.code)
            .cloned()
            .collect();
        chain.push(CategoryRef::new(&self.code, &self.name));
        chain
    }

    /// Slash-joined codes of the chain with the root segment dropped.
    pub fn category_path(&self) -> String {
        self.chain().iter().skip(1).fold(String::new(), |mut path, c| {
            path.push('/');
            path.push_str(&c.code);
            path
        })
    }

    /// Codes end up as segments of materialized and facet paths, so none of
    /// them may contain `/`.
    pub fn validate(&self) -> Result<()> {
        let codes = std::iter::once(self.code.as_str()).chain(self.ancestors.iter().map(|a| a.code.as_str()));
        for code in codes {
            if code.contains('/') {
                return Err(Error::Validation(format!("category code '{code}' contains '/'")));
            }
        }
        Ok(())
    }

    /// Checks for a teaser handed in on its own, which must carry a code.
    pub fn validate_standalone(&self) -> Result<()> {
        if self.code.is_empty() {
            return Err(Error::Validation(format!("category teaser '{}' without code", self.name)));
        }
        self.validate()
    }

    /// Materialized paths of the category and each non-root ancestor.
    pub fn ancestor_paths(&self) -> Vec<String> {
        let chain = self.chain();
        let mut paths = Vec::new();
        let mut path = String::new();
        for c in chain.iter().skip(1) {
            path.push('/');
            path.push_str(&c.code);
            paths.push(path.clone());
        }
        paths
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "asc" | "ascending" => Ok(Self::Ascending),
            "d" | "desc" | "descending" => Ok(Self::Descending),
            other => Err(Error::Validation(format!("unknown sort direction '{other}'"))),
        }
    }
}

/// Search filters. Structural filters (`Query`, `KeyValue`, `Category`)
/// narrow the candidate set; the rest shape the result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Query(String),
    KeyValue { key: String, values: Vec<String> },
    Category(String),
    Sort { field: String, direction: SortDirection },
    Page(usize),
    PageSize(usize),
}

impl Filter {
    pub fn query(q: &str) -> Self {
        Self::Query(q.to_string())
    }

    pub fn key_value<I, S>(key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::KeyValue { key: key.to_string(), values: values.into_iter().map(Into::into).collect() }
    }

    pub fn category(code: &str) -> Self {
        Self::Category(code.to_string())
    }

    pub fn sort(field: &str, direction: SortDirection) -> Self {
        Self::Sort { field: field.to_string(), direction }
    }

    pub fn page(page: usize) -> Self {
        Self::Page(page)
    }

    pub fn page_size(size: usize) -> Self {
        Self::PageSize(size)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetKind {
    #[default]
    List,
    Tree,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetItem {
    pub label: String,
    pub value: String,
    pub count: u64,
    pub selected: bool,
    pub active: bool,
    pub items: Vec<FacetItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub kind: FacetKind,
    pub name: String,
    pub label: String,
    pub position: usize,
    pub items: Vec<FacetItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortOption {
    pub label: String,
    pub field: String,
    pub asc: String,
    pub desc: String,
    pub selected_asc: bool,
    pub selected_desc: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMeta {
    pub num_results: usize,
    pub num_pages: usize,
    pub page: usize,
    pub sort_options: Vec<SortOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<Product>,
    pub facets: BTreeMap<String, Facet>,
    pub meta: SearchMeta,
}

/// Flat category summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub code: String,
    pub name: String,
    pub path: String,
}

/// Owned snapshot of a category subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub code: String,
    pub name: String,
    pub path: String,
    pub document_count: u64,
    pub active: bool,
    pub children: Vec<Tree>,
}

impl Tree {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child(&self, code: &str) -> Option<&Tree> {
        self.children.iter().find(|c| c.code == code)
    }

    /// Depth-first search for a node by code.
    pub fn find(&self, code: &str) -> Option<&Tree> {
        if self.code == code {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(code))
    }
}

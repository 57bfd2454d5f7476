//! Backend independent parts of query evaluation: filter partitioning,
//! sorting and pagination.

use std::cmp::Ordering;

use crate::config::{AttributeType, SortConfig};
use crate::types::{Filter, Product, SortDirection, SortOption};

pub const DEFAULT_SORT_FIELD: &str = "relevance";
pub const PRICE_SORT_FIELD: &str = "price";

/// A structural filter narrowing the candidate set.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Text(String),
    Attribute { key: String, values: Vec<String> },
    Category(Vec<String>),
}

/// Filters partitioned by kind, in the order they were given.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub constraints: Vec<Constraint>,
    pub sort_field: String,
    pub sort_direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

impl QueryPlan {
    pub fn from_filters(filters: &[Filter], default_page_size: usize) -> Self {
        let mut plan = Self {
            constraints: Vec::new(),
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_direction: SortDirection::Ascending,
            page: 1,
            page_size: default_page_size,
        };
        for filter in filters {
            match filter {
                Filter::Query(q) => plan.constraints.push(Constraint::Text(q.clone())),
                Filter::KeyValue { key, values } if key == "category" => {
                    plan.constraints.push(Constraint::Category(values.clone()));
                }
                Filter::KeyValue { key, values } => {
                    plan.constraints.push(Constraint::Attribute { key: key.clone(), values: values.clone() });
                }
                Filter::Category(code) => plan.constraints.push(Constraint::Category(vec![code.clone()])),
                Filter::Sort { field, direction } => {
                    plan.sort_field.clone_from(field);
                    plan.sort_direction = *direction;
                }
                Filter::Page(page) => plan.page = (*page).max(1),
                Filter::PageSize(size) => plan.page_size = *size,
            }
        }
        plan
    }

    /// Selected values per attribute, for marking facet items active.
    pub fn selected_attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Attribute { key, values } => Some((key.as_str(), values.as_slice())),
            _ => None,
        })
    }

    pub fn selected_categories(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().flat_map(|c| match c {
            Constraint::Category(codes) => codes.iter().map(String::as_str).collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl SortValue {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

fn sort_value(product: &Product, field: &str, attribute_type: AttributeType) -> Option<SortValue> {
    if field.eq_ignore_ascii_case("title") || field.eq_ignore_ascii_case(DEFAULT_SORT_FIELD) {
        return Some(SortValue::Text(product.title().to_string()));
    }
    if field.eq_ignore_ascii_case(PRICE_SORT_FIELD) {
        return Some(SortValue::Number(product.teaser().price.final_price().amount));
    }
    let raw = product.base().attribute(field)?.first_value()?;
    match attribute_type {
        AttributeType::Numeric => raw.trim().parse().ok().map(SortValue::Number),
        AttributeType::Bool => raw.trim().parse().ok().map(SortValue::Bool),
        AttributeType::Text => Some(SortValue::Text(raw.to_string())),
    }
}

/// Sorts by `field`, missing values last in either direction. Ties keep
/// marketplace code order.
pub fn sort_products(mut products: Vec<Product>, field: &str, direction: SortDirection, sorts: &[SortConfig]) -> Vec<Product> {
    products.sort_by(|a, b| a.marketplace_code().cmp(b.marketplace_code()));
    let attribute_type = sorts
        .iter()
        .find(|s| s.attribute_code == field)
        .map_or(AttributeType::Text, |s| s.attribute_type);
    let mut keyed: Vec<(Option<SortValue>, Product)> = products
        .into_iter()
        .map(|p| (sort_value(&p, field, attribute_type), p))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match direction {
            SortDirection::Ascending => a.compare(b),
            SortDirection::Descending => a.compare(b).reverse(),
        },
    });
    keyed.into_iter().map(|(_, p)| p).collect()
}

/// Slices one 1-based page out of `items` and returns it with the page
/// count. A page size of 0 disables pagination.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> (Vec<T>, usize) {
    if page_size == 0 {
        return (items, 0);
    }
    let total = items.len();
    let start = page.saturating_sub(1).saturating_mul(page_size).min(total);
    let stop = start.saturating_add(page_size).min(total);
    let page_items = items.into_iter().skip(start).take(stop - start).collect();
    (page_items, total.div_ceil(page_size))
}

/// Price is always offered; configured sorts follow.
pub fn sort_options(sorts: &[SortConfig], field: &str, direction: SortDirection) -> Vec<SortOption> {
    let selected = |code: &str, dir: SortDirection| code.eq_ignore_ascii_case(field) && direction == dir;
    let mut options = vec![SortOption {
        label: "Price".to_string(),
        field: PRICE_SORT_FIELD.to_string(),
        asc: PRICE_SORT_FIELD.to_string(),
        desc: PRICE_SORT_FIELD.to_string(),
        selected_asc: selected(PRICE_SORT_FIELD, SortDirection::Ascending),
        selected_desc: selected(PRICE_SORT_FIELD, SortDirection::Descending),
    }];
    for sort in sorts {
        let code = sort.attribute_code.as_str();
        options.push(SortOption {
            label: code.to_string(),
            field: code.to_string(),
            asc: if sort.asc { code.to_string() } else { String::new() },
            desc: if sort.desc { code.to_string() } else { String::new() },
            selected_asc: sort.asc && selected(code, SortDirection::Ascending),
            selected_desc: sort.desc && selected(code, SortDirection::Descending),
        });
    }
    options
}

//! Facet assembly shared by both backends. Backends only supply counts;
//! labels, ordering, truncation and active marking happen here.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::FacetConfig;
use crate::query::QueryPlan;
use crate::types::{Facet, FacetItem, FacetKind, Product};

pub const CATEGORY_FACET: &str = "category";

/// Counts hits per value of `attribute_code`. A product carrying the same
/// value twice counts once.
pub fn count_attribute_values<'a, I>(hits: I, attribute_code: &str) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = &'a Product>,
{
    let mut counts = BTreeMap::new();
    for product in hits {
        let Some(attribute) = product.base().attribute(attribute_code) else {
            continue;
        };
        let values: BTreeSet<&str> = attribute.values().into_iter().collect();
        for value in values {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Counts hits per category path. A hit counts once under every prefix of
/// every path it carries.
pub fn count_category_paths<'a, I>(hits: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = &'a Product>,
{
    let mut counts = BTreeMap::new();
    for product in hits {
        let paths: BTreeSet<String> = product
            .base()
            .all_categories()
            .flat_map(|teaser| teaser.ancestor_paths())
            .collect();
        for path in paths {
            *counts.entry(path).or_insert(0) += 1;
        }
    }
    counts
}

/// Flat facet for one configured attribute: count desc, then value asc,
/// truncated to the configured amount.
pub fn attribute_facet<F>(config: &FacetConfig, position: usize, counts: &BTreeMap<String, u64>, label: F) -> Facet
where
    F: Fn(&str) -> Option<String>,
{
    let mut items: Vec<FacetItem> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(value, count)| FacetItem {
            label: label(value).unwrap_or_else(|| value.clone()),
            value: value.clone(),
            count: *count,
            ..FacetItem::default()
        })
        .collect();
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    items.truncate(config.amount);
    Facet {
        kind: FacetKind::List,
        name: config.attribute_code.clone(),
        label: config.attribute_code.clone(),
        position,
        items,
    }
}

/// Tree facet from `(path, count)` pairs. Each path segment becomes one
/// level; labels resolve through `category_name`.
pub fn category_facet<F>(paths: &BTreeMap<String, u64>, position: usize, category_name: F) -> Facet
where
    F: Fn(&str) -> Option<String>,
{
    let mut items = Vec::new();
    for (path, count) in paths {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        insert_path(&mut items, &segments, *count, &category_name);
    }
    Facet {
        kind: FacetKind::Tree,
        name: CATEGORY_FACET.to_string(),
        label: "Category".to_string(),
        position,
        items,
    }
}

fn insert_path(items: &mut Vec<FacetItem>, segments: &[&str], count: u64, category_name: &dyn Fn(&str) -> Option<String>) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };
    let index = match items.iter().position(|item| item.value == *segment) {
        Some(index) => index,
        None => {
            let label = category_name(segment).unwrap_or_else(|| {
                tracing::warn!(code = %segment, "Category label not resolvable, using code");
                (*segment).to_string()
            });
            items.push(FacetItem { label, value: (*segment).to_string(), ..FacetItem::default() });
            items.len() - 1
        }
    };
    if rest.is_empty() {
        items[index].count = count;
    } else {
        insert_path(&mut items[index].items, rest, count, category_name);
    }
}

/// Marks items matching the plan's attribute and category selections.
pub fn mark_active(plan: &QueryPlan, facets: &mut BTreeMap<String, Facet>) {
    for (key, values) in plan.selected_attributes() {
        if let Some(facet) = facets.get_mut(key) {
            for item in facet.items.iter_mut().filter(|i| values.contains(&i.value)) {
                item.selected = true;
                item.active = true;
            }
        }
    }
    let categories: BTreeSet<&str> = plan.selected_categories().collect();
    if categories.is_empty() {
        return;
    }
    if let Some(facet) = facets.get_mut(CATEGORY_FACET) {
        mark_tree(&mut facet.items, &categories);
    }
}

fn mark_tree(items: &mut [FacetItem], selected: &BTreeSet<&str>) {
    for item in items {
        if selected.contains(item.value.as_str()) {
            item.selected = true;
            item.active = true;
        }
        mark_tree(&mut item.items, selected);
    }
}

//! Category taxonomy: an arena of nodes keyed by code.
//!
//! Trees are built either from flat `(code, name, parent)` records via
//! [`CategoryTreeBuilder`] or incrementally by merging the ancestor chains
//! products carry ([`CategoryTree::merge_chain`]).
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::types::{Category, CategoryRef, CategoryTeaser, Tree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub code: String,
    pub name: String,
    pub path: String,
    pub document_count: u64,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

impl CategoryNode {
    fn new(code: &str, name: &str, path: String, parent: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            path,
            document_count: 0,
            parent: parent.map(str::to_string),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTree {
    root: String,
    nodes: HashMap<String, CategoryNode>,
}

impl CategoryTree {
    /// A tree holding only its root. The root path is empty.
    pub fn new(root_code: &str, root_name: &str) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(root_code.to_string(), CategoryNode::new(root_code, root_name, String::new(), None));
        Self { root: root_code.to_string(), nodes }
    }

    /// Single-branch tree rooted at the outermost ancestor of `chain`.
    pub fn from_chain(chain: &[CategoryRef]) -> Option<Self> {
        let (root, _) = chain.split_first()?;
        let mut tree = Self::new(&root.code, &root.name);
        tree.merge_chain(chain);
        Some(tree)
    }

    pub fn root(&self) -> &CategoryNode {
        // The root is inserted on construction and never removed.
        &self.nodes[&self.root]
    }

    pub fn root_code(&self) -> &str {
        &self.root
    }

    pub fn get(&self, code: &str) -> Option<&CategoryNode> {
        self.nodes.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.nodes.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CategoryNode> {
        self.nodes.values()
    }

    pub fn children(&self, code: &str) -> impl Iterator<Item = &CategoryNode> {
        self.nodes
            .get(code)
            .into_iter()
            .flat_map(|n| n.children.iter())
            .filter_map(|c| self.nodes.get(c))
    }

    /// Appends a new child under `parent`, computing its materialized path.
    fn attach(&mut self, parent: &str, code: &str, name: &str) -> Result<()> {
        if self.nodes.contains_key(code) {
            return Err(Error::Validation(format!("category {code} is already part of the tree")));
        }
        let parent_node = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| Error::ParentNotFound(parent.to_string()))?;
        parent_node.children.push(code.to_string());
        let path = format!("{}/{}", parent_node.path, code);
        self.nodes.insert(code.to_string(), CategoryNode::new(code, name, path, Some(parent)));
        Ok(())
    }

    /// Merges a root-first ancestor chain into the tree and returns the
    /// number of nodes added.
    ///
    /// Existing nodes are never altered, so merging the same chain again is a
    /// no-op. A chain rooted elsewhere is ignored.
    pub fn merge_chain(&mut self, chain: &[CategoryRef]) -> usize {
        let Some((first, rest)) = chain.split_first() else {
            return 0;
        };
        if first.code != self.root {
            tracing::warn!(root = %self.root, chain_root = %first.code, "No common root category, chain ignored");
            return 0;
        }
        let mut current = self.root.clone();
        let mut added = 0;
        for link in rest {
            let existing_child = self.nodes[&current].children.iter().find(|c| **c == link.code).cloned();
            if let Some(child) = existing_child {
                current = child;
                continue;
            }
            if self.attach(&current, &link.code, &link.name).is_err() {
                tracing::warn!(code = %link.code, parent = %current, "Category already placed under another parent, merge stopped");
                break;
            }
            added += 1;
            current = link.code.clone();
        }
        added
    }

    /// Removes a category and all of its descendants, returning their codes.
    /// The root cannot be removed this way.
    pub fn remove_subtree(&mut self, code: &str) -> Vec<String> {
        if code == self.root || !self.nodes.contains_key(code) {
            return Vec::new();
        }
        if let Some(parent) = self.nodes[code].parent.clone() {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|c| c != code);
            }
        }
        let mut removed = Vec::new();
        let mut pending = vec![code.to_string()];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children);
                removed.push(node.code);
            }
        }
        removed
    }

    pub fn category(&self, code: &str) -> Option<Category> {
        let node = if code.is_empty() { self.root() } else { self.nodes.get(code)? };
        Some(Category { code: node.code.clone(), name: node.name.clone(), path: node.path.clone() })
    }

    /// Owned snapshot of the subtree at `code` (root for `""`), with document
    /// counts supplied by the backend.
    pub fn subtree<F>(&self, code: &str, document_count: F) -> Option<Tree>
    where
        F: Fn(&str) -> u64,
    {
        let start = if code.is_empty() { self.root.as_str() } else { code };
        self.nodes.get(start)?;
        Some(self.snapshot(start, &document_count))
    }

    // Children ordered by code so snapshots do not depend on merge order.
    fn snapshot(&self, code: &str, document_count: &dyn Fn(&str) -> u64) -> Tree {
        let node = &self.nodes[code];
        let mut children: Vec<&String> = node.children.iter().collect();
        children.sort();
        Tree {
            code: node.code.clone(),
            name: node.name.clone(),
            path: node.path.clone(),
            document_count: document_count(code),
            active: false,
            children: children.into_iter().map(|c| self.snapshot(c, document_count)).collect(),
        }
    }

    /// Teaser for `code` carrying its ancestor chain taken from the tree.
    pub fn teaser_for(&self, code: &str) -> Option<CategoryTeaser> {
        let node = self.nodes.get(code)?;
        let mut ancestors = Vec::new();
        let mut parent = node.parent.as_deref();
        while let Some(p) = parent {
            let parent_node = self.nodes.get(p)?;
            ancestors.push(CategoryRef::new(&parent_node.code, &parent_node.name));
            parent = parent_node.parent.as_deref();
        }
        ancestors.reverse();
        Some(CategoryTeaser {
            code: node.code.clone(),
            name: node.name.clone(),
            path: node.path.clone(),
            ancestors,
        })
    }
}

/// Collects flat category records and links them into a [`CategoryTree`].
///
/// Call [`add_category_data`](Self::add_category_data) as often as needed
/// before [`build_tree`](Self::build_tree).
#[derive(Debug, Default)]
pub struct CategoryTreeBuilder {
    root: Option<CategoryRef>,
    names: HashMap<String, String>,
    // child -> parent
    links: BTreeMap<String, String>,
}

impl CategoryTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one record. `code == parent_code` marks the explicit root.
    pub fn add_category_data(&mut self, code: &str, name: &str, parent_code: &str) {
        if code == parent_code {
            self.root = Some(CategoryRef::new(code, name));
            self.links.remove(code);
            return;
        }
        self.names.insert(code.to_string(), name.to_string());
        self.links.insert(code.to_string(), parent_code.to_string());
    }

    pub fn build_tree(&self) -> Result<CategoryTree> {
        let root = self.root.clone().unwrap_or_default();
        let mut tree = CategoryTree::new(&root.code, &root.name);

        let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (child, parent) in &self.links {
            let parent = if parent.is_empty() { root.code.as_str() } else { parent.as_str() };
            if parent != root.code && !self.names.contains_key(parent) {
                return Err(Error::ParentNotFound(parent.to_string()));
            }
            children.entry(parent).or_default().push(child);
        }

        let mut queue = VecDeque::from([root.code.clone()]);
        let mut linked = HashSet::new();
        while let Some(parent) = queue.pop_front() {
            for child in children.get(parent.as_str()).into_iter().flatten() {
                let name = self.names.get(*child).map_or("", String::as_str);
                tree.attach(&parent, child, name)?;
                linked.insert(*child);
                queue.push_back((*child).to_string());
            }
        }

        if let Some(detached) = self.links.keys().find(|c| !linked.contains(c.as_str())) {
            return Err(Error::Validation(format!("category {detached} is not reachable from the root")));
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(codes: &[&str]) -> Vec<CategoryRef> {
        codes.iter().map(|c| CategoryRef::new(c, "")).collect()
    }

    fn child_codes(tree: &CategoryTree, code: &str) -> Vec<String> {
        tree.children(code).map(|n| n.code.clone()).collect()
    }

    #[test]
    fn build_tree_without_explicit_root() {
        let mut builder = CategoryTreeBuilder::new();
        builder.add_category_data("sub1_sub1", "Sub1 Sub1", "sub1");
        builder.add_category_data("sub1", "Sub1", "");
        builder.add_category_data("sub2", "Sub1", "");
        builder.add_category_data("sub3", "Sub1", "");
        builder.add_category_data("sub1_sub2_sub1", "Sub1 Sub2 Sub1", "sub1_sub2");
        builder.add_category_data("sub1_sub2", "Sub1 Sub2", "sub1");

        let tree = builder.build_tree().expect("build");
        assert_eq!(tree.root().code, "");
        assert_eq!(child_codes(&tree, ""), vec!["sub1", "sub2", "sub3"]);
        assert_eq!(child_codes(&tree, "sub1"), vec!["sub1_sub1", "sub1_sub2"]);
        assert_eq!(tree.get("sub1_sub2_sub1").map(|n| n.path.as_str()), Some("/sub1/sub1_sub2/sub1_sub2_sub1"));
    }

    #[test]
    fn build_tree_with_explicit_root() {
        let mut builder = CategoryTreeBuilder::new();
        builder.add_category_data("sub1_sub1", "Sub1 Sub1", "sub1");
        builder.add_category_data("sub1", "Sub1", "root");
        builder.add_category_data("sub2", "Sub1", "root");
        builder.add_category_data("root", "Root", "root");
        builder.add_category_data("sub1_sub2", "Sub1 Sub2", "sub1");

        let tree = builder.build_tree().expect("build");
        assert_eq!(tree.root().code, "root");
        assert_eq!(tree.root().name, "Root");
        assert_eq!(tree.root().path, "");
        assert_eq!(tree.get("sub1_sub2").map(|n| n.path.as_str()), Some("/sub1/sub1_sub2"));
    }

    #[test]
    fn build_tree_reports_missing_parent() {
        let mut builder = CategoryTreeBuilder::new();
        builder.add_category_data("orphan", "Orphan", "ghost");
        assert!(matches!(builder.build_tree(), Err(Error::ParentNotFound(p)) if p == "ghost"));
    }

    #[test]
    fn later_record_replaces_the_earlier_link() {
        let mut builder = CategoryTreeBuilder::new();
        builder.add_category_data("a", "A", "");
        builder.add_category_data("b", "B", "");
        builder.add_category_data("c", "C", "a");
        builder.add_category_data("c", "C moved", "b");

        let tree = builder.build_tree().expect("build");
        assert_eq!(tree.len(), 4);
        assert!(child_codes(&tree, "a").is_empty());
        assert_eq!(child_codes(&tree, "b"), vec!["c"]);
        assert_eq!(tree.get("c").map(|n| (n.name.as_str(), n.path.as_str())), Some(("C moved", "/b/c")));
    }

    #[test]
    fn build_tree_rejects_cycles() {
        let mut builder = CategoryTreeBuilder::new();
        builder.add_category_data("a", "A", "b");
        builder.add_category_data("b", "B", "a");
        assert!(matches!(builder.build_tree(), Err(Error::Validation(_))));
    }

    #[test]
    fn build_tree_is_order_independent() {
        let records = [("sub1_sub1", "sub1"), ("sub1", ""), ("sub2", ""), ("sub2_a", "sub2")];
        let mut forward = CategoryTreeBuilder::new();
        for (code, parent) in records {
            forward.add_category_data(code, code, parent);
        }
        let mut backward = CategoryTreeBuilder::new();
        for (code, parent) in records.iter().rev() {
            backward.add_category_data(code, code, parent);
        }
        assert_eq!(forward.build_tree().expect("forward"), backward.build_tree().expect("backward"));
    }

    #[test]
    fn merge_attaches_new_branches_and_descends_existing_ones() {
        let mut tree = CategoryTree::from_chain(&chain(&["root", "sub1"])).expect("tree");
        tree.merge_chain(&chain(&["root", "sub2"]));
        tree.merge_chain(&chain(&["root", "sub3", "sub3-sub"]));
        tree.merge_chain(&chain(&["root", "sub2", "sub2-sub"]));

        assert_eq!(child_codes(&tree, "root"), vec!["sub1", "sub2", "sub3"]);
        assert_eq!(child_codes(&tree, "sub2"), vec!["sub2-sub"]);
        assert_eq!(child_codes(&tree, "sub3"), vec!["sub3-sub"]);
        assert_eq!(tree.get("sub3-sub").map(|n| n.path.as_str()), Some("/sub3/sub3-sub"));
    }

    #[test]
    fn merge_is_idempotent() {
        let laptops = chain(&["root", "computers", "laptops"]);
        let mut once = CategoryTree::from_chain(&laptops).expect("tree");
        let mut many = once.clone();
        for _ in 0..5 {
            assert_eq!(many.merge_chain(&laptops), 0);
        }
        assert_eq!(once, many);
        assert_eq!(once.merge_chain(&chain(&["root", "computers"])), 0);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn merge_ignores_foreign_roots_and_misplaced_codes() {
        let mut tree = CategoryTree::from_chain(&chain(&["root", "a", "b"])).expect("tree");
        assert_eq!(tree.merge_chain(&chain(&["other", "x"])), 0);
        assert_eq!(tree.merge_chain(&chain(&["root", "c", "b"])), 1);
        assert_eq!(child_codes(&tree, "c"), Vec::<String>::new());
        assert_eq!(tree.get("b").and_then(|n| n.parent.as_deref()), Some("a"));
    }

    #[test]
    fn teaser_for_rebuilds_ancestor_chain() {
        let tree = CategoryTree::from_chain(&chain(&["root", "sub"])).expect("tree");
        let teaser = tree.teaser_for("sub").expect("teaser");
        assert_eq!(teaser.code, "sub");
        assert_eq!(teaser.parent().map(|p| p.code.as_str()), Some("root"));
        assert_eq!(teaser.path, "/sub");
    }

    #[test]
    fn remove_subtree_drops_descendants() {
        let mut tree = CategoryTree::from_chain(&chain(&["root", "a", "b"])).expect("tree");
        tree.merge_chain(&chain(&["root", "c"]));
        let mut removed = tree.remove_subtree("a");
        removed.sort();
        assert_eq!(removed, vec!["a", "b"]);
        assert_eq!(child_codes(&tree, "root"), vec!["c"]);
        assert!(tree.remove_subtree("root").is_empty());
    }

    #[test]
    fn subtree_snapshot_uses_supplied_counts() {
        let tree = CategoryTree::from_chain(&chain(&["root", "a", "b"])).expect("tree");
        let snapshot = tree.subtree("", |code| if code == "b" { 3 } else { 0 }).expect("snapshot");
        assert_eq!(snapshot.code, "root");
        assert_eq!(snapshot.find("b").map(|t| t.document_count), Some(3));
        assert!(tree.subtree("missing", |_| 0).is_none());
    }
}

use std::borrow::Cow;
use std::collections::HashMap;

use log::warn;

use crate::model::{TagTree, TagTreeNode};
use crate::normalize::normalize_tag;

/// Filtering stops descending past this depth.
pub const MAX_FILTER_DEPTH: usize = 50;

/// Pattern matcher describing which tags to hide.
///
/// Patterns are parsed from user-facing strings: `*suffix` hides nodes whose
/// bare name ends with the suffix, `prefix*` hides nodes whose bare name
/// starts with the prefix, anything else hides the exact path and everything
/// below it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HiddenTagMatcher {
    path_prefixes: Vec<String>,
    name_starts: Vec<String>,
    name_ends: Vec<String>,
}

impl HiddenTagMatcher {
    pub fn parse(patterns: &[String]) -> Self {
        let mut matcher = Self::default();
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if let Some(suffix) = pattern.strip_prefix('*') {
                if !suffix.is_empty() {
                    matcher.name_ends.push(suffix.to_lowercase());
                }
            } else if let Some(prefix) = pattern.strip_suffix('*') {
                if !prefix.is_empty() {
                    matcher.name_starts.push(prefix.to_lowercase());
                }
            } else if let Some(path) = normalize_tag(pattern) {
                matcher.path_prefixes.push(path);
            }
        }
        matcher
    }

    pub fn is_empty(&self) -> bool {
        self.path_prefixes.is_empty() && self.name_starts.is_empty() && self.name_ends.is_empty()
    }

    /// Whether a node with this normalized path and display name is hidden.
    fn matches(&self, path: &str, name: &str) -> bool {
        if self.path_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        }) {
            return true;
        }
        let name = name.to_lowercase();
        self.name_starts.iter().any(|p| name.starts_with(p.as_str()))
            || self.name_ends.iter().any(|s| name.ends_with(s.as_str()))
    }

    /// Produce a filtered copy of the tree. Pure: the input is never mutated.
    ///
    /// A matching node is excluded together with its entire subtree; surviving
    /// children are filtered recursively, and a node left with no children and
    /// no own notes is pruned. With no rules configured the original tree is
    /// returned borrowed, so callers can detect the no-op case.
    pub fn filter<'t>(&self, tree: &'t TagTree) -> Cow<'t, TagTree> {
        if self.is_empty() {
            return Cow::Borrowed(tree);
        }

        let mut roots = HashMap::new();
        let mut ancestors = Vec::new();
        for (key, node) in &tree.roots {
            if let Some(kept) = self.filter_node(node, 0, &mut ancestors) {
                roots.insert(key.clone(), kept);
            }
        }

        Cow::Owned(TagTree {
            roots,
            hidden_roots: tree.hidden_roots.clone(),
            untagged: tree.untagged,
        })
    }

    fn filter_node(
        &self,
        node: &TagTreeNode,
        depth: usize,
        ancestors: &mut Vec<String>,
    ) -> Option<TagTreeNode> {
        // Exclusion short-circuits: descendants of a hidden node are never
        // evaluated on their own.
        if self.matches(&node.path, &node.name) {
            return None;
        }

        // The tree is built acyclic; a repeat on the DFS stack means a bug
        // upstream, not a supported shape.
        if ancestors.iter().any(|path| path == &node.path) {
            warn!("hidden-tag filter: cycle at '{}', skipping branch", node.path);
            return None;
        }

        if depth >= MAX_FILTER_DEPTH {
            warn!(
                "hidden-tag filter: depth cap {} at '{}', truncating",
                MAX_FILTER_DEPTH, node.path
            );
            if node.notes_with_tag.is_empty() {
                return None;
            }
            let mut kept = node.clone();
            kept.children.clear();
            return Some(kept);
        }

        ancestors.push(node.path.clone());
        let mut children = HashMap::new();
        for (key, child) in &node.children {
            if let Some(kept) = self.filter_node(child, depth + 1, ancestors) {
                children.insert(key.clone(), kept);
            }
        }
        ancestors.pop();

        // Prune ancestors emptied by exclusion below them.
        if children.is_empty() && node.notes_with_tag.is_empty() {
            return None;
        }

        Some(TagTreeNode {
            name: node.name.clone(),
            path: node.path.clone(),
            display_path: node.display_path.clone(),
            children,
            notes_with_tag: node.notes_with_tag.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_index::IndexedFile;
    use crate::index::{build_index, IndexOptions};
    use crate::tree::assemble;

    fn tree_of(files: Vec<(&str, Vec<&str>)>) -> TagTree {
        let files: Vec<IndexedFile> = files
            .into_iter()
            .map(|(path, tags)| IndexedFile {
                path: path.to_string(),
                is_note: true,
                tags: Some(tags.into_iter().map(str::to_string).collect()),
            })
            .collect();
        assemble(&build_index(&files, &IndexOptions::default()))
    }

    #[test]
    fn empty_matcher_returns_borrowed_tree() {
        let tree = tree_of(vec![("a.md", vec!["x"])]);
        let matcher = HiddenTagMatcher::parse(&[]);
        assert!(matches!(matcher.filter(&tree), Cow::Borrowed(_)));
    }

    #[test]
    fn path_prefix_hides_subtree() {
        let tree = tree_of(vec![
            ("a.md", vec!["work/private/journal"]),
            ("b.md", vec!["work/open"]),
        ]);
        let matcher = HiddenTagMatcher::parse(&["work/private".to_string()]);
        let filtered = matcher.filter(&tree);

        let work = &filtered.roots["work"];
        assert!(!work.children.contains_key("work/private"));
        assert!(work.children.contains_key("work/open"));
    }

    #[test]
    fn path_prefix_matches_only_on_segment_boundary() {
        let tree = tree_of(vec![("a.md", vec!["workload"])]);
        let matcher = HiddenTagMatcher::parse(&["work".to_string()]);
        let filtered = matcher.filter(&tree);
        assert!(filtered.roots.contains_key("workload"));
    }

    #[test]
    fn name_wildcards_match_bare_names_anywhere() {
        let tree = tree_of(vec![
            ("a.md", vec!["notes/tmp-stuff"]),
            ("b.md", vec!["notes/keep"]),
            ("c.md", vec!["old-draft"]),
        ]);
        let matcher = HiddenTagMatcher::parse(&["tmp*".to_string(), "*draft".to_string()]);
        let filtered = matcher.filter(&tree);

        assert!(!filtered.roots.contains_key("old-draft"));
        let notes = &filtered.roots["notes"];
        assert!(!notes.children.contains_key("notes/tmp-stuff"));
        assert!(notes.children.contains_key("notes/keep"));
    }

    #[test]
    fn empty_ancestors_are_pruned() {
        // `x` only exists because of `x/y`; hiding `y` must take `x` with it.
        let tree = tree_of(vec![("a.md", vec!["x/y"])]);
        let matcher = HiddenTagMatcher::parse(&["y*".to_string()]);
        let filtered = matcher.filter(&tree);
        assert!(!filtered.roots.contains_key("x"));
    }

    #[test]
    fn ancestor_with_own_notes_survives_pruning() {
        let tree = tree_of(vec![("a.md", vec!["x/y", "x"])]);
        let matcher = HiddenTagMatcher::parse(&["y*".to_string()]);
        let filtered = matcher.filter(&tree);
        let x = &filtered.roots["x"];
        assert!(x.children.is_empty());
        assert!(x.notes_with_tag.contains("a.md"));
    }

    #[test]
    fn depth_cap_truncates_and_pruning_takes_the_emptied_chain() {
        let deep: String = (0..MAX_FILTER_DEPTH + 10)
            .map(|i| format!("s{i}"))
            .collect::<Vec<_>>()
            .join("/");
        let tree = tree_of(vec![
            ("leaf.md", vec![deep.as_str()]),
            ("kept.md", vec!["shallow"]),
        ]);
        let matcher = HiddenTagMatcher::parse(&["zzz*".to_string()]);
        let filtered = matcher.filter(&tree);

        // The only file hangs past the cap: truncation empties the chain and
        // empty-ancestor pruning removes the whole branch.
        assert!(!filtered.roots.contains_key("s0"));
        assert!(filtered.roots.contains_key("shallow"));
    }

    #[test]
    fn node_with_notes_at_depth_cap_survives_without_children() {
        let segments: Vec<String> = (0..MAX_FILTER_DEPTH + 2).map(|i| format!("s{i}")).collect();
        let deep = segments.join("/");
        let at_cap = segments[..=MAX_FILTER_DEPTH].join("/");
        let tree = tree_of(vec![
            ("deep.md", vec![deep.as_str()]),
            ("cap.md", vec![at_cap.as_str()]),
        ]);
        let matcher = HiddenTagMatcher::parse(&["zzz*".to_string()]);
        let filtered = matcher.filter(&tree);

        let mut node = &filtered.roots["s0"];
        for i in 1..=MAX_FILTER_DEPTH {
            let key = format!("{}/s{}", node.path, i);
            node = &node.children[key.as_str()];
        }
        assert!(node.notes_with_tag.contains("cap.md"));
        assert!(node.children.is_empty(), "levels past the cap are dropped");
    }

    #[test]
    fn filtering_is_idempotent() {
        let tree = tree_of(vec![
            ("a.md", vec!["work/private/journal", "work/open"]),
            ("b.md", vec!["home"]),
        ]);
        let matcher = HiddenTagMatcher::parse(&["work/private".to_string()]);
        let once = matcher.filter(&tree).into_owned();
        let twice = matcher.filter(&once).into_owned();
        assert_eq!(once, twice);
    }
}

use std::collections::{HashMap, HashSet};

use log::{error, warn};

use crate::index::TagIndex;
use crate::model::{FilePath, TagTree, TagTreeNode};
use crate::normalize::natural_cmp;

/// Tags deeper than this many segments are skipped during assembly.
pub const MAX_DEPTH: usize = 100;
/// Assembly aborts (keeping the partial tree) past this many tags.
pub const MAX_TAGS: usize = 100_000;

/// Convert the flat canonical tag index into a hierarchical tree.
///
/// Tags are visited in natural order, which makes the first-seen display
/// casing of shared ancestor nodes deterministic; correctness does not depend
/// on the ordering because nodes are created on demand.
pub fn assemble(index: &TagIndex) -> TagTree {
    let mut tags: Vec<(&String, &String)> = index.canonical.iter().collect();
    tags.sort_by(|a, b| natural_cmp(a.0, b.0));

    let mut tree = TagTree {
        untagged: index.untagged,
        ..TagTree::default()
    };
    let empty = HashSet::new();

    for (count, (normalized, display)) in tags.into_iter().enumerate() {
        if count >= MAX_TAGS {
            error!("tag tree: tag cap of {MAX_TAGS} reached, aborting assembly");
            break;
        }
        let segments: Vec<&str> = display.split('/').collect();
        if segments.len() > MAX_DEPTH {
            warn!(
                "tag tree: skipping '{}' with {} segments (cap {})",
                normalized,
                segments.len(),
                MAX_DEPTH
            );
            continue;
        }
        let files = index.files_by_tag.get(normalized).unwrap_or(&empty);
        insert_tag(&mut tree.roots, &segments, files);
    }

    // Visible tree wins: a hidden root that also shows up as a real root is
    // dropped from the hidden registry.
    for (root, display_root) in &index.hidden_roots {
        if tree.roots.contains_key(root) {
            continue;
        }
        tree.hidden_roots.insert(
            root.clone(),
            TagTreeNode::new(display_root.clone(), root.clone(), display_root.clone()),
        );
    }

    tree
}

/// Walk the segments left to right, get-or-creating one node per prefix.
/// Only the node for the full path receives the file set.
fn insert_tag(roots: &mut HashMap<String, TagTreeNode>, segments: &[&str], files: &HashSet<FilePath>) {
    let first = segments[0];
    let mut normalized_path = first.to_lowercase();
    let mut node = roots.entry(normalized_path.clone()).or_insert_with(|| {
        TagTreeNode::new(first.to_string(), normalized_path.clone(), first.to_string())
    });

    for segment in &segments[1..] {
        normalized_path.push('/');
        normalized_path.push_str(&segment.to_lowercase());
        // The child's display path extends the parent's stored casing, so
        // casing stays consistent down any one branch.
        let display_path = format!("{}/{}", node.display_path, segment);
        node = node
            .children
            .entry(normalized_path.clone())
            .or_insert_with(|| {
                TagTreeNode::new(segment.to_string(), normalized_path.clone(), display_path)
            });
    }

    node.notes_with_tag.extend(files.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_index::IndexedFile;
    use crate::index::{build_index, IndexOptions};

    fn index_of(files: Vec<(&str, Vec<&str>)>) -> TagIndex {
        let files: Vec<IndexedFile> = files
            .into_iter()
            .map(|(path, tags)| IndexedFile {
                path: path.to_string(),
                is_note: true,
                tags: Some(tags.into_iter().map(str::to_string).collect()),
            })
            .collect();
        build_index(&files, &IndexOptions::default())
    }

    #[test]
    fn files_attach_only_to_exact_tag_nodes() {
        let tree = assemble(&index_of(vec![
            ("a.md", vec!["proj/alpha"]),
            ("b.md", vec!["proj"]),
        ]));

        let proj = &tree.roots["proj"];
        assert!(proj.notes_with_tag.contains("b.md"));
        assert!(!proj.notes_with_tag.contains("a.md"));

        let alpha = &proj.children["proj/alpha"];
        assert_eq!(alpha.name, "alpha");
        assert!(alpha.notes_with_tag.contains("a.md"));
    }

    #[test]
    fn node_path_extends_parent_path() {
        let tree = assemble(&index_of(vec![("a.md", vec!["One/Two/Three"])]));

        let one = &tree.roots["one"];
        assert_eq!(one.path, one.name.to_lowercase());
        let two = &one.children["one/two"];
        assert_eq!(two.path, format!("{}/{}", one.path, two.name.to_lowercase()));
        let three = &two.children["one/two/three"];
        assert_eq!(
            three.path,
            format!("{}/{}", two.path, three.name.to_lowercase())
        );
        assert_eq!(three.display_path, "One/Two/Three");
    }

    #[test]
    fn ancestors_are_created_for_leaf_only_tags() {
        let tree = assemble(&index_of(vec![("a.md", vec!["x/y/z"])]));
        let x = &tree.roots["x"];
        assert!(x.notes_with_tag.is_empty());
        let y = &x.children["x/y"];
        assert!(y.notes_with_tag.is_empty());
        assert!(y.children["x/y/z"].notes_with_tag.contains("a.md"));
    }

    #[test]
    fn hidden_root_removed_when_visible_tree_has_it() {
        let options = IndexOptions {
            excluded_folders: vec!["archive".into()],
            apply_exclusions: true,
            included_paths: None,
        };
        let files = vec![
            IndexedFile {
                path: "archive/a.md".into(),
                is_note: true,
                tags: Some(vec!["shared".into(), "only-hidden".into()]),
            },
            IndexedFile {
                path: "b.md".into(),
                is_note: true,
                tags: Some(vec!["shared".into()]),
            },
        ];
        let tree = assemble(&build_index(&files, &options));

        assert!(tree.roots.contains_key("shared"));
        assert!(!tree.hidden_roots.contains_key("shared"));
        assert!(tree.hidden_roots.contains_key("only-hidden"));
    }

    #[test]
    fn over_deep_tags_are_skipped() {
        let deep = vec!["x"; MAX_DEPTH + 1].join("/");
        let tree = assemble(&index_of(vec![("a.md", vec![deep.as_str()])]));
        assert!(tree.roots.is_empty());
    }
}

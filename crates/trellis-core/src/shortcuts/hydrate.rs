use crate::file_index::FileIndex;
use crate::model::{ShortcutCollection, ShortcutEntry, TagTree};

/// A shortcut entry plus its resolved live target.
///
/// Derived on each relevant change, never persisted. `is_missing` is purely
/// advisory: a shortcut whose target went away stays in the collection so the
/// UI can mark it instead of silently dropping it.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratedShortcut {
    pub entry: ShortcutEntry,
    pub key: String,
    pub target: ResolvedTarget,
    pub is_missing: bool,
}

/// What a shortcut currently points at.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTarget {
    Folder { path: String },
    Note { path: String },
    Tag { path: String, in_tree: bool },
    Search { name: String, query: String, provider: String },
}

/// Resolve every shortcut in a collection against the live file index and
/// the current tag tree snapshot.
pub fn hydrate(
    collection: &ShortcutCollection,
    files: &dyn FileIndex,
    tree: &TagTree,
) -> Vec<HydratedShortcut> {
    collection
        .shortcuts
        .iter()
        .map(|entry| {
            let key = entry.key();
            let (target, is_missing) = match entry {
                ShortcutEntry::Folder { path } => (
                    ResolvedTarget::Folder { path: path.clone() },
                    !files.folder_exists(path),
                ),
                ShortcutEntry::Note { path } => (
                    ResolvedTarget::Note { path: path.clone() },
                    !files.note_exists(path),
                ),
                ShortcutEntry::Tag { tag_path } => {
                    let in_tree = tag_in_tree(tree, tag_path);
                    (
                        ResolvedTarget::Tag {
                            path: tag_path.clone(),
                            in_tree,
                        },
                        !in_tree,
                    )
                }
                ShortcutEntry::Search {
                    name,
                    query,
                    provider,
                } => (
                    // Searches are validated at add time and carry their own
                    // payload; they cannot go missing.
                    ResolvedTarget::Search {
                        name: name.clone(),
                        query: query.clone(),
                        provider: provider.clone(),
                    },
                    false,
                ),
            };
            HydratedShortcut {
                entry: entry.clone(),
                key,
                target,
                is_missing,
            }
        })
        .collect()
}

/// Whether a normalized tag path resolves to a node in the snapshot. Root
/// tags tracked only in the hidden-root registry still count as valid.
fn tag_in_tree(tree: &TagTree, path: &str) -> bool {
    let mut segments = path.split('/');
    let Some(root) = segments.next() else {
        return false;
    };
    let Some(mut node) = tree.roots.get(root) else {
        return segments.next().is_none() && tree.hidden_roots.contains_key(root);
    };
    let mut prefix = root.to_string();
    for segment in segments {
        prefix.push('/');
        prefix.push_str(segment);
        match node.children.get(&prefix) {
            Some(child) => node = child,
            None => return false,
        }
    }
    true
}

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Vault-relative file path with `/` separators.
pub type FilePath = String;

/// Stable identifier of a shortcut collection, generated at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub uuid::Uuid);

impl CollectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One node of the hierarchical tag tree.
///
/// Invariant: `path` equals the parent's `path` + `/` + the lowercased `name`;
/// for root nodes `path` is just the lowercased `name`. Nodes are owned
/// exclusively by the tree that created them; a tree is an immutable snapshot
/// that is rebuilt wholesale, never patched in place after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagTreeNode {
    /// Display casing of the last path segment.
    pub name: String,
    /// Normalized (lowercase) slash-joined path from the root to this node.
    pub path: String,
    /// Full path in display casing, consistent with the parent's casing.
    pub display_path: String,
    /// Children keyed by their normalized full path.
    pub children: HashMap<String, TagTreeNode>,
    /// Files carrying exactly this tag. Descendant tags do not contribute.
    pub notes_with_tag: HashSet<FilePath>,
}

impl TagTreeNode {
    pub(crate) fn new(name: String, path: String, display_path: String) -> Self {
        Self {
            name,
            path,
            display_path,
            children: HashMap::new(),
            notes_with_tag: HashSet::new(),
        }
    }
}

/// One consistent snapshot of the tag hierarchy at build time.
///
/// `roots` holds the visible root-level tags; the full hierarchy is reachable
/// through `children`. `hidden_roots` holds root tags that appear only on
/// files inside excluded folders, kept apart so callers can still render them
/// without their notes counting in the visible tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagTree {
    pub roots: HashMap<String, TagTreeNode>,
    pub hidden_roots: HashMap<String, TagTreeNode>,
    /// Note files whose tag list was extracted and came back empty.
    pub untagged: usize,
}

/// A typed shortcut. The derived [`key`](ShortcutEntry::key) is the sole
/// identity: two entries with the same key are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShortcutEntry {
    Folder {
        path: String,
    },
    Note {
        path: String,
    },
    Tag {
        /// Stored in normalized form (see [`crate::normalize::normalize_tag`]).
        tag_path: String,
    },
    Search {
        name: String,
        query: String,
        provider: String,
    },
}

impl ShortcutEntry {
    /// Deterministic identity key derived from the type and its
    /// discriminating fields. Used for lookup, removal and reordering.
    pub fn key(&self) -> String {
        match self {
            ShortcutEntry::Folder { path } => format!("folder:{path}"),
            ShortcutEntry::Note { path } => format!("note:{path}"),
            ShortcutEntry::Tag { tag_path } => format!("tag:{tag_path}"),
            ShortcutEntry::Search {
                name,
                query,
                provider,
            } => format!("search:{name}\u{1f}{query}\u{1f}{provider}"),
        }
    }
}

/// An ordered, user-managed collection of shortcuts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortcutCollection {
    pub id: CollectionId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub shortcuts: Vec<ShortcutEntry>,
    /// Exactly one collection carries this marker; it is the non-deletable
    /// fallback that the active pointer returns to.
    #[serde(default)]
    pub is_default: bool,
}

impl ShortcutCollection {
    pub fn new(name: &str, icon: Option<String>) -> Self {
        Self {
            id: CollectionId::new(),
            name: name.to_string(),
            icon,
            shortcuts: Vec::new(),
            is_default: false,
        }
    }
}

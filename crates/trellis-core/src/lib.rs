//! Trellis Core Library
//!
//! Core logic for a note-navigator panel: a hierarchical tag tree derived
//! from per-file tag metadata, hidden-tag filtering with empty-ancestor
//! pruning, memoized note counts, and switchable shortcut collections.
//! No UI dependencies, pure logic plus a thin file-system seam.
//!

mod cache;
pub mod counts;
pub mod engine;
pub mod file_index;
pub mod filter;
pub mod index;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod settings;
pub mod shortcuts;
pub mod tree;
pub mod vault;
pub mod vfs;

pub use engine::{NavigatorEngine, TreeSnapshot};
pub use file_index::{FileIndex, IndexedFile};
pub use model::{
    CollectionId, ShortcutCollection, ShortcutEntry, TagTree, TagTreeNode,
};
pub use normalize::{display_tag, natural_cmp, normalize_tag};
pub use settings::{NavigatorSettings, SettingsHost};
pub use shortcuts::{AddOptions, ShortcutError, ShortcutStore};
pub use vault::VaultIndex;

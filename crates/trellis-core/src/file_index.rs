use serde::{Deserialize, Serialize};

/// Per-file view handed over by the file index collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Vault-relative path with `/` separators.
    pub path: String,
    /// Whether the file is a note (only notes count as untagged).
    pub is_note: bool,
    /// Raw tag strings attached to the file. `None` means tag extraction has
    /// not run for this file yet, which is different from an empty list.
    pub tags: Option<Vec<String>>,
}

/// Abstract interface over the underlying file-index storage.
///
/// The tag engine only ever reads through this trait; how the index is
/// populated and persisted is the collaborator's concern. [`crate::vault::VaultIndex`]
/// is the bundled filesystem-backed implementation.
pub trait FileIndex {
    /// Current snapshot of every indexed file.
    fn all_files(&self) -> Vec<IndexedFile>;

    /// Whether a note with this vault-relative path currently exists.
    fn note_exists(&self, path: &str) -> bool;

    /// Whether a folder with this vault-relative path currently exists.
    fn folder_exists(&self, path: &str) -> bool;
}

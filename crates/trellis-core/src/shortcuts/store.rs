use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::model::{CollectionId, ShortcutCollection, ShortcutEntry};
use crate::normalize::normalize_tag;

/// Why a shortcut operation was rejected. The `Display` text doubles as the
/// user-facing notice; none of these abort anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortcutError {
    #[error("a shortcut for this target already exists in the collection")]
    Duplicate,
    #[error("search shortcuts need a non-empty name and query")]
    InvalidSearch,
    #[error("a search named '{0}' already exists in the collection")]
    DuplicateSearchName(String),
    #[error("tag is empty after normalization")]
    EmptyTag,
    #[error("no collection with id {0}")]
    UnknownCollection(String),
    #[error("the order given does not match the current shortcuts")]
    ReorderMismatch,
    #[error("the default collection cannot be deleted")]
    DefaultCollectionProtected,
}

/// Placement options for add operations.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Insert position, clamped to `[0, len]`; append when absent.
    pub index: Option<usize>,
    /// Target collection; the active collection when absent.
    pub collection_id: Option<CollectionId>,
}

/// Result of a batch insert: how many entries actually landed, plus one
/// consolidated notice per violation class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub notices: Vec<String>,
}

/// State machine over the shortcut collections and the active pointer.
///
/// Every mutation follows clone-then-replace: the successor list is built in
/// full and swapped in, so a collection list handed to a reader earlier is
/// never mutated underneath it.
#[derive(Debug)]
pub struct ShortcutStore {
    collections: Vec<ShortcutCollection>,
    active_id: CollectionId,
    /// Content fingerprints recorded by the one-time tag normalization pass.
    normalized_fingerprints: HashMap<CollectionId, String>,
}

impl ShortcutStore {
    /// Fresh store with a single default collection.
    pub fn new() -> Self {
        Self::from_settings(Vec::new(), None)
    }

    /// Restore from persisted state. A default collection is created when the
    /// persisted list lacks one; an unresolvable active pointer falls back to
    /// the default collection's id.
    pub fn from_settings(
        mut collections: Vec<ShortcutCollection>,
        active: Option<CollectionId>,
    ) -> Self {
        if !collections.iter().any(|c| c.is_default) {
            let mut default = ShortcutCollection::new("Shortcuts", None);
            default.is_default = true;
            collections.insert(0, default);
        }
        let default_id = collections
            .iter()
            .find(|c| c.is_default)
            .map(|c| c.id.clone())
            .unwrap_or_default();
        let active_id = active
            .filter(|id| collections.iter().any(|c| &c.id == id))
            .unwrap_or(default_id);
        Self {
            collections,
            active_id,
            normalized_fingerprints: HashMap::new(),
        }
    }

    pub fn collections(&self) -> &[ShortcutCollection] {
        &self.collections
    }

    pub fn active_id(&self) -> &CollectionId {
        &self.active_id
    }

    pub fn active(&self) -> &ShortcutCollection {
        self.collections
            .iter()
            .find(|c| c.id == self.active_id)
            .unwrap_or(&self.collections[0])
    }

    pub fn collection(&self, id: &CollectionId) -> Option<&ShortcutCollection> {
        self.collections.iter().find(|c| &c.id == id)
    }

    pub fn default_id(&self) -> CollectionId {
        self.collections
            .iter()
            .find(|c| c.is_default)
            .map(|c| c.id.clone())
            .unwrap_or_else(|| self.collections[0].id.clone())
    }

    pub fn set_active(&mut self, id: &CollectionId) -> bool {
        if self.collections.iter().any(|c| &c.id == id) {
            self.active_id = id.clone();
            true
        } else {
            false
        }
    }

    /// Index of the collection an operation targets: the explicit id when
    /// given, otherwise the active collection.
    fn resolve_target(&self, options: &AddOptions) -> Result<usize, ShortcutError> {
        let id = options
            .collection_id
            .as_ref()
            .unwrap_or(&self.active_id);
        self.collections
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| ShortcutError::UnknownCollection(id.to_string()))
    }

    // ------------------------------------------------------------------
    // Adding shortcuts
    // ------------------------------------------------------------------

    pub fn add_folder(&mut self, path: &str, options: &AddOptions) -> Result<(), ShortcutError> {
        self.add_entry(
            ShortcutEntry::Folder {
                path: path.to_string(),
            },
            options,
        )
    }

    pub fn add_note(&mut self, path: &str, options: &AddOptions) -> Result<(), ShortcutError> {
        self.add_entry(
            ShortcutEntry::Note {
                path: path.to_string(),
            },
            options,
        )
    }

    /// Tag paths are normalized before both the uniqueness check and storage.
    pub fn add_tag(&mut self, tag_path: &str, options: &AddOptions) -> Result<(), ShortcutError> {
        let tag_path = normalize_tag(tag_path).ok_or(ShortcutError::EmptyTag)?;
        self.add_entry(ShortcutEntry::Tag { tag_path }, options)
    }

    pub fn add_search(
        &mut self,
        name: &str,
        query: &str,
        provider: &str,
        options: &AddOptions,
    ) -> Result<(), ShortcutError> {
        let name = name.trim();
        let query = query.trim();
        if name.is_empty() || query.is_empty() {
            return Err(ShortcutError::InvalidSearch);
        }
        let target = self.resolve_target(options)?;
        if has_search_named(&self.collections[target], name) {
            return Err(ShortcutError::DuplicateSearchName(name.to_string()));
        }
        self.add_entry(
            ShortcutEntry::Search {
                name: name.to_string(),
                query: query.to_string(),
                provider: provider.to_string(),
            },
            options,
        )
    }

    fn add_entry(&mut self, entry: ShortcutEntry, options: &AddOptions) -> Result<(), ShortcutError> {
        let target = self.resolve_target(options)?;
        let key = entry.key();
        if self.collections[target]
            .shortcuts
            .iter()
            .any(|existing| existing.key() == key)
        {
            return Err(ShortcutError::Duplicate);
        }

        let mut shortcuts = self.collections[target].shortcuts.clone();
        let at = options.index.unwrap_or(shortcuts.len()).min(shortcuts.len());
        shortcuts.insert(at, entry);
        self.collections[target].shortcuts = shortcuts;
        Ok(())
    }

    /// Validate and dedupe the whole batch before any mutation, then insert
    /// the survivors sequentially. Violations are aggregated per class.
    pub fn add_batch(
        &mut self,
        entries: Vec<ShortcutEntry>,
        options: &AddOptions,
    ) -> Result<BatchOutcome, ShortcutError> {
        let target = self.resolve_target(options)?;
        let collection = &self.collections[target];

        let mut seen: HashSet<String> =
            collection.shortcuts.iter().map(|s| s.key()).collect();
        let mut search_names: HashSet<String> = collection
            .shortcuts
            .iter()
            .filter_map(|s| match s {
                ShortcutEntry::Search { name, .. } => Some(name.to_lowercase()),
                _ => None,
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        let mut survivors = Vec::new();
        for entry in entries {
            let entry = match entry {
                ShortcutEntry::Tag { tag_path } => match normalize_tag(&tag_path) {
                    Some(tag_path) => ShortcutEntry::Tag { tag_path },
                    None => {
                        outcome.invalid += 1;
                        continue;
                    }
                },
                ShortcutEntry::Search {
                    name,
                    query,
                    provider,
                } => {
                    let name = name.trim().to_string();
                    let query = query.trim().to_string();
                    if name.is_empty() || query.is_empty() {
                        outcome.invalid += 1;
                        continue;
                    }
                    if !search_names.insert(name.to_lowercase()) {
                        outcome.duplicates += 1;
                        continue;
                    }
                    ShortcutEntry::Search {
                        name,
                        query,
                        provider,
                    }
                }
                other => other,
            };
            if !seen.insert(entry.key()) {
                outcome.duplicates += 1;
                continue;
            }
            survivors.push(entry);
        }

        if outcome.duplicates > 0 {
            outcome.notices.push(format!(
                "{} shortcut(s) skipped: already present",
                outcome.duplicates
            ));
        }
        if outcome.invalid > 0 {
            outcome.notices.push(format!(
                "{} shortcut(s) skipped: invalid target",
                outcome.invalid
            ));
        }

        outcome.inserted = survivors.len();
        if !survivors.is_empty() {
            let mut shortcuts = self.collections[target].shortcuts.clone();
            let mut at = options.index.unwrap_or(shortcuts.len()).min(shortcuts.len());
            for entry in survivors {
                shortcuts.insert(at, entry);
                at += 1;
            }
            self.collections[target].shortcuts = shortcuts;
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Removing and reordering
    // ------------------------------------------------------------------

    /// Remove the entry with this key from EVERY collection containing it.
    ///
    /// Add and duplicate detection are per-collection while removal is
    /// global; the asymmetry is the documented contract and is pinned by
    /// `tests::remove_strips_key_from_all_collections_despite_per_collection_add`.
    pub fn remove(&mut self, key: &str) -> bool {
        let mut next = self.collections.clone();
        let mut removed = false;
        for collection in &mut next {
            let before = collection.shortcuts.len();
            collection.shortcuts.retain(|s| s.key() != key);
            removed |= collection.shortcuts.len() != before;
        }
        if removed {
            self.collections = next;
        }
        removed
    }

    /// Replace the active collection's order atomically. Fails without any
    /// state change unless the key set matches the current entries exactly.
    pub fn reorder(&mut self, keys: &[String]) -> Result<(), ShortcutError> {
        let target = self
            .collections
            .iter()
            .position(|c| c.id == self.active_id)
            .ok_or_else(|| ShortcutError::UnknownCollection(self.active_id.to_string()))?;
        let current = &self.collections[target].shortcuts;
        if keys.len() != current.len() {
            return Err(ShortcutError::ReorderMismatch);
        }
        let mut by_key: HashMap<String, ShortcutEntry> =
            current.iter().map(|s| (s.key(), s.clone())).collect();
        let mut next = Vec::with_capacity(keys.len());
        for key in keys {
            let entry = by_key.remove(key).ok_or(ShortcutError::ReorderMismatch)?;
            next.push(entry);
        }
        self.collections[target].shortcuts = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Collection management
    // ------------------------------------------------------------------

    pub fn create_collection(&mut self, name: &str, icon: Option<String>) -> CollectionId {
        let collection = ShortcutCollection::new(name, icon);
        let id = collection.id.clone();
        let mut next = self.collections.clone();
        next.push(collection);
        self.collections = next;
        id
    }

    pub fn update_collection(
        &mut self,
        id: &CollectionId,
        name: &str,
        icon: Option<String>,
    ) -> Result<(), ShortcutError> {
        let target = self
            .collections
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| ShortcutError::UnknownCollection(id.to_string()))?;
        let mut next = self.collections.clone();
        next[target].name = name.to_string();
        next[target].icon = icon;
        self.collections = next;
        Ok(())
    }

    /// Refused for the default collection. Deleting the active collection
    /// moves the active pointer to the default collection's id.
    pub fn delete_collection(&mut self, id: &CollectionId) -> Result<(), ShortcutError> {
        let target = self
            .collections
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| ShortcutError::UnknownCollection(id.to_string()))?;
        if self.collections[target].is_default {
            return Err(ShortcutError::DefaultCollectionProtected);
        }
        let mut next = self.collections.clone();
        next.remove(target);
        if self.active_id == *id {
            self.active_id = next
                .iter()
                .find(|c| c.is_default)
                .map(|c| c.id.clone())
                .unwrap_or_else(|| next[0].id.clone());
        }
        self.collections = next;
        self.normalized_fingerprints.remove(id);
        Ok(())
    }

    /// All-or-nothing reorder of the collections list, same validate-then-
    /// replace pattern as shortcut reorder.
    pub fn reorder_collections(&mut self, ids: &[CollectionId]) -> Result<(), ShortcutError> {
        if ids.len() != self.collections.len() {
            return Err(ShortcutError::ReorderMismatch);
        }
        let mut by_id: HashMap<CollectionId, ShortcutCollection> = self
            .collections
            .iter()
            .map(|c| (c.id.clone(), c.clone()))
            .collect();
        let mut next = Vec::with_capacity(ids.len());
        for id in ids {
            let collection = by_id.remove(id).ok_or(ShortcutError::ReorderMismatch)?;
            next.push(collection);
        }
        self.collections = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stored-tag normalization
    // ------------------------------------------------------------------

    /// One-time pass rewriting tag shortcuts whose stored path is not in
    /// normalized form. Gated per collection by a content fingerprint, so
    /// the scan runs at most once per distinct content state. Returns the
    /// number of rewritten entries.
    pub fn normalize_stored_tags(&mut self) -> usize {
        let mut rewritten = 0;
        let mut next = self.collections.clone();
        for collection in &mut next {
            let current = fingerprint(collection);
            if self.normalized_fingerprints.get(&collection.id) == Some(&current) {
                continue;
            }
            for entry in &mut collection.shortcuts {
                if let ShortcutEntry::Tag { tag_path } = entry {
                    if let Some(normalized) = normalize_tag(tag_path) {
                        if normalized != *tag_path {
                            *tag_path = normalized;
                            rewritten += 1;
                        }
                    }
                }
            }
            self.normalized_fingerprints
                .insert(collection.id.clone(), fingerprint(collection));
        }
        if rewritten > 0 {
            self.collections = next;
        }
        rewritten
    }
}

impl Default for ShortcutStore {
    fn default() -> Self {
        Self::new()
    }
}

fn has_search_named(collection: &ShortcutCollection, name: &str) -> bool {
    let needle = name.to_lowercase();
    collection.shortcuts.iter().any(|s| match s {
        ShortcutEntry::Search {
            name: existing, ..
        } => existing.to_lowercase() == needle,
        _ => false,
    })
}

/// Content fingerprint of a collection: digest over its entry keys in order.
/// Detects "needs reprocessing" without deep comparison.
pub(crate) fn fingerprint(collection: &ShortcutCollection) -> String {
    let mut hasher = Sha256::new();
    for entry in &collection.shortcuts {
        hasher.update(entry.key().as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

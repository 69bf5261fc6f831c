use std::sync::Arc;

use log::warn;

use crate::counts::NoteCountCache;
use crate::file_index::FileIndex;
use crate::filter::HiddenTagMatcher;
use crate::index::{build_index, IndexOptions};
use crate::model::{CollectionId, ShortcutEntry, TagTree, TagTreeNode};
use crate::settings::SettingsHost;
use crate::shortcuts::{
    fingerprint, hydrate, AddOptions, BatchOutcome, HydratedShortcut, ShortcutError, ShortcutStore,
};
use crate::tree::assemble;

/// One published tag-tree snapshot. The generation is monotonically
/// increasing across rebuilds and keys the note-count memo.
#[derive(Debug)]
pub struct TreeSnapshot {
    pub generation: u64,
    pub tree: TagTree,
}

/// The NavigatorEngine is the high-level facade over the navigator core.
///
/// # Architecture Decision: Rebuild, don't patch
///
/// Derived structures (the tag tree, hydrated shortcuts) are immutable
/// snapshots recomputed from the latest committed state whenever an
/// identity-compared input changes: the file index version, or the settings
/// revision. Rebuilds run to completion synchronously; there is no
/// interleaving and therefore no locking. External file-system notifications
/// only bump a version counter, which invalidates the memos.
pub struct NavigatorEngine<F: FileIndex> {
    files: F,
    settings: Arc<dyn SettingsHost>,
    store: ShortcutStore,
    counts: NoteCountCache,
    fs_version: u64,
    settings_revision: u64,
    generation: u64,
    snapshot: Option<Arc<TreeSnapshot>>,
    snapshot_inputs: Option<(u64, u64)>,
    hydration: Option<HydrationMemo>,
}

struct HydrationMemo {
    fingerprint: String,
    fs_version: u64,
    generation: u64,
    shortcuts: Arc<Vec<HydratedShortcut>>,
}

impl<F: FileIndex> NavigatorEngine<F> {
    pub fn new(files: F, settings: Arc<dyn SettingsHost>) -> Self {
        let persisted = settings.read();
        let store = ShortcutStore::from_settings(persisted.collections, persisted.active_collection);
        Self {
            files,
            settings,
            store,
            counts: NoteCountCache::new(),
            fs_version: 0,
            settings_revision: 0,
            generation: 0,
            snapshot: None,
            snapshot_inputs: None,
            hydration: None,
        }
    }

    // ------------------------------------------------------------------
    // Tag tree
    // ------------------------------------------------------------------

    /// Current tag tree snapshot, rebuilt only when an input changed.
    pub fn tree(&mut self) -> Arc<TreeSnapshot> {
        let inputs = (self.fs_version, self.settings_revision);
        if let (Some(snapshot), Some(previous)) = (&self.snapshot, self.snapshot_inputs) {
            if previous == inputs {
                return snapshot.clone();
            }
        }

        let settings = self.settings.read();
        let index = build_index(
            &self.files.all_files(),
            &IndexOptions {
                excluded_folders: settings.excluded_folders.clone(),
                apply_exclusions: settings.apply_exclusions,
                included_paths: None,
            },
        );
        let assembled = assemble(&index);
        let matcher = HiddenTagMatcher::parse(&settings.hidden_tag_patterns);
        let tree = matcher.filter(&assembled).into_owned();

        self.generation += 1;
        self.counts.reset(self.generation);
        let snapshot = Arc::new(TreeSnapshot {
            generation: self.generation,
            tree,
        });
        self.snapshot = Some(snapshot.clone());
        self.snapshot_inputs = Some(inputs);
        snapshot
    }

    /// Memoized distinct note count under `node`. Pass the snapshot the node
    /// was taken from; nodes of a superseded snapshot are counted against
    /// that snapshot without disturbing the current generation's memo.
    pub fn total_note_count(&mut self, snapshot: &TreeSnapshot, node: &TagTreeNode) -> usize {
        self.counts.total_note_count(snapshot.generation, node)
    }

    pub fn untagged_count(&mut self) -> usize {
        self.tree().tree.untagged
    }

    // ------------------------------------------------------------------
    // File System Notifications (changes coming FROM the host)
    // ------------------------------------------------------------------

    pub fn notify_file_created(&mut self, _path: &str) {
        self.bump_fs_version();
    }

    pub fn notify_file_deleted(&mut self, _path: &str) {
        self.bump_fs_version();
    }

    pub fn notify_file_renamed(&mut self, _new_path: &str, _old_path: &str) {
        self.bump_fs_version();
    }

    pub fn file_index(&self) -> &F {
        &self.files
    }

    /// Mutable access to the file index. Taking it counts as a change: the
    /// version bump invalidates the tree and hydration memos.
    pub fn file_index_mut(&mut self) -> &mut F {
        self.bump_fs_version();
        &mut self.files
    }

    /// Settings that feed the tree (exclusions, hidden patterns) changed.
    pub fn notify_settings_changed(&mut self) {
        self.settings_revision += 1;
    }

    fn bump_fs_version(&mut self) {
        self.fs_version += 1;
    }

    // ------------------------------------------------------------------
    // Shortcuts (changes GOING TO settings)
    // ------------------------------------------------------------------

    pub fn shortcuts(&self) -> &ShortcutStore {
        &self.store
    }

    pub fn add_folder(&mut self, path: &str, options: &AddOptions) -> Result<(), ShortcutError> {
        let result = self.store.add_folder(path, options);
        self.persist_if(result.is_ok());
        result
    }

    pub fn add_note(&mut self, path: &str, options: &AddOptions) -> Result<(), ShortcutError> {
        let result = self.store.add_note(path, options);
        self.persist_if(result.is_ok());
        result
    }

    pub fn add_tag(&mut self, tag_path: &str, options: &AddOptions) -> Result<(), ShortcutError> {
        let result = self.store.add_tag(tag_path, options);
        self.persist_if(result.is_ok());
        result
    }

    pub fn add_search(
        &mut self,
        name: &str,
        query: &str,
        provider: &str,
        options: &AddOptions,
    ) -> Result<(), ShortcutError> {
        let result = self.store.add_search(name, query, provider, options);
        self.persist_if(result.is_ok());
        result
    }

    pub fn add_batch(
        &mut self,
        entries: Vec<ShortcutEntry>,
        options: &AddOptions,
    ) -> Result<BatchOutcome, ShortcutError> {
        let outcome = self.store.add_batch(entries, options)?;
        self.persist_if(outcome.inserted > 0);
        Ok(outcome)
    }

    pub fn remove_shortcut(&mut self, key: &str) -> bool {
        let removed = self.store.remove(key);
        self.persist_if(removed);
        removed
    }

    pub fn reorder_shortcuts(&mut self, keys: &[String]) -> Result<(), ShortcutError> {
        let result = self.store.reorder(keys);
        self.persist_if(result.is_ok());
        result
    }

    pub fn create_collection(&mut self, name: &str, icon: Option<String>) -> CollectionId {
        let id = self.store.create_collection(name, icon);
        self.persist_if(true);
        id
    }

    pub fn update_collection(
        &mut self,
        id: &CollectionId,
        name: &str,
        icon: Option<String>,
    ) -> Result<(), ShortcutError> {
        let result = self.store.update_collection(id, name, icon);
        self.persist_if(result.is_ok());
        result
    }

    pub fn delete_collection(&mut self, id: &CollectionId) -> Result<(), ShortcutError> {
        let result = self.store.delete_collection(id);
        self.persist_if(result.is_ok());
        result
    }

    pub fn reorder_collections(&mut self, ids: &[CollectionId]) -> Result<(), ShortcutError> {
        let result = self.store.reorder_collections(ids);
        self.persist_if(result.is_ok());
        result
    }

    pub fn set_active_collection(&mut self, id: &CollectionId) -> bool {
        let switched = self.store.set_active(id);
        self.persist_if(switched);
        switched
    }

    /// Hydrated view of the active collection. Memoized by the collection
    /// content fingerprint, the file-index version, and the tree generation.
    pub fn hydrated_shortcuts(&mut self) -> Arc<Vec<HydratedShortcut>> {
        let rewritten = self.store.normalize_stored_tags();
        self.persist_if(rewritten > 0);

        let snapshot = self.tree();
        let active = self.store.active().clone();
        let current = fingerprint(&active);

        if let Some(memo) = &self.hydration {
            if memo.fingerprint == current
                && memo.fs_version == self.fs_version
                && memo.generation == snapshot.generation
            {
                return memo.shortcuts.clone();
            }
        }

        let shortcuts = Arc::new(hydrate(&active, &self.files, &snapshot.tree));
        self.hydration = Some(HydrationMemo {
            fingerprint: current,
            fs_version: self.fs_version,
            generation: snapshot.generation,
            shortcuts: shortcuts.clone(),
        });
        shortcuts
    }

    /// Push the store's committed state into persisted settings. Failures
    /// are logged, not propagated: the in-memory state already committed.
    fn persist_if(&mut self, mutated: bool) {
        if !mutated {
            return;
        }
        let collections = self.store.collections().to_vec();
        let active = self.store.active_id().clone();
        if let Err(err) = self.settings.update(&move |s| {
            s.collections = collections.clone();
            s.active_collection = Some(active.clone());
        }) {
            warn!("failed to persist shortcut collections: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemorySettings, NavigatorSettings};
    use crate::vault::VaultIndex;
    use crate::vfs::PhysicalFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn engine_over(
        dir: &TempDir,
        settings: NavigatorSettings,
    ) -> (NavigatorEngine<VaultIndex>, Arc<MemorySettings>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let host = Arc::new(MemorySettings::new(settings));
        let mut vault =
            VaultIndex::new(dir.path().to_path_buf(), Arc::new(PhysicalFileSystem));
        vault.scan();
        (NavigatorEngine::new(vault, host.clone()), host)
    }

    #[test]
    fn tree_is_memoized_until_an_input_changes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "#proj/alpha\n").unwrap();
        let (mut engine, _host) = engine_over(&dir, NavigatorSettings::default());

        let first = engine.tree();
        let again = engine.tree();
        assert!(Arc::ptr_eq(&first, &again), "no input changed, same snapshot");
        assert_eq!(first.generation, again.generation);

        fs::write(dir.path().join("b.md"), "#proj\n").unwrap();
        engine.file_index_mut().scan();
        let rebuilt = engine.tree();
        assert_eq!(rebuilt.generation, first.generation + 1);
        assert!(rebuilt.tree.roots.contains_key("proj"));
    }

    #[test]
    fn live_scenario_tree_counts_and_untagged() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "#proj/alpha\n").unwrap();
        fs::write(dir.path().join("b.md"), "#proj\n").unwrap();
        fs::write(dir.path().join("plain.md"), "no tags\n").unwrap();
        let (mut engine, _host) = engine_over(&dir, NavigatorSettings::default());

        let snapshot = engine.tree();
        let proj = snapshot.tree.roots["proj"].clone();
        assert!(proj.notes_with_tag.contains("b.md"));
        assert!(proj.children["proj/alpha"].notes_with_tag.contains("a.md"));
        assert_eq!(engine.total_note_count(&snapshot, &proj), 2);
        assert_eq!(engine.untagged_count(), 1);
    }

    #[test]
    fn stale_snapshot_nodes_do_not_poison_fresh_counts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "#proj\n").unwrap();
        let (mut engine, _host) = engine_over(&dir, NavigatorSettings::default());

        let old = engine.tree();
        let old_proj = old.tree.roots["proj"].clone();

        fs::write(dir.path().join("b.md"), "#proj\n").unwrap();
        engine.file_index_mut().scan();
        let fresh = engine.tree();

        // Counting through the superseded snapshot answers for that snapshot,
        // and the fresh generation's memo still sees both files.
        assert_eq!(engine.total_note_count(&old, &old_proj), 1);
        let fresh_proj = fresh.tree.roots["proj"].clone();
        assert_eq!(engine.total_note_count(&fresh, &fresh_proj), 2);
    }

    #[test]
    fn hidden_patterns_apply_after_settings_change() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "#x/y\n#keep\n").unwrap();
        let (mut engine, host) = engine_over(&dir, NavigatorSettings::default());

        assert!(engine.tree().tree.roots.contains_key("x"));

        host.update(&|s| s.hidden_tag_patterns.push("y*".into()))
            .unwrap();
        engine.notify_settings_changed();
        let filtered = engine.tree();
        // `x` only existed for `x/y`; hiding `y` prunes it too.
        assert!(!filtered.tree.roots.contains_key("x"));
        assert!(filtered.tree.roots.contains_key("keep"));
    }

    #[test]
    fn shortcut_mutations_persist_into_settings() {
        let dir = TempDir::new().unwrap();
        let (mut engine, host) = engine_over(&dir, NavigatorSettings::default());

        engine.add_folder("projects", &AddOptions::default()).unwrap();
        assert_eq!(
            engine.add_folder("projects", &AddOptions::default()),
            Err(ShortcutError::Duplicate)
        );

        let persisted = host.read();
        let default = persisted
            .collections
            .iter()
            .find(|c| c.is_default)
            .expect("default collection persisted");
        assert_eq!(default.shortcuts.len(), 1);
        assert_eq!(
            persisted.active_collection.as_ref(),
            Some(engine.shortcuts().active_id())
        );
    }

    #[test]
    fn deleting_active_collection_persists_default_fallback() {
        let dir = TempDir::new().unwrap();
        let (mut engine, host) = engine_over(&dir, NavigatorSettings::default());

        let work = engine.create_collection("Work", None);
        assert!(engine.set_active_collection(&work));
        engine.delete_collection(&work).unwrap();

        let default_id = engine.shortcuts().default_id();
        assert_eq!(engine.shortcuts().active_id(), &default_id);
        assert_eq!(host.read().active_collection, Some(default_id));
    }

    #[test]
    fn hydration_memo_invalidated_by_file_events() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("target.md");
        fs::write(&note, "content\n").unwrap();
        let (mut engine, _host) = engine_over(&dir, NavigatorSettings::default());

        engine.add_note("target.md", &AddOptions::default()).unwrap();
        let hydrated = engine.hydrated_shortcuts();
        assert!(!hydrated[0].is_missing);
        let memoized = engine.hydrated_shortcuts();
        assert!(Arc::ptr_eq(&hydrated, &memoized));

        fs::remove_file(&note).unwrap();
        engine.file_index_mut().remove_file(&note);
        let refreshed = engine.hydrated_shortcuts();
        assert!(refreshed[0].is_missing, "missing is advisory, entry stays");
        assert_eq!(refreshed.len(), 1);
    }

    #[test]
    fn excluded_folder_tags_surface_as_hidden_roots() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();
        fs::write(dir.path().join("archive/old.md"), "#Stale\n").unwrap();
        fs::write(dir.path().join("new.md"), "#fresh\n").unwrap();

        let settings = NavigatorSettings {
            excluded_folders: vec!["archive".into()],
            ..Default::default()
        };
        let (mut engine, _host) = engine_over(&dir, settings);

        let snapshot = engine.tree();
        assert!(snapshot.tree.roots.contains_key("fresh"));
        assert!(!snapshot.tree.roots.contains_key("stale"));
        assert_eq!(snapshot.tree.hidden_roots["stale"].name, "Stale");
    }
}

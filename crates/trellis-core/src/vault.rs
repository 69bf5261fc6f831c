use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::file_index::{FileIndex, IndexedFile};
use crate::parser::{compute_digest, extract_tags};
use crate::vfs::FileSystem;

/// What the vault remembers about one indexed note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FileRecord {
    pub digest: String,
    pub tags: Vec<String>,
}

/// Filesystem-backed implementation of [`FileIndex`].
///
/// Scans the vault for markdown notes and extracts their tags, skipping files
/// whose content digest is unchanged since the last pass. The derived tag
/// lists can be persisted between sessions (see [`VaultIndex::save_cache`]).
pub struct VaultIndex {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    files: HashMap<String, FileRecord>,
}

impl VaultIndex {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root,
            fs,
            files: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full scan of the vault. Returns the number of files actually parsed;
    /// digest hits and unreadable files are skipped.
    pub fn scan(&mut self) -> usize {
        let paths = self.fs.list_files(&self.root, "md");
        let mut next = HashMap::new();
        let mut parsed = 0;

        for path in paths {
            let relative = self.relative(&path);
            let Ok(content) = self.fs.read_to_string(&path) else {
                continue;
            };
            let digest = compute_digest(&content);
            match self.files.get(&relative) {
                Some(record) if record.digest == digest => {
                    next.insert(relative, record.clone());
                }
                _ => {
                    parsed += 1;
                    next.insert(
                        relative,
                        FileRecord {
                            digest,
                            tags: extract_tags(&content),
                        },
                    );
                }
            }
        }

        self.files = next;
        parsed
    }

    /// Re-extract tags for one file from provided content.
    pub fn update_file(&mut self, path: &Path, content: &str) {
        let relative = self.relative(path);
        self.files.insert(
            relative,
            FileRecord {
                digest: compute_digest(content),
                tags: extract_tags(content),
            },
        );
    }

    pub fn remove_file(&mut self, path: &Path) -> bool {
        self.files.remove(&self.relative(path)).is_some()
    }

    /// Carry the record over to the new path; the content did not change.
    pub fn rename_file(&mut self, old_path: &Path, new_path: &Path) {
        let old_relative = self.relative(old_path);
        if let Some(record) = self.files.remove(&old_relative) {
            self.files.insert(self.relative(new_path), record);
        }
    }

    /// Vault-relative path with `/` separators, the key shape the tag engine
    /// sees everywhere.
    fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut s = relative.to_string_lossy().to_string();
        if std::path::MAIN_SEPARATOR == '\\' {
            s = s.replace('\\', "/");
        }
        s
    }

    pub(crate) fn records(&self) -> &HashMap<String, FileRecord> {
        &self.files
    }

    /// Persist the derived index so the next session can skip a cold parse.
    pub fn save_cache(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        crate::cache::IndexCache::from_records(self.files.clone()).save(path, &*self.fs)
    }

    /// Load a previously persisted index. Version mismatches and unreadable
    /// caches surface as errors; callers fall back to a full scan.
    pub fn load_cache(&mut self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let cache = crate::cache::IndexCache::load(path, &*self.fs)?;
        self.files = cache.files;
        Ok(())
    }
}

impl FileIndex for VaultIndex {
    fn all_files(&self) -> Vec<IndexedFile> {
        self.files
            .iter()
            .map(|(path, record)| IndexedFile {
                path: path.clone(),
                is_note: true,
                tags: Some(record.tags.clone()),
            })
            .collect()
    }

    fn note_exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn folder_exists(&self, path: &str) -> bool {
        self.fs.is_dir(&self.root.join(path))
    }
}

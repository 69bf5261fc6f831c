use std::collections::{HashMap, HashSet};

use log::{error, warn};

use crate::file_index::IndexedFile;
use crate::model::FilePath;
use crate::normalize::display_tag;

/// Files carrying more tags than this are skipped wholesale.
pub const MAX_TAGS_PER_FILE: usize = 1_000;
/// Hard cap on the number of files considered in one build.
pub const MAX_FILES: usize = 100_000;
/// Hard cap on the number of tag occurrences accumulated in one build.
pub const MAX_TOTAL_TAGS: usize = 100_000;

/// Options controlling one index build.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Folder path prefixes whose files are routed into `hidden_roots`.
    pub excluded_folders: Vec<String>,
    /// Master switch for excluded-folder handling.
    pub apply_exclusions: bool,
    /// When present, files absent from this set are skipped entirely. Guards
    /// against double-counting files whose inclusion is decided elsewhere.
    pub included_paths: Option<HashSet<FilePath>>,
}

/// Flat canonical tag index built from the per-file tag lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagIndex {
    /// Normalized path -> first-seen display casing for this build.
    pub canonical: HashMap<String, String>,
    /// Normalized path -> files carrying exactly that tag.
    pub files_by_tag: HashMap<String, HashSet<FilePath>>,
    /// Note files with an extracted-but-empty tag list.
    pub untagged: usize,
    /// Normalized root -> display root, for tags seen only on excluded files.
    pub hidden_roots: HashMap<String, String>,
    /// Set when a hard cap aborted the build early.
    pub truncated: bool,
}

/// Build the canonical tag index from a file snapshot.
///
/// Fail-soft by contract: cap violations log and truncate, returning whatever
/// was accumulated so far. This never returns an error and never panics.
pub fn build_index(files: &[IndexedFile], options: &IndexOptions) -> TagIndex {
    let mut index = TagIndex::default();
    let mut total_tags = 0usize;

    for (seen, file) in files.iter().enumerate() {
        if seen >= MAX_FILES {
            error!(
                "tag index: file cap of {} reached, ignoring {} remaining files",
                MAX_FILES,
                files.len() - seen
            );
            index.truncated = true;
            break;
        }

        if let Some(included) = &options.included_paths {
            if !included.contains(&file.path) {
                continue;
            }
        }

        // A missing tag list means extraction has not run yet; such a file is
        // neither tagged nor untagged.
        let Some(tags) = &file.tags else {
            continue;
        };

        // The per-file cap applies before exclusion routing, so an excluded
        // file cannot smuggle an unbounded tag list into the hidden roots.
        if tags.len() > MAX_TAGS_PER_FILE {
            warn!(
                "tag index: skipping '{}' with {} tags (cap {})",
                file.path,
                tags.len(),
                MAX_TAGS_PER_FILE
            );
            continue;
        }

        if options.apply_exclusions && in_excluded_folder(&file.path, &options.excluded_folders) {
            accumulate_hidden_roots(&mut index.hidden_roots, tags);
            continue;
        }

        if tags.is_empty() {
            if file.is_note {
                index.untagged += 1;
            }
            continue;
        }

        for raw in tags {
            let Some(display) = display_tag(raw) else {
                continue; // empty after normalization
            };
            if total_tags >= MAX_TOTAL_TAGS {
                error!(
                    "tag index: total tag cap of {} reached, aborting build",
                    MAX_TOTAL_TAGS
                );
                index.truncated = true;
                return index;
            }
            total_tags += 1;

            let normalized = display.to_lowercase();
            index
                .files_by_tag
                .entry(normalized.clone())
                .or_default()
                .insert(file.path.clone());
            index.canonical.entry(normalized).or_insert(display);
        }
    }

    index
}

/// Whether `path` lies inside any of the excluded folders. Prefixes match at
/// segment boundaries only, so `arch` does not exclude `archive/note.md`.
fn in_excluded_folder(path: &str, folders: &[String]) -> bool {
    folders.iter().any(|folder| {
        let folder = folder.trim_end_matches('/');
        if folder.is_empty() {
            return false;
        }
        path.strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn accumulate_hidden_roots(hidden_roots: &mut HashMap<String, String>, tags: &[String]) {
    for raw in tags {
        let Some(display) = display_tag(raw) else {
            continue;
        };
        let display_root = display.split('/').next().unwrap_or(&display).to_string();
        let normalized_root = display_root.to_lowercase();
        hidden_roots.entry(normalized_root).or_insert(display_root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, tags: Option<Vec<&str>>) -> IndexedFile {
        IndexedFile {
            path: path.to_string(),
            is_note: true,
            tags: tags.map(|t| t.into_iter().map(str::to_string).collect()),
        }
    }

    #[test]
    fn first_seen_casing_becomes_canonical() {
        let files = vec![
            file("a.md", Some(vec!["#Proj/Alpha"])),
            file("b.md", Some(vec!["#proj/alpha", "#proj"])),
        ];
        let index = build_index(&files, &IndexOptions::default());

        assert_eq!(index.canonical["proj/alpha"], "Proj/Alpha");
        assert_eq!(index.canonical["proj"], "proj");
        let alpha_files = &index.files_by_tag["proj/alpha"];
        assert_eq!(alpha_files.len(), 2, "duplicates merge under one key");
    }

    #[test]
    fn null_tags_are_not_untagged_but_empty_tags_are() {
        let files = vec![
            file("pending.md", None),
            file("empty.md", Some(vec![])),
            IndexedFile {
                path: "image.png".into(),
                is_note: false,
                tags: Some(vec![]),
            },
        ];
        let index = build_index(&files, &IndexOptions::default());
        assert_eq!(index.untagged, 1, "only empty-listed note files count");
    }

    #[test]
    fn excluded_files_feed_only_hidden_roots() {
        let options = IndexOptions {
            excluded_folders: vec!["archive".into()],
            apply_exclusions: true,
            included_paths: None,
        };
        let files = vec![
            file("archive/old.md", Some(vec!["#Stale/Deep"])),
            file("current.md", Some(vec!["#fresh"])),
        ];
        let index = build_index(&files, &options);

        assert_eq!(index.hidden_roots.get("stale"), Some(&"Stale".to_string()));
        assert!(!index.canonical.contains_key("stale/deep"));
        assert!(index.canonical.contains_key("fresh"));
    }

    #[test]
    fn exclusion_prefix_matches_at_segment_boundary() {
        assert!(in_excluded_folder("archive/note.md", &["archive".into()]));
        assert!(in_excluded_folder("a/b/note.md", &["a/b/".into()]));
        assert!(!in_excluded_folder("archive2/note.md", &["archive".into()]));
        assert!(!in_excluded_folder("note.md", &["".into()]));
    }

    #[test]
    fn included_paths_gate_processing() {
        let options = IndexOptions {
            included_paths: Some(["kept.md".to_string()].into_iter().collect()),
            ..Default::default()
        };
        let files = vec![
            file("kept.md", Some(vec!["#a"])),
            file("dropped.md", Some(vec!["#b"])),
        ];
        let index = build_index(&files, &options);
        assert!(index.canonical.contains_key("a"));
        assert!(!index.canonical.contains_key("b"));
    }

    #[test]
    fn per_file_tag_cap_skips_file_wholesale() {
        let many: Vec<String> = (0..=MAX_TAGS_PER_FILE).map(|i| format!("t{i}")).collect();
        let files = vec![IndexedFile {
            path: "huge.md".into(),
            is_note: true,
            tags: Some(many),
        }];
        let index = build_index(&files, &IndexOptions::default());
        assert!(index.canonical.is_empty());
        assert!(!index.truncated, "per-file skip is not a build abort");
    }

    #[test]
    fn per_file_tag_cap_applies_to_excluded_files_too() {
        let many: Vec<String> = (0..=MAX_TAGS_PER_FILE).map(|i| format!("t{i}")).collect();
        let options = IndexOptions {
            excluded_folders: vec!["archive".into()],
            apply_exclusions: true,
            included_paths: None,
        };
        let files = vec![IndexedFile {
            path: "archive/huge.md".into(),
            is_note: true,
            tags: Some(many),
        }];
        let index = build_index(&files, &options);
        assert!(index.hidden_roots.is_empty());
        assert!(!index.truncated);
    }

    #[test]
    fn total_tag_cap_aborts_fail_soft() {
        let files: Vec<IndexedFile> = (0..(MAX_TOTAL_TAGS / 500 + 1))
            .map(|i| {
                let tags: Vec<String> = (0..500).map(|j| format!("f{i}/t{j}")).collect();
                IndexedFile {
                    path: format!("n{i}.md"),
                    is_note: true,
                    tags: Some(tags),
                }
            })
            .collect();
        let index = build_index(&files, &IndexOptions::default());
        assert!(index.truncated);
        assert!(!index.canonical.is_empty(), "partial result is returned");
    }
}

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::model::TagTreeNode;

/// Descent stops past this depth; the count is then a partial undercount
/// rather than a runaway traversal.
pub const MAX_COUNT_DEPTH: usize = 50;

/// Memo for aggregate note counts, keyed by `(generation, node path)`.
///
/// The owner assigns each tree build a monotonically increasing generation
/// and resets the cache when a new tree is published; counts are never
/// carried across rebuilds and never keyed by reference identity.
#[derive(Debug, Default)]
pub struct NoteCountCache {
    generation: u64,
    memo: HashMap<String, usize>,
}

impl NoteCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every memoized count and adopt a new tree generation.
    pub fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.memo.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Total distinct note count under `node`, descendants included.
    ///
    /// This is a set union, not a sum: a file tagged with both a tag and one
    /// of its child tags counts once. `generation` must be the generation of
    /// the tree snapshot `node` belongs to: a newer generation adopts and
    /// clears the memo, an older one is counted without memoization so a node
    /// from a superseded snapshot never pollutes the live entries.
    pub fn total_note_count(&mut self, generation: u64, node: &TagTreeNode) -> usize {
        if generation > self.generation {
            self.reset(generation);
        } else if generation < self.generation {
            return union_count(node);
        }
        if let Some(&count) = self.memo.get(&node.path) {
            return count;
        }
        let count = union_count(node);
        self.memo.insert(node.path.clone(), count);
        count
    }
}

/// Work-list traversal with a visited set, so depth and cycles are bounded
/// deterministically instead of leaning on the call stack.
fn union_count(node: &TagTreeNode) -> usize {
    let mut files: HashSet<&str> = HashSet::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut work: Vec<(&TagTreeNode, usize)> = vec![(node, 0)];

    while let Some((current, depth)) = work.pop() {
        if !visited.insert(current.path.as_str()) {
            warn!("note count: cycle at '{}', skipping branch", current.path);
            continue;
        }
        files.extend(current.notes_with_tag.iter().map(String::as_str));
        if depth >= MAX_COUNT_DEPTH {
            warn!(
                "note count: depth cap {} at '{}', result is partial",
                MAX_COUNT_DEPTH, current.path
            );
            continue;
        }
        work.extend(current.children.values().map(|child| (child, depth + 1)));
    }

    files.len()
}

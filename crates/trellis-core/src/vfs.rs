use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Abstract interface for the file system operations the vault index needs.
pub trait FileSystem: Send + Sync {
    /// Read the entire contents of a file into a string.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// Read the entire contents of a file as bytes.
    fn read_all(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// Write bytes to a file, creating it if needed.
    fn write_all(&self, path: &Path, data: &[u8]) -> std::io::Result<()>;

    /// Recursively list all files with the given extension under the root.
    fn list_files(&self, root: &Path, extension: &str) -> Vec<PathBuf>;

    /// Whether the path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;
}

/// Standard implementation of FileSystem using std::fs and walkdir.
pub struct PhysicalFileSystem;

impl FileSystem for PhysicalFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_all(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_all(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        std::fs::write(path, data)
    }

    fn list_files(&self, root: &Path, extension: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == extension {
                        files.push(path.to_path_buf());
                    }
                }
            }
        }

        files
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

//! ==============================================================================
//! library.rs - media library scan
//! ==============================================================================
//!
//! purpose:
//!     builds the selection space: an ordered, fixed list of playable files
//!     from one directory, filtered by extension. the list is immutable for
//!     the process lifetime; the dial maps onto its indices.
//!
//! relationships:
//!     - used by: main.rs (startup), backend.rs (playlist enqueue)
//!
//! ==============================================================================

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// ordered, immutable list of playable items
pub struct MediaLibrary {
    items: Vec<PathBuf>,
}

impl MediaLibrary {
    /// scan `dir` for files matching the extension allow-list
    ///
    /// entries are sorted by path so indices are stable across runs with
    /// the same directory contents. an empty result is fatal: the dial has
    /// nothing to select.
    pub fn scan(dir: &Path, extensions: &[String]) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read media directory {}", dir.display()))?;

        let mut items: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && matches_extension(path, extensions))
            .collect();
        items.sort();

        if items.is_empty() {
            bail!(
                "no playable files ({}) found in {}",
                extensions.join(", "),
                dir.display()
            );
        }

        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[PathBuf] {
        &self.items
    }
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["mov".to_string(), "mp4".to_string()]
    }

    #[test]
    fn filters_and_sorts() {
        let dir = std::env::temp_dir().join(format!("dial-kiosk-lib-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.mp4", "a.MOV", "notes.txt", "c.mp4"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }

        let library = MediaLibrary::scan(&dir, &exts()).unwrap();
        let names: Vec<_> = library
            .items()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.MOV", "b.mp4", "c.mp4"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_directory_is_fatal() {
        let dir = std::env::temp_dir().join(format!("dial-kiosk-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        assert!(MediaLibrary::scan(&dir, &exts()).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = Path::new("/definitely/not/a/real/media/dir");
        assert!(MediaLibrary::scan(dir, &exts()).is_err());
    }
}

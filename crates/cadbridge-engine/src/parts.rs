//! Parts library
//!
//! A directory tree of prebuilt part files addressed by relative path. The
//! listing is cached until [`PartsLibrary::invalidate`] is called, or, with
//! the `parts-watcher` feature, until a file under the root changes.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use cadbridge_kernel::PART_EXTENSION;
use parking_lot::Mutex;

use crate::error::{BridgeError, Result};

type Cache = Arc<Mutex<Option<Vec<String>>>>;

/// Catalog of part files under a root directory
#[derive(Debug)]
pub struct PartsLibrary {
    root: PathBuf,
    cache: Cache,
}

impl PartsLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sorted `/`-separated paths of every part file, relative to the root
    pub fn list(&self) -> Result<Vec<String>> {
        let mut cache = self.cache.lock();
        if let Some(parts) = cache.as_ref() {
            return Ok(parts.clone());
        }

        if !self.root.is_dir() {
            return Err(BridgeError::PartNotFound(format!(
                "parts library {} does not exist",
                self.root.display()
            )));
        }

        let mut parts = Vec::new();
        scan(&self.root, &self.root, &mut parts)
            .map_err(|e| BridgeError::Internal(format!("cannot read parts library: {e}")))?;
        parts.sort();

        tracing::debug!("Indexed {} parts under {}", parts.len(), self.root.display());
        *cache = Some(parts.clone());
        Ok(parts)
    }

    /// Drop the cached listing so the next call rescans
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    /// Absolute path of a part given by its relative path
    ///
    /// Absolute paths and `..` components are rejected, so a request can
    /// never leave the library root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(BridgeError::PartNotFound(relative.to_string()));
        }

        let path = self.root.join(rel);
        if path.is_file() {
            Ok(path)
        } else {
            Err(BridgeError::PartNotFound(relative.to_string()))
        }
    }

    /// Invalidate the listing whenever something under the root changes
    ///
    /// The watch lasts as long as the returned guard.
    #[cfg(feature = "parts-watcher")]
    pub fn watch(&self, debounce: std::time::Duration) -> Result<PartsWatcher> {
        use notify::RecursiveMode;
        use notify_debouncer_mini::{DebouncedEvent, new_debouncer};

        let cache = self.cache.clone();
        let mut debouncer = new_debouncer(
            debounce,
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) if !events.is_empty() => {
                    tracing::debug!("Parts library changed ({} events)", events.len());
                    *cache.lock() = None;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Parts library watch error: {:?}", e),
            },
        )
        .map_err(|e| BridgeError::Internal(format!("failed to create parts watcher: {e:?}")))?;

        debouncer
            .watcher()
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| BridgeError::Internal(format!("failed to watch {}: {e}", self.root.display())))?;

        tracing::info!("Watching parts library: {}", self.root.display());
        Ok(PartsWatcher { _debouncer: debouncer })
    }
}

/// Keeps a parts library watch alive
#[cfg(feature = "parts-watcher")]
pub struct PartsWatcher {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

fn scan(root: &Path, dir: &Path, parts: &mut Vec<String>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan(root, &path, parts)?;
        } else if path.extension().is_some_and(|e| e == PART_EXTENSION) {
            if let Ok(rel) = path.strip_prefix(root) {
                let segments: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect();
                parts.push(segments.join("/"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> (tempfile::TempDir, PartsLibrary) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("fasteners/bolts")).unwrap();
        fs::write(dir.path().join("bracket.cbpart"), "{}").unwrap();
        fs::write(dir.path().join("fasteners/bolts/m6.cbpart"), "{}").unwrap();
        fs::write(dir.path().join("fasteners/readme.txt"), "").unwrap();
        let lib = PartsLibrary::new(dir.path());
        (dir, lib)
    }

    #[test]
    fn test_list_is_sorted_and_relative() {
        let (_dir, lib) = library();
        assert_eq!(lib.list().unwrap(), vec!["bracket.cbpart", "fasteners/bolts/m6.cbpart"]);
    }

    #[test]
    fn test_list_is_cached_until_invalidated() {
        let (dir, lib) = library();
        let first = lib.list().unwrap();

        fs::write(dir.path().join("washer.cbpart"), "{}").unwrap();
        assert_eq!(lib.list().unwrap(), first);

        lib.invalidate();
        assert!(lib.list().unwrap().contains(&"washer.cbpart".to_string()));
    }

    #[test]
    fn test_missing_root() {
        let lib = PartsLibrary::new("/nonexistent/parts/root");
        assert!(matches!(lib.list(), Err(BridgeError::PartNotFound(_))));
    }

    #[test]
    fn test_resolve_stays_inside_root() {
        let (dir, lib) = library();
        assert_eq!(
            lib.resolve("fasteners/bolts/m6.cbpart").unwrap(),
            dir.path().join("fasteners/bolts/m6.cbpart")
        );
        assert!(lib.resolve("../etc/passwd").is_err());
        assert!(lib.resolve("/etc/passwd").is_err());
        assert!(lib.resolve("missing.cbpart").is_err());
        assert!(lib.resolve("").is_err());
    }
}

use super::Provenance;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

type Cell = Arc<OnceLock<Arc<Provenance>>>;

/// Per-run memo of source path → provenance.
///
/// Each key owns a `OnceLock`: the map lock is held only to fetch the cell,
/// so different paths resolve in parallel while concurrent requests for the
/// same path wait on one computation. Entries are never replaced.
#[derive(Default)]
pub struct ProvenanceCache {
    cells: Mutex<FxHashMap<PathBuf, Cell>>,
}

impl ProvenanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_resolve(&self, key: &Path, resolve: impl FnOnce() -> Provenance) -> Arc<Provenance> {
        let cell: Cell = {
            let mut cells = self.cells.lock();
            Arc::clone(cells.entry(key.to_path_buf()).or_default())
        };
        Arc::clone(cell.get_or_init(|| Arc::new(resolve())))
    }

    pub fn get(&self, key: &Path) -> Option<Arc<Provenance>> {
        let cell = self.cells.lock().get(key).cloned()?;
        cell.get().cloned()
    }

    pub fn len(&self) -> usize {
        self.cells.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_wins() {
        let cache = ProvenanceCache::new();
        let key = Path::new("/repo/a.md");

        let first = cache.get_or_resolve(key, || Provenance::fallback(None, "first"));
        let second = cache.get_or_resolve(key, || Provenance::fallback(None, "second"));

        assert_eq!(first.fallback_reason.as_deref(), Some("first"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_before_and_after_resolve() {
        let cache = ProvenanceCache::new();
        let key = Path::new("/repo/b.md");
        assert!(cache.get(key).is_none());
        assert!(cache.is_empty());

        cache.get_or_resolve(key, Provenance::default);
        assert!(cache.get(key).is_some());
    }
}

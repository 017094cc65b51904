use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::sync::Arc;

/// LibraryCache keeps compiled libraries keyed by source path,
/// so that one library is compiled at most once even if multiple
/// threads request it concurrently.
///
/// The cache is owned by its creator, e.g. one per analysis run.
/// Cached values are shared read-only. Consumers must copy a node
/// before modifying it.
#[derive(Debug)]
pub struct LibraryCache<T> {
    slots: RwLock<IndexMap<SmolStr, Arc<OnceCell<Arc<T>>>>>,
}

impl<T> Default for LibraryCache<T> {
    fn default() -> Self {
        LibraryCache {
            slots: RwLock::new(IndexMap::new()),
        }
    }
}

impl<T> LibraryCache<T> {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns cached library of given path.
    #[inline]
    pub fn get(&self, path: &str) -> Option<Arc<T>> {
        let slots = self.slots.read();
        slots.get(path).and_then(|slot| slot.get().cloned())
    }

    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Returns number of compiled libraries.
    #[inline]
    pub fn len(&self) -> usize {
        let slots = self.slots.read();
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn clear(&self) {
        self.slots.write().clear()
    }

    /// Returns cached library, or compiles it with given function
    /// if absent.
    /// Concurrent callers of the same path wait for the single
    /// compilation. If compilation fails, the error is returned and
    /// the path remains vacant.
    pub fn get_or_try_insert_with<E, F>(&self, path: &str, compile: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(lib) = self.get(path) {
            return Ok(lib);
        }
        let slot = {
            let mut slots = self.slots.write();
            Arc::clone(slots.entry(SmolStr::new(path)).or_default())
        };
        slot.get_or_try_init(|| {
            log::debug!("compile library at {}", path);
            compile().map(Arc::new)
        })
        .map(Arc::clone)
    }
}

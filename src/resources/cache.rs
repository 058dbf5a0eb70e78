//! Text-keyed cache for rasterized sprite textures.

use std::collections::HashMap;

/// Maps a text string to the resource rasterized for it.
///
/// Entries are never evicted; [`TextureCache::drain`] hands every entry back
/// so the caller can release GPU memory at teardown.
#[derive(Debug)]
pub struct TextureCache<T> {
    entries: HashMap<String, T>,
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Return the entry for `key`, creating it with `create` on first request.
    ///
    /// A failing `create` leaves the cache untouched.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        create: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        if !self.entries.contains_key(key) {
            let value = create()?;
            self.entries.insert(key.to_string(), value);
        }
        // the key is present at this point, the lookup cannot miss
        Ok(&self.entries[key])
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and yield every entry.
    pub fn drain(&mut self) -> impl Iterator<Item = (String, T)> + '_ {
        self.entries.drain()
    }
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_each_entry_once() {
        let mut cache = TextureCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("Khó khăn chỉ là tạm thời", || {
                    calls += 1;
                    Ok::<_, ()>(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_creation_is_not_cached() {
        let mut cache: TextureCache<u32> = TextureCache::new();
        let result = cache.get_or_try_insert_with("a", || Err("no font"));
        assert_eq!(result, Err("no font"));
        assert!(cache.is_empty());
        assert!(!cache.contains("a"));

        let value = cache.get_or_try_insert_with("a", || Ok::<_, &str>(7));
        assert_eq!(value, Ok(&7));
    }

    #[test]
    fn drain_empties_the_cache() {
        let mut cache = TextureCache::new();
        cache.get_or_try_insert_with("a", || Ok::<_, ()>(1)).unwrap();
        cache.get_or_try_insert_with("b", || Ok::<_, ()>(2)).unwrap();

        let mut drained: Vec<_> = cache.drain().collect();
        drained.sort();
        assert_eq!(drained, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}

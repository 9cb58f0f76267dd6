use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::error::SqlTemplateError;

use super::{Record, RowMapper};

type Erased = Arc<dyn Any + Send + Sync>;

/// Derived mappers keyed by record type.
///
/// Lookups take a read lock. On a miss the mapper is derived outside any lock and
/// inserted under the write lock only if no other caller got there first, so racing
/// first uses all end up holding the same cached mapper.
#[derive(Default)]
pub struct MapperCache {
    mappers: RwLock<HashMap<TypeId, Erased>>,
}

impl MapperCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached mapper for `T`, deriving it on first use.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::MappingError` if `T`'s descriptor is invalid.
    pub fn get_or_derive<T: Record>(&self) -> Result<RowMapper<T>, SqlTemplateError> {
        let key = TypeId::of::<T>();
        if let Some(mapper) = self.lookup::<T>(key) {
            return Ok(mapper);
        }

        let derived = RowMapper::<T>::derived()?;
        let mut guard = self
            .mappers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = guard.entry(key).or_insert_with(|| {
            trace!(record = std::any::type_name::<T>(), "cached derived row mapper");
            Arc::new(derived) as Erased
        });
        downcast::<T>(entry)
    }

    /// Number of record types with a cached mapper.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<T: Record>(&self, key: TypeId) -> Option<RowMapper<T>> {
        let guard = self.mappers.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(&key).and_then(|entry| downcast::<T>(entry).ok())
    }
}

impl std::fmt::Debug for MapperCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperCache")
            .field("cached_types", &self.len())
            .finish()
    }
}

fn downcast<T: Record>(entry: &Erased) -> Result<RowMapper<T>, SqlTemplateError> {
    entry
        .downcast_ref::<RowMapper<T>>()
        .cloned()
        .ok_or_else(|| {
            SqlTemplateError::MappingError(format!(
                "cached mapper for `{}` has an unexpected type",
                std::any::type_name::<T>()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    crate::record! {
        struct Tag {
            id: i64,
            label: String,
        }
    }

    crate::record! {
        struct Other {
            id: i64,
        }
    }

    #[test]
    fn second_lookup_reuses_cached_mapper() {
        let cache = MapperCache::new();
        let first = cache.get_or_derive::<Tag>().unwrap();
        let second = cache.get_or_derive::<Tag>().unwrap();
        assert!(RowMapper::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.get_or_derive::<Other>().unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_first_use_converges() {
        let cache = Arc::new(MapperCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_derive::<Tag>().unwrap())
            })
            .collect();
        let mappers: Vec<RowMapper<Tag>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let cached = cache.get_or_derive::<Tag>().unwrap();
        assert!(mappers.iter().all(|m| RowMapper::ptr_eq(m, &cached)));
        assert_eq!(cache.len(), 1);
    }
}

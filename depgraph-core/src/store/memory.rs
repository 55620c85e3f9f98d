use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use crate::types::CodeObject;

use super::traits::{CodeObjectStore, LoadOptions, StoreStats};

/// Map-backed store for tests and for graphs imported without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, CodeObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `objects`. Later duplicates replace earlier ones.
    pub fn from_objects(objects: impl IntoIterator<Item = CodeObject>) -> Self {
        let map = objects.into_iter().map(|o| (o.id.clone(), o)).collect();
        Self {
            objects: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, CodeObject>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, CodeObject>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl CodeObjectStore for MemoryStore {
    async fn upsert_object(&self, object: &CodeObject) -> crate::error::Result<()> {
        self.write().insert(object.id.clone(), object.clone());
        Ok(())
    }

    async fn upsert_objects_batch(&self, objects: &[CodeObject]) -> crate::error::Result<u64> {
        let mut map = self.write();
        for object in objects {
            map.insert(object.id.clone(), object.clone());
        }
        Ok(objects.len() as u64)
    }

    async fn get_object(&self, id: &str) -> crate::error::Result<Option<CodeObject>> {
        Ok(self.read().get(id).cloned())
    }

    async fn get_objects(
        &self,
        ids: &[String],
    ) -> crate::error::Result<HashMap<String, CodeObject>> {
        let map = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| map.get(id).map(|o| (id.clone(), o.clone())))
            .collect())
    }

    async fn load_objects(&self, options: LoadOptions) -> crate::error::Result<Vec<CodeObject>> {
        let map = self.read();
        Ok(map
            .values()
            .map(|o| {
                if options.include_source {
                    o.clone()
                } else {
                    o.lightweight()
                }
            })
            .collect())
    }

    async fn object_ids(&self) -> crate::error::Result<Vec<String>> {
        Ok(self.read().keys().cloned().collect())
    }

    async fn delete_object(&self, id: &str) -> crate::error::Result<bool> {
        Ok(self.write().remove(id).is_some())
    }

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        let map = self.read();
        let mut stats = StoreStats {
            total_objects: map.len() as u64,
            ..StoreStats::default()
        };
        for object in map.values() {
            *stats
                .objects_by_kind
                .entry(object.kind.as_str().to_string())
                .or_default() += 1;
            stats.total_calls += object.calls.len() as u64;
            if object.overloaded {
                stats.overloaded_objects += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallReference, ObjectKind};

    #[tokio::test]
    async fn behaves_like_a_store() {
        let store = MemoryStore::new();
        let a = CodeObject::new("pkg", "a", ObjectKind::Procedure)
            .with_calls(vec![CallReference::new("b")])
            .with_source("BEGIN b; END;");
        store.upsert_object(&a).await.unwrap();
        store
            .upsert_objects_batch(&[CodeObject::new("pkg", "b", ObjectKind::Function)])
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.object_ids().await.unwrap(), vec!["pkg.a", "pkg.b"]);

        let light = store.load_objects(LoadOptions::lightweight()).await.unwrap();
        assert!(light.iter().all(|o| o.source_text.is_none()));

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_calls, 1);
        assert_eq!(stats.objects_by_kind["function"], 1);

        assert!(store.delete_object("pkg.a").await.unwrap());
        assert!(store.get_object("pkg.a").await.unwrap().is_none());
    }
}

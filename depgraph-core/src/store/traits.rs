use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::CodeObject;

/// Options for bulk loads from a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Include source text and literal maps. `false` gives a lightweight load.
    pub include_source: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            include_source: true,
        }
    }
}

impl LoadOptions {
    pub fn lightweight() -> Self {
        Self {
            include_source: false,
        }
    }
}

/// Summary statistics for a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_objects: u64,
    /// Object count broken down by `ObjectKind` name.
    pub objects_by_kind: HashMap<String, u64>,
    pub total_calls: u64,
    pub overloaded_objects: u64,
    /// Database file size in bytes (0 for in-memory stores).
    pub db_size_bytes: u64,
}

/// Source of extracted code objects, keyed by id.
///
/// The graph layers only read through this trait; writes exist so the
/// extractor (or tests) can populate a store.
#[async_trait::async_trait]
pub trait CodeObjectStore: Send + Sync {
    /// Insert or replace an object by id.
    async fn upsert_object(&self, object: &CodeObject) -> crate::error::Result<()>;

    /// Insert or replace many objects within a single transaction.
    async fn upsert_objects_batch(&self, objects: &[CodeObject]) -> crate::error::Result<u64>;

    /// Get one object by id.
    async fn get_object(&self, id: &str) -> crate::error::Result<Option<CodeObject>>;

    /// Get many objects by id. Ids absent from the store are simply missing
    /// from the returned map.
    async fn get_objects(&self, ids: &[String]) -> crate::error::Result<HashMap<String, CodeObject>>;

    /// Load every object, ordered by id.
    async fn load_objects(&self, options: LoadOptions) -> crate::error::Result<Vec<CodeObject>>;

    /// All object ids, sorted.
    async fn object_ids(&self) -> crate::error::Result<Vec<String>>;

    /// Delete an object. Returns whether it existed.
    async fn delete_object(&self, id: &str) -> crate::error::Result<bool>;

    /// Get summary statistics about the store.
    async fn stats(&self) -> crate::error::Result<StoreStats>;
}

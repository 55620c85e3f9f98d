use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreError;
use crate::types::{CodeObject, ObjectKind};

use super::schema;
use super::traits::{CodeObjectStore, LoadOptions, StoreStats};

const FULL_COLUMNS: &str = "id, name, package_name, kind, overloaded, parameters, return_type, \
                            calls, source_text, literal_map";
const LIGHT_COLUMNS: &str = "id, name, package_name, kind, overloaded, parameters, return_type, \
                             calls, NULL AS source_text, NULL AS literal_map";

/// SQLite-backed implementation of `CodeObjectStore`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open a store that must already exist.
    pub fn open_existing(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()).into());
        }
        Self::open(path)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.lock();

        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )
        .map_err(StoreError::Sqlite)?;

        // WAL is not available for in-memory databases; ignore failure.
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::Sqlite)?;

        conn.execute(
            "INSERT OR IGNORE INTO depgraph_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::Sqlite)?;

        let version: String = conn
            .query_row(
                "SELECT value FROM depgraph_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        if version != schema::SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "database schema version {version} is not supported (expected {})",
                schema::SCHEMA_VERSION
            ))
            .into());
        }

        Ok(())
    }

    /// Helper: read a code object from a row selected with `FULL_COLUMNS`
    /// or `LIGHT_COLUMNS`. JSON columns are returned raw for the caller to decode.
    fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawObject> {
        Ok(RawObject {
            id: row.get("id")?,
            name: row.get("name")?,
            package_name: row.get("package_name")?,
            kind: row.get("kind")?,
            overloaded: row.get::<_, i64>("overloaded")? != 0,
            parameters: row.get("parameters")?,
            return_type: row.get("return_type")?,
            calls: row.get("calls")?,
            source_text: row.get("source_text")?,
            literal_map: row.get("literal_map")?,
        })
    }

    fn write_object(conn: &Connection, object: &CodeObject) -> crate::error::Result<()> {
        let parameters =
            serde_json::to_string(&object.parameters).map_err(StoreError::Serialization)?;
        let calls = serde_json::to_string(&object.calls).map_err(StoreError::Serialization)?;
        let literal_map = object
            .literal_map
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StoreError::Serialization)?;
        let call_count = i64::try_from(object.calls.len()).unwrap_or(i64::MAX);

        conn.execute(
            "INSERT INTO code_objects
                (id, name, package_name, kind, overloaded, parameters, return_type,
                 calls, call_count, source_text, literal_map, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                package_name = excluded.package_name,
                kind = excluded.kind,
                overloaded = excluded.overloaded,
                parameters = excluded.parameters,
                return_type = excluded.return_type,
                calls = excluded.calls,
                call_count = excluded.call_count,
                source_text = excluded.source_text,
                literal_map = excluded.literal_map,
                updated_at = excluded.updated_at",
            params![
                object.id,
                object.name,
                object.package_name,
                object.kind.as_str(),
                i64::from(object.overloaded),
                parameters,
                object.return_type,
                calls,
                call_count,
                object.source_text,
                literal_map,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(())
    }
}

/// A row before its JSON columns are decoded.
struct RawObject {
    id: String,
    name: String,
    package_name: String,
    kind: String,
    overloaded: bool,
    parameters: String,
    return_type: Option<String>,
    calls: String,
    source_text: Option<String>,
    literal_map: Option<String>,
}

impl RawObject {
    fn decode(self) -> crate::error::Result<CodeObject> {
        let literal_map = self
            .literal_map
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(StoreError::Serialization)?;
        Ok(CodeObject {
            id: self.id,
            name: self.name,
            package_name: self.package_name,
            kind: ObjectKind::parse(&self.kind),
            overloaded: self.overloaded,
            parameters: serde_json::from_str(&self.parameters)
                .map_err(StoreError::Serialization)?,
            return_type: self.return_type,
            calls: serde_json::from_str(&self.calls).map_err(StoreError::Serialization)?,
            source_text: self.source_text,
            literal_map,
        })
    }
}

#[async_trait::async_trait]
impl CodeObjectStore for SqliteStore {
    async fn upsert_object(&self, object: &CodeObject) -> crate::error::Result<()> {
        let conn = self.lock();
        Self::write_object(&conn, object)
    }

    async fn upsert_objects_batch(&self, objects: &[CodeObject]) -> crate::error::Result<u64> {
        let conn = self.lock();
        let tx = conn.unchecked_transaction().map_err(StoreError::Sqlite)?;
        let mut count = 0u64;
        for chunk in objects.chunks(1000) {
            for object in chunk {
                Self::write_object(&tx, object)?;
                count += 1;
            }
        }
        tx.commit().map_err(StoreError::Sqlite)?;
        Ok(count)
    }

    async fn get_object(&self, id: &str) -> crate::error::Result<Option<CodeObject>> {
        let conn = self.lock();
        let raw = conn
            .query_row(
                &format!("SELECT {FULL_COLUMNS} FROM code_objects WHERE id = ?1"),
                params![id],
                Self::row_to_raw,
            )
            .optional()
            .map_err(StoreError::Sqlite)?;
        raw.map(RawObject::decode).transpose()
    }

    async fn get_objects(
        &self,
        ids: &[String],
    ) -> crate::error::Result<HashMap<String, CodeObject>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {FULL_COLUMNS} FROM code_objects WHERE id = ?1"
            ))
            .map_err(StoreError::Sqlite)?;

        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            let raw = stmt
                .query_row(params![id], Self::row_to_raw)
                .optional()
                .map_err(StoreError::Sqlite)?;
            if let Some(raw) = raw {
                let object = raw.decode()?;
                found.insert(object.id.clone(), object);
            }
        }
        Ok(found)
    }

    async fn load_objects(&self, options: LoadOptions) -> crate::error::Result<Vec<CodeObject>> {
        let conn = self.lock();
        let columns = if options.include_source {
            FULL_COLUMNS
        } else {
            LIGHT_COLUMNS
        };
        let mut stmt = conn
            .prepare(&format!("SELECT {columns} FROM code_objects ORDER BY id"))
            .map_err(StoreError::Sqlite)?;
        let rows = stmt
            .query_map([], Self::row_to_raw)
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        rows.into_iter().map(RawObject::decode).collect()
    }

    async fn object_ids(&self) -> crate::error::Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT id FROM code_objects ORDER BY id")
            .map_err(StoreError::Sqlite)?;
        let ids = stmt
            .query_map([], |row| row.get(0))
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(StoreError::Sqlite)?;
        Ok(ids)
    }

    async fn delete_object(&self, id: &str) -> crate::error::Result<bool> {
        let conn = self.lock();
        let deleted = conn
            .execute("DELETE FROM code_objects WHERE id = ?1", params![id])
            .map_err(StoreError::Sqlite)?;
        Ok(deleted > 0)
    }

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        let conn = self.lock();

        let total_objects: u64 = conn
            .query_row("SELECT COUNT(*) FROM code_objects", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        let total_calls: u64 = conn
            .query_row(
                "SELECT COALESCE(SUM(call_count), 0) FROM code_objects",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        let overloaded_objects: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM code_objects WHERE overloaded != 0",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;

        let mut stmt = conn
            .prepare("SELECT kind, COUNT(*) FROM code_objects GROUP BY kind")
            .map_err(StoreError::Sqlite)?;
        let objects_by_kind: HashMap<String, u64> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<HashMap<_, _>>>()
            .map_err(StoreError::Sqlite)?;

        let db_size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(StoreStats {
            total_objects,
            objects_by_kind,
            total_calls,
            overloaded_objects,
            db_size_bytes,
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::types::{CallReference, Parameter};

    fn sample_object() -> CodeObject {
        let mut obj = CodeObject::new("pkg_orders", "place_order", ObjectKind::Procedure)
            .with_parameters(vec![
                Parameter::new("p_id", "NUMBER"),
                Parameter::new("p_note", "VARCHAR2").with_default("NULL"),
            ])
            .with_calls(vec![
                CallReference::new("pkg_stock.reserve")
                    .at_line(4)
                    .with_positional(["p_id"]),
                CallReference::new("log_event").with_named("p_msg", "<lit_1>"),
            ])
            .with_source("BEGIN\n  pkg_stock.reserve(p_id);\n  log_event(p_msg => <lit_1>);\nEND;");
        obj.literal_map = Some(BTreeMap::from([("<lit_1>".into(), "'placed'".into())]));
        obj
    }

    #[tokio::test]
    async fn object_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let obj = sample_object();
        store.upsert_object(&obj).await.unwrap();

        let fetched = store.get_object(&obj.id).await.unwrap().unwrap();
        assert_eq!(fetched, obj);
    }

    #[tokio::test]
    async fn missing_object_is_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_object("nope.nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = SqliteStore::in_memory().unwrap();
        let mut obj = sample_object();
        store.upsert_object(&obj).await.unwrap();
        obj.return_type = Some("NUMBER".into());
        store.upsert_object(&obj).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_objects, 1);
        let fetched = store.get_object(&obj.id).await.unwrap().unwrap();
        assert_eq!(fetched.return_type.as_deref(), Some("NUMBER"));
    }

    #[tokio::test]
    async fn lightweight_load_drops_source() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_object(&sample_object()).await.unwrap();

        let light = store.load_objects(LoadOptions::lightweight()).await.unwrap();
        assert_eq!(light.len(), 1);
        assert!(light[0].source_text.is_none());
        assert!(light[0].literal_map.is_none());
        assert_eq!(light[0].calls.len(), 2);

        let full = store.load_objects(LoadOptions::default()).await.unwrap();
        assert!(full[0].source_text.is_some());
    }

    #[tokio::test]
    async fn batch_upsert_and_bulk_get() {
        let store = SqliteStore::in_memory().unwrap();
        let objects: Vec<CodeObject> = (0..25)
            .map(|i| CodeObject::new("pkg", &format!("proc_{i:02}"), ObjectKind::Procedure))
            .collect();
        let written = store.upsert_objects_batch(&objects).await.unwrap();
        assert_eq!(written, 25);

        let ids = store.object_ids().await.unwrap();
        assert_eq!(ids.len(), 25);
        assert_eq!(ids[0], "pkg.proc_00");

        let wanted = vec!["pkg.proc_03".to_string(), "pkg.missing".to_string()];
        let found = store.get_objects(&wanted).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("pkg.proc_03"));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = SqliteStore::in_memory().unwrap();
        let obj = sample_object();
        store.upsert_object(&obj).await.unwrap();
        assert!(store.delete_object(&obj.id).await.unwrap());
        assert!(!store.delete_object(&obj.id).await.unwrap());
    }

    #[tokio::test]
    async fn stats_by_kind() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_object(&sample_object()).await.unwrap();
        store
            .upsert_object(&CodeObject::new("pkg", "f", ObjectKind::Function).overloaded())
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_objects, 2);
        assert_eq!(stats.total_calls, 2);
        assert_eq!(stats.overloaded_objects, 1);
        assert_eq!(stats.objects_by_kind.get("procedure"), Some(&1));
        assert_eq!(stats.objects_by_kind.get("function"), Some(&1));
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[tokio::test]
    async fn reopen_file_store_keeps_data() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let store = SqliteStore::open(tmp.path()).unwrap();
            store.upsert_object(&sample_object()).await.unwrap();
        }
        let store = SqliteStore::open(tmp.path()).unwrap();
        assert_eq!(store.object_ids().await.unwrap(), vec!["pkg_orders.place_order"]);
        assert!(store.stats().await.unwrap().db_size_bytes > 0);
    }

    #[test]
    fn open_existing_requires_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.db");
        let err = SqliteStore::open_existing(&missing).unwrap_err();
        assert!(matches!(err, crate::error::DepGraphError::Store(StoreError::NotFound(_))), "got {err:?}");
        assert!(!missing.exists());
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(tmp.path()).unwrap();
            conn.execute_batch(
                "CREATE TABLE depgraph_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
                 INSERT INTO depgraph_meta (key, value) VALUES ('schema_version', '99');",
            )
            .unwrap();
        }
        let err = SqliteStore::open(tmp.path()).unwrap_err();
        assert!(
            matches!(
                err,
                crate::error::DepGraphError::Store(StoreError::Migration(_))
            ),
            "got {err:?}"
        );
    }
}

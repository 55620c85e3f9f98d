/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// SQL schema for the code-object database.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS depgraph_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per extracted code object
CREATE TABLE IF NOT EXISTS code_objects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    package_name TEXT NOT NULL DEFAULT '',
    kind TEXT NOT NULL,
    overloaded INTEGER NOT NULL DEFAULT 0,
    parameters TEXT NOT NULL DEFAULT '[]',
    return_type TEXT,
    calls TEXT NOT NULL DEFAULT '[]',
    call_count INTEGER NOT NULL DEFAULT 0,
    source_text TEXT,
    literal_map TEXT,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_code_objects_package ON code_objects(package_name);
CREATE INDEX IF NOT EXISTS idx_code_objects_name ON code_objects(name);
CREATE INDEX IF NOT EXISTS idx_code_objects_kind ON code_objects(kind);
";

//! Code-object storage: the read interface the graph layers depend on, plus
//! SQLite and in-memory implementations.

pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CodeObjectStore, LoadOptions, StoreStats};

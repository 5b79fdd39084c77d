//! dbtabs Storage - durable tab records
//!
//! This crate provides:
//! - A small key/value store abstraction with in-memory and SQLite backends
//! - `TabPersistence`, which saves and loads the tab set of one
//!   (connection, database) session under a stable key
//!
//! Loading never fails from the caller's point of view: unreadable or
//! unparsable records are logged and treated as absent.

mod error;
mod kv;
mod persistence;
mod sqlite;

pub use error::{PersistenceError, StorageError, StorageResult};
pub use kv::{KeyValueStore, MemoryStore};
pub use persistence::{DEFAULT_NAMESPACE, PersistedRecord, SavedSession, TabPersistence};
pub use sqlite::SqliteStore;

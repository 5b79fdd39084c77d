//! Per-session tab records
//!
//! Each (connection, database) pair owns one record holding every open tab.
//! Writes always carry the full tab set so the last writer for a key wins
//! as a whole, never field by field.

use chrono::{DateTime, TimeZone, Utc};
use dbtabs_core::{SessionKey, TabId, TabState};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{KeyValueStore, PersistenceError};

/// Key namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "dbtabs-tabs";

/// What is stored under a session's key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub states: IndexMap<TabId, TabState>,
    /// Unix milliseconds of the write. Informational only.
    pub timestamp: i64,
    /// The session this record was written for, so saved sessions can be
    /// listed without parsing storage keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionKey>,
}

impl PersistedRecord {
    pub fn new(session: SessionKey, states: IndexMap<TabId, TabState>) -> Self {
        Self {
            states,
            timestamp: Utc::now().timestamp_millis(),
            session: Some(session),
        }
    }

    /// Tab ids in saved order
    pub fn tab_ids(&self) -> impl Iterator<Item = &TabId> {
        self.states.keys()
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

/// Lenient shape used for reading. Individual tab entries are validated one
/// by one so a single bad entry does not cost the whole record.
#[derive(Deserialize)]
struct StoredRecord {
    #[serde(default)]
    states: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    session: Option<SessionKey>,
}

/// Summary of one saved session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedSession {
    pub session: SessionKey,
    pub tab_count: usize,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Saves and loads tab records through a key/value store
pub struct TabPersistence<S> {
    store: S,
    namespace: String,
}

impl<S: KeyValueStore> TabPersistence<S> {
    pub fn new(store: S) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `<namespace>-<connection>-<database>`
    pub fn storage_key(&self, session: &SessionKey) -> String {
        format!(
            "{}-{}-{}",
            self.namespace, session.connection_id, session.database
        )
    }

    /// Write the full tab set for `session`, stamped with the current time
    pub fn save(
        &self,
        session: &SessionKey,
        states: &IndexMap<TabId, TabState>,
    ) -> Result<(), PersistenceError> {
        let key = self.storage_key(session);
        let record = PersistedRecord::new(session.clone(), states.clone());
        let json = serde_json::to_string(&record)?;
        self.store.set(&key, &json)?;
        tracing::debug!(session = %session, tabs = states.len(), "saved tab record");
        Ok(())
    }

    /// Load the record for `session`.
    ///
    /// Storage failures and corrupt data are logged and reported as no record.
    pub fn load(&self, session: &SessionKey) -> Option<PersistedRecord> {
        match self.read_record(session) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(session = %session, error = %err, "ignoring unreadable tab record");
                None
            }
        }
    }

    /// Like [`load`](Self::load) but surfaces the failure.
    ///
    /// Distinct sessions can share a storage key (`a-b`/`c` and `a`/`b-c`),
    /// so a record stamped with a different session is reported as absent.
    pub fn read_record(
        &self,
        session: &SessionKey,
    ) -> Result<Option<PersistedRecord>, PersistenceError> {
        let key = self.storage_key(session);
        let record = self.read_key(&key)?;

        match record {
            Some(PersistedRecord {
                session: Some(owner),
                ..
            }) if &owner != session => {
                tracing::warn!(
                    key,
                    session = %session,
                    owner = %owner,
                    "ignoring tab record saved for another session"
                );
                Ok(None)
            }
            record => Ok(record),
        }
    }

    fn read_key(&self, key: &str) -> Result<Option<PersistedRecord>, PersistenceError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };

        let stored: StoredRecord = serde_json::from_str(&raw).map_err(|source| {
            PersistenceError::CorruptPersistedRecord {
                key: key.to_string(),
                source,
            }
        })?;

        let mut states = IndexMap::with_capacity(stored.states.len());
        for (raw_id, value) in stored.states {
            match decode_entry(&raw_id, value) {
                Some(state) => {
                    states.insert(state.id().clone(), state);
                }
                None => {
                    tracing::warn!(key, tab_id = %raw_id, "dropping invalid saved tab");
                }
            }
        }

        Ok(Some(PersistedRecord {
            states,
            timestamp: stored.timestamp,
            session: stored.session,
        }))
    }

    /// Delete the saved record for `session`. Returns whether one existed.
    pub fn forget(&self, session: &SessionKey) -> Result<bool, PersistenceError> {
        let removed = self.store.remove(&self.storage_key(session))?;
        if removed {
            tracing::info!(session = %session, "forgot saved tabs");
        }
        Ok(removed)
    }

    /// Every saved session in this namespace, sorted by storage key.
    /// Unreadable records are skipped.
    pub fn sessions(&self) -> Result<Vec<SavedSession>, PersistenceError> {
        let prefix = format!("{}-", self.namespace);
        let mut sessions = Vec::new();

        for key in self.store.keys_with_prefix(&prefix)? {
            let record = match self.read_key(&key) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(key, error = %err, "skipping unreadable tab record");
                    continue;
                }
            };
            let Some(session) = record.session.clone() else {
                continue;
            };
            sessions.push(SavedSession {
                session,
                tab_count: record.states.len(),
                saved_at: record.saved_at(),
            });
        }

        Ok(sessions)
    }
}

fn decode_entry(raw_id: &str, value: serde_json::Value) -> Option<TabState> {
    let id = TabId::parse(raw_id).ok()?;
    let state: TabState = serde_json::from_value(value).ok()?;
    (state.id() == &id && state.is_consistent()).then_some(state)
}

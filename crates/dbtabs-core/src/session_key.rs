use serde::{Deserialize, Serialize};
use std::fmt;

/// The (connection, database) pair a tab set belongs to.
///
/// Saved tabs are partitioned by this key, so switching database shows a
/// different tab set without touching the one left behind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub connection_id: String,
    pub database: String,
}

impl SessionKey {
    pub fn new(connection_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection_id, self.database)
    }
}

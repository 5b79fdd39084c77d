//! Tab identifiers
//!
//! A `TabId` encodes which kind of tab it names. Query tabs are
//! `query-<token>`, table tabs are `table-<schema>.<table>`. Because the
//! table form is derived from its target, opening the same table twice
//! lands on the same identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Result, TabError};

pub const QUERY_TAB_PREFIX: &str = "query-";
pub const TABLE_TAB_PREFIX: &str = "table-";

/// Separator used when tab ids are joined into a location parameter.
/// No valid id may contain it.
pub const TAB_LIST_SEPARATOR: char = ',';

/// Which family a tab id belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TabKind {
    Query,
    Table,
}

impl TabKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabKind::Query => "query",
            TabKind::Table => "table",
        }
    }
}

impl fmt::Display for TabKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier of a tab within a session
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TabId(String);

impl TabId {
    /// Build a query tab id from an allocator token
    pub fn query(token: u64) -> Self {
        Self(format!("{QUERY_TAB_PREFIX}{token}"))
    }

    /// Build the deterministic id of the tab inspecting `schema.table`
    pub fn for_table(schema: &str, table: &str) -> Result<Self> {
        if schema.contains('.') {
            return Err(TabError::InvalidTabId(format!(
                "{TABLE_TAB_PREFIX}{schema}.{table}"
            )));
        }
        Self::parse(&format!("{TABLE_TAB_PREFIX}{schema}.{table}"))
    }

    /// Parse and validate a raw identifier
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || TabError::InvalidTabId(raw.to_string());

        if raw.contains(TAB_LIST_SEPARATOR) || raw.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        if let Some(token) = raw.strip_prefix(QUERY_TAB_PREFIX) {
            if token.is_empty() {
                return Err(invalid());
            }
        } else if let Some(target) = raw.strip_prefix(TABLE_TAB_PREFIX) {
            match target.split_once('.') {
                Some((schema, table)) if !schema.is_empty() && !table.is_empty() => {}
                _ => return Err(invalid()),
            }
        } else {
            return Err(invalid());
        }

        Ok(Self(raw.to_string()))
    }

    pub fn kind(&self) -> TabKind {
        if self.0.starts_with(TABLE_TAB_PREFIX) {
            TabKind::Table
        } else {
            TabKind::Query
        }
    }

    /// The `(schema, table)` pair a table tab id points at
    pub fn table_target(&self) -> Option<(&str, &str)> {
        self.0
            .strip_prefix(TABLE_TAB_PREFIX)
            .and_then(|target| target.split_once('.'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TabId {
    type Err = TabError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TabId {
    type Error = TabError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TabId> for String {
    fn from(id: TabId) -> Self {
        id.0
    }
}

impl AsRef<str> for TabId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_id_kind() {
        let id = TabId::query(42);
        assert_eq!(id.as_str(), "query-42");
        assert_eq!(id.kind(), TabKind::Query);
        assert_eq!(id.table_target(), None);
    }

    #[test]
    fn test_table_id_is_deterministic() {
        let a = TabId::for_table("public", "users").unwrap();
        let b = TabId::for_table("public", "users").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "table-public.users");
        assert_eq!(a.kind(), TabKind::Table);
        assert_eq!(a.table_target(), Some(("public", "users")));
    }

    #[test]
    fn test_table_name_may_contain_dots() {
        let id = TabId::parse("table-analytics.events.2024").unwrap();
        assert_eq!(id.table_target(), Some(("analytics", "events.2024")));
    }

    #[test]
    fn test_schema_with_dot_rejected() {
        assert!(TabId::for_table("a.b", "c").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in [
            "",
            "query-",
            "table-",
            "table-users",
            "table-.users",
            "table-public.",
            "editor-1",
            "query-1,query-2",
            "query- 1",
        ] {
            assert!(TabId::parse(raw).is_err(), "expected {raw:?} to be rejected");
        }
    }

    #[test]
    fn test_serde_validates() {
        let id: TabId = serde_json::from_str("\"query-abc\"").unwrap();
        assert_eq!(id.kind(), TabKind::Query);
        assert!(serde_json::from_str::<TabId>("\"bogus\"").is_err());
    }
}

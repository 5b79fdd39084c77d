//! Tab content
//!
//! A tab is either a free-form SQL editor or an inspector bound to one
//! table. The variant always agrees with the `TabId` prefix.

use serde::{Deserialize, Serialize};

use crate::{TabId, TabKind};

pub const DEFAULT_QUERY_LABEL: &str = "Query";

/// A SQL editor tab
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTab {
    id: TabId,
    pub label: String,
    #[serde(default)]
    pub sql: String,
    /// Content for this tab is still being fetched by its owner
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_load: bool,
}

/// A table inspector tab
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableTab {
    id: TabId,
    pub label: String,
    pub schema: String,
    pub table: String,
    /// Row filter the inspector was showing (a WHERE fragment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TabState {
    Query(QueryTab),
    Table(TableTab),
}

impl QueryTab {
    pub fn id(&self) -> &TabId {
        &self.id
    }
}

impl TableTab {
    pub fn id(&self) -> &TabId {
        &self.id
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl TabState {
    /// An empty query tab with the default label
    pub fn empty_query(id: TabId) -> Self {
        Self::Query(QueryTab {
            id,
            label: DEFAULT_QUERY_LABEL.to_string(),
            sql: String::new(),
            pending_load: false,
        })
    }

    /// A query tab pre-filled with SQL (e.g. a saved query)
    pub fn seeded_query(id: TabId, label: Option<String>, sql: String) -> Self {
        let label = label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY_LABEL.to_string());
        Self::Query(QueryTab {
            id,
            label,
            sql,
            pending_load: false,
        })
    }

    /// Reconstruct a tab from nothing but its id.
    ///
    /// Table ids carry their target, so the inspector can be rebuilt without
    /// any saved record. Query ids come back as an empty editor.
    pub fn from_id(id: TabId) -> Self {
        let target = id
            .table_target()
            .map(|(schema, table)| (schema.to_string(), table.to_string()));
        match target {
            Some((schema, table)) => {
                Self::Table(TableTab {
                    label: format!("{schema}.{table}"),
                    id,
                    schema,
                    table,
                    filter: None,
                })
            }
            None => Self::empty_query(id),
        }
    }

    pub fn id(&self) -> &TabId {
        match self {
            TabState::Query(tab) => &tab.id,
            TabState::Table(tab) => &tab.id,
        }
    }

    pub fn kind(&self) -> TabKind {
        match self {
            TabState::Query(_) => TabKind::Query,
            TabState::Table(_) => TabKind::Table,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TabState::Query(tab) => &tab.label,
            TabState::Table(tab) => &tab.label,
        }
    }

    /// Label shown when no override is set
    pub fn default_label(&self) -> String {
        match self {
            TabState::Query(_) => DEFAULT_QUERY_LABEL.to_string(),
            TabState::Table(tab) => tab.qualified_name(),
        }
    }

    pub fn as_query(&self) -> Option<&QueryTab> {
        match self {
            TabState::Query(tab) => Some(tab),
            TabState::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableTab> {
        match self {
            TabState::Table(tab) => Some(tab),
            TabState::Query(_) => None,
        }
    }

    /// Whether the variant and content agree with what the id encodes.
    ///
    /// Records read back from storage may have been edited by hand or written
    /// by an older build, so they are checked before being trusted.
    pub fn is_consistent(&self) -> bool {
        match self {
            TabState::Query(tab) => tab.id.kind() == TabKind::Query,
            TabState::Table(tab) => {
                tab.id.table_target() == Some((tab.schema.as_str(), tab.table.as_str()))
            }
        }
    }

    /// Apply a partial update, returning whether anything changed.
    ///
    /// Fields that do not exist on this variant are ignored.
    pub fn apply(&mut self, patch: &TabPatch) -> bool {
        let mut changed = false;

        if let Some(label) = &patch.label {
            let label = if label.trim().is_empty() {
                self.default_label()
            } else {
                label.clone()
            };
            let current = match self {
                TabState::Query(tab) => &mut tab.label,
                TabState::Table(tab) => &mut tab.label,
            };
            if *current != label {
                *current = label;
                changed = true;
            }
        }

        match self {
            TabState::Query(tab) => {
                if let Some(sql) = &patch.sql {
                    if tab.sql != *sql {
                        tab.sql = sql.clone();
                        changed = true;
                    }
                    if tab.pending_load {
                        tab.pending_load = false;
                        changed = true;
                    }
                }
                if let Some(pending) = patch.pending_load {
                    if tab.pending_load != pending {
                        tab.pending_load = pending;
                        changed = true;
                    }
                }
            }
            TabState::Table(tab) => {
                if let Some(filter) = &patch.filter {
                    let filter = filter.clone().filter(|f| !f.trim().is_empty());
                    if tab.filter != filter {
                        tab.filter = filter;
                        changed = true;
                    }
                }
            }
        }

        changed
    }
}

/// Partial update for a tab. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabPatch {
    /// New label; an empty label restores the default
    pub label: Option<String>,
    /// New editor text (query tabs). Clears `pending_load`.
    pub sql: Option<String>,
    pub pending_load: Option<bool>,
    /// New row filter (table tabs); `Some(None)` clears it
    pub filter: Option<Option<String>>,
}

impl TabPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn sql(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            ..Default::default()
        }
    }

    pub fn pending_load(pending: bool) -> Self {
        Self {
            pending_load: Some(pending),
            ..Default::default()
        }
    }

    pub fn filter(filter: Option<String>) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }
}

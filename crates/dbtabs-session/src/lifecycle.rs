//! Tab lifecycle commands
//!
//! Commands are what the UI asks for. Each one ends in a location change (or
//! nothing), and the location change is what reshapes the tab bar.
//!
//! The close planners here are pure: they take the current view and return
//! the view that should be navigated to, or `None` when no tab would be left
//! and a fresh query tab has to take its place.

use dbtabs_core::TabId;

use crate::UrlView;

/// SQL and label a new query tab starts with
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySeed {
    pub label: Option<String>,
    pub sql: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabCommand {
    /// Append a query tab and select it
    OpenQuery { seed: Option<QuerySeed> },
    /// Select the tab for `schema.table`, appending it if it is not open
    OpenTable { schema: String, table: String },
    Close { index: usize },
    /// Close every tab except the one at `index`
    CloseOthers { index: usize },
    /// Close every tab after `index`
    CloseToRight { index: usize },
    CloseAll,
    Switch { index: usize },
    Rename { id: TabId, label: String },
    UpdateSql { id: TabId, sql: String },
    SetPendingLoad { id: TabId, pending: bool },
    UpdateFilter { id: TabId, filter: Option<String> },
}

/// View after closing the tab at `index`.
///
/// Closing the selected tab selects its left neighbour. Closing a tab left of
/// the selection shifts the index so the same tab stays selected. An index
/// past the end leaves the view unchanged.
pub fn close_tab(view: &UrlView, index: usize) -> Option<UrlView> {
    if index >= view.len() {
        return Some(view.clone());
    }
    if view.len() == 1 {
        return None;
    }

    let active = view.active_index();
    let next_active = if index == active {
        index.saturating_sub(1)
    } else if index < active {
        active - 1
    } else {
        active
    };

    let mut ids = view.tab_ids().to_vec();
    ids.remove(index);
    Some(UrlView::new(ids, next_active))
}

/// View keeping only the tab at `index`, selected
pub fn close_others(view: &UrlView, index: usize) -> Option<UrlView> {
    let id = view.tab_ids().get(index)?.clone();
    Some(UrlView::new(vec![id], 0))
}

/// View keeping tabs up to and including `index`.
///
/// The selection is kept when it survives, otherwise the tab at `index`
/// becomes selected.
pub fn close_to_right(view: &UrlView, index: usize) -> Option<UrlView> {
    if index >= view.len() {
        return None;
    }
    let ids = view.tab_ids()[..=index].to_vec();
    let active = view.active_index().min(index);
    Some(UrlView::new(ids, active))
}

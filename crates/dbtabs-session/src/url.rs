//! Location projection of the tab bar
//!
//! The navigable location carries two parameters: `tabs`, the ordered,
//! comma-joined tab ids, and `active`, the index of the selected tab. The
//! location is the only thing that decides tab order and selection; the
//! reconciler asks for a new location instead of changing either directly.

use dbtabs_core::{TAB_LIST_SEPARATOR, TabId};
use url::form_urlencoded;

use crate::TabIdAllocator;

pub const TABS_PARAM: &str = "tabs";
pub const ACTIVE_PARAM: &str = "active";

/// Ordered tab ids plus the selected index.
///
/// The index is always within bounds when the list is non-empty, and `0`
/// otherwise.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlView {
    tab_ids: Vec<TabId>,
    active_index: usize,
}

impl UrlView {
    /// Build a view, dropping duplicate ids and clamping the index
    pub fn new(tab_ids: Vec<TabId>, active_index: usize) -> Self {
        let mut unique: Vec<TabId> = Vec::with_capacity(tab_ids.len());
        for id in tab_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        let active_index = clamp_index(active_index, unique.len());
        Self {
            tab_ids: unique,
            active_index,
        }
    }

    /// Read a location query string (with or without a leading `?`).
    ///
    /// Malformed ids are skipped and an unparsable `active` falls back to 0.
    /// The result may be empty; see [`decode`] for the variant that always
    /// yields at least one tab.
    pub fn parse(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        let mut tabs_param = None;
        let mut active_param = None;

        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*name {
                TABS_PARAM if tabs_param.is_none() => tabs_param = Some(value.into_owned()),
                ACTIVE_PARAM if active_param.is_none() => active_param = Some(value.into_owned()),
                _ => {}
            }
        }

        let tab_ids = tabs_param
            .as_deref()
            .unwrap_or_default()
            .split(TAB_LIST_SEPARATOR)
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .filter_map(|raw| match TabId::parse(raw) {
                Ok(id) => Some(id),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping malformed tab id in location");
                    None
                }
            })
            .collect();

        let active_index = active_param
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(0);

        Self::new(tab_ids, active_index)
    }

    /// Serialize as `tabs=<id>,<id>&active=<n>`
    pub fn to_query_string(&self) -> String {
        encode(&self.tab_ids, self.active_index)
    }

    pub fn tab_ids(&self) -> &[TabId] {
        &self.tab_ids
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_tab(&self) -> Option<&TabId> {
        self.tab_ids.get(self.active_index)
    }

    pub fn len(&self) -> usize {
        self.tab_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab_ids.is_empty()
    }

    pub fn contains(&self, id: &TabId) -> bool {
        self.tab_ids.contains(id)
    }

    pub fn position(&self, id: &TabId) -> Option<usize> {
        self.tab_ids.iter().position(|candidate| candidate == id)
    }

    /// Same tabs, different selection
    pub fn with_active(&self, active_index: usize) -> Self {
        Self::new(self.tab_ids.clone(), active_index)
    }

    /// Whether both views show the same set of tabs, ignoring order
    pub fn same_tabs<'a>(&self, other: impl IntoIterator<Item = &'a TabId>) -> bool {
        let mut count = 0;
        for id in other {
            if !self.contains(id) {
                return false;
            }
            count += 1;
        }
        count == self.tab_ids.len()
    }
}

/// Location query string for an ordered tab list and selection.
///
/// The index is written as given; [`decode`] clamps it.
pub fn encode(ordered_ids: &[TabId], active_index: usize) -> String {
    let tabs = ordered_ids
        .iter()
        .map(|id| form_urlencoded::byte_serialize(id.as_str().as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join(",");
    format!("{TABS_PARAM}={tabs}&{ACTIVE_PARAM}={active_index}")
}

/// Read a location, substituting a single fresh query tab when it names no
/// valid tab.
pub fn decode(query: &str, ids: &mut TabIdAllocator) -> UrlView {
    let view = UrlView::parse(query);
    if view.is_empty() {
        return UrlView::new(vec![ids.next_query_id()], 0);
    }
    view
}

fn clamp_index(index: usize, len: usize) -> usize {
    if index < len { index } else { 0 }
}

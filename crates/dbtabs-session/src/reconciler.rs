//! Tab session reconciler
//!
//! Keeps three views of the open tabs in agreement:
//!
//! ```text
//!   location (UrlView)          tab order + selection, the only thing the UI renders from
//!   memory   (TabStateStore)    content of every tab the location names
//!   durable  (PersistedRecord)  last record saved for the current session key
//! ```
//!
//! The reconciler is a plain state machine. [`Reconciler::apply`] takes an
//! event, updates state, and returns the side effects to perform: loading a
//! record, navigating to a new location, or saving the tab set. It never
//! touches storage or the router itself, so the driver decides how (and how
//! asynchronously) effects run.
//!
//! Rules, in short:
//!
//! - On a session key change the store is cleared and the key's record is
//!   requested. Until it arrives, locations are remembered but not synced.
//! - A loaded record whose tab set differs from the location wins, because the
//!   location still shows the previous key's tabs.
//! - With no record and no tabs in the location, one fresh query tab is opened.
//!   The same happens when the location was last synced for another key, so
//!   one database's tabs never show up under another.
//! - Every location change drops tabs that left the location and
//!   materializes tabs that entered it, from the record if it has them,
//!   otherwise from the id alone.
//! - There is always at least one tab once a session is ready.

use dbtabs_core::{SessionKey, TabError, TabId, TabPatch, TabState, TabStateStore};
use dbtabs_storage::PersistedRecord;
use indexmap::IndexMap;

use crate::lifecycle::{self, QuerySeed, TabCommand};
use crate::{TabIdAllocator, UrlView};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No session key
    Detached,
    /// Waiting for the record of the current key
    Loading { generation: u64 },
    Ready,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A connection or database was selected
    SessionChanged(SessionKey),
    /// The active connection went away
    Disconnected,
    /// Result of an [`Effect::LoadRecord`]
    RecordLoaded {
        generation: u64,
        record: Option<PersistedRecord>,
    },
    /// The location changed, by our request or the user's
    Navigated(UrlView),
    Command(TabCommand),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Load the record for `session` and answer with
    /// [`SessionEvent::RecordLoaded`] carrying the same generation
    LoadRecord { session: SessionKey, generation: u64 },
    /// Save the full tab set for `session`
    Persist {
        session: SessionKey,
        states: IndexMap<TabId, TabState>,
    },
    /// Move the location to this view and answer with
    /// [`SessionEvent::Navigated`]
    Navigate(UrlView),
}

#[derive(Debug)]
pub struct Reconciler {
    session: Option<SessionKey>,
    phase: Phase,
    generation: u64,
    tabs: TabStateStore,
    durable: IndexMap<TabId, TabState>,
    view: UrlView,
    /// Session the location was last synced for; `None` when it came from
    /// outside (mount, typed address)
    view_session: Option<SessionKey>,
    ids: TabIdAllocator,
}

impl Reconciler {
    pub fn new(ids: TabIdAllocator) -> Self {
        Self {
            session: None,
            phase: Phase::Detached,
            generation: 0,
            tabs: TabStateStore::new(),
            durable: IndexMap::new(),
            view: UrlView::default(),
            view_session: None,
            ids,
        }
    }

    pub fn session(&self) -> Option<&SessionKey> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn tabs(&self) -> &TabStateStore {
        &self.tabs
    }

    /// The location as last seen
    pub fn view(&self) -> &UrlView {
        &self.view
    }

    /// Tabs in tab bar order
    pub fn ordered_tabs(&self) -> Vec<&TabState> {
        self.view
            .tab_ids()
            .iter()
            .filter_map(|id| self.tabs.get(id))
            .collect()
    }

    pub fn active_tab(&self) -> Option<&TabState> {
        self.view.active_tab().and_then(|id| self.tabs.get(id))
    }

    pub fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            SessionEvent::SessionChanged(session) => self.change_session(session, &mut effects),
            SessionEvent::Disconnected => self.disconnect(),
            SessionEvent::RecordLoaded { generation, record } => {
                self.record_loaded(generation, record, &mut effects)
            }
            SessionEvent::Navigated(view) => self.navigated(view, &mut effects),
            SessionEvent::Command(command) => self.command(command, &mut effects),
        }

        // Writes go first so a save triggered by this event always lands
        // before anything the resulting navigation saves.
        if let Some(persist) = self.pending_write() {
            effects.insert(0, persist);
        }

        effects
    }

    fn change_session(&mut self, session: SessionKey, effects: &mut Vec<Effect>) {
        if self.session.as_ref() == Some(&session) && self.phase != Phase::Detached {
            tracing::debug!(session = %session, "session unchanged");
            return;
        }

        self.generation += 1;
        self.tabs.reset();
        self.durable.clear();
        self.phase = Phase::Loading {
            generation: self.generation,
        };
        self.session = Some(session.clone());

        tracing::info!(session = %session, generation = self.generation, "loading saved tabs");
        effects.push(Effect::LoadRecord {
            session,
            generation: self.generation,
        });
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(session = %session, "session detached");
        }
        self.generation += 1;
        self.phase = Phase::Detached;
        self.tabs.reset();
        self.durable.clear();
    }

    fn record_loaded(
        &mut self,
        generation: u64,
        record: Option<PersistedRecord>,
        effects: &mut Vec<Effect>,
    ) {
        if self.phase != (Phase::Loading { generation }) {
            tracing::debug!(generation, current = self.generation, "discarding stale tab record");
            return;
        }
        self.phase = Phase::Ready;

        let record = record.filter(|record| !record.states.is_empty());
        match record {
            Some(record) => {
                for id in record.tab_ids() {
                    self.ids.observe(id);
                }
                self.durable = record.states;

                if self.view.same_tabs(self.durable.keys()) {
                    self.sync(effects);
                } else {
                    let saved: Vec<TabId> = self.durable.keys().cloned().collect();
                    tracing::debug!(tabs = saved.len(), "restoring saved tabs over location");
                    effects.push(Effect::Navigate(UrlView::new(saved, 0)));
                }
            }
            None if self.view.is_empty() || self.view_is_foreign() => {
                tracing::debug!("no saved tabs, opening a fresh query tab");
                self.replace_with_fresh_query(effects);
            }
            None => self.sync(effects),
        }
    }

    fn navigated(&mut self, view: UrlView, effects: &mut Vec<Effect>) {
        for id in view.tab_ids() {
            self.ids.observe(id);
        }
        self.view = view;
        self.view_session = None;

        match self.phase {
            Phase::Ready => self.sync(effects),
            Phase::Loading { generation } => {
                tracing::debug!(generation, "location changed while loading, sync deferred");
            }
            Phase::Detached => {}
        }
    }

    /// Whether the location still shows tabs synced for a different key
    fn view_is_foreign(&self) -> bool {
        self.view_session.is_some() && self.view_session != self.session
    }

    /// Make the store hold exactly the tabs the location names
    fn sync(&mut self, effects: &mut Vec<Effect>) {
        if self.view.is_empty() {
            self.replace_with_fresh_query(effects);
            return;
        }
        self.view_session.clone_from(&self.session);

        let departed: Vec<TabId> = self
            .tabs
            .ids()
            .filter(|id| !self.view.contains(id))
            .cloned()
            .collect();
        for id in departed {
            if let Err(err) = self.tabs.remove(&id) {
                tracing::warn!(error = %err, "failed to drop departed tab");
            }
        }

        for id in self.view.tab_ids() {
            if self.tabs.contains(id) {
                continue;
            }
            let result = match self.durable.get(id) {
                Some(saved) => self.tabs.import(saved.clone()),
                None => self.tabs.create(TabState::from_id(id.clone())),
            };
            if let Err(err) = result {
                tracing::warn!(error = %err, "failed to materialize tab");
            }
        }
    }

    fn command(&mut self, command: TabCommand, effects: &mut Vec<Effect>) {
        if !self.is_ready() {
            tracing::warn!(?command, phase = ?self.phase, "ignoring tab command, session not ready");
            return;
        }

        match command {
            TabCommand::OpenQuery { seed } => self.open_query(seed, effects),
            TabCommand::OpenTable { schema, table } => self.open_table(&schema, &table, effects),
            TabCommand::Close { index } => {
                if index >= self.view.len() {
                    tracing::warn!(index, tabs = self.view.len(), "close index out of range");
                    return;
                }
                let next = lifecycle::close_tab(&self.view, index);
                self.navigate_or_replace(next, effects);
            }
            TabCommand::CloseOthers { index } => {
                let Some(next) = lifecycle::close_others(&self.view, index) else {
                    tracing::warn!(index, tabs = self.view.len(), "close-others index out of range");
                    return;
                };
                self.navigate_if_changed(next, effects);
            }
            TabCommand::CloseToRight { index } => {
                let Some(next) = lifecycle::close_to_right(&self.view, index) else {
                    tracing::warn!(index, tabs = self.view.len(), "close-to-right index out of range");
                    return;
                };
                self.navigate_if_changed(next, effects);
            }
            TabCommand::CloseAll => self.replace_with_fresh_query(effects),
            TabCommand::Switch { index } => {
                if index >= self.view.len() {
                    tracing::warn!(index, tabs = self.view.len(), "switch index out of range");
                    return;
                }
                let next = self.view.with_active(index);
                self.navigate_if_changed(next, effects);
            }
            TabCommand::Rename { id, label } => self.update(&id, TabPatch::label(label)),
            TabCommand::UpdateSql { id, sql } => self.update(&id, TabPatch::sql(sql)),
            TabCommand::SetPendingLoad { id, pending } => {
                self.update(&id, TabPatch::pending_load(pending))
            }
            TabCommand::UpdateFilter { id, filter } => self.update(&id, TabPatch::filter(filter)),
        }
    }

    fn open_query(&mut self, seed: Option<QuerySeed>, effects: &mut Vec<Effect>) {
        let Some(id) = self.fresh_query_id() else {
            return;
        };
        let state = match seed {
            Some(seed) => TabState::seeded_query(id.clone(), seed.label, seed.sql),
            None => TabState::empty_query(id.clone()),
        };
        if let Err(err) = self.tabs.create(state) {
            tracing::error!(error = %err, "failed to open query tab");
            return;
        }
        tracing::debug!(tab_id = %id, "opened query tab");
        self.append_and_select(id, effects);
    }

    fn open_table(&mut self, schema: &str, table: &str, effects: &mut Vec<Effect>) {
        let id = match TabId::for_table(schema, table) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, "cannot open table tab");
                return;
            }
        };

        if let Some(position) = self.view.position(&id) {
            let next = self.view.with_active(position);
            self.navigate_if_changed(next, effects);
            return;
        }

        if !self.tabs.contains(&id) {
            if let Err(err) = self.tabs.create(TabState::from_id(id.clone())) {
                tracing::error!(error = %err, "failed to open table tab");
                return;
            }
        }
        tracing::debug!(tab_id = %id, "opened table tab");
        self.append_and_select(id, effects);
    }

    fn update(&mut self, id: &TabId, patch: TabPatch) {
        match self.tabs.update(id, &patch) {
            Ok(_) => {}
            Err(TabError::NotFound(id)) => {
                tracing::warn!(tab_id = %id, "update for a tab that is not open");
            }
            Err(err) => tracing::warn!(error = %err, "tab update failed"),
        }
    }

    fn append_and_select(&mut self, id: TabId, effects: &mut Vec<Effect>) {
        let mut ids = self.view.tab_ids().to_vec();
        ids.push(id);
        let last = ids.len() - 1;
        effects.push(Effect::Navigate(UrlView::new(ids, last)));
    }

    fn navigate_or_replace(&mut self, next: Option<UrlView>, effects: &mut Vec<Effect>) {
        match next {
            Some(view) => self.navigate_if_changed(view, effects),
            None => self.replace_with_fresh_query(effects),
        }
    }

    fn navigate_if_changed(&mut self, next: UrlView, effects: &mut Vec<Effect>) {
        if next != self.view {
            effects.push(Effect::Navigate(next));
        }
    }

    /// Open one empty query tab and navigate to it alone
    fn replace_with_fresh_query(&mut self, effects: &mut Vec<Effect>) {
        let Some(id) = self.fresh_query_id() else {
            return;
        };
        if let Err(err) = self.tabs.create(TabState::empty_query(id.clone())) {
            tracing::error!(error = %err, "failed to open replacement query tab");
            return;
        }
        effects.push(Effect::Navigate(UrlView::new(vec![id], 0)));
    }

    /// A query id no open, shown or saved tab uses
    fn fresh_query_id(&mut self) -> Option<TabId> {
        // The counter yields distinct ids, so one more try than there are
        // taken ids always lands on a free one.
        let attempts = self.tabs.len() + self.view.len() + self.durable.len() + 1;
        let ids = &mut self.ids;
        let found = (0..attempts).map(|_| ids.next_query_id()).find(|id| {
            !self.tabs.contains(id) && !self.view.contains(id) && !self.durable.contains_key(id)
        });
        if found.is_none() {
            tracing::error!(attempts, "no free query tab id");
        }
        found
    }

    /// Whether the location shows the saved tabs in a different order
    fn is_reordered(&self) -> bool {
        self.view.same_tabs(self.durable.keys())
            && !self.durable.keys().eq(self.view.tab_ids().iter())
    }

    fn pending_write(&mut self) -> Option<Effect> {
        let dirty = self.tabs.take_pending_write();
        let session = match (&self.session, self.phase) {
            (Some(session), Phase::Ready) => session.clone(),
            _ => return None,
        };
        if !dirty && !self.is_reordered() {
            return None;
        }

        // Saved in tab bar order; tabs not in the location yet go last
        let mut states = self.tabs.snapshot();
        let rank = |id: &TabId| self.view.position(id).unwrap_or(usize::MAX);
        states.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
        self.durable = states.clone();
        Some(Effect::Persist { session, states })
    }
}

//! Tab session driver
//!
//! Wires the reconciler to its two ports: persistence and navigation.
//! Effects run in the order they were produced; navigations re-enter the
//! reconciler as location changes, loads re-enter as loaded records.

use std::collections::VecDeque;

use dbtabs_core::{SessionKey, TabId, TabState, TabStateStore};
use dbtabs_storage::{KeyValueStore, TabPersistence};

use crate::lifecycle::{QuerySeed, TabCommand};
use crate::reconciler::{Effect, Phase, Reconciler, SessionEvent};
use crate::{Navigator, TabIdAllocator, UrlView};

pub struct TabSession<S, N> {
    reconciler: Reconciler,
    persistence: TabPersistence<S>,
    navigator: N,
}

impl<S: KeyValueStore, N: Navigator> TabSession<S, N> {
    pub fn new(persistence: TabPersistence<S>, navigator: N) -> Self {
        Self::with_allocator(persistence, navigator, TabIdAllocator::new())
    }

    pub fn with_allocator(
        persistence: TabPersistence<S>,
        navigator: N,
        ids: TabIdAllocator,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(ids),
            persistence,
            navigator,
        }
    }

    /// Attach to `session` with the location the window opened on
    pub fn mount(&mut self, session: SessionKey, location: &str) {
        self.location_changed(location);
        self.set_session(session);
    }

    pub fn set_session(&mut self, session: SessionKey) {
        self.dispatch(SessionEvent::SessionChanged(session));
    }

    pub fn disconnect(&mut self) {
        self.dispatch(SessionEvent::Disconnected);
    }

    /// The location changed outside our control (history, typed address)
    pub fn location_changed(&mut self, location: &str) {
        self.dispatch(SessionEvent::Navigated(UrlView::parse(location)));
    }

    pub fn open_query_tab(&mut self) {
        self.command(TabCommand::OpenQuery { seed: None });
    }

    /// Open a query tab pre-filled with `sql`
    pub fn open_saved_query(&mut self, label: Option<String>, sql: impl Into<String>) {
        self.command(TabCommand::OpenQuery {
            seed: Some(QuerySeed {
                label,
                sql: sql.into(),
            }),
        });
    }

    pub fn open_table_tab(&mut self, schema: impl Into<String>, table: impl Into<String>) {
        self.command(TabCommand::OpenTable {
            schema: schema.into(),
            table: table.into(),
        });
    }

    pub fn close_tab(&mut self, index: usize) {
        self.command(TabCommand::Close { index });
    }

    pub fn close_others(&mut self, index: usize) {
        self.command(TabCommand::CloseOthers { index });
    }

    pub fn close_to_right(&mut self, index: usize) {
        self.command(TabCommand::CloseToRight { index });
    }

    pub fn close_all(&mut self) {
        self.command(TabCommand::CloseAll);
    }

    pub fn switch_tab(&mut self, index: usize) {
        self.command(TabCommand::Switch { index });
    }

    /// Override a tab's label; an empty label restores the default
    pub fn rename_tab(&mut self, id: &TabId, label: impl Into<String>) {
        self.command(TabCommand::Rename {
            id: id.clone(),
            label: label.into(),
        });
    }

    pub fn update_sql(&mut self, id: &TabId, sql: impl Into<String>) {
        self.command(TabCommand::UpdateSql {
            id: id.clone(),
            sql: sql.into(),
        });
    }

    pub fn set_pending_load(&mut self, id: &TabId, pending: bool) {
        self.command(TabCommand::SetPendingLoad {
            id: id.clone(),
            pending,
        });
    }

    pub fn update_filter(&mut self, id: &TabId, filter: Option<String>) {
        self.command(TabCommand::UpdateFilter {
            id: id.clone(),
            filter,
        });
    }

    pub fn command(&mut self, command: TabCommand) {
        self.dispatch(SessionEvent::Command(command));
    }

    pub fn session(&self) -> Option<&SessionKey> {
        self.reconciler.session()
    }

    pub fn phase(&self) -> Phase {
        self.reconciler.phase()
    }

    pub fn tabs(&self) -> &TabStateStore {
        self.reconciler.tabs()
    }

    /// Tabs in tab bar order
    pub fn ordered_tabs(&self) -> Vec<&TabState> {
        self.reconciler.ordered_tabs()
    }

    pub fn active_tab(&self) -> Option<&TabState> {
        self.reconciler.active_tab()
    }

    pub fn view(&self) -> &UrlView {
        self.reconciler.view()
    }

    /// Id of the tab at `index` in tab bar order
    pub fn tab_id_at(&self, index: usize) -> Option<&TabId> {
        self.reconciler.view().tab_ids().get(index)
    }

    pub fn location(&self) -> String {
        self.reconciler.view().to_query_string()
    }

    pub fn persistence(&self) -> &TabPersistence<S> {
        &self.persistence
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            for effect in self.reconciler.apply(event) {
                match effect {
                    Effect::LoadRecord {
                        session,
                        generation,
                    } => {
                        let record = self.persistence.load(&session);
                        queue.push_back(SessionEvent::RecordLoaded { generation, record });
                    }
                    Effect::Persist { session, states } => {
                        if let Err(err) = self.persistence.save(&session, &states) {
                            tracing::error!(session = %session, error = %err, "failed to save tabs");
                        }
                    }
                    Effect::Navigate(view) => {
                        let location = view.to_query_string();
                        tracing::trace!(location, "navigating");
                        self.navigator.navigate(&location);
                        queue.push_back(SessionEvent::Navigated(UrlView::parse(&location)));
                    }
                }
            }
        }
    }
}

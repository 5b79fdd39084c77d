//! Line-oriented shell over one tab session
//!
//! Every tab operation the UI layer would trigger is reachable as a command,
//! and every navigation lands in an in-process history, so `back` and
//! `forward` behave like the window's history buttons.

use anyhow::{Context, Result, anyhow, bail};
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use dbtabs_core::{QueryExecutor, QueryOutcome, SessionKey, TabId, TabState};
use dbtabs_session::{HistoryNavigator, Navigator, TabSession};
use dbtabs_storage::KeyValueStore;
use std::io::Write;

/// Row limit for `run` on a table tab
const TABLE_PREVIEW_LIMIT: usize = 100;

pub const HELP: &str = "\
connect <conn> <db>     switch to a connection and database
new [label]             open a query tab
table <schema> <table>  open (or select) a table tab
close <i>               close the tab at position i
close-others <i>        close every tab except i
close-right <i>         close every tab after i
close-all               close everything (one fresh tab remains)
switch <i>              select the tab at position i
rename <i> <label>      relabel a tab (empty label restores the default)
sql <text>              replace the active query tab's SQL
filter <text|->         set or clear the active table tab's filter
go <location>           navigate to a location, e.g. tabs=query-1&active=0
back / forward          move through navigation history
run                     execute the active tab
show                    list tabs
sessions                list saved sessions
forget <conn> <db>      delete a saved session
help                    this text
quit                    leave";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Connect { connection: String, database: String },
    New { label: Option<String> },
    Table { schema: String, table: String },
    Close(usize),
    CloseOthers(usize),
    CloseRight(usize),
    CloseAll,
    Switch(usize),
    Rename { index: usize, label: String },
    Sql(String),
    Filter(Option<String>),
    Go(String),
    Back,
    Forward,
    Run,
    Show,
    Sessions,
    Forget { connection: String, database: String },
    Help,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name {
            "connect" => {
                let (connection, database) = two_args(rest, "connect <conn> <db>")?;
                Self::Connect {
                    connection,
                    database,
                }
            }
            "new" => Self::New {
                label: (!rest.is_empty()).then(|| rest.to_string()),
            },
            "table" => {
                let (schema, table) = two_args(rest, "table <schema> <table>")?;
                Self::Table { schema, table }
            }
            "close" => Self::Close(index_arg(rest)?),
            "close-others" => Self::CloseOthers(index_arg(rest)?),
            "close-right" => Self::CloseRight(index_arg(rest)?),
            "close-all" => Self::CloseAll,
            "switch" => Self::Switch(index_arg(rest)?),
            "rename" => {
                let (index, label) = match rest.split_once(char::is_whitespace) {
                    Some((index, label)) => (index, label.trim()),
                    None => (rest, ""),
                };
                Self::Rename {
                    index: index_arg(index)?,
                    label: label.to_string(),
                }
            }
            "sql" => Self::Sql(rest.to_string()),
            "filter" => Self::Filter(match rest {
                "" | "-" => None,
                text => Some(text.to_string()),
            }),
            "go" => Self::Go(rest.to_string()),
            "back" => Self::Back,
            "forward" => Self::Forward,
            "run" => Self::Run,
            "show" => Self::Show,
            "sessions" => Self::Sessions,
            "forget" => {
                let (connection, database) = two_args(rest, "forget <conn> <db>")?;
                Self::Forget {
                    connection,
                    database,
                }
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("Unknown command '{other}' (try 'help')"),
        };
        Ok(Some(command))
    }
}

fn two_args(rest: &str, usage: &str) -> Result<(String, String)> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => Ok((first.to_string(), second.to_string())),
        _ => bail!("Usage: {usage}"),
    }
}

fn index_arg(raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .with_context(|| format!("Expected a tab position, got '{raw}'"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell<S, E> {
    session: TabSession<S, HistoryNavigator>,
    executor: E,
    start_location: String,
}

impl<S: KeyValueStore, E: QueryExecutor> Shell<S, E> {
    pub fn new(
        session: TabSession<S, HistoryNavigator>,
        executor: E,
        start_location: impl Into<String>,
    ) -> Self {
        Self {
            session,
            executor,
            start_location: start_location.into(),
        }
    }

    pub fn session(&self) -> &TabSession<S, HistoryNavigator> {
        &self.session
    }

    /// Parse and run one input line. Command errors are written to `out`
    /// rather than returned; only output failures are errors.
    pub async fn handle_line(&mut self, line: &str, out: &mut impl Write) -> Result<Flow> {
        let command = match ShellCommand::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(err) => {
                writeln!(out, "error: {err:#}")?;
                return Ok(Flow::Continue);
            }
        };

        match self.execute(command, out).await {
            Ok(flow) => Ok(flow),
            Err(err) => {
                writeln!(out, "error: {err:#}")?;
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn execute(&mut self, command: ShellCommand, out: &mut impl Write) -> Result<Flow> {
        tracing::debug!(?command, "shell command");

        if self.session.session().is_none() && needs_session(&command) {
            bail!("Not connected (use 'connect <conn> <db>')");
        }

        match command {
            ShellCommand::Connect {
                connection,
                database,
            } => {
                let key = SessionKey::new(connection, database);
                if self.session.session().is_none() {
                    let location = self.current_location();
                    self.session.mount(key, &location);
                } else {
                    self.session.set_session(key);
                }
                self.render_tabs(out)?;
            }
            ShellCommand::New { label } => {
                match label {
                    Some(label) => self.session.open_saved_query(Some(label), ""),
                    None => self.session.open_query_tab(),
                }
                self.render_tabs(out)?;
            }
            ShellCommand::Table { schema, table } => {
                TabId::for_table(&schema, &table)?;
                self.session.open_table_tab(schema, table);
                self.render_tabs(out)?;
            }
            ShellCommand::Close(index) => {
                self.check_index(index)?;
                self.session.close_tab(index);
                self.render_tabs(out)?;
            }
            ShellCommand::CloseOthers(index) => {
                self.check_index(index)?;
                self.session.close_others(index);
                self.render_tabs(out)?;
            }
            ShellCommand::CloseRight(index) => {
                self.check_index(index)?;
                self.session.close_to_right(index);
                self.render_tabs(out)?;
            }
            ShellCommand::CloseAll => {
                self.session.close_all();
                self.render_tabs(out)?;
            }
            ShellCommand::Switch(index) => {
                self.check_index(index)?;
                self.session.switch_tab(index);
                self.render_tabs(out)?;
            }
            ShellCommand::Rename { index, label } => {
                let id = self.check_index(index)?;
                self.session.rename_tab(&id, label);
                self.render_tabs(out)?;
            }
            ShellCommand::Sql(sql) => {
                let id = self.active_query_id()?;
                self.session.update_sql(&id, sql);
            }
            ShellCommand::Filter(filter) => {
                let id = self.active_table_id()?;
                self.session.update_filter(&id, filter);
            }
            ShellCommand::Go(location) => {
                self.session.navigator_mut().navigate(&location);
                self.session.location_changed(&location);
                self.render_tabs(out)?;
            }
            ShellCommand::Back => {
                let location = self
                    .session
                    .navigator_mut()
                    .back()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("No earlier location"))?;
                self.session.location_changed(&location);
                self.render_tabs(out)?;
            }
            ShellCommand::Forward => {
                let location = self
                    .session
                    .navigator_mut()
                    .forward()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("No later location"))?;
                self.session.location_changed(&location);
                self.render_tabs(out)?;
            }
            ShellCommand::Run => self.run_active(out).await?,
            ShellCommand::Show => self.render_tabs(out)?,
            ShellCommand::Sessions => self.render_sessions(out)?,
            ShellCommand::Forget {
                connection,
                database,
            } => {
                let key = SessionKey::new(connection, database);
                if self.session.persistence().forget(&key)? {
                    writeln!(out, "Forgot saved tabs for {key}")?;
                } else {
                    writeln!(out, "No saved tabs for {key}")?;
                }
            }
            ShellCommand::Help => writeln!(out, "{HELP}")?,
            ShellCommand::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn current_location(&self) -> String {
        self.session
            .navigator()
            .current()
            .map(str::to_string)
            .unwrap_or_else(|| self.start_location.clone())
    }

    fn check_index(&self, index: usize) -> Result<TabId> {
        self.session
            .tab_id_at(index)
            .cloned()
            .ok_or_else(|| anyhow!("No tab at position {index}"))
    }

    fn active_query_id(&self) -> Result<TabId> {
        match self.session.active_tab() {
            Some(TabState::Query(tab)) => Ok(tab.id().clone()),
            Some(TabState::Table(_)) => bail!("The active tab is a table tab"),
            None => bail!("No active tab"),
        }
    }

    fn active_table_id(&self) -> Result<TabId> {
        match self.session.active_tab() {
            Some(TabState::Table(tab)) => Ok(tab.id().clone()),
            Some(TabState::Query(_)) => bail!("The active tab is a query tab"),
            None => bail!("No active tab"),
        }
    }

    async fn run_active(&mut self, out: &mut impl Write) -> Result<()> {
        let connection_id = self
            .session
            .session()
            .map(|key| key.connection_id.clone())
            .context("Not connected")?;
        let sql = match self.session.active_tab() {
            Some(TabState::Query(tab)) if tab.sql.trim().is_empty() => {
                bail!("The active query tab has no SQL")
            }
            Some(TabState::Query(tab)) => tab.sql.clone(),
            Some(TabState::Table(tab)) => {
                let mut sql = format!(
                    "SELECT * FROM {}.{}",
                    quote_ident(&tab.schema),
                    quote_ident(&tab.table)
                );
                if let Some(filter) = &tab.filter {
                    sql.push_str(" WHERE ");
                    sql.push_str(filter);
                }
                sql.push_str(&format!(" LIMIT {TABLE_PREVIEW_LIMIT}"));
                sql
            }
            None => bail!("No active tab"),
        };

        match self.executor.execute(&connection_id, &sql).await {
            Ok(outcome) => render_outcome(&outcome, out)?,
            // Execution failures are reported, the tab stays as it was
            Err(err) => writeln!(out, "query failed: {err}")?,
        }
        Ok(())
    }

    fn render_tabs(&self, out: &mut impl Write) -> Result<()> {
        let Some(key) = self.session.session() else {
            writeln!(out, "(not connected)")?;
            return Ok(());
        };

        let active = self.session.view().active_index();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["#", "", "Id", "Label", "Content"]);
        for (index, tab) in self.session.ordered_tabs().into_iter().enumerate() {
            table.add_row(vec![
                index.to_string(),
                (if index == active { "*" } else { "" }).to_string(),
                tab.id().to_string(),
                tab.label().to_string(),
                describe(tab),
            ]);
        }

        writeln!(out, "{key}  {}", self.session.location())?;
        writeln!(out, "{table}")?;
        Ok(())
    }

    fn render_sessions(&self, out: &mut impl Write) -> Result<()> {
        let sessions = self.session.persistence().sessions()?;
        if sessions.is_empty() {
            writeln!(out, "No saved sessions")?;
            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["Connection", "Database", "Tabs", "Saved"]);
        for saved in sessions {
            table.add_row(vec![
                saved.session.connection_id,
                saved.session.database,
                saved.tab_count.to_string(),
                saved
                    .saved_at
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default(),
            ]);
        }
        writeln!(out, "{table}")?;
        Ok(())
    }
}

fn needs_session(command: &ShellCommand) -> bool {
    !matches!(
        command,
        ShellCommand::Connect { .. }
            | ShellCommand::Go(_)
            | ShellCommand::Back
            | ShellCommand::Forward
            | ShellCommand::Show
            | ShellCommand::Sessions
            | ShellCommand::Forget { .. }
            | ShellCommand::Help
            | ShellCommand::Quit
    )
}

fn describe(tab: &TabState) -> String {
    match tab {
        TabState::Query(query) => {
            let mut text = preview(&query.sql);
            if query.pending_load {
                text.push_str(" (loading)");
            }
            text
        }
        TabState::Table(table) => match &table.filter {
            Some(filter) => format!("WHERE {}", preview(filter)),
            None => String::new(),
        },
    }
}

fn preview(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() > 48 {
        let cut: String = line.chars().take(47).collect();
        format!("{cut}…")
    } else {
        line
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn render_outcome(outcome: &QueryOutcome, out: &mut impl Write) -> Result<()> {
    if outcome.columns.is_empty() {
        writeln!(
            out,
            "{} row(s) affected ({} ms)",
            outcome.rows_affected, outcome.duration_ms
        )?;
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(outcome.columns.clone());
    for row in &outcome.rows {
        table.add_row(row.iter().map(|value| match value {
            serde_json::Value::Null => "NULL".to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }));
    }
    writeln!(out, "{table}")?;
    writeln!(out, "{} row(s) ({} ms)", outcome.rows.len(), outcome.duration_ms)?;
    Ok(())
}

#[cfg(test)]
mod tests;

use super::*;
use async_trait::async_trait;
use dbtabs_core::ExecutionError;
use dbtabs_session::TabIdAllocator;
use dbtabs_storage::{MemoryStore, TabPersistence};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// Records the SQL it is asked to run and answers with one row
#[derive(Clone, Default)]
struct FakeExecutor {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute(
        &self,
        connection_id: &str,
        sql: &str,
    ) -> Result<QueryOutcome, ExecutionError> {
        self.seen
            .lock()
            .push((connection_id.to_string(), sql.to_string()));
        if sql.contains("boom") {
            return Err(ExecutionError::new("near \"boom\": syntax error"));
        }
        Ok(QueryOutcome {
            columns: vec!["answer".into()],
            rows: vec![vec![serde_json::json!(42)]],
            duration_ms: 1,
            rows_affected: 0,
        })
    }
}

fn shell(store: &MemoryStore, executor: &FakeExecutor) -> Shell<MemoryStore, FakeExecutor> {
    let session = TabSession::with_allocator(
        TabPersistence::new(store.clone()),
        HistoryNavigator::new(),
        TabIdAllocator::starting_at(1),
    );
    Shell::new(session, executor.clone(), "")
}

async fn feed(shell: &mut Shell<MemoryStore, FakeExecutor>, lines: &[&str]) -> String {
    let mut out = Vec::new();
    for line in lines {
        shell.handle_line(line, &mut out).await.unwrap();
    }
    String::from_utf8(out).unwrap()
}

fn order(shell: &Shell<MemoryStore, FakeExecutor>) -> Vec<String> {
    shell
        .session()
        .view()
        .tab_ids()
        .iter()
        .map(|id| id.to_string())
        .collect()
}

#[test]
fn test_parse_commands() {
    assert_eq!(ShellCommand::parse("  ").unwrap(), None);
    assert_eq!(ShellCommand::parse("# note").unwrap(), None);
    assert_eq!(
        ShellCommand::parse("connect local main").unwrap(),
        Some(ShellCommand::Connect {
            connection: "local".into(),
            database: "main".into()
        })
    );
    assert_eq!(
        ShellCommand::parse("rename 2 Monthly totals").unwrap(),
        Some(ShellCommand::Rename {
            index: 2,
            label: "Monthly totals".into()
        })
    );
    assert_eq!(
        ShellCommand::parse("rename 0").unwrap(),
        Some(ShellCommand::Rename {
            index: 0,
            label: String::new()
        })
    );
    assert_eq!(
        ShellCommand::parse("filter -").unwrap(),
        Some(ShellCommand::Filter(None))
    );
    assert_eq!(
        ShellCommand::parse("new").unwrap(),
        Some(ShellCommand::New { label: None })
    );
    assert!(ShellCommand::parse("close x").is_err());
    assert!(ShellCommand::parse("connect only").is_err());
    assert!(ShellCommand::parse("frobnicate").is_err());
}

#[tokio::test]
async fn test_commands_need_a_session() {
    let store = MemoryStore::new();
    let mut shell = shell(&store, &FakeExecutor::default());

    let out = feed(&mut shell, &["new"]).await;
    assert!(out.contains("Not connected"));
    assert!(shell.session().tabs().is_empty());
}

#[tokio::test]
async fn test_connect_opens_default_tab() {
    let store = MemoryStore::new();
    let mut shell = shell(&store, &FakeExecutor::default());

    let out = feed(&mut shell, &["connect local main"]).await;
    assert!(out.contains("local/main  tabs=query-1&active=0"));
    assert_eq!(order(&shell), vec!["query-1"]);
}

#[tokio::test]
async fn test_location_before_connect_is_used() {
    let store = MemoryStore::new();
    let mut shell = shell(&store, &FakeExecutor::default());

    feed(
        &mut shell,
        &["go tabs=query-0,table-public.users&active=1", "connect local main"],
    )
    .await;
    assert_eq!(order(&shell), vec!["query-0", "table-public.users"]);
    assert_eq!(shell.session().view().active_index(), 1);
}

#[tokio::test]
async fn test_tab_lifecycle_through_shell() {
    let store = MemoryStore::new();
    let mut shell = shell(&store, &FakeExecutor::default());

    feed(
        &mut shell,
        &[
            "connect local main",
            "table public users",
            "new Scratch",
            "table public users",
        ],
    )
    .await;
    assert_eq!(order(&shell), vec!["query-1", "table-public.users", "query-2"]);
    assert_eq!(shell.session().view().active_index(), 1);

    feed(&mut shell, &["close 1"]).await;
    assert_eq!(order(&shell), vec!["query-1", "query-2"]);
    assert_eq!(shell.session().view().active_index(), 0);

    feed(&mut shell, &["rename 1 Report", "switch 1", "sql SELECT 1"]).await;
    let active = shell.session().active_tab().unwrap();
    assert_eq!(active.label(), "Report");
    assert_eq!(active.as_query().unwrap().sql, "SELECT 1");

    let out = feed(&mut shell, &["close 9"]).await;
    assert!(out.contains("No tab at position 9"));
}

#[tokio::test]
async fn test_back_restores_previous_tabs() {
    let store = MemoryStore::new();
    let mut shell = shell(&store, &FakeExecutor::default());

    feed(&mut shell, &["connect local main", "new", "close 1"]).await;
    assert_eq!(order(&shell), vec!["query-1"]);

    feed(&mut shell, &["back"]).await;
    assert_eq!(order(&shell), vec!["query-1", "query-2"]);

    let out = feed(&mut shell, &["back", "back"]).await;
    assert!(out.contains("No earlier location"));
}

#[tokio::test]
async fn test_run_query_and_table_tabs() {
    let store = MemoryStore::new();
    let executor = FakeExecutor::default();
    let mut shell = shell(&store, &executor);

    let out = feed(
        &mut shell,
        &[
            "connect local main",
            "sql SELECT 42 AS answer",
            "run",
            "table main users",
            "filter age > 30",
            "run",
        ],
    )
    .await;
    assert!(out.contains("42"));
    assert!(out.contains("1 row(s)"));

    let seen = executor.seen.lock().clone();
    assert_eq!(
        seen,
        vec![
            ("local".to_string(), "SELECT 42 AS answer".to_string()),
            (
                "local".to_string(),
                "SELECT * FROM \"main\".\"users\" WHERE age > 30 LIMIT 100".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_failed_query_is_reported() {
    let store = MemoryStore::new();
    let mut shell = shell(&store, &FakeExecutor::default());

    let out = feed(&mut shell, &["connect local main", "run", "sql boom", "run"]).await;
    assert!(out.contains("The active query tab has no SQL"));
    assert!(out.contains("query failed: near \"boom\": syntax error"));
    assert_eq!(shell.session().tabs().len(), 1);
}

#[tokio::test]
async fn test_sessions_and_forget() {
    let store = MemoryStore::new();
    let mut shell = shell(&store, &FakeExecutor::default());

    let out = feed(&mut shell, &["sessions"]).await;
    assert!(out.contains("No saved sessions"));

    let out = feed(
        &mut shell,
        &["connect local main", "connect local audit", "sessions"],
    )
    .await;
    assert!(out.contains("main"));
    assert!(out.contains("audit"));

    let out = feed(&mut shell, &["forget local main", "forget local main"]).await;
    assert!(out.contains("Forgot saved tabs for local/main"));
    assert!(out.contains("No saved tabs for local/main"));
    assert_eq!(
        TabPersistence::new(store.clone()).sessions().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_quit() {
    let store = MemoryStore::new();
    let mut shell = shell(&store, &FakeExecutor::default());
    let mut out = Vec::new();

    assert_eq!(shell.handle_line("help", &mut out).await.unwrap(), Flow::Continue);
    assert_eq!(shell.handle_line("quit", &mut out).await.unwrap(), Flow::Quit);
    assert!(String::from_utf8(out).unwrap().contains("close-right <i>"));
}

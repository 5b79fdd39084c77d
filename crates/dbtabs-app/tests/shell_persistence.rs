//! Shell runs against on-disk storage and a real SQLite executor

use dbtabs_app::{Shell, SqliteExecutor, StorageBackend, StorageSettings};
use dbtabs_session::{HistoryNavigator, TabIdAllocator, TabSession};
use dbtabs_storage::{KeyValueStore, TabPersistence};
use std::collections::BTreeMap;
use std::path::Path;

fn open_shell(dir: &Path, start: u64) -> Shell<Box<dyn KeyValueStore>, SqliteExecutor> {
    let storage = StorageSettings {
        backend: StorageBackend::Sqlite,
        path: Some(dir.join("tabs.db")),
    };
    let session = TabSession::with_allocator(
        TabPersistence::new(storage.open().unwrap()),
        HistoryNavigator::new(),
        TabIdAllocator::starting_at(start),
    );
    let mut connections = BTreeMap::new();
    connections.insert("local".to_string(), dir.join("app.db"));
    Shell::new(session, SqliteExecutor::new(connections), "")
}

async fn feed(
    shell: &mut Shell<Box<dyn KeyValueStore>, SqliteExecutor>,
    lines: &[&str],
) -> String {
    let mut out = Vec::new();
    for line in lines {
        shell.handle_line(line, &mut out).await.unwrap();
    }
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_tabs_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = open_shell(dir.path(), 1);
    feed(
        &mut first,
        &[
            "connect local main",
            "sql SELECT name FROM pets ORDER BY name",
            "table main pets",
            "filter legs = 4",
        ],
    )
    .await;
    drop(first);

    // A fresh process starts on an unrelated location; the saved record wins
    let mut second = open_shell(dir.path(), 1000);
    let out = feed(&mut second, &["go tabs=query-77&active=0", "connect local main"]).await;
    assert!(out.contains("tabs=query-1,table-main.pets&active=0"));

    let session = second.session();
    assert_eq!(session.tabs().len(), 2);
    let query = session.active_tab().unwrap().as_query().unwrap();
    assert_eq!(query.sql, "SELECT name FROM pets ORDER BY name");
    let pets = session.tabs().get(session.tab_id_at(1).unwrap()).unwrap();
    assert_eq!(pets.as_table().unwrap().filter.as_deref(), Some("legs = 4"));
}

#[tokio::test]
async fn test_run_against_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = open_shell(dir.path(), 1);

    let out = feed(
        &mut shell,
        &[
            "connect local main",
            "sql CREATE TABLE pets (name TEXT, legs INTEGER)",
            "run",
            "sql INSERT INTO pets VALUES ('rex', 4), ('tweety', 2)",
            "run",
            "table main pets",
            "filter legs = 4",
            "run",
        ],
    )
    .await;

    assert!(out.contains("2 row(s) affected"));

    // Everything after the last tab listing is the filtered table preview
    let (_, preview) = out.rsplit_once("table-main.pets").unwrap();
    assert!(preview.contains("rex"));
    assert!(!preview.contains("tweety"));
    assert!(preview.contains("1 row(s)"));
}

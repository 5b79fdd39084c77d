//! SQLite query executor
//!
//! Each connection id maps to a database file. Connections are opened on
//! first use and kept; statements run on the blocking pool.

use async_trait::async_trait;
use dbtabs_core::{ExecutionError, QueryExecutor, QueryOutcome};
use parking_lot::Mutex;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub struct SqliteExecutor {
    paths: BTreeMap<String, PathBuf>,
    open: Mutex<HashMap<String, Arc<Mutex<Connection>>>>,
}

impl SqliteExecutor {
    pub fn new(paths: BTreeMap<String, PathBuf>) -> Self {
        Self {
            paths,
            open: Mutex::new(HashMap::new()),
        }
    }

    fn connection(&self, connection_id: &str) -> Result<Arc<Mutex<Connection>>, ExecutionError> {
        if let Some(conn) = self.open.lock().get(connection_id) {
            return Ok(conn.clone());
        }

        let path = self.paths.get(connection_id).ok_or_else(|| {
            ExecutionError::new(format!("Unknown connection '{connection_id}'"))
        })?;
        let conn = Connection::open(path)
            .map_err(|e| ExecutionError::new(format!("Failed to open {}: {e}", path.display())))?;
        tracing::debug!(connection_id, path = %path.display(), "opened query connection");

        let conn = Arc::new(Mutex::new(conn));
        self.open
            .lock()
            .insert(connection_id.to_string(), conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, connection_id: &str, sql: &str) -> Result<QueryOutcome, ExecutionError> {
        let conn = self.connection(connection_id)?;
        let sql = sql.to_string();

        let outcome = tokio::task::spawn_blocking(move || run_statement(&conn.lock(), &sql))
            .await
            .map_err(|e| ExecutionError::new(format!("Query task failed: {e}")))??;

        tracing::debug!(
            rows = outcome.rows.len(),
            rows_affected = outcome.rows_affected,
            duration_ms = outcome.duration_ms,
            "query executed"
        );
        Ok(outcome)
    }
}

fn run_statement(conn: &Connection, sql: &str) -> Result<QueryOutcome, ExecutionError> {
    let start = Instant::now();

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ExecutionError::new(format!("Failed to prepare query: {e}")))?;

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    if columns.is_empty() {
        let rows_affected = stmt
            .execute([])
            .map_err(|e| ExecutionError::new(format!("Failed to execute statement: {e}")))?;
        return Ok(QueryOutcome {
            columns,
            rows: Vec::new(),
            duration_ms: elapsed_ms(start),
            rows_affected: rows_affected as u64,
        });
    }

    let mut rows = Vec::new();
    let mut query_rows = stmt
        .query([])
        .map_err(|e| ExecutionError::new(format!("Failed to execute query: {e}")))?;
    while let Some(row) = query_rows
        .next()
        .map_err(|e| ExecutionError::new(format!("Failed to fetch row: {e}")))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            let value = row
                .get_ref(idx)
                .map_err(|e| ExecutionError::new(e.to_string()))?;
            values.push(to_json(value));
        }
        rows.push(values);
    }

    Ok(QueryOutcome {
        columns,
        rows,
        duration_ms: elapsed_ms(start),
        rows_affected: 0,
    })
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(s) => String::from_utf8_lossy(s).into_owned().into(),
        // Text stored without a declared type comes back as a blob
        ValueRef::Blob(b) => match std::str::from_utf8(b) {
            Ok(s) => s.to_string().into(),
            Err(_) => format!("<{} bytes>", b.len()).into(),
        },
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

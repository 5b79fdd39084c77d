//! Query execution port
//!
//! Tab contents hand their SQL to an executor. The tab session never calls
//! it; it is defined here so content renderers and the shell agree on one
//! shape.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Result of running one statement
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub duration_ms: u64,
    pub rows_affected: u64,
}

/// Execution failed; the message is shown to the user as-is
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        connection_id: &str,
        sql: &str,
    ) -> Result<QueryOutcome, ExecutionError>;
}

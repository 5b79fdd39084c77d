//! Error types for tab bookkeeping

use thiserror::Error;

use crate::TabId;

/// Errors raised by the tab store and tab identifier parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    #[error("Tab already exists: {0}")]
    DuplicateId(TabId),

    #[error("Tab not found: {0}")]
    NotFound(TabId),

    #[error("Invalid tab id: {0:?}")]
    InvalidTabId(String),
}

/// Result type alias for tab operations
pub type Result<T> = std::result::Result<T, TabError>;

//! dbtabs Core - tab identity and the in-memory tab store
//!
//! This crate provides the data model every other dbtabs crate builds on:
//!
//! - `TabId` - Self-describing tab identifier (`query-<token>` / `table-<schema>.<table>`)
//! - `TabState` - Content of a query editor tab or a table inspector tab
//! - `SessionKey` - The (connection, database) pair that scopes a tab set
//! - `TabStateStore` - Ephemeral map of open tabs with write tracking
//! - `QueryExecutor` - Port to whatever runs SQL for a connection
//!
//! Nothing in here performs I/O.

mod error;
mod executor;
mod session_key;
mod store;
mod tab;
mod tab_id;

pub use error::*;
pub use executor::*;
pub use session_key::*;
pub use store::*;
pub use tab::*;
pub use tab_id::*;

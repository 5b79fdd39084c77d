//! dbtabs - a command-line shell over persistent database tab sessions
//!
//! The binary reads settings, sets up logging, opens the saved-tab store and
//! a SQLite query executor, then runs [`shell::Shell`] over stdin.

pub mod executor;
pub mod logging;
pub mod settings;
pub mod shell;

pub use executor::SqliteExecutor;
pub use settings::{LogPreset, ShellSettings, StorageBackend, StorageSettings};
pub use shell::{Flow, Shell, ShellCommand};

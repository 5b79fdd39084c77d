use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use dbtabs_app::logging::{self, LoggingConfig};
use dbtabs_app::{Flow, LogPreset, Shell, ShellSettings, SqliteExecutor, StorageBackend};
use dbtabs_session::{HistoryNavigator, TabSession};
use dbtabs_storage::TabPersistence;

#[derive(Parser, Debug)]
#[command(name = "dbtabs", version, about = "Persistent query tabs per connection and database")]
struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "DBTABS_SETTINGS")]
    settings: Option<PathBuf>,

    /// Keep saved tabs in memory only
    #[arg(long)]
    memory: bool,

    /// Logging preset, overriding the settings file
    #[arg(long, value_enum)]
    log: Option<LogPreset>,

    /// Location to start from, e.g. "tabs=query-1,table-main.users&active=1"
    #[arg(long, default_value = "")]
    location: String,

    /// Connect right away: <connection> <database>
    #[arg(long, num_args = 2, value_names = ["CONNECTION", "DATABASE"])]
    connect: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => ShellSettings::load_from(path)?,
        None => ShellSettings::load()?,
    };
    if args.memory {
        settings.storage.backend = StorageBackend::Memory;
    }
    if let Some(preset) = args.log {
        settings.logging = preset;
    }

    if let Err(e) = logging::init(LoggingConfig::for_preset(settings.logging)) {
        // Logging is not up yet, so this goes straight to stderr
        eprintln!("warning: failed to initialize logging: {e:#}");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?settings.storage.backend,
        namespace = %settings.namespace,
        "starting dbtabs"
    );

    let store = settings.storage.open()?;
    let persistence = TabPersistence::with_namespace(store, settings.namespace.clone());
    let session = TabSession::new(persistence, HistoryNavigator::new());
    let executor = SqliteExecutor::new(settings.connections.clone());
    let mut shell = Shell::new(session, executor, args.location);

    let mut stdout = std::io::stdout();
    if let Some([connection, database]) = args.connect.as_deref() {
        let line = format!("connect {connection} {database}");
        shell.handle_line(&line, &mut stdout).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "dbtabs> ")?;
        stdout.flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        if shell.handle_line(&line, &mut stdout).await? == Flow::Quit {
            break;
        }
    }

    tracing::info!("dbtabs exiting");
    Ok(())
}

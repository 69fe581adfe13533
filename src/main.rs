use clap::Parser;
use fairway_ledger::application::context::LedgerContext;
use fairway_ledger::application::engine::LedgerEngine;
use fairway_ledger::config::LedgerConfig;
use fairway_ledger::domain::ports::LedgerStoreRef;
use fairway_ledger::infrastructure::clock::SystemClock;
use fairway_ledger::infrastructure::in_memory::{
    InMemoryLedgerStore, StaticClubPolicies, StaticMemberDirectory,
};
#[cfg(feature = "storage-rocksdb")]
use fairway_ledger::infrastructure::rocksdb::RocksDBLedgerStore;
use fairway_ledger::interfaces::csv::cart_writer::CartWriter;
use fairway_ledger::interfaces::csv::command_reader::CommandReader;
use fairway_ledger::interfaces::json::seed::Seed;
use fairway_ledger::logging::init_logging;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Ledger commands CSV file
    commands: PathBuf,

    /// JSON file with tee times, players, line items, payment methods and club policies
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Minutes after payment during which a transaction may be voided
    #[arg(long, default_value_t = 120)]
    void_window_minutes: i64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDBLedgerStore::open(path)?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let store = open_store(cli.db_path)?;
    let policies = StaticClubPolicies::new();
    let members = StaticMemberDirectory::new();

    if let Some(seed_path) = cli.seed {
        let seed = Seed::from_reader(File::open(seed_path).into_diagnostic()?)?;
        seed.apply(store.as_ref(), &policies, &members).await?;
    }

    let ctx = LedgerContext::new(
        store,
        Arc::new(policies),
        Arc::new(members),
        Arc::new(SystemClock),
        LedgerConfig::default().with_void_window_minutes(cli.void_window_minutes),
    );
    let engine = LedgerEngine::new(ctx);

    // Process commands
    let file = File::open(cli.commands).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (row, command) in reader.commands().enumerate() {
        let line = row + 2;
        match command {
            Ok(command) => match engine.execute(command).await {
                Ok(outcome) => info!(line, "{}", outcome.describe()),
                Err(e) => eprintln!("Error processing command on line {}: {}", line, e),
            },
            Err(e) => eprintln!("Error reading command on line {}: {}", line, e),
        }
    }

    let carts = engine.all_carts().await?;

    let stdout = io::stdout();
    let mut writer = CartWriter::new(stdout.lock());
    writer.write_carts(&carts)?;

    Ok(())
}

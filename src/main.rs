use clap::{Parser, Subcommand};
use donations::application::donation::{
    Collaborators, DonationRequest, DonationWorkflow, PaymentSource,
};
use donations::domain::ports::RecordStoreRef;
use donations::infrastructure::in_memory::{
    InMemoryRecordStore, InMemorySession, LocalTokenizer, RouteNavigator,
};
use donations::interfaces::csv::donation_reader::DonationReader;
use donations::interfaces::csv::outcome_writer::{Outcome, OutcomeWriter};
use donations::interfaces::router::RouteTable;
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every donation in a CSV file through the checkout workflow
    Process {
        /// Input donations CSV file
        input: PathBuf,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long, env = "DONATIONS_DB_PATH")]
        db_path: Option<PathBuf>,
    },
    /// Resolve a URL against the route table and print the match as JSON
    Route {
        url: String,
    },
}

fn open_store(db_path: Option<PathBuf>) -> Result<RecordStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = donations::infrastructure::rocksdb::RocksDBStore::open(path)
                .into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        None => Ok(Arc::new(InMemoryRecordStore::new())),
    }
}

async fn process(input: PathBuf, db_path: Option<PathBuf>) -> Result<()> {
    let store = open_store(db_path)?;
    let tokenizer = Arc::new(LocalTokenizer::new());
    let navigator = Arc::new(RouteNavigator::new(RouteTable::standard()));

    let file = File::open(input).into_diagnostic()?;
    let reader = DonationReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());

    for row_result in reader.donations() {
        let row = match row_result {
            Ok(row) => row,
            Err(e) => {
                warn!("Error reading donation: {}", e);
                continue;
            }
        };

        let mut user = row.user();
        user.platform_customer = store
            .customer_for_user(user.id)
            .await
            .into_diagnostic()?
            .map(|c| c.id);

        let payment = match row.card_params() {
            Some(card) => PaymentSource::NewCard(card),
            None => match store.cards_for_user(user.id).await.into_diagnostic()?.pop() {
                Some(card) => PaymentSource::ExistingCard(card),
                None => {
                    warn!(user = %user.id, "No saved card for donation without card details");
                    writer
                        .write_outcome(&Outcome::rejected(&row, "No saved card for user"))
                        .into_diagnostic()?;
                    continue;
                }
            },
        };

        let workflow = DonationWorkflow::new(
            row.project(),
            Collaborators {
                tokenizer: tokenizer.clone(),
                store: store.clone(),
                session: Arc::new(InMemorySession::new(user)),
                navigator: navigator.clone(),
            },
        );
        let state = workflow
            .submit(DonationRequest {
                amount: row.amount,
                payment,
            })
            .await;

        writer
            .write_outcome(&Outcome::from_state(&row, &state))
            .into_diagnostic()?;
    }

    writer.flush().into_diagnostic()?;
    Ok(())
}

fn route(url: &str) -> Result<()> {
    let routes = RouteTable::standard();
    let matched = routes
        .recognize(url)
        .ok_or_else(|| miette!("No route matches {}", url))?;
    let json = serde_json::to_string_pretty(&matched).into_diagnostic()?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Process { input, db_path } => process(input, db_path).await,
        Command::Route { url } => route(&url),
    }
}

//! Admin CLI for a korel-core SQLite store: schema init, bulk ingest, and
//! ad-hoc neighbor lookups.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use korel_core::config::StoreConfig;
use korel_core::store::sqlite::SqliteStore;
use korel_core::store::{no_cancel, NewDocument, Store};

#[derive(Parser)]
#[command(name = "storectl", about = "Manage a korel-core document store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create (or open) a store file and run schema migrations.
    Init { path: PathBuf },
    /// Ingest documents from a JSON file containing an array of
    /// documents shaped like [`NewDocument`].
    Ingest {
        path: PathBuf,
        docs_file: PathBuf,
    },
    /// Print a token's top-k PMI neighbors.
    Neighbors {
        path: PathBuf,
        token: String,
        #[arg(long, default_value_t = 10)]
        k: i64,
        #[arg(long)]
        npmi: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let cancel = no_cancel();

    match cli.command {
        Command::Init { path } => {
            SqliteStore::open(&path, StoreConfig::default())?;
            println!("initialized store at {}", path.display());
        }
        Command::Ingest { path, docs_file } => {
            let store = SqliteStore::open(&path, StoreConfig::default())?;
            let raw = fs::read_to_string(&docs_file)?;
            let docs: Vec<NewDocument> = serde_json::from_str(&raw)?;
            let count = docs.len();
            for doc in docs {
                store.upsert_doc(doc, &cancel)?;
            }
            println!("ingested {count} documents into {}", path.display());
        }
        Command::Neighbors {
            path,
            token,
            k,
            npmi,
        } => {
            let config = StoreConfig {
                use_npmi: npmi,
                ..StoreConfig::default()
            };
            let store = SqliteStore::open(&path, config)?;
            let neighbors = store.top_neighbors(&token, k, &cancel)?;
            for neighbor in neighbors {
                println!("{}\t{:.4}", neighbor.token, neighbor.score);
            }
        }
    }

    Ok(())
}

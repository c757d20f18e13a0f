use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use tables_sms::config::AppConfig;
use tables_sms::handler::{MessageHandler, Outcome};
use tables_sms::logging::init_logging;
use tables_sms::models::{InboundMessage, Shortcut, TableDescriptor};
use tables_sms::repository::ResponseSender;
use tables_sms::store::SqliteStore;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and its metadata tables
    Init,
    /// Define a data table from a JSON description
    Define {
        /// Path to the table description
        file: PathBuf,
    },
    /// Add a shortcut to a shortcut table
    Shortcut {
        /// Shortcut table, created if missing
        table: String,
        /// Name used after `@`
        name: String,
        /// Input pattern with `%key%` holes
        input: String,
        /// Output pattern with `%key%` holes
        output: String,
    },
    /// Store a phone/password credential in an access table
    Grant {
        /// Access table, created if missing
        table: String,
        /// Phone number
        phone: String,
        /// Password
        password: String,
    },
    /// Interpret one inbound message
    Handle {
        /// Phone number of the sender
        #[arg(short, long)]
        from: String,
        /// Message text
        message: String,
    },
}

/// Prints replies instead of texting them
struct ConsoleSender;

impl ResponseSender for ConsoleSender {
    fn send(&self, phone: &str, body: &str) -> tables_sms::Result<()> {
        writeln!(std::io::stdout().lock(), "to {phone}: {body}")?;
        Ok(())
    }
}

fn main() -> Result<()> {
    let config = AppConfig::load()?;
    let _log_guard = init_logging(&config.logging)?;
    info!("Starting tables-sms");

    let cli = Cli::parse();

    let store = SqliteStore::open(&config.database.path, config.database.max_connections)
        .with_context(|| format!("Failed to open database {}", config.database.path))?;

    match cli.command {
        Commands::Init => info!(path = %config.database.path, "database ready"),
        Commands::Define { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let table: TableDescriptor = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            store.define_table(&table)?;
        },
        Commands::Shortcut {
            table,
            name,
            input,
            output,
        } => store.add_shortcut(
            &table,
            &Shortcut {
                name,
                input_pattern: input,
                output_pattern: output,
            },
        )?,
        Commands::Grant {
            table,
            phone,
            password,
        } => store.grant(&table, &phone, &password)?,
        Commands::Handle { from, message } => {
            handle_message(&config, &store, &InboundMessage::new(from, message))?;
        },
    }

    Ok(())
}

fn handle_message(config: &AppConfig, store: &SqliteStore, message: &InboundMessage) -> Result<()> {
    let sender = ConsoleSender;
    let handler = MessageHandler::new(store, store, store, &sender, config.interpreter);
    let mut out = std::io::stdout().lock();

    match handler.handle(message)? {
        Outcome::Inserted { table, values } => {
            writeln!(out, "inserted into {table}: {}", serde_json::to_string(&values)?)?;
        },
        // Already printed by the sender
        Outcome::Responded { .. } => {},
        Outcome::NotHandled(rejection) => {
            writeln!(out, "not handled ({}): {rejection}", rejection.reason())?;
        },
    }
    Ok(())
}

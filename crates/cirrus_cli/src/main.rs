//! Cirrus CLI
//!
//! Command-line front end for the Cirrus SDK, for poking at a backend
//! from a terminal.
//!
//! # Commands
//!
//! - `find` - List records, optionally filtered
//! - `get` - Fetch one record
//! - `save` - Create or update a record
//! - `delete` - Delete a record
//! - `upload` - Attach a file to a record property
//! - `download` - Fetch an attached file
//! - `login` / `logout` / `whoami` - Manage the stored session
//!
//! The application key and backend URL come from `CIRRUS_APP_KEY` and
//! `CIRRUS_BASE_URL`. The session is kept in a JSON file between runs.

mod commands;

use cirrus_core::{Client, ClientConfig, FileSecureStore};
use clap::{Parser, Subcommand};
use commands::Assignment;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Cirrus backend command-line tools.
#[derive(Parser)]
#[command(name = "cirrus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File holding the session between invocations
    #[arg(global = true, long, default_value = ".cirrus-session.json")]
    session_file: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List records of a collection
    Find {
        /// Collection name
        collection: String,

        /// Equality filter, repeatable (property=value)
        #[arg(short, long = "where", value_parser = commands::parse_assignment)]
        conditions: Vec<Assignment>,

        /// Substring to search for
        #[arg(short, long, conflicts_with = "conditions", requires = "properties")]
        search: Option<String>,

        /// Properties to search in (with --search)
        #[arg(long = "in", requires = "search")]
        properties: Vec<String>,

        /// Filter in the backend's query grammar
        #[arg(short, long, conflicts_with_all = ["conditions", "search"])]
        filter: Option<String>,

        /// Inline related records this many levels deep
        #[arg(short, long, default_value_t = 0)]
        expand: u32,
    },

    /// Fetch one record
    Get {
        /// Collection name
        collection: String,
        /// Record identifier
        id: String,

        /// Inline related records this many levels deep
        #[arg(short, long, default_value_t = 0)]
        expand: u32,
    },

    /// Create a record, or update one with --id
    Save {
        /// Collection name
        collection: String,

        /// Identifier of an existing record to update
        #[arg(long)]
        id: Option<String>,

        /// Properties to set (property=value, value parsed as JSON if possible)
        #[arg(value_parser = commands::parse_assignment)]
        properties: Vec<Assignment>,
    },

    /// Delete a record
    Delete {
        /// Collection name
        collection: String,
        /// Record identifier
        id: String,
    },

    /// Attach a file to a record property
    Upload {
        /// Collection name
        collection: String,
        /// Record identifier
        id: String,
        /// Property to attach the file to
        property: String,
        /// File to upload
        path: PathBuf,
    },

    /// Download the file attached to a record property
    Download {
        /// Collection name
        collection: String,
        /// Record identifier
        id: String,
        /// File property
        property: String,

        /// Resize to this width
        #[arg(long)]
        width: Option<u32>,

        /// Resize to this height
        #[arg(long)]
        height: Option<u32>,

        /// Crop instead of scaling
        #[arg(long)]
        crop: bool,

        /// Write to this path instead of the attachment's filename
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Open a session and store it
    Login {
        /// Username
        username: String,

        /// Password (read from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// End the stored session
    Logout,

    /// Show the logged-in user
    Whoami,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    let store = FileSecureStore::open(&cli.session_file);
    let client = Client::init_with_secure_store(config, Arc::new(store))?;
    if let Some(user) = client.users().current_user() {
        debug!(username = user.username(), "using stored session");
    }

    match cli.command {
        Commands::Find {
            collection,
            conditions,
            search,
            properties,
            filter,
            expand,
        } => {
            let selection = commands::find::Selection::from_args(conditions, search, properties, filter);
            commands::find::run(&client, &collection, selection, expand).await?;
        }
        Commands::Get {
            collection,
            id,
            expand,
        } => {
            commands::get::run(&client, &collection, &id, expand).await?;
        }
        Commands::Save {
            collection,
            id,
            properties,
        } => {
            commands::save::run(&client, &collection, id.as_deref(), properties).await?;
        }
        Commands::Delete { collection, id } => {
            commands::delete::run(&client, &collection, &id).await?;
        }
        Commands::Upload {
            collection,
            id,
            property,
            path,
        } => {
            commands::upload::run(&client, &collection, &id, &property, &path).await?;
        }
        Commands::Download {
            collection,
            id,
            property,
            width,
            height,
            crop,
            output,
        } => {
            let resize = commands::download::resize_spec(width, height, crop);
            commands::download::run(&client, &collection, &id, &property, resize, output).await?;
        }
        Commands::Login { username, password } => {
            commands::login::login(&client, &username, password).await?;
        }
        Commands::Logout => {
            commands::login::logout(&client).await?;
        }
        Commands::Whoami => {
            commands::login::whoami(&client);
        }
    }

    client.teardown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("cirrus").chain(args.iter().copied()))
    }

    #[test]
    fn search_needs_properties() {
        assert!(parse(&["find", "notes", "--search", "milk"]).is_err());
        assert!(parse(&["find", "notes", "--in", "title"]).is_err());

        let cli = parse(&["find", "notes", "--search", "milk", "--in", "title", "--in", "body"]).unwrap();
        match cli.command {
            Commands::Find {
                search, properties, ..
            } => {
                assert_eq!(search.as_deref(), Some("milk"));
                assert_eq!(properties, ["title", "body"]);
            }
            _ => panic!("expected find"),
        }
    }

    #[test]
    fn expand_defaults_to_off() {
        match parse(&["get", "invoices", "i1"]).unwrap().command {
            Commands::Get { expand, .. } => assert_eq!(expand, 0),
            _ => panic!("expected get"),
        }
        match parse(&["find", "invoices", "--expand", "2"]).unwrap().command {
            Commands::Find { expand, .. } => assert_eq!(expand, 2),
            _ => panic!("expected find"),
        }
    }
}

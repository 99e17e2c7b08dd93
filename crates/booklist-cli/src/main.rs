//! Booklist CLI
//!
//! Command-line interface for Booklist - a personal book catalog.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use booklist_core::{BookField, BookFields, Config, Store};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "booklist")]
#[command(about = "Booklist - a personal catalog of books, covers and ebook files")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Data directory (overrides config and BOOKLIST_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Config file to use instead of the default
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage books
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Manage files attached to a book
    File {
        #[command(subcommand)]
        command: FileCommands,
    },
    /// Manage a book's cover image
    Cover {
        #[command(subcommand)]
        command: CoverCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show catalog and storage status
    Status,
}

/// Book fields settable from the command line
#[derive(Args, Debug, Default)]
struct BookFieldArgs {
    #[arg(short, long)]
    title: Option<String>,
    #[arg(short, long)]
    author: Option<String>,
    #[arg(short, long)]
    series: Option<String>,
    #[arg(short, long)]
    description: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    /// Release date, YYYY-MM-DD
    #[arg(long)]
    release_date: Option<String>,
    #[arg(long)]
    publisher: Option<String>,
    #[arg(long)]
    language: Option<String>,
    #[arg(short, long)]
    genre: Option<String>,
}

impl BookFieldArgs {
    fn into_fields(self) -> BookFields {
        let supplied = [
            (BookField::Title, self.title),
            (BookField::Author, self.author),
            (BookField::Series, self.series),
            (BookField::Description, self.description),
            (BookField::Isbn, self.isbn),
            (BookField::ReleaseDate, self.release_date),
            (BookField::Publisher, self.publisher),
            (BookField::Language, self.language),
            (BookField::Genre, self.genre),
        ];

        let mut fields = BookFields::new();
        for (field, value) in supplied {
            if let Some(value) = value {
                fields.set(field, value);
            }
        }
        fields
    }
}

#[derive(Subcommand)]
enum BookCommands {
    /// Add a new book
    #[command(alias = "create")]
    Add {
        #[command(flatten)]
        fields: BookFieldArgs,
    },
    /// Edit a book (prompts for each field when no flags are given)
    Edit {
        /// Book ID (full UUID or prefix)
        id: String,
        #[command(flatten)]
        fields: BookFieldArgs,
    },
    /// Show book details
    Show {
        /// Book ID (full UUID or prefix)
        id: String,
        /// Only title, author, cover flag and modification time
        #[arg(long)]
        summary: bool,
    },
    /// Delete a book with its cover and files
    #[command(alias = "rm")]
    Delete {
        /// Book ID (full UUID or prefix)
        id: String,
    },
    /// List all books, newest first
    #[command(alias = "ls")]
    List,
    /// Search books by relevance
    Search {
        /// Search query (lists every book when empty)
        #[arg(default_value = "")]
        query: String,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    /// Attach a file to a book
    Add {
        /// Book ID (full UUID or prefix)
        book_id: String,
        /// File to attach
        path: PathBuf,
        /// Display name (defaults to the file's name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List a book's files
    #[command(alias = "ls")]
    List {
        /// Book ID (full UUID or prefix)
        book_id: String,
    },
    /// Show one file and where it is stored
    Show {
        /// Book ID (full UUID or prefix)
        book_id: String,
        /// Storage name (or prefix)
        hash_name: String,
    },
    /// Change a file's display name
    Rename {
        /// Book ID (full UUID or prefix)
        book_id: String,
        /// Storage name (or prefix)
        hash_name: String,
        /// New display name
        name: String,
    },
    /// Delete a file
    #[command(alias = "rm")]
    Delete {
        /// Book ID (full UUID or prefix)
        book_id: String,
        /// Storage name (or prefix)
        hash_name: String,
    },
}

#[derive(Subcommand)]
enum CoverCommands {
    /// Set a book's cover from an image file
    Set {
        /// Book ID (full UUID or prefix)
        book_id: String,
        /// Image file
        image: PathBuf,
    },
    /// Show where a book's cover is stored
    Show {
        /// Book ID (full UUID or prefix)
        book_id: String,
    },
    /// Remove a book's cover
    #[command(alias = "rm")]
    Delete {
        /// Book ID (full UUID or prefix)
        book_id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, autosave_interval_secs, resize_covers, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let mut config =
        Config::load_with_cli_override(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    init_logging(&config, cli.verbose);

    let store = Store::open_with_config(config);
    let autosave = store.spawn_autosave();

    let result = match cli.command {
        Commands::Book { command } => handle_book_command(command, &store, &output),
        Commands::File { command } => handle_file_command(command, &store, &output),
        Commands::Cover { command } => handle_cover_command(command, &store, &output),
        Commands::Status => commands::status::show(&store, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    autosave.shutdown().await;
    let saved = if store.is_dirty() {
        store.save().context("Failed to save catalog")
    } else {
        Ok(())
    };
    let result = saved.and(result);

    if let Err(e) = &result {
        if let Some(hint) = commands::recovery_hint(e) {
            eprintln!("Hint: {}", hint);
        }
    }

    result
}

fn handle_book_command(command: BookCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        BookCommands::Add { fields } => commands::book::add(store, fields.into_fields(), output),
        BookCommands::Edit { id, fields } => {
            commands::book::edit(store, &id, fields.into_fields(), output)
        }
        BookCommands::Show { id, summary } => commands::book::show(store, &id, summary, output),
        BookCommands::Delete { id } => commands::book::delete(store, &id, output),
        BookCommands::List => commands::book::list(store, output),
        BookCommands::Search { query } => commands::book::search(store, &query, output),
    }
}

fn handle_file_command(command: FileCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        FileCommands::Add {
            book_id,
            path,
            name,
        } => commands::file::add(store, &book_id, &path, name, output),
        FileCommands::List { book_id } => commands::file::list(store, &book_id, output),
        FileCommands::Show { book_id, hash_name } => {
            commands::file::show(store, &book_id, &hash_name, output)
        }
        FileCommands::Rename {
            book_id,
            hash_name,
            name,
        } => commands::file::rename(store, &book_id, &hash_name, &name, output),
        FileCommands::Delete { book_id, hash_name } => {
            commands::file::delete(store, &book_id, &hash_name, output)
        }
    }
}

fn handle_cover_command(command: CoverCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        CoverCommands::Set { book_id, image } => {
            commands::cover::set(store, &book_id, &image, output)
        }
        CoverCommands::Show { book_id } => commands::cover::show(store, &book_id, output),
        CoverCommands::Delete { book_id } => commands::cover::delete(store, &book_id, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging to stderr, or to `config.log_file` when set
///
/// `RUST_LOG` wins over `-v` when present.
fn init_logging(config: &Config, verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "booklist_core={},booklist_cli={}",
            log_level, log_level
        ))
    });

    let Some(log_path) = config.log_file.as_ref() else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(log_file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();
            debug!("Logging to {:?}", log_path);
        }
        Err(e) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
            warn!("Could not open log file {:?}: {}", log_path, e);
        }
    }
}

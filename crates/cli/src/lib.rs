mod includes;
mod occurrences;
mod output;
mod records;
mod stale;
mod units;

use clap::{Parser, Subcommand};
use indexstore::{IndexStore, IndexStoreLibrary, locate};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "indexstore",
    version,
    about = "Inspect clang/swift index stores",
    long_about = "Reads an index store written by `clang -index-store-path` or `swiftc -index-store-path` \
                  through libIndexStore and prints its units, include directives, records and symbol \
                  occurrences."
)]
pub struct Cli {
    /// Path to libIndexStore. Searched next to clang/swiftc on PATH when omitted.
    #[arg(long, global = true, env = locate::LIBRARY_PATH_ENV, value_name = "LIBRARY")]
    pub library: Option<PathBuf>,

    /// Index store directory (the one passed to -index-store-path)
    #[arg(long, short, global = true, value_name = "STORE_DIR", default_value = ".")]
    pub store: PathBuf,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    /// Also log to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the units in the store
    Units {
        /// Order units by name
        #[arg(long)]
        sorted: bool,
    },
    /// List include directives
    #[command(
        long_about = "Lists the #include/#import directives recorded for one unit, or for every unit \
                            when none is given."
    )]
    Includes {
        /// Unit name; all units when omitted
        #[arg(value_name = "UNIT")]
        unit: Option<String>,
        /// Only units whose main file ends with this suffix
        #[arg(long, value_name = "SUFFIX")]
        main_file: Option<String>,
    },
    /// List the records a unit references
    Records {
        #[arg(value_name = "UNIT")]
        unit: String,
    },
    /// List symbol occurrences of a record
    Occurrences {
        #[arg(value_name = "RECORD")]
        record: String,
        /// Only occurrences of the symbol with this USR
        #[arg(long)]
        usr: Option<String>,
        /// First line of a line range
        #[arg(long, requires = "line_count")]
        line_start: Option<u32>,
        /// Number of lines in the range
        #[arg(long, requires = "line_start")]
        line_count: Option<u32>,
    },
    /// Report units whose inputs changed since they were indexed
    Stale {
        /// Unit name; all units when omitted
        #[arg(value_name = "UNIT")]
        unit: Option<String>,
        /// Only list units that are not up to date
        #[arg(long)]
        only_stale: bool,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = indexstore::logging::init_logging("cli", cli.verbose);

    let library = match &cli.library {
        Some(path) => IndexStoreLibrary::load(path)?,
        None => IndexStoreLibrary::discover()?,
    };
    info!(library = ?library.path(), store = %cli.store.display(), "opening index store");
    let store = library.open_store(&cli.store)?;

    let text = execute(&store, cli.command, cli.json)?;
    println!("{text}");
    Ok(())
}

/// Run one subcommand against an open store and render its output.
pub fn execute(
    store: &IndexStore<'_>,
    command: Commands,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    match command {
        Commands::Units { sorted } => units::run(store, sorted, json),
        Commands::Includes { unit, main_file } => {
            includes::run(store, unit.as_deref(), main_file.as_deref(), json)
        }
        Commands::Records { unit } => records::run(store, &unit, json),
        Commands::Occurrences {
            record,
            usr,
            line_start,
            line_count,
        } => {
            let lines = line_start.zip(line_count);
            occurrences::run(store, &record, usr.as_deref(), lines, json)
        }
        Commands::Stale { unit, only_stale } => stale::run(store, unit.as_deref(), only_stale, json),
    }
}

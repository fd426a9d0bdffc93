mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// dosprobe -- automation harness tooling for emulated DOS programs.
#[derive(Parser, Debug)]
#[command(name = "dosprobe", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate stroke tokens into the key codes they would type
    Keys {
        /// Tokens such as `:NEWGAME`, `enter`, `esc`
        #[arg(required = true, allow_hyphen_values = true)]
        strokes: Vec<String>,
    },

    /// Watch-image fixture subcommands
    Fixture {
        #[command(subcommand)]
        action: FixtureCommands,
    },

    /// Persistent file store subcommands
    Store {
        #[command(subcommand)]
        action: StoreCommands,
    },

    /// Configuration subcommands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum FixtureCommands {
    /// Decode a fixture and check its image against its region
    Check {
        /// Path to the fixture JSON file
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum StoreCommands {
    /// List every path in the store
    Ls {
        /// Store file (defaults to the configured store_path)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Print a file's contents to stdout or write them to --out
    Get {
        /// Virtual path, e.g. /game/SAVE.DAT
        path: String,

        #[arg(long)]
        store: Option<PathBuf>,

        /// Write contents here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Store a local file under a virtual path
    Put {
        /// Virtual path to store under
        path: String,

        /// Local file to read
        file: PathBuf,

        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Remove a path from the store
    Rm {
        path: String,

        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where each value came from
    Show,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing with env filter (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keys { strokes } => commands::keys::run(&strokes),
        Commands::Fixture { action } => match action {
            FixtureCommands::Check { path } => commands::fixture::check(&path),
        },
        Commands::Store { action } => match action {
            StoreCommands::Ls { store } => commands::store::ls(store),
            StoreCommands::Get { path, store, out } => {
                commands::store::get(&path, store, out.as_deref())
            }
            StoreCommands::Put { path, file, store } => commands::store::put(&path, &file, store),
            StoreCommands::Rm { path, store } => commands::store::rm(&path, store),
        },
        Commands::Config { action } => match action {
            ConfigCommands::Show => commands::config::show(),
        },
    }
}

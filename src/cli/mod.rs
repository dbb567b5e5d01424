use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage::{self, KeyValueStore};

pub mod commands;
mod prompt;

use self::commands::{CommandContext, EntryArgs, InfoArgs};

#[derive(Parser, Debug)]
#[command(
    name = "rantbox",
    version,
    about = "Tell us what's broken: collect your details and rants, then send them in"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over RANTBOX_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over RANTBOX_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk through the whole flow interactively (default)
    Start,
    /// Save your contact details
    Info(InfoArgs),
    /// Write one entry into the saved draft
    Entry(EntryArgs),
    /// Send the saved draft to the webhook
    Submit,
    /// Show what is currently saved
    Status,
    /// Forget saved contact details and draft entries
    Reset,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = ConfigLoader::discover()?.load_or_init()?;
    let storage = storage::init(&config.storage)?;
    tracing::debug!(db = %storage.database_path().display(), "local store ready");

    let store: Arc<dyn KeyValueStore> = Arc::new(storage.clone());
    let ctx = CommandContext::new(Arc::new(config), store);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;

    let command = cli.command.unwrap_or(Commands::Start);
    match command {
        Commands::Start => runtime.block_on(commands::start(&ctx)),
        Commands::Info(args) => commands::save_info(&ctx, args),
        Commands::Entry(args) => runtime.block_on(commands::write_entry(&ctx, args)),
        Commands::Submit => runtime.block_on(commands::submit(&ctx)),
        Commands::Status => commands::status(&ctx, &storage),
        Commands::Reset => commands::reset(&ctx),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}

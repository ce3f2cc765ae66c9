pub mod host_path;
pub mod output;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use host_path::to_host_path;
use output::{client_line, time_entry_line};
use tracing::{info, level_filters::LevelFilter};

use crate::{
    host::{
        args::{HostArgs, StoreArgs},
        integration::shortcut::{create_shortcut, DesktopShortcutWriter, ShortcutSpec},
        start_host,
        storage::{
            document_storage::JsonDocumentStorage,
            entities::{Clients, RecordId, TimeEntries},
            store::Store,
        },
    },
    utils::{
        dir::application_dir,
        logging::{enable_logging, CLI_PREFIX, HOST_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "legal-time-tracker", version, long_about = None)]
#[command(about = "Time tracking for legal professionals", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Run the host directly in current console. Requests are read from stdin unless a front-end is given"
    )]
    Serve {
        #[command(flatten)]
        host: HostArgs,
    },
    #[command(about = "List stored clients")]
    Clients {
        #[command(flatten)]
        store: StoreArgs,
    },
    #[command(about = "List stored time entries")]
    Entries {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long, help = "Only show entries of this client")]
        client: Option<String>,
    },
    #[command(about = "Create a desktop shortcut that starts the host")]
    Shortcut {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long, help = "Icon used for the shortcut")]
        icon: Option<PathBuf>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    match args.commands {
        Commands::Serve { host } => {
            let app_dir = application_dir(host.store.dir.as_deref())?;
            enable_logging(
                HOST_PREFIX,
                &app_dir.join("logs"),
                host.log.or(logging_level),
                host.log_console || args.log,
            )?;
            start_host(host, app_dir).await
        }
        Commands::Clients { store } => {
            let app_dir = application_dir(store.dir.as_deref())?;
            enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;
            let store = open_store(&app_dir, &store.store_name).await?;
            for client in store.get::<Clients>() {
                println!("{}", client_line(client));
            }
            Ok(())
        }
        Commands::Entries { store, client } => {
            let app_dir = application_dir(store.dir.as_deref())?;
            enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;
            let store = open_store(&app_dir, &store.store_name).await?;
            let client = client.map(RecordId::from);
            for entry in store.get::<TimeEntries>().iter().filter(|entry| {
                client
                    .as_ref()
                    .map_or(true, |client_id| entry.belongs_to(client_id))
            }) {
                println!("{}", time_entry_line(entry));
            }
            Ok(())
        }
        Commands::Shortcut { store, icon } => {
            let app_dir = application_dir(store.dir.as_deref())?;
            enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;
            let cli = std::env::current_exe().context("Can't locate the cli executable")?;
            let spec = ShortcutSpec::new(to_host_path(cli), store.to_host_args(), icon);
            let outcome = create_shortcut(&DesktopShortcutWriter::new(), &spec);
            match outcome.path {
                Some(path) if outcome.success => {
                    info!("Shortcut created at {path:?}");
                    println!("{}", path.display());
                    Ok(())
                }
                _ => bail!("Failed to create desktop shortcut: {:?}", outcome.status),
            }
        }
    }
}

async fn open_store(app_dir: &Path, store_name: &str) -> Result<Store<JsonDocumentStorage>> {
    let storage = JsonDocumentStorage::new(app_dir, store_name)?;
    info!("Reading store {:?}", storage.path());
    Store::open(storage).await
}

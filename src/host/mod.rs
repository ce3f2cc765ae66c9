use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ipc::{
    router::{Capabilities, Router},
    server::IpcServer,
    HostEvent,
};
use integration::{
    shortcut::{DesktopShortcutWriter, ShortcutSpec},
    tray::{forward_tray_actions, install_tray, platform_tray, TrayMenu},
};
use repository::Repository;
use storage::document_storage::JsonDocumentStorage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::utils::clock::{Clock, DefaultClock};

pub mod args;
pub mod frontend;
pub mod integration;
pub mod ipc;
pub mod repository;
pub mod shutdown;
pub mod storage;

/// Represents the starting point for the host
pub async fn start_host(args: args::HostArgs, app_dir: PathBuf) -> Result<()> {
    let shutdown_token = CancellationToken::new();
    let (event_sender, event_receiver) = mpsc::unbounded_channel::<HostEvent>();

    let exe = std::env::current_exe().context("Can't locate the host executable")?;
    let frontend_config = args.frontend_config();
    event_sender.send(frontend_config.load_event(exe.parent()))?;

    let tray = install_tray(platform_tray(), &TrayMenu::default());

    let capabilities = Capabilities {
        tray: tray.status.clone(),
        shortcut_writer: Box::new(DesktopShortcutWriter::new()),
        shortcut: ShortcutSpec::new(exe, args.store.to_host_args(), args.icon.clone()),
    };
    let server = create_server(
        &app_dir,
        &args.store.store_name,
        capabilities,
        &shutdown_token,
        DefaultClock,
    )
    .await?;

    let connection = frontend::connect(&frontend_config)?;

    let (_, _, serve_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        forward_tray_actions(tray.actions, event_sender, shutdown_token.clone()),
        server.run(connection.input, connection.output, event_receiver),
    );

    if let Err(e) = serve_result {
        error!("Front-end channel closed with an error {:?}", e);
    }

    frontend::stop(connection.child).await?;

    info!("Host stopped");
    Ok(())
}

async fn create_server(
    app_dir: &Path,
    store_name: &str,
    capabilities: Capabilities,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> Result<IpcServer<JsonDocumentStorage>> {
    let storage = JsonDocumentStorage::new(app_dir, store_name)?;
    let repository = Repository::open(storage, Box::new(clock)).await?;
    Ok(IpcServer::new(
        Router::new(repository, capabilities),
        shutdown_token.clone(),
    ))
}

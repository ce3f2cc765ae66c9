// This runs the host on windows without creating a console. Disable during development to see
// stderr.
#![windows_subsystem = "windows"]

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use legal_time_tracker::{
    host::{args::HostArgs, start_host},
    utils::{
        dir::application_dir,
        logging::{enable_logging, HOST_PREFIX},
        runtime::single_thread_runtime,
    },
};
use tracing::error;

fn main() -> Result<()> {
    run(HostArgs::parse())
}

fn run(args: HostArgs) -> Result<()> {
    let app_dir = application_dir(args.store.dir.as_deref())?;
    enable_logging(HOST_PREFIX, &app_dir.join("logs"), args.log, args.log_console)?;

    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(async move { start_host(args, app_dir).await });
    // Reading stdin happens on a blocking thread that can't be interrupted.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result.inspect_err(|e| error!("Host failed {e:?}"))
}

use std::time::Duration;

use anyhow::Result;
use legal_time_tracker::cli::run_cli;
use tracing::error;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run_cli());
    // `serve` may leave a blocking stdin read behind.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result.inspect_err(|e| {
        error!("Error running cli {e:?}");
    })
}

use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Waits for ctrl-c or for another part of the host to request shutdown, whichever comes first.
///
/// On Windows a host started without a console can't receive ctrl-c, there the front-end closing
/// its channel or the tray's quit item are the only ways out.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received ctrl-c");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}

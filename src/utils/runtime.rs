use anyhow::Result;

/// Every store operation runs on one thread, see [crate::host::ipc::server::IpcServer].
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

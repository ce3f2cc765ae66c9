use std::path::PathBuf;

pub const HOST_EXECUTABLE_NAME: &str = "legal-time-tracker-host";

/// The host binary is installed next to the cli.
pub fn to_host_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name(HOST_EXECUTABLE_NAME);
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

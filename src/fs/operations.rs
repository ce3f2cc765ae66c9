use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, File},
    io::{self, AsyncWriteExt},
};

/// Returns `path` with `suffix` appended to its file name, e.g. `data.json` -> `data.json.tmp`.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|v| v.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(suffix);
    path.with_file_name(name)
}

/// Replaces the contents of `path` in a way that never leaves a half-written file behind.
/// Data is written into a temporary sibling first, synced and then renamed over the target.
pub async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let temporary = sibling_path(path, ".tmp");

    let mut file = File::create(&temporary).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = fs::rename(&temporary, path).await {
        let _ = fs::remove_file(&temporary).await;
        return Err(e);
    }
    Ok(())
}

/// Reads the whole file. A missing file is not an error.
pub async fn read_to_string_if_exists(path: &Path) -> Result<Option<String>, io::Error> {
    match fs::read_to_string(path).await {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Moves a file out of the way. Earlier backups are kept: the first one is `<file><suffix>`,
/// later ones get a counter, `<file><suffix>.1`, `<file><suffix>.2` and so on.
pub async fn move_aside(path: &Path, suffix: &str) -> Result<PathBuf, io::Error> {
    let mut backup = sibling_path(path, suffix);
    let mut counter = 0u32;
    while fs::try_exists(&backup).await? {
        counter += 1;
        backup = sibling_path(path, &format!("{suffix}.{counter}"));
    }
    fs::rename(path, &backup).await?;
    Ok(backup)
}

use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

pub const APPLICATION_DIR_NAME: &str = "legal-time-tracker";

/// Directory holding the store and the logs. Created if it doesn't exist yet.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path = PathBuf::from(
                env::var("APPDATA").map_err(|_| anyhow!("APPDATA should be present on Windows"))?,
            );
            path.push(APPLICATION_DIR_NAME);
            path
        }
        #[cfg(target_os = "macos")]
        {
            let mut path = env::var("HOME")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("Couldn't find HOME"))?;
            path.push("Library/Application Support");
            path.push(APPLICATION_DIR_NAME);
            path
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
            path.push(APPLICATION_DIR_NAME);
            path
        }
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Location of the user's desktop. The directory is not required to exist.
pub fn desktop_path() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        env::var("USERPROFILE")
            .ok()
            .map(|profile| PathBuf::from(profile).join("Desktop"))
    }
    #[cfg(not(windows))]
    {
        env::var("XDG_DESKTOP_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join("Desktop"))
            })
    }
}

/// The directory given on the command line, or the default one. Created if missing.
pub fn application_dir(dir: Option<&Path>) -> Result<PathBuf> {
    let Some(dir) = dir else {
        return create_application_default_path();
    };
    std::fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Context, Result};
use tokio::{
    io::{AsyncBufRead, AsyncWrite, BufReader},
    process::{Child, Command},
};
use tracing::{info, warn};

use super::{integration::APPLICATION_NAME, ipc::HostEvent};

pub const DEVELOPMENT_SERVER_URL: &str = "http://localhost:3000";
pub const WINDOW_WIDTH: u32 = 1200;
pub const WINDOW_HEIGHT: u32 = 800;

/// How the window gets created and what it shows.
#[derive(Debug, Clone, Default)]
pub struct FrontendConfig {
    /// Front-end executable. Without it the host talks to whoever started it through stdio.
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
    pub start_url: Option<String>,
    pub dev_tools: bool,
}

impl FrontendConfig {
    /// Explicit url first, then the bundled build next to the executable, then the development
    /// server.
    pub fn resolve_start_url(&self, resources_dir: Option<&Path>) -> String {
        if let Some(url) = self.start_url.as_ref().filter(|v| !v.is_empty()) {
            return url.clone();
        }
        let bundled = resources_dir.map(|dir| dir.join("build").join("index.html"));
        match bundled {
            Some(index) if index.is_file() => file_url(&index),
            Some(index) => {
                warn!("No bundled front-end at {index:?}, falling back to development server");
                DEVELOPMENT_SERVER_URL.into()
            }
            None => DEVELOPMENT_SERVER_URL.into(),
        }
    }

    pub fn load_event(&self, resources_dir: Option<&Path>) -> HostEvent {
        HostEvent::Load {
            url: self.resolve_start_url(resources_dir),
            title: APPLICATION_NAME.into(),
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            dev_tools: self.dev_tools,
        }
    }
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

/// Both ends of the channel to the front-end.
pub struct FrontendConnection {
    pub input: Box<dyn AsyncBufRead + Unpin + Send>,
    pub output: Box<dyn AsyncWrite + Unpin + Send>,
    pub child: Option<Child>,
}

/// Stops a front-end started by the host if it is still running.
pub async fn stop(child: Option<Child>) -> Result<()> {
    let Some(mut child) = child else {
        return Ok(());
    };
    if child.try_wait()?.is_none() {
        info!("Stopping front-end");
        child.kill().await?;
    }
    Ok(())
}

/// Spawns the configured front-end with piped stdio, or attaches to the host's own stdio.
pub fn connect(config: &FrontendConfig) -> Result<FrontendConnection> {
    let Some(program) = &config.program else {
        info!("Serving front-end over stdio");
        return Ok(FrontendConnection {
            input: Box::new(BufReader::new(tokio::io::stdin())),
            output: Box::new(tokio::io::stdout()),
            child: None,
        });
    };

    info!("Starting front-end {program:?}");
    let mut child = Command::new(program)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start front-end {program:?}"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("Front-end stdout is not piped"))?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("Front-end stdin is not piped"))?;

    Ok(FrontendConnection {
        input: Box::new(BufReader::new(stdout)),
        output: Box::new(stdin),
        child: Some(child),
    })
}

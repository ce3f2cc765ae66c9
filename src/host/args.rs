use std::path::PathBuf;

use clap::{Args, Parser};
use tracing::level_filters::LevelFilter;

use super::{frontend::FrontendConfig, storage::document_storage::DEFAULT_STORE_NAME};

/// Where the store lives.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(
        long,
        help = "Application directory. By default $XDG_STATE_HOME/legal-time-tracker or $HOME/.local/state/legal-time-tracker"
    )]
    pub dir: Option<PathBuf>,
    #[arg(long = "store-name", default_value = DEFAULT_STORE_NAME, help = "File name of the store without extension")]
    pub store_name: String,
}

impl StoreArgs {
    /// Arguments that make another host instance open the same store. Empty for the default one.
    pub fn to_host_args(&self) -> Vec<String> {
        let mut args = vec![];
        if let Some(dir) = &self.dir {
            args.push("--dir".into());
            args.push(dir.to_string_lossy().into_owned());
        }
        if self.store_name != DEFAULT_STORE_NAME {
            args.push("--store-name".into());
            args.push(self.store_name.clone());
        }
        args
    }
}

#[derive(Parser, Debug, Clone)]
pub struct HostArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    #[arg(long, help = "Front-end executable to start. Without it requests are read from stdin")]
    pub frontend: Option<PathBuf>,
    #[arg(
        long = "frontend-arg",
        allow_hyphen_values = true,
        help = "Argument passed to the front-end, can be repeated"
    )]
    pub frontend_args: Vec<String>,
    #[arg(long = "start-url", env = "LEGAL_TIME_TRACKER_START_URL")]
    pub start_url: Option<String>,
    #[arg(long = "dev-tools", env = "LEGAL_TIME_TRACKER_DEV_TOOLS")]
    pub dev_tools: bool,
    #[arg(long, help = "Icon used for the desktop shortcut")]
    pub icon: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

impl HostArgs {
    pub fn frontend_config(&self) -> FrontendConfig {
        FrontendConfig {
            program: self.frontend.clone(),
            args: self.frontend_args.clone(),
            start_url: self.start_url.clone(),
            dev_tools: self.dev_tools,
        }
    }
}

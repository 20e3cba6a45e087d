use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::api::{DEFAULT_API_URL, TaskClient};

mod api;
mod prompt;
mod ui;

#[derive(Debug, Parser)]
#[command(name = "taskboard-tui", version, about = "Terminal client for the taskboard API")]
struct Args {
    #[arg(long, env = "TASKBOARD_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Defaults to taskboard/taskboard-tui.log under the platform state directory.
    #[arg(long, env = "TASKBOARD_TUI_LOG")]
    log_file: Option<PathBuf>,
}

fn default_log_file() -> anyhow::Result<PathBuf> {
    let state_dir = dirs::state_dir()
        .or_else(dirs::config_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    Ok(state_dir.join("taskboard").join("taskboard-tui.log"))
}

/// The terminal belongs to the UI, so logs always go to a file.
fn init_logging(log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match log_file {
        Some(path) => path,
        None => default_log_file()?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file)?;

    let client = TaskClient::new(args.api_url);
    ui::run_app(client).await?;

    Ok(())
}

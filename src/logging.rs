use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogMode;

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(log_mode: &LogMode) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    match log_mode {
        LogMode::Console => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .try_init()?;
        }
        LogMode::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_mode_creates_the_log_directory() {
        let root = std::env::temp_dir().join(format!("taskboard-logging-{}", std::process::id()));
        let path = root.join("logs").join("access.log");

        init_logging(&LogMode::File(path.clone())).expect("init file logging");
        tracing::info!("file logging ready");

        assert!(path.is_file());
        assert!(init_logging(&LogMode::Console).is_err());

        fs::remove_dir_all(&root).expect("cleanup");
    }
}

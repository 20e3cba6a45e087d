use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
        }
    }

    /// Internal error messages only reach clients in development.
    pub fn exposes_error_details(self) -> bool {
        self == RunMode::Development
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
    Console,
    /// JSON lines appended to the given file.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    AllowAll,
    Origins(Vec<String>),
}

/// Per-client request budgets. Mutating requests draw from both budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
    pub max_mutations: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
            max_mutations: 50,
        }
    }
}

pub const DEFAULT_SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub mode: RunMode,
    pub rate_limit: Option<RateLimitPolicy>,
    pub log_mode: LogMode,
    pub cors_policy: CorsPolicy,
    pub slow_request_threshold: Duration,
}

impl ServerOptions {
    pub fn development() -> Self {
        Self {
            mode: RunMode::Development,
            rate_limit: Some(RateLimitPolicy::default()),
            log_mode: LogMode::Console,
            cors_policy: CorsPolicy::AllowAll,
            slow_request_threshold: DEFAULT_SLOW_REQUEST_THRESHOLD,
        }
    }

    pub fn production(log_file: impl Into<PathBuf>) -> Self {
        Self {
            mode: RunMode::Production,
            log_mode: LogMode::File(log_file.into()),
            ..Self::development()
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::development()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Console,
    File,
}

#[derive(Debug, Parser)]
#[command(name = "taskboard", version, about = "Task tracking REST API")]
pub struct Cli {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long = "env", env = "APP_ENV", value_enum, default_value = "development")]
    pub mode: RunMode,

    /// Defaults to a database under the platform state directory.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Defaults to console in development and file in production.
    #[arg(long, env = "LOG_MODE", value_enum)]
    pub log_mode: Option<LogTarget>,

    #[arg(long, env = "LOG_FILE", default_value = "logs/access.log")]
    pub log_file: PathBuf,

    /// Comma separated. Empty allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 900)]
    pub rate_limit_window_secs: u64,

    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 100)]
    pub rate_limit_max: u32,

    #[arg(long, env = "RATE_LIMIT_MUTATIONS_MAX", default_value_t = 50)]
    pub rate_limit_mutations_max: u32,

    #[arg(long, env = "DISABLE_RATE_LIMIT")]
    pub no_rate_limit: bool,

    #[arg(long, env = "SLOW_REQUEST_MS", default_value_t = 1000)]
    pub slow_request_ms: u64,
}

impl Cli {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_options(&self) -> ServerOptions {
        let log_target = self.log_mode.unwrap_or(match self.mode {
            RunMode::Development => LogTarget::Console,
            RunMode::Production => LogTarget::File,
        });
        let log_mode = match log_target {
            LogTarget::Console => LogMode::Console,
            LogTarget::File => LogMode::File(self.log_file.clone()),
        };

        let origins: Vec<String> = self
            .cors_origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        let cors_policy = if origins.is_empty() {
            CorsPolicy::AllowAll
        } else {
            CorsPolicy::Origins(origins)
        };

        let rate_limit = (!self.no_rate_limit).then(|| RateLimitPolicy {
            window: Duration::from_secs(self.rate_limit_window_secs.max(1)),
            max_requests: self.rate_limit_max,
            max_mutations: self.rate_limit_mutations_max,
        });

        ServerOptions {
            mode: self.mode,
            rate_limit,
            log_mode,
            cors_policy,
            slow_request_threshold: Duration::from_millis(self.slow_request_ms),
        }
    }
}

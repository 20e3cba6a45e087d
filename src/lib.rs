pub mod config;
pub mod error;
mod handlers;
pub mod logging;
mod middleware;
mod rate_limit;
mod routes;
pub mod server;
mod state;

pub use config::{Cli, CorsPolicy, LogMode, RateLimitPolicy, RunMode, ServerOptions};
pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;

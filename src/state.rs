use std::sync::Arc;
use std::time::Instant;

use taskboard_core::Database;

use crate::config::ServerOptions;
use crate::rate_limit::RateLimiters;

/// Everything a request handler may touch. Built once at startup and cloned
/// into each request.
#[derive(Clone)]
pub struct AppState {
    pub(crate) db: Database,
    pub(crate) options: Arc<ServerOptions>,
    pub(crate) limiters: Option<Arc<RateLimiters>>,
    pub(crate) started_at: Instant,
}

impl AppState {
    pub fn new(db: Database, options: ServerOptions) -> Self {
        let limiters = options
            .rate_limit
            .as_ref()
            .map(|policy| Arc::new(RateLimiters::new(policy)));

        Self {
            db,
            options: Arc::new(options),
            limiters,
            started_at: Instant::now(),
        }
    }
}

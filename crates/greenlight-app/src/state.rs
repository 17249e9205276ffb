use std::sync::Arc;
use std::time::Duration;

use greenlight_dal::Pool;
use greenlight_types::config::Environment;

/// Request bodies above this size are rejected unless configured otherwise.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1_048_576;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool) -> Self {
        AppState {
            state: Arc::new(AppStateInner { app_config, pool }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub version: &'static str,
    pub max_body_bytes: usize,
    pub query_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            environment: Environment::default(),
            version: env!("CARGO_PKG_VERSION"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            query_timeout: greenlight_dal::DEFAULT_QUERY_TIMEOUT,
        }
    }
}

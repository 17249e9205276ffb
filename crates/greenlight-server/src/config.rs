use std::time::Duration;

pub use clap::Parser;
use greenlight_app::state::{AppConfig, DEFAULT_MAX_BODY_BYTES};
use greenlight_types::config::{DatabaseConfig, Environment};

#[derive(Debug, Clone, clap::Parser)]
#[command(version)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 4000,
        env = "GREENLIGHT_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,

    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "GREENLIGHT_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        value_enum,
        default_value_t = Environment::Development,
        env = "GREENLIGHT_ENV",
        help = "Environment reported by the healthcheck"
    )]
    pub env: Environment,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[arg(
        long,
        env = "GREENLIGHT_QUERY_TIMEOUT",
        default_value = "3s",
        help = "Maximum duration of a single database call, in human friendly format (e.g. 3s, 500ms)",
        value_parser = humantime::parse_duration
    )]
    pub query_timeout: Duration,

    #[arg(
        long,
        env = "GREENLIGHT_MAX_BODY_BYTES",
        default_value_t = DEFAULT_MAX_BODY_BYTES,
        help = "Maximum size of a request body in bytes"
    )]
    pub max_body_bytes: usize,

    #[arg(long, env = "GREENLIGHT_CORS", help = "Enable permissive CORS")]
    pub cors: bool,

    #[arg(long, env = "GREENLIGHT_LOG_JSON", help = "Log in JSON lines")]
    pub log_json: bool,
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            environment: config.env,
            max_body_bytes: config.max_body_bytes,
            query_timeout: config.query_timeout,
            ..Default::default()
        }
    }
}

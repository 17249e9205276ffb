use std::time::Duration;

#[derive(Debug, Clone, clap::Args)]
pub struct DatabaseConfig {
    #[arg(
        long,
        env = "GREENLIGHT_DATABASE_URL",
        default_value = "sqlite://greenlight.db",
        help = "Database URL e.g. sqlite://file.db, file is created if missing"
    )]
    pub database_url: String,

    #[arg(
        long,
        env = "GREENLIGHT_DB_MAX_OPEN_CONNS",
        default_value_t = 25,
        help = "Maximum number of open connections in the pool"
    )]
    pub db_max_open_conns: u32,

    #[arg(
        long,
        env = "GREENLIGHT_DB_MIN_CONNS",
        default_value_t = 0,
        help = "Number of connections kept open even when idle"
    )]
    pub db_min_conns: u32,

    #[arg(
        long,
        env = "GREENLIGHT_DB_MAX_IDLE_TIME",
        default_value = "15m",
        help = "Idle connections are closed after this time (e.g. 15m, 1h)",
        value_parser = humantime::parse_duration
    )]
    pub db_max_idle_time: Duration,
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        DatabaseConfig {
            database_url: database_url.into(),
            db_max_open_conns: 25,
            db_min_conns: 0,
            db_max_idle_time: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

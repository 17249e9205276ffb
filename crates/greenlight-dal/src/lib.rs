pub mod error;
pub mod movie;
pub mod patch;

use std::str::FromStr as _;
use std::time::Duration;

pub use error::Error;
use greenlight_types::config::DatabaseConfig;
pub use sqlx::Error as SqlxError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

/// Upper bound for a single store call unless the repository is built with another one.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

pub async fn new_pool(config: &DatabaseConfig) -> Result<Pool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_open_conns)
        .min_connections(config.db_min_conns)
        .idle_timeout(config.db_max_idle_time)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

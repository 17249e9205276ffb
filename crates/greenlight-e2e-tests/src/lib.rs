use std::time::Duration;

use anyhow::{Result, anyhow};
use greenlight_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use tempfile::TempDir;
use tracing::debug;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(4030..5030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

/// Keeps the test database alive for the duration of a test.
pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, extra_args: &[&str]) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let database_url = format!(
        "sqlite://{}",
        tmp_data_dir.path().join("greenlight.db").to_string_lossy()
    );
    let port = random_port()?.to_string();
    let mut args = vec![
        "greenlight-e2e-tests",
        "--port",
        port.as_str(),
        "--database-url",
        database_url.as_str(),
    ];
    args.extend_from_slice(extra_args);
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub fn base_url(config: &ServerConfig) -> String {
    format!("http://{}:{}", config.listen_address, config.port)
}

/// Starts the server in the background and waits until its healthcheck answers.
pub async fn spawn_server(config: ServerConfig) -> Result<String> {
    let base_url = base_url(&config);
    tokio::spawn(async move {
        if let Err(e) = greenlight_server::run::run(config).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    let health_url = format!("{base_url}/v1/healthcheck");
    for _ in 0..50 {
        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => return Ok(base_url),
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start at {base_url}"))
}

pub async fn launch_env(test_name: &str) -> Result<(reqwest::Client, String, ConfigGuard)> {
    let (config, guard) = test_config(test_name, &[])?;
    let base_url = spawn_server(config).await?;
    Ok((reqwest::Client::new(), base_url, guard))
}

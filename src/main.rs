use dotenv::dotenv;
use remote_connector::config::{endpoint_from_env, ConnectorConfig};
use remote_connector::remote::{RedisConnector, SelectRows};
use remote_connector::{init_logging, HandleState, RemoteConnector};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();
    info!("Remote connector starting up");

    let config = ConnectorConfig::from_env()?;
    let endpoint = endpoint_from_env()?;
    info!(
        address = endpoint.address(),
        credential = ?endpoint.credential(),
        max_retries = config.connect.max_retries,
        "Configuration loaded"
    );

    let remote = RemoteConnector::new(
        RedisConnector::new(config.connection_timeout),
        endpoint,
        &config,
    );

    // Block startup until the dependency's health is known
    if remote.initialize().await != HandleState::Connected {
        warn!("Running without a client handle; reads will return no data");
    }

    let probe = SelectRows::new(&config.key_prefix, &config.health.probe_table)
        .limit(config.health.probe_limit);
    let verdict = remote.health(&probe).await;

    info!(
        operation = "startup",
        status = ?verdict.status,
        http_status = verdict.http_status(),
        "Remote connector initialized"
    );

    Ok(())
}

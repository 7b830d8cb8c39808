// src/bin/connector_cli.rs

use chrono::Utc;
use indicatif::ProgressBar;
use prettytable::{Cell, Row, Table};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::time;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use remote_connector::config::ConnectorConfig;
use remote_connector::diagnostics::diagnose;
use remote_connector::logging;
use remote_connector::remote::{Credential, Endpoint, RedisConnector, SelectRows};
use remote_connector::{FetchOutcome, HandleState, HealthStatus, RemoteConnector};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "connector_cli",
    about = "A CLI for checking and using a resilient remote data connection"
)]
struct Opt {
    /// Address of the remote service
    #[structopt(long, env = "CONNECTOR_URL", default_value = "redis://localhost:6379")]
    url: String,

    /// Credential passed through to the remote service
    #[structopt(long, env = "CONNECTOR_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,

    /// Emit logs as JSON
    #[structopt(long)]
    json_logs: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Read rows from a table
    Fetch {
        #[structopt(short, long, default_value = "messages")]
        table: String,

        /// Maximum number of rows to read
        #[structopt(short, long)]
        limit: Option<usize>,
    },

    /// Append one message row to a table
    Insert {
        #[structopt(short, long, default_value = "messages")]
        table: String,

        #[structopt(short, long)]
        content: String,
    },

    /// Run one health check and print the verdict
    Health {
        #[structopt(short, long)]
        table: Option<String>,
    },

    /// Run health checks periodically until Ctrl-C
    Watch {
        #[structopt(short, long)]
        table: Option<String>,

        /// Seconds between checks
        #[structopt(short, long, default_value = "5")]
        interval: u64,
    },

    /// Walk through DNS, TCP, client creation and a query, stopping at the first failure
    Diagnose {
        #[structopt(short, long)]
        table: Option<String>,
    },
}

type Remote = RemoteConnector<RedisConnector>;

fn init_tracing(opt: &Opt) {
    let filter = if opt.disable_logs {
        EnvFilter::new("connector_cli=error,remote_connector=error")
    } else {
        let log_level = match opt.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("connector_cli={0},remote_connector={0}", log_level))
    };

    logging::init_with(filter, opt.json_logs);
}

/// Run the client factory behind a spinner
async fn connect(remote: &Remote) -> HandleState {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Connecting to {}", remote.endpoint().address()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let state = remote.initialize().await;

    match state {
        HandleState::Connected => spinner.finish_with_message("Connected"),
        _ => spinner.finish_with_message("Connection failed, continuing without a client"),
    }
    state
}

fn print_rows(rows: &[Value]) {
    let columns: BTreeSet<String> = rows
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|object| object.keys().cloned())
        .collect();

    let mut table = Table::new();
    if columns.is_empty() {
        table.set_titles(Row::new(vec![Cell::new("value")]));
        for row in rows {
            table.add_row(Row::new(vec![Cell::new(&row.to_string())]));
        }
    } else {
        table.set_titles(Row::new(columns.iter().map(|c| Cell::new(c)).collect()));
        for row in rows {
            let cells = columns
                .iter()
                .map(|column| match row.get(column) {
                    Some(Value::String(s)) => Cell::new(s),
                    Some(other) => Cell::new(&other.to_string()),
                    None => Cell::new(""),
                })
                .collect();
            table.add_row(Row::new(cells));
        }
    }
    table.printstd();
}

async fn run_fetch(
    remote: &Remote,
    config: &ConnectorConfig,
    table: &str,
    limit: Option<usize>,
) -> i32 {
    connect(remote).await;

    let mut select = SelectRows::new(&config.key_prefix, table);
    if let Some(limit) = limit {
        select = select.limit(limit);
    }

    match remote.fetch_outcome(&select).await {
        FetchOutcome::Rows { rows, attempts } => {
            info!(
                key = select.key(),
                rows = rows.len(),
                attempts,
                "Fetched rows"
            );
            print_rows(&rows);
            0
        }
        FetchOutcome::NoHandle => {
            error!(table, "No client handle, nothing fetched");
            1
        }
        FetchOutcome::Failed(failure) => {
            error!(key = select.key(), "Fetch failed: {}", failure);
            1
        }
    }
}

async fn run_insert(remote: &Remote, config: &ConnectorConfig, table: &str, content: &str) -> i32 {
    connect(remote).await;

    let handle = match remote.handle() {
        Some(handle) => handle,
        None => {
            error!(table, "No client handle, cannot insert");
            return 1;
        }
    };

    let row = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "content": content,
        "created_at": Utc::now().to_rfc3339(),
    });

    // writes are not retried: RPUSH is not idempotent
    match handle.insert_row(&config.key_prefix, table, &row).await {
        Ok(count) => {
            info!(
                address = handle.address(),
                table,
                rows = count,
                "Inserted row"
            );
            println!("{}", row);
            0
        }
        Err(e) => {
            error!(table, error_kind = e.kind(), "Insert failed: {}", e);
            1
        }
    }
}

async fn run_health(
    remote: &Remote,
    probe: &SelectRows,
) -> Result<i32, Box<dyn std::error::Error>> {
    connect(remote).await;

    let verdict = remote.health(probe).await;
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    println!("HTTP {}", verdict.http_status());

    Ok(if verdict.is_healthy() { 0 } else { 1 })
}

async fn run_watch(
    remote: &Remote,
    probe: &SelectRows,
    interval: Duration,
) -> Result<i32, Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    connect(remote).await;

    let mut previous: Option<HealthStatus> = None;
    while running.load(Ordering::SeqCst) {
        let verdict = remote.health(probe).await;
        println!("{}", serde_json::to_string(&verdict)?);

        if previous != Some(verdict.status) {
            match verdict.status {
                HealthStatus::Healthy => info!("Remote service is now healthy"),
                HealthStatus::Degraded => warn!("Remote service is now degraded"),
            }
            previous = Some(verdict.status);
        }

        let next = Instant::now() + interval;
        while running.load(Ordering::SeqCst) && Instant::now() < next {
            time::sleep(Duration::from_millis(100)).await;
        }
    }

    info!("Watch stopped");
    Ok(0)
}

async fn run_diagnose(remote: &Remote, probe: &SelectRows) -> i32 {
    let report = diagnose(
        remote.connector(),
        remote.endpoint(),
        remote.executor(),
        probe,
    )
    .await;

    let mut table = Table::new();
    table.set_titles(Row::new(vec![
        Cell::new("step"),
        Cell::new("result"),
        Cell::new("elapsed (ms)"),
        Cell::new("detail"),
    ]));
    for step in &report.steps {
        table.add_row(Row::new(vec![
            Cell::new(step.name),
            Cell::new(if step.ok { "ok" } else { "FAILED" }),
            Cell::new(&step.elapsed_ms.to_string()),
            Cell::new(&step.detail),
        ]));
    }
    table.printstd();

    if report.passed() {
        println!("All checks passed - the remote service is reachable");
        0
    } else {
        1
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Parse command line arguments
    let opt = Opt::from_args();
    init_tracing(&opt);

    let config = ConnectorConfig::from_env()?;
    let endpoint = Endpoint::new(opt.url.clone(), opt.key.clone().map(Credential::new));
    let remote = RemoteConnector::new(
        RedisConnector::new(config.connection_timeout),
        endpoint,
        &config,
    );

    let probe_for = |table: &Option<String>| {
        let table = table.as_deref().unwrap_or(&config.health.probe_table);
        SelectRows::new(&config.key_prefix, table).limit(config.health.probe_limit)
    };

    let code = match &opt.command {
        Command::Fetch { table, limit } => run_fetch(&remote, &config, table, *limit).await,
        Command::Insert { table, content } => run_insert(&remote, &config, table, content).await,
        Command::Health { table } => run_health(&remote, &probe_for(table)).await?,
        Command::Watch { table, interval } => {
            run_watch(&remote, &probe_for(table), Duration::from_secs(*interval)).await?
        }
        Command::Diagnose { table } => run_diagnose(&remote, &probe_for(table)).await,
    };

    std::process::exit(code);
}

//! rawkv - command line driver for the raw KV client
//!
//! Runs one operation against a cluster, or `demo` to walk through all of
//! them.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rawkv::config::{LogConfig, PdConfig, ScanConfig, StoreConfig};
use rawkv::{Config, KvPair, RawClient};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "rawkv")]
#[command(about = "Raw key-value client for a range-sharded store")]
struct Args {
    /// Metadata service address (repeatable; tried in order)
    #[arg(long)]
    pd: Vec<String>,

    /// Configuration file path (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum pairs returned by one scan
    #[arg(long)]
    scan_limit: Option<u32>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value of a key
    Get { key: String },
    /// Set a key
    Put { key: String, value: String },
    /// Remove a key
    Delete { key: String },
    /// Print the pairs that exist for the given keys
    BatchGet {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Set several keys, given as key=value
    BatchPut {
        #[arg(required = true, value_parser = parse_pair)]
        pairs: Vec<(String, String)>,
    },
    /// Remove several keys
    BatchDelete {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Ascending scan of [start, end) within the region owning start
    Scan { start: String, end: String },
    /// Descending scan below start down to end, within the region owning start
    ReverseScan { start: String, end: String },
    /// Remove every key in [start, end); without end, to the end of the keyspace
    DeleteRange { start: String, end: Option<String> },
    /// Walk through every operation
    Demo,
}

fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {:?}", s)),
    }
}

/// Settings given on the command line; unset fields keep the file's values
fn overrides(args: &Args) -> Config {
    Config {
        pd: PdConfig {
            endpoints: args.pd.clone(),
            request_timeout_secs: 0,
        },
        store: StoreConfig {
            connect_timeout_ms: 0,
            request_timeout_secs: None,
        },
        scan: ScanConfig {
            limit: args.scan_limit.unwrap_or(0),
        },
        log: LogConfig {
            level: args.log_level.clone().unwrap_or_default(),
        },
    }
}

fn print_pairs(pairs: &[KvPair]) {
    for pair in pairs {
        println!("{} = {}", pair.key, pair.value);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?
    } else {
        Config::default()
    };

    config.merge(overrides(&args));

    let level = match config.log.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Metadata endpoints: {:?}", config.pd.endpoints);
    let client = RawClient::connect(config)
        .await
        .context("failed to connect to the cluster")?;

    run(&client, args.command).await
}

async fn run(client: &RawClient, command: Command) -> Result<()> {
    match command {
        Command::Get { key } => match client.get(&key).await? {
            Some(value) => println!("{}", value),
            None => bail!("key {:?} not found", key),
        },
        Command::Put { key, value } => client.put(&key, &value).await?,
        Command::Delete { key } => client.delete(&key).await?,
        Command::BatchGet { keys } => print_pairs(&client.batch_get(&keys).await?),
        Command::BatchPut { pairs } => client.batch_put(pairs).await?,
        Command::BatchDelete { keys } => client.batch_delete(&keys).await?,
        Command::Scan { start, end } => print_pairs(&client.scan(&start, &end).await?),
        Command::ReverseScan { start, end } => {
            print_pairs(&client.reverse_scan(&start, &end).await?)
        }
        Command::DeleteRange { start, end } => match end {
            Some(end) => client.delete_range(&start, &end).await?,
            None => client.delete_range_from(&start).await?,
        },
        Command::Demo => demo(client).await?,
    }
    Ok(())
}

async fn demo(client: &RawClient) -> Result<()> {
    println!("Cluster ID: {}\n", client.cluster_id());

    client.put("company", "PingCAP").await?;
    println!(
        "key \"company\" should have value: {:?}\n",
        client.get("company").await?
    );

    client.delete("company").await?;
    println!(
        "after delete, key \"company\" should have no value: {:?}\n",
        client.get("company").await?
    );

    client
        .batch_put([("company", "PingCAP"), ("fruit", "Apple"), ("baby", "Ruby")])
        .await?;
    println!("batch_get \"fruit\", \"company\" should have values:");
    print_pairs(&client.batch_get(["fruit", "company"]).await?);
    println!();

    client.batch_delete(["company", "fruit"]).await?;
    println!(
        "after batch_delete \"fruit\", \"company\" should have no values: {:?}\n",
        client.batch_get(["fruit", "company"]).await?
    );

    client
        .batch_put([
            ("cloud provider", "AWS"),
            ("company", "Apple"),
            ("framework", "Spring"),
            ("lang", "Java"),
            ("method", "Agile"),
            ("orchestration", "kubernetes"),
            ("practice", "DevOps"),
            ("runtime", "docker"),
        ])
        .await?;

    println!("scan from \"c\" to \"f\" should return all the keys beginning with \"c\":");
    print_pairs(&client.scan("c", "f").await?);
    println!();

    println!(
        "reverse_scan from \"g\" to \"c\" should return the keys beginning with \"f\" or \"c\":"
    );
    print_pairs(&client.reverse_scan("g", "c").await?);
    println!();

    println!("delete_range from \"f\" should keep only the keys beginning with \"b\" or \"c\":");
    client.delete_range_from("f").await?;
    print_pairs(&client.scan("a", "z").await?);
    println!();

    Ok(())
}

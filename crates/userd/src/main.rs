//! User lookup daemon - HTTP front end for the cached user catalog

mod handler;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};
use usercache::{CacheConfig, FetchPolicy, UserCache, UserStore, DEFAULT_SHARDS};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, env = "USERD_BIND", default_value = "127.0.0.1:3333")]
    bind: String,

    /// Number of users in the catalog (ids 1..=N)
    #[arg(short, long, env = "USERD_USERS", default_value_t = 100)]
    users: usize,

    /// Simulated store round trip in milliseconds
    #[arg(short, long, env = "USERD_LATENCY_MS", default_value_t = 3)]
    latency_ms: u64,

    /// Miss policy: independent or coalesced
    #[arg(short, long, env = "USERD_POLICY", default_value_t = FetchPolicy::Coalesced)]
    policy: FetchPolicy,

    /// Cache lock shards (1 = single lock)
    #[arg(
        short,
        long,
        env = "USERD_SHARDS",
        default_value_t = DEFAULT_SHARDS,
        value_parser = parse_shards
    )]
    shards: usize,

    /// Health check mode (for Docker)
    #[arg(long)]
    health: bool,
}

impl Args {
    fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            shards: self.shards,
            policy: self.policy,
        }
    }

    fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

fn parse_shards(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("shard count must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    // Health check
    if args.health {
        match TcpStream::connect(&args.bind).await {
            Ok(_) => {
                println!("OK");
                std::process::exit(0);
            }
            Err(_) => {
                eprintln!("FAILED");
                std::process::exit(1);
            }
        }
    }

    info!("Starting userd v{}", env!("CARGO_PKG_VERSION"));
    info!("Catalog size: {} users", args.users);
    info!("Store latency: {:?}", args.latency());
    info!("Fetch policy: {}", args.policy);
    info!("Cache shards: {}", args.shards);

    let store = Arc::new(UserStore::generate(args.users, args.latency()));
    let cache = UserCache::new(store, args.cache_config());

    let listener = TcpListener::bind(&args.bind).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, handler::router(cache.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stats = cache.stats();
    info!(
        "Server stopped: {} store fetches, {} hits, {} coalesced, {} cached",
        stats.misses(),
        stats.hits(),
        stats.coalesced(),
        cache.cache_len()
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

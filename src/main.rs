// src/main.rs
// =============================================================================
// Entry point.
//
// What happens here:
// 1. Parse command-line arguments (flags and environment) with clap
// 2. Install the tracing subscriber (stderr, so stdout carries only JSON)
// 3. Open the stores once and hand them to the crawler or the query service
// 4. Exit with a proper code (0 = success, 1 = rejected or not found,
//    2 = error)
//
// Ctrl-C during a crawl stops new roots and epochs, then waits a short grace
// period for the work already in flight before exiting.
// =============================================================================

mod cli;
mod config;
mod crawl;
mod error;
mod extract;
mod github;
mod model;
mod query;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CrawlArgs};
use config::{CrawlConfig, QueryConfig};
use crawl::Crawler;
use error::QueryError;
use github::{full_name_from_input, GitHubClient, RateLimiter};
use model::NodeRef;
use query::QueryService;
use store::{FrontierStore, GraphStore, SqliteFrontierStore, SqliteGraphStore};

// How long in-flight crawl work may run after Ctrl-C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Both stores share one database file; failing to open either is fatal
    let graph: Arc<dyn GraphStore> = Arc::new(
        SqliteGraphStore::open(&cli.db)
            .with_context(|| format!("cannot open graph store at {}", cli.db.display()))?,
    );
    let frontier: Arc<dyn FrontierStore> = Arc::new(
        SqliteFrontierStore::open(&cli.db)
            .with_context(|| format!("cannot open frontier store at {}", cli.db.display()))?,
    );

    let query_config = QueryConfig {
        max_depth: cli.max_depth,
        cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
        ..QueryConfig::default()
    };
    let service = QueryService::new(graph.clone(), frontier.clone(), query_config);

    match cli.command {
        Commands::Crawl(args) => handle_crawl(args, graph, frontier).await,
        Commands::Tree { root, depth } => answer(
            service
                .parse_depth(depth.as_deref())
                .and_then(|depth| service.tree(&node_ref(&root), depth)),
        ),
        Commands::Show { root } => answer(service.node(&node_ref(&root)).and_then(to_json)),
        Commands::Search { term } => answer(service.search(&term).and_then(to_json)),
        Commands::Page { page, limit } => answer(
            service
                .page(page.as_deref(), limit.as_deref())
                .and_then(to_json),
        ),
        Commands::Readme { id } => answer(service.readme(id).map(Option::unwrap_or_default)),
        Commands::Multi { ids } => answer(service.multi(&ids).and_then(to_json)),
    }
}

// RUST_LOG wins; otherwise info, or debug with --verbose
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Accepts an id, owner/repo, or a GitHub URL
fn node_ref(raw: &str) -> NodeRef {
    NodeRef::parse(&full_name_from_input(raw))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<String, QueryError> {
    Ok(serde_json::to_string(&value)?)
}

// Prints a query result. Bad input and unknown repositories exit with 1;
// anything else is an error.
fn answer(result: Result<String, QueryError>) -> Result<i32> {
    match result {
        Ok(body) => {
            println!("{}", body);
            Ok(0)
        }
        Err(e) if e.is_client_error() || matches!(e, QueryError::NotFound(_)) => {
            eprintln!("Error: {}", e);
            Ok(1)
        }
        Err(e) => {
            error!(severity = ?e.severity(), error = %e, "query failed");
            Err(e.into())
        }
    }
}

// Handles the 'crawl' subcommand
async fn handle_crawl(
    args: CrawlArgs,
    graph: Arc<dyn GraphStore>,
    frontier: Arc<dyn FrontierStore>,
) -> Result<i32> {
    let client = Arc::new(
        GitHubClient::new(&args.api_url, &args.token)
            .context("cannot build GitHub client")?
            .with_limiter(RateLimiter::new(args.quota_threshold)),
    );

    let config = CrawlConfig {
        search_query: args.query,
        pages: args.pages,
        workers: args.workers,
        manifest_path: args.manifest,
        fetch_readme: args.readme,
        max_nodes_per_root: args.max_nodes,
        cooldown: Duration::from_secs(args.cooldown_secs),
        ..CrawlConfig::default()
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    let crawler = Crawler::new(client.clone(), graph.clone(), frontier, config)
        .context("cannot build dependency pattern")?
        .with_shutdown(stop_rx);

    info!(
        pages = args.pages,
        workers = args.workers,
        once = args.once,
        "crawler starting"
    );

    let crawl = crawler.run(args.once);
    tokio::pin!(crawl);

    let mut exit_code = 0;
    let epochs = tokio::select! {
        epochs = &mut crawl => epochs,
        _ = tokio::signal::ctrl_c() => {
            info!(grace_secs = SHUTDOWN_GRACE.as_secs(), "interrupt received, finishing in-flight work");
            let _ = stop_tx.send(true);
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut crawl).await {
                Ok(epochs) => epochs,
                Err(_) => {
                    warn!("grace period elapsed, abandoning in-flight work");
                    exit_code = 1;
                    0
                }
            }
        }
    };

    let quota = client.limiter().snapshot().await;
    info!(
        epochs,
        requests = client.requests_made(),
        quota_remaining = ?quota.remaining,
        repos = graph.repo_count()?,
        edges = graph.module_count()?,
        "crawler stopped"
    );

    Ok(exit_code)
}

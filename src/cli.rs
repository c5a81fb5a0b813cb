// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// Every knob can also come from the environment (the `env = ...` attributes),
// so the crawler can run from a service unit or container without a long
// command line. Flags win over environment variables.
//
// Subcommands:
// - crawl:  discover seeds and build the graph (needs a GitHub token)
// - tree:   dependency tree of one repository, depth-bounded and cached
// - show:   a single repository
// - search: repositories matching a term
// - page:   ranked listing, most starred first
// - readme: stored README of a repository
// - multi:  several repositories by id
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "modgraph",
    version,
    about = "Crawl GitHub for Go module dependencies and query the resulting graph",
    long_about = "modgraph discovers repositories through GitHub search, follows the module \
                  paths declared in their go.mod files breadth-first, and stores the \
                  dependency graph in SQLite. The query subcommands read that graph back \
                  as JSON on stdout."
)]
pub struct Cli {
    /// SQLite database holding the graph, the seeds and the query cache
    #[arg(long, global = true, env = "MODGRAPH_DB", default_value = "modgraph.sqlite3")]
    pub db: PathBuf,

    /// Log at debug level (RUST_LOG overrides this)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Deepest tree a query may request; deeper requests are clamped
    #[arg(long, global = true, env = "MODGRAPH_MAX_DEPTH", default_value_t = 5)]
    pub max_depth: usize,

    /// How long a computed tree is served from the cache
    #[arg(long, global = true, env = "MODGRAPH_CACHE_TTL_SECS", default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl GitHub and build the dependency graph
    ///
    /// Example: GITHUB_ACCESS_TOKEN=... modgraph crawl --once --readme
    Crawl(CrawlArgs),

    /// Print the dependency tree of a repository
    ///
    /// Example: modgraph tree sirupsen/logrus --depth 2
    Tree {
        /// Repository id, owner/repo, or GitHub URL
        root: String,

        /// Levels to expand: a positive number or "max" (default: 1)
        #[arg(long)]
        depth: Option<String>,
    },

    /// Print a single repository
    Show {
        /// Repository id, owner/repo, or GitHub URL
        root: String,
    },

    /// Search names and descriptions (case-insensitive)
    Search { term: String },

    /// Print one page of the ranked listing
    Page {
        /// 1-based page number (default: 1)
        #[arg(long)]
        page: Option<String>,

        /// Items per page (default: 10, at most 100)
        #[arg(long)]
        limit: Option<String>,
    },

    /// Print the stored README (rendered HTML) of a repository
    Readme { id: i64 },

    /// Print several repositories by id
    ///
    /// Example: modgraph multi 1,2,3
    Multi { ids: String },
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// GitHub access token
    #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// GitHub API base URL (GitHub Enterprise installs use their own)
    #[arg(long, env = "GITHUB_API_URL", default_value = crate::config::DEFAULT_API_URL)]
    pub api_url: String,

    /// Repository search used to find seeds
    #[arg(long, default_value = crate::config::DEFAULT_SEARCH_QUERY)]
    pub query: String,

    /// Search result pages fetched per epoch (100 results each)
    #[arg(long, default_value_t = 10)]
    pub pages: u32,

    /// Seeds crawled at the same time
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Manifest file read from each repository
    #[arg(long, default_value = "go.mod")]
    pub manifest: String,

    /// Also fetch and store every repository's README
    #[arg(long)]
    pub readme: bool,

    /// Stop expanding a seed after this many repositories
    #[arg(long, default_value_t = 5000)]
    pub max_nodes: usize,

    /// Pause between crawl epochs
    #[arg(long, default_value_t = 6 * 60 * 60)]
    pub cooldown_secs: u64,

    /// Wait for the quota reset once this few requests remain
    #[arg(long, default_value_t = 3)]
    pub quota_threshold: u64,

    /// Run a single epoch and exit
    #[arg(long)]
    pub once: bool,
}

// src/config.rs
// =============================================================================
// Runtime knobs for the crawler and the query service.
//
// The CLI (src/cli.rs) fills these from flags and environment variables;
// tests build them with Default and override single fields.
// =============================================================================

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

// Default seed search: Go packages mentioned in READMEs, most starred first
pub const DEFAULT_SEARCH_QUERY: &str = "go package in:readme language:go";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Free-text search used to discover seed repositories.
    pub search_query: String,
    /// How many search pages to fetch per epoch (fetched concurrently).
    pub pages: u32,
    pub per_page: u32,
    /// Crawl roots explored at the same time.
    pub workers: usize,
    /// Manifest path inside each repository.
    pub manifest_path: String,
    /// Host whose module paths count as dependencies.
    pub module_host: String,
    /// Fetch rendered README text for every visited node.
    pub fetch_readme: bool,
    /// Upper bound on nodes visited from a single root.
    pub max_nodes_per_root: usize,
    /// Sleep between epochs.
    pub cooldown: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        CrawlConfig {
            search_query: DEFAULT_SEARCH_QUERY.to_string(),
            pages: 10,
            per_page: 100,
            workers: 1,
            manifest_path: "go.mod".to_string(),
            module_host: "github.com".to_string(),
            fetch_readme: false,
            max_nodes_per_root: 5000,
            cooldown: Duration::from_secs(6 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Deepest tree a query may request; larger requests are clamped.
    pub max_depth: usize,
    pub cache_ttl: Duration,
    pub search_limit: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            max_depth: 5,
            cache_ttl: Duration::from_secs(60 * 60),
            search_limit: 50,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

// src/crawl/mod.rs
// =============================================================================
// The crawler: turns GitHub search results into a persisted dependency graph.
//
// One epoch:
// 1. Fetch the seed search pages concurrently and store every hit in the
//    frontier store (seeds.rs)
// 2. Breadth-first crawl from every seed, a fixed number of roots at a time
//    (queue.rs)
// 3. Sleep for the cooldown, then start over
//
// Client and stores are built once by the caller and injected here. Nothing
// in this module is fatal to the process: failures are logged per item or
// per root and the epoch keeps going.
// =============================================================================

mod queue;
mod seeds;

#[cfg(test)]
mod fake;

pub use queue::RootReport;
pub use seeds::SeedReport;

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::CrawlConfig;
use crate::error::Severity;
use crate::extract::ManifestScanner;
use crate::github::RepoSource;
use crate::store::{FrontierStore, GraphStore};

// Keyword of go.mod's self-declaration line
const DECLARATION_KEYWORD: &str = "module";

#[derive(Debug, Default)]
pub struct EpochReport {
    pub seeds: SeedReport,
    pub roots: Vec<RootReport>,
    pub requests_made: u64,
}

impl EpochReport {
    pub fn nodes_visited(&self) -> usize {
        self.roots.iter().map(|r| r.visited).sum()
    }

    pub fn edges_added(&self) -> usize {
        self.roots.iter().map(|r| r.edges_added).sum()
    }
}

pub struct Crawler {
    source: Arc<dyn RepoSource>,
    graph: Arc<dyn GraphStore>,
    frontier: Arc<dyn FrontierStore>,
    scanner: ManifestScanner,
    config: CrawlConfig,
    shutdown: watch::Receiver<bool>,
}

impl Crawler {
    pub fn new(
        source: Arc<dyn RepoSource>,
        graph: Arc<dyn GraphStore>,
        frontier: Arc<dyn FrontierStore>,
        config: CrawlConfig,
    ) -> Result<Self, regex::Error> {
        let scanner = ManifestScanner::new(&config.module_host, DECLARATION_KEYWORD)?;
        // Nobody holds the sender, so this never flips to true
        let (_, shutdown) = watch::channel(false);
        Ok(Crawler {
            source,
            graph,
            frontier,
            scanner,
            config,
            shutdown,
        })
    }

    /// Stops new roots and epochs once `shutdown` becomes true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    // Runs epochs until shutdown (or once). Returns completed epochs.
    pub async fn run(&self, once: bool) -> u64 {
        let mut epochs = 0;

        loop {
            if self.stopping() {
                break;
            }

            info!(epoch = epochs + 1, "starting crawl epoch");
            let report = self.run_epoch().await;
            epochs += 1;
            info!(
                epoch = epochs,
                seeds = report.seeds.stored,
                roots = report.roots.len(),
                nodes = report.nodes_visited(),
                edges = report.edges_added(),
                requests = report.requests_made,
                "crawl epoch done"
            );

            if once || self.stopping() {
                break;
            }

            info!(cooldown_secs = self.config.cooldown.as_secs(), "cooling down");
            if !self.cooldown(self.config.cooldown).await {
                info!("shutdown requested during cooldown");
                break;
            }
        }

        epochs
    }

    pub async fn run_epoch(&self) -> EpochReport {
        let seeds = self.fetch_seeds().await;

        let keys = match self.frontier.seed_keys() {
            Ok(keys) => keys,
            Err(e) => {
                error!(error = %e, "cannot list seeds, skipping crawl");
                Vec::new()
            }
        };

        let roots: Vec<RootReport> = stream::iter(keys)
            .map(|key| async move { self.crawl_seed(&key).await })
            .buffer_unordered(self.config.workers.max(1))
            .filter_map(|report| async move { report })
            .collect()
            .await;

        EpochReport {
            seeds,
            roots,
            requests_made: self.source.requests_made(),
        }
    }

    // Crawls one stored seed; None if it was skipped or aborted
    async fn crawl_seed(&self, key: &str) -> Option<RootReport> {
        if self.stopping() {
            return None;
        }

        let root = match self.frontier.seed(key) {
            Ok(Some(root)) => root,
            Ok(None) => {
                warn!(seed = key, "seed disappeared from frontier");
                return None;
            }
            Err(e) => {
                warn!(seed = key, error = %e, "cannot read seed");
                return None;
            }
        };

        match self.crawl_root(root).await {
            Ok(report) => {
                info!(
                    root = %report.root,
                    visited = report.visited,
                    edges = report.edges_added,
                    failures = report.failures,
                    truncated = report.truncated,
                    "root done"
                );
                Some(report)
            }
            Err(e) => {
                // Losing the root loses the whole traversal
                let severity = e.severity().max(Severity::AbortRoot);
                error!(seed = key, error = %e, severity = ?severity, "root aborted");
                None
            }
        }
    }

    // Sleeps for `duration`; false if shutdown arrived first
    async fn cooldown(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = wait_for_shutdown(self.shutdown.clone()) => false,
        }
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            // Sender dropped: shutdown can no longer be requested
            std::future::pending::<()>().await;
        }
    }
}

// src/crawl/seeds.rs
// =============================================================================
// Seed discovery: run the repository search, one request per page, all pages
// at once, and store every hit in the frontier store.
//
// A failed page is logged and skipped; the seeds stored by earlier epochs
// are still crawled.
// =============================================================================

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::Crawler;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub stored: usize,
    pub failed_pages: usize,
    pub failed_writes: usize,
}

impl Crawler {
    pub async fn fetch_seeds(&self) -> SeedReport {
        let query = self.config.search_query.as_str();
        let per_page = self.config.per_page;

        let pages: Vec<_> = stream::iter(1..=self.config.pages)
            .map(|page| async move {
                let result = self.source.search_page(query, page, per_page).await;
                (page, result)
            })
            .buffer_unordered(self.config.pages.max(1) as usize)
            .collect()
            .await;

        let mut report = SeedReport::default();
        for (page, result) in pages {
            let repos = match result {
                Ok(repos) => repos,
                Err(e) => {
                    warn!(page, error = %e, "search page failed");
                    report.failed_pages += 1;
                    continue;
                }
            };

            debug!(page, hits = repos.len(), "search page fetched");
            for repo in repos {
                match self.frontier.put_seed(&repo) {
                    Ok(()) => report.stored += 1,
                    Err(e) => {
                        warn!(seed = %repo.full_name, error = %e, "cannot store seed");
                        report.failed_writes += 1;
                    }
                }
            }
        }

        report
    }
}

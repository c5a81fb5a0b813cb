// src/crawl/queue.rs
// =============================================================================
// Breadth-first crawl from one root repository.
//
// How it works:
// 1. Upsert the root and put it in the queue
// 2. Pop the front node, fetch its manifest, extract candidates
// 3. Candidates already known in this traversal are only linked; new ones are
//    resolved through GitHub, upserted once, linked, and queued at the tail
// 4. Optionally store the node's rendered README
// 5. Repeat until the queue is empty or the per-root cap is reached
//
// There is no depth bound here: the reachable component is the bound, and the
// cap (max_nodes_per_root) keeps a huge component from running forever.
//
// Every store call is its own unit of work, so a second crawl of the same
// root rewrites the same rows and adds no duplicate edges.
// =============================================================================

use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

use super::Crawler;
use crate::error::{Severity, StoreError};
use crate::extract::resolve_candidates;
use crate::model::{normalize_name, Repository};

// A node waiting to be expanded
#[derive(Debug, Clone)]
struct CrawlItem {
    id: i64,
    full_name: String,
}

// What happened while crawling one root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootReport {
    pub root: String,
    /// Nodes whose manifest was fetched and expanded.
    pub visited: usize,
    pub edges_added: usize,
    /// Item-level failures that were logged and skipped.
    pub failures: usize,
    /// The per-root node cap stopped the crawl early.
    pub truncated: bool,
    /// Shutdown was requested mid-crawl.
    pub interrupted: bool,
}

impl Crawler {
    // Crawls everything reachable from `root`. Only a failure to persist the
    // root itself (or a fatal store error) aborts; everything else is counted
    // in `failures` and skipped.
    pub async fn crawl_root(&self, root: Repository) -> Result<RootReport, StoreError> {
        let root = root.normalized();
        let root_id = self.graph.upsert_repo(&root)?;

        let mut report = RootReport {
            root: root.full_name.clone(),
            ..RootReport::default()
        };

        // Lower-cased full name -> node id, for everything seen from this root
        let mut known: HashMap<String, i64> = HashMap::new();
        known.insert(root.key(), root_id);

        let mut queue = VecDeque::new();
        queue.push_back(CrawlItem {
            id: root_id,
            full_name: root.full_name,
        });

        while let Some(item) = queue.pop_front() {
            if self.stopping() {
                report.interrupted = true;
                break;
            }

            if report.visited >= self.config.max_nodes_per_root {
                warn!(
                    root = %report.root,
                    cap = self.config.max_nodes_per_root,
                    pending = queue.len() + 1,
                    "node cap reached, truncating crawl"
                );
                report.truncated = true;
                break;
            }
            report.visited += 1;

            debug!(node = %item.full_name, queued = queue.len(), "expanding");

            let manifest = match self
                .source
                .manifest(&item.full_name, &self.config.manifest_path)
                .await
            {
                Ok(text) => text,
                Err(e) if e.is_not_found() => {
                    debug!(node = %item.full_name, "no manifest");
                    String::new()
                }
                Err(e) => {
                    warn!(
                        node = %item.full_name,
                        error = %e,
                        severity = ?e.severity(),
                        "manifest fetch failed"
                    );
                    report.failures += 1;
                    String::new()
                }
            };

            // Split candidates into already-known nodes and ones to resolve
            let mut children = Vec::new();
            let mut unresolved = Vec::new();
            for candidate in self.scanner.candidates(&manifest, &item.full_name) {
                match known.get(&normalize_name(&candidate)) {
                    Some(&id) => children.push(id),
                    None => unresolved.push(candidate),
                }
            }

            let resolved =
                resolve_candidates(self.source.as_ref(), unresolved, &item.full_name).await;

            for repo in resolved {
                // Two candidates can resolve to the same repository (renames)
                if let Some(&id) = known.get(&repo.key()) {
                    children.push(id);
                    continue;
                }

                match self.graph.upsert_repo(&repo) {
                    Ok(id) => {
                        known.insert(repo.key(), id);
                        children.push(id);
                        queue.push_back(CrawlItem {
                            id,
                            full_name: repo.full_name,
                        });
                    }
                    Err(e) => self.item_failed(&mut report, &repo.full_name, e)?,
                }
            }

            for child in children {
                if child == item.id {
                    continue;
                }
                match self.graph.add_module(item.id, child) {
                    Ok(true) => report.edges_added += 1,
                    Ok(false) => {}
                    Err(e) => self.item_failed(&mut report, &item.full_name, e)?,
                }
            }

            if self.config.fetch_readme {
                match self.source.readme(&item.full_name).await {
                    Ok(html) => {
                        if let Err(e) = self.graph.set_readme(item.id, &html) {
                            self.item_failed(&mut report, &item.full_name, e)?;
                        }
                    }
                    Err(e) if e.is_not_found() => {}
                    Err(e) => {
                        warn!(node = %item.full_name, error = %e, "readme fetch failed");
                        report.failures += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    // Counts a failed store call, or hands it back if it is fatal
    fn item_failed(
        &self,
        report: &mut RootReport,
        node: &str,
        error: StoreError,
    ) -> Result<(), StoreError> {
        if error.severity() == Severity::Fatal {
            return Err(error);
        }
        warn!(node, error = %error, "store write failed, skipping");
        report.failures += 1;
        Ok(())
    }
}

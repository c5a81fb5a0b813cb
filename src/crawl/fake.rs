// src/crawl/fake.rs
// =============================================================================
// Test doubles for crawler tests: an in-memory RepoSource that records every
// call, and a GraphStore wrapper that records every upsert.
// =============================================================================

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::{ApiError, StoreError};
use crate::github::RepoSource;
use crate::model::{RepoRow, Repository};
use crate::store::{FrontierStore, GraphStore, SqliteFrontierStore, SqliteGraphStore};

#[derive(Default)]
pub struct FakeSource {
    repos: HashMap<String, Repository>,
    manifests: HashMap<String, String>,
    readmes: HashMap<String, String>,
    seeds: Vec<String>,
    missing: HashSet<String>,
    failing_pages: HashSet<u32>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        FakeSource::default()
    }

    // A repository whose go.mod requires `deps`
    pub fn repo(mut self, name: &str, stars: i64, deps: &[&str]) -> Self {
        let mut manifest = format!("module github.com/{}\n\ngo 1.21\n\nrequire (\n", name);
        for dep in deps {
            manifest.push_str(&format!("\tgithub.com/{} v1.0.0\n", dep));
        }
        manifest.push_str(")\n");

        self.repos
            .insert(name.to_string(), Repository::named(name).with_stars(stars));
        self.manifests.insert(name.to_string(), manifest);
        self
    }

    pub fn seed(mut self, name: &str) -> Self {
        self.seeds.push(name.to_string());
        self
    }

    pub fn readme(mut self, name: &str, html: &str) -> Self {
        self.readmes.insert(name.to_string(), html.to_string());
        self
    }

    pub fn missing(mut self, name: &str) -> Self {
        self.missing.insert(name.to_string());
        self
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn repository_record(&self, name: &str) -> Repository {
        self.repos[name].clone()
    }

    pub fn calls(&self, kind: &str, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, n)| k == kind && n == name)
            .count()
    }

    fn record(&self, kind: &str, name: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((kind.to_string(), name.to_string()));
    }

    fn lookup(&self, name: &str) -> Result<&Repository, ApiError> {
        if self.missing.contains(name) {
            return Err(ApiError::NotFound(name.to_string()));
        }
        self.repos
            .get(name)
            .ok_or_else(|| ApiError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl RepoSource for FakeSource {
    async fn search_page(
        &self,
        _query: &str,
        page: u32,
        _per_page: u32,
    ) -> Result<Vec<Repository>, ApiError> {
        self.record("search", &page.to_string());
        if self.failing_pages.contains(&page) {
            return Err(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                url: format!("search page {}", page),
            });
        }
        if page != 1 {
            return Ok(Vec::new());
        }
        self.seeds
            .iter()
            .map(|name| self.lookup(name).cloned())
            .collect()
    }

    async fn repository(&self, full_name: &str) -> Result<Repository, ApiError> {
        self.record("repository", full_name);
        self.lookup(full_name).cloned()
    }

    async fn manifest(&self, full_name: &str, _path: &str) -> Result<String, ApiError> {
        self.record("manifest", full_name);
        self.lookup(full_name)?;
        self.manifests
            .get(full_name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(full_name.to_string()))
    }

    async fn readme(&self, full_name: &str) -> Result<String, ApiError> {
        self.record("readme", full_name);
        self.readmes
            .get(full_name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(full_name.to_string()))
    }

    fn requests_made(&self) -> u64 {
        self.calls.lock().unwrap().len() as u64
    }
}

pub fn memory_stores() -> (Arc<dyn GraphStore>, Arc<dyn FrontierStore>) {
    (
        Arc::new(SqliteGraphStore::open_in_memory().unwrap()),
        Arc::new(SqliteFrontierStore::open_in_memory().unwrap()),
    )
}

// The same store twice: once as the trait object the crawler takes, once
// concretely so tests can read the upsert log
pub fn counting_stores() -> (Arc<dyn GraphStore>, Arc<CountingGraph>) {
    let counting = Arc::new(CountingGraph {
        inner: SqliteGraphStore::open_in_memory().unwrap(),
        upserts: Mutex::new(Vec::new()),
    });
    (counting.clone(), counting)
}

pub struct CountingGraph {
    inner: SqliteGraphStore,
    upserts: Mutex<Vec<String>>,
}

impl CountingGraph {
    pub fn upserts_of(&self, name: &str) -> usize {
        self.upserts
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.as_str() == name)
            .count()
    }

    pub fn upsert_order(&self) -> Vec<String> {
        self.upserts.lock().unwrap().clone()
    }
}

impl GraphStore for CountingGraph {
    fn upsert_repo(&self, repo: &Repository) -> Result<i64, StoreError> {
        self.upserts.lock().unwrap().push(repo.key());
        self.inner.upsert_repo(repo)
    }

    fn add_module(&self, repo_id: i64, module_id: i64) -> Result<bool, StoreError> {
        self.inner.add_module(repo_id, module_id)
    }

    fn set_readme(&self, id: i64, readme: &str) -> Result<(), StoreError> {
        self.inner.set_readme(id, readme)
    }

    fn repo_by_id(&self, id: i64) -> Result<Option<RepoRow>, StoreError> {
        self.inner.repo_by_id(id)
    }

    fn repo_by_name(&self, full_name: &str) -> Result<Option<RepoRow>, StoreError> {
        self.inner.repo_by_name(full_name)
    }

    fn modules_of(&self, id: i64) -> Result<Vec<RepoRow>, StoreError> {
        self.inner.modules_of(id)
    }

    fn ranked_page(&self, limit: usize, offset: usize) -> Result<Vec<RepoRow>, StoreError> {
        self.inner.ranked_page(limit, offset)
    }

    fn search(&self, term: &str, limit: usize) -> Result<Vec<RepoRow>, StoreError> {
        self.inner.search(term, limit)
    }

    fn repos_by_ids(&self, ids: &[i64]) -> Result<Vec<RepoRow>, StoreError> {
        self.inner.repos_by_ids(ids)
    }

    fn readme(&self, id: i64) -> Result<Option<String>, StoreError> {
        self.inner.readme(id)
    }

    fn repo_count(&self) -> Result<u64, StoreError> {
        self.inner.repo_count()
    }

    fn module_count(&self) -> Result<u64, StoreError> {
        self.inner.module_count()
    }
}

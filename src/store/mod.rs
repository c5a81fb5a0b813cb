// src/store/mod.rs
// =============================================================================
// Persistence contracts and their SQLite implementations.
//
// The crawler and the query service only see the two traits:
// - GraphStore:    nodes + dependency edges
// - FrontierStore: the seed set, plus the look-aside query cache
//
// Every call is an independent unit of work; nothing spans transactions, so a
// crawl interrupted half-way leaves a consistent (if incomplete) graph.
// =============================================================================

mod frontier;
mod graph;
mod schema;

pub use frontier::SqliteFrontierStore;
pub use graph::SqliteGraphStore;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use crate::error::StoreError;
use crate::model::{RepoRow, Repository};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub trait GraphStore: Send + Sync {
    /// Inserts or overwrites the node keyed by `full_name`, returning its id.
    fn upsert_repo(&self, repo: &Repository) -> Result<i64, StoreError>;

    /// Records that `repo_id` depends on `module_id`. Returns false if the
    /// edge already existed.
    fn add_module(&self, repo_id: i64, module_id: i64) -> Result<bool, StoreError>;

    fn set_readme(&self, id: i64, readme: &str) -> Result<(), StoreError>;

    fn repo_by_id(&self, id: i64) -> Result<Option<RepoRow>, StoreError>;

    fn repo_by_name(&self, full_name: &str) -> Result<Option<RepoRow>, StoreError>;

    /// Direct dependencies of `id`, most starred first.
    fn modules_of(&self, id: i64) -> Result<Vec<RepoRow>, StoreError>;

    fn ranked_page(&self, limit: usize, offset: usize) -> Result<Vec<RepoRow>, StoreError>;

    /// Case-insensitive substring match on name, full name and description.
    fn search(&self, term: &str, limit: usize) -> Result<Vec<RepoRow>, StoreError>;

    fn repos_by_ids(&self, ids: &[i64]) -> Result<Vec<RepoRow>, StoreError>;

    fn readme(&self, id: i64) -> Result<Option<String>, StoreError>;

    fn repo_count(&self) -> Result<u64, StoreError>;

    fn module_count(&self) -> Result<u64, StoreError>;
}

pub trait FrontierStore: Send + Sync {
    fn put_seed(&self, repo: &Repository) -> Result<(), StoreError>;

    fn seed_keys(&self) -> Result<Vec<String>, StoreError>;

    fn seed(&self, key: &str) -> Result<Option<Repository>, StoreError>;

    /// Cached value for `key`, unless it has expired.
    fn cache_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn cache_put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}

// Opens a file-backed database, or a private in-memory one when `path` is
// None, and applies `schema`
fn open_connection(path: Option<&Path>, schema: &str) -> Result<Connection, StoreError> {
    let conn = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(StoreError::Directory)?;
            }
            Connection::open(path)
        }
        None => Connection::open_in_memory(),
    }
    .map_err(StoreError::Schema)?;

    configure_connection(&conn).map_err(StoreError::Schema)?;
    conn.execute_batch(schema).map_err(StoreError::Schema)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    register_fold_case(conn)?;
    Ok(())
}

// SQLite's lower() only folds ASCII. fold_case(x) lower-cases with Rust's
// Unicode rules, the same ones applied to search terms.
fn register_fold_case(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

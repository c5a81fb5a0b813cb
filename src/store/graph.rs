// src/store/graph.rs
// =============================================================================
// SQLite-backed GraphStore.
//
// Nodes are upserted by full_name (ON CONFLICT ... DO UPDATE ... RETURNING id)
// and edges are insert-if-absent (INSERT OR IGNORE on the pair key). The
// connection sits behind a std Mutex: every call is short and synchronous.
// =============================================================================

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::schema::{GRAPH_SQL, RANKED, REPO_COLUMNS};
use super::{open_connection, GraphStore};
use crate::error::StoreError;
use crate::model::{normalize_name, RepoRow, Repository};

pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(SqliteGraphStore {
            conn: Mutex::new(open_connection(Some(path), GRAPH_SQL)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(SqliteGraphStore {
            conn: Mutex::new(open_connection(None, GRAPH_SQL)?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn select_rows(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RepoRow>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, repo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn select_one(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<RepoRow>, StoreError> {
        let conn = self.conn()?;
        let row = conn.query_row(sql, params, repo_from_row).optional()?;
        Ok(row)
    }
}

impl GraphStore for SqliteGraphStore {
    fn upsert_repo(&self, repo: &Repository) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        // A sighting without README text keeps the stored one
        let id = conn.query_row(
            "INSERT INTO repos
                (name, full_name, html_url, description, stargazers_count, forks_count, avatar_url, readme)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(full_name) DO UPDATE SET
                name = excluded.name,
                html_url = excluded.html_url,
                description = excluded.description,
                stargazers_count = excluded.stargazers_count,
                forks_count = excluded.forks_count,
                avatar_url = excluded.avatar_url,
                readme = COALESCE(excluded.readme, repos.readme)
             RETURNING id",
            params![
                repo.name,
                normalize_name(&repo.full_name),
                repo.html_url,
                repo.description,
                repo.stargazers_count,
                repo.forks_count,
                repo.avatar_url,
                repo.readme,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn add_module(&self, repo_id: i64, module_id: i64) -> Result<bool, StoreError> {
        if repo_id == module_id {
            return Err(StoreError::SelfLoop(repo_id));
        }
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO repo_modules (repo_id, module_id) VALUES (?1, ?2)",
            params![repo_id, module_id],
        )?;
        Ok(inserted > 0)
    }

    fn set_readme(&self, id: i64, readme: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE repos SET readme = ?2 WHERE id = ?1",
            params![id, readme],
        )?;
        Ok(())
    }

    fn repo_by_id(&self, id: i64) -> Result<Option<RepoRow>, StoreError> {
        self.select_one(
            &format!("SELECT {} FROM repos r WHERE r.id = ?1", REPO_COLUMNS),
            params![id],
        )
    }

    fn repo_by_name(&self, full_name: &str) -> Result<Option<RepoRow>, StoreError> {
        self.select_one(
            &format!("SELECT {} FROM repos r WHERE r.full_name = ?1", REPO_COLUMNS),
            params![normalize_name(full_name)],
        )
    }

    fn modules_of(&self, id: i64) -> Result<Vec<RepoRow>, StoreError> {
        self.select_rows(
            &format!(
                "SELECT {} FROM repo_modules m
                 JOIN repos r ON r.id = m.module_id
                 WHERE m.repo_id = ?1
                 ORDER BY {}",
                REPO_COLUMNS, RANKED
            ),
            params![id],
        )
    }

    fn ranked_page(&self, limit: usize, offset: usize) -> Result<Vec<RepoRow>, StoreError> {
        self.select_rows(
            &format!(
                "SELECT {} FROM repos r ORDER BY {} LIMIT ?1 OFFSET ?2",
                REPO_COLUMNS, RANKED
            ),
            params![to_sql_count(limit), to_sql_count(offset)],
        )
    }

    fn search(&self, term: &str, limit: usize) -> Result<Vec<RepoRow>, StoreError> {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        self.select_rows(
            &format!(
                "SELECT {} FROM repos r
                 WHERE fold_case(r.name) LIKE ?1 ESCAPE '\\'
                    OR fold_case(r.full_name) LIKE ?1 ESCAPE '\\'
                    OR fold_case(r.description) LIKE ?1 ESCAPE '\\'
                 ORDER BY {}
                 LIMIT ?2",
                REPO_COLUMNS, RANKED
            ),
            params![pattern, to_sql_count(limit)],
        )
    }

    fn repos_by_ids(&self, ids: &[i64]) -> Result<Vec<RepoRow>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.select_rows(
            &format!(
                "SELECT {} FROM repos r WHERE r.id IN ({}) ORDER BY {}",
                REPO_COLUMNS, placeholders, RANKED
            ),
            params_from_iter(ids.iter()),
        )
    }

    fn readme(&self, id: i64) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let readme: Option<Option<String>> = conn
            .query_row("SELECT readme FROM repos WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(readme.flatten())
    }

    fn repo_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM repos", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn module_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM repo_modules", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

fn repo_from_row(row: &Row<'_>) -> rusqlite::Result<RepoRow> {
    Ok(RepoRow {
        id: row.get(0)?,
        repo: Repository {
            name: row.get(1)?,
            full_name: row.get(2)?,
            html_url: row.get(3)?,
            description: row.get(4)?,
            stargazers_count: row.get(5)?,
            forks_count: row.get(6)?,
            avatar_url: row.get(7)?,
            readme: None,
        },
    })
}

// SQLite reads a negative LIMIT/OFFSET as "none", so counts past i64::MAX
// are pinned instead of wrapped
fn to_sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// Escapes LIKE wildcards so the term matches literally
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

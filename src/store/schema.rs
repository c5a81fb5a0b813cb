// src/store/schema.rs
// =============================================================================
// SQLite tables, created on open if they don't exist yet.
//
// - repos:        one row per repository, unique on full_name
// - repo_modules: the directed many-to-many dependency relation
// - seeds:        repositories found by search, waiting to be crawled
// - query_cache:  serialized query results with an expiry time
// =============================================================================

pub const GRAPH_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    full_name TEXT NOT NULL UNIQUE,
    html_url TEXT NOT NULL DEFAULT '',
    description TEXT,
    stargazers_count INTEGER,
    forks_count INTEGER,
    avatar_url TEXT,
    readme TEXT
);

CREATE TABLE IF NOT EXISTS repo_modules (
    repo_id INTEGER NOT NULL REFERENCES repos(id),
    module_id INTEGER NOT NULL REFERENCES repos(id),
    PRIMARY KEY (repo_id, module_id),
    CHECK (repo_id <> module_id)
);

CREATE INDEX IF NOT EXISTS idx_repos_stars ON repos(stargazers_count);
CREATE INDEX IF NOT EXISTS idx_repo_modules_module ON repo_modules(module_id);
"#;

pub const FRONTIER_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS seeds (
    key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS query_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at_ms INTEGER NOT NULL
);
"#;

// Column list shared by every query that maps rows into RepoRow. Queries
// alias the repos table as `r`. readme is only read by GraphStore::readme.
pub const REPO_COLUMNS: &str =
    "r.id, r.name, r.full_name, r.html_url, r.description, r.stargazers_count, r.forks_count, r.avatar_url";

// Popularity order, unknown star counts last, ties by name
pub const RANKED: &str = "r.stargazers_count DESC NULLS LAST, r.full_name ASC";

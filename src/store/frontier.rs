// src/store/frontier.rs
// =============================================================================
// SQLite-backed FrontierStore: the seed set and the query cache.
//
// Seeds are stored as JSON keyed by the lower-cased full name, so a search
// hit seen on several pages (or several epochs) is one entry.
// Cache entries carry an absolute expiry in unix milliseconds; an entry is
// live while expires_at_ms is strictly in the future.
// =============================================================================

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::schema::FRONTIER_SQL;
use super::{open_connection, FrontierStore};
use crate::error::StoreError;
use crate::model::Repository;

pub struct SqliteFrontierStore {
    conn: Mutex<Connection>,
}

impl SqliteFrontierStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(SqliteFrontierStore {
            conn: Mutex::new(open_connection(Some(path), FRONTIER_SQL)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(SqliteFrontierStore {
            conn: Mutex::new(open_connection(None, FRONTIER_SQL)?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl FrontierStore for SqliteFrontierStore {
    fn put_seed(&self, repo: &Repository) -> Result<(), StoreError> {
        let payload = serde_json::to_string(repo)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO seeds (key, payload, updated_at_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, updated_at_ms = excluded.updated_at_ms",
            params![repo.key(), payload, now_ms()],
        )?;
        Ok(())
    }

    fn seed_keys(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached("SELECT key FROM seeds ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn seed(&self, key: &str) -> Result<Option<Repository>, StoreError> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM seeds WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    fn cache_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM query_cache WHERE key = ?1 AND expires_at_ms > ?2",
                params![key, now_ms()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn cache_put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = now_ms();
        let expires_at = now.saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64);
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM query_cache WHERE expires_at_ms <= ?1",
            params![now],
        )?;
        conn.execute(
            "INSERT INTO query_cache (key, value, expires_at_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at_ms = excluded.expires_at_ms",
            params![key, value, expires_at],
        )?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteFrontierStore {
        SqliteFrontierStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_seeds_dedupe_by_key() {
        let store = store();
        store
            .put_seed(&Repository::named("Sirupsen/Logrus").with_stars(1))
            .unwrap();
        store
            .put_seed(&Repository::named("sirupsen/logrus").with_stars(2))
            .unwrap();
        store.put_seed(&Repository::named("a/b")).unwrap();

        assert_eq!(store.seed_keys().unwrap(), vec!["a/b", "sirupsen/logrus"]);
        let seed = store.seed("sirupsen/logrus").unwrap().unwrap();
        assert_eq!(seed.stargazers_count, Some(2));
        assert!(store.seed("missing/seed").unwrap().is_none());
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let store = store();
        store
            .cache_put("tree:1:id:1", "{\"a\":1}", Duration::from_secs(60))
            .unwrap();
        assert_eq!(
            store.cache_get("tree:1:id:1").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(store.cache_get("tree:2:id:1").unwrap().is_none());
    }

    #[test]
    fn test_cache_expires() {
        let store = store();
        store.cache_put("k", "v", Duration::ZERO).unwrap();
        assert!(store.cache_get("k").unwrap().is_none());

        store.cache_put("k", "v2", Duration::from_secs(60)).unwrap();
        assert_eq!(store.cache_get("k").unwrap().as_deref(), Some("v2"));
    }
}

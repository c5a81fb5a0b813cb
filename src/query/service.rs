// src/query/service.rs
// =============================================================================
// QueryService: every read operation over the stored graph.
//
// Tree requests are cache-aside: the serialized tree is looked up under
// `tree:{depth}:{id|name}:{value}` first, and built and stored with a TTL on a
// miss. A hit is returned verbatim, so it may lag behind the graph until it
// expires. A cache that cannot be read or written is logged and skipped.
// =============================================================================

use std::sync::Arc;
use tracing::{debug, warn};

use super::tree::build_tree;
use super::{parse_depth, parse_ids, parse_positive};
use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::model::{Listing, NodeRef, RepoRow, RepoTree};
use crate::store::{FrontierStore, GraphStore};

pub struct QueryService {
    graph: Arc<dyn GraphStore>,
    cache: Arc<dyn FrontierStore>,
    config: QueryConfig,
}

impl QueryService {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        cache: Arc<dyn FrontierStore>,
        config: QueryConfig,
    ) -> Self {
        QueryService {
            graph,
            cache,
            config,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.config.max_depth.max(1)
    }

    pub fn parse_depth(&self, raw: Option<&str>) -> Result<usize, QueryError> {
        parse_depth(raw, self.max_depth())
    }

    /// Serialized dependency tree of `root`, at most `depth` levels deep.
    /// Depths above the configured maximum are clamped; 0 is rejected.
    pub fn tree(&self, root: &NodeRef, depth: usize) -> Result<String, QueryError> {
        if depth == 0 {
            return Err(QueryError::InvalidDepth(depth.to_string()));
        }
        let depth = depth.min(self.max_depth());
        let key = format!("tree:{}:{}", depth, root.cache_part());

        match self.cache.cache_get(&key) {
            Ok(Some(hit)) => {
                debug!(key = %key, "tree cache hit");
                return Ok(hit);
            }
            Ok(None) => debug!(key = %key, "tree cache miss"),
            Err(e) => warn!(key = %key, error = %e, "tree cache read failed, bypassing"),
        }

        let tree = self.build(root, depth)?;
        let json = serde_json::to_string(&tree)?;

        if let Err(e) = self.cache.cache_put(&key, &json, self.config.cache_ttl) {
            warn!(key = %key, error = %e, "tree cache write failed");
        }

        Ok(json)
    }

    // Uncached tree expansion
    pub fn build(&self, root: &NodeRef, depth: usize) -> Result<RepoTree, QueryError> {
        let row = self.node(root)?;
        Ok(build_tree(self.graph.as_ref(), row, depth)?)
    }

    pub fn node(&self, root: &NodeRef) -> Result<RepoRow, QueryError> {
        let row = match root {
            NodeRef::Id(id) => self.graph.repo_by_id(*id)?,
            NodeRef::Name(name) => self.graph.repo_by_name(name)?,
        };
        row.ok_or_else(|| QueryError::NotFound(root.to_string()))
    }

    // Ranked listing, 1-based pages
    pub fn page(
        &self,
        page: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Listing<RepoRow>, QueryError> {
        let page = parse_positive(page, 1)?;
        let limit = parse_positive(limit, self.config.default_page_size)?
            .min(self.config.max_page_size);
        let offset = (page - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| QueryError::InvalidPage(page.to_string()))?;

        Ok(self.graph.ranked_page(limit, offset)?.into())
    }

    pub fn search(&self, term: &str) -> Result<Listing<RepoRow>, QueryError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new().into());
        }
        Ok(self.graph.search(term, self.config.search_limit)?.into())
    }

    /// Rendered README of node `id`; None if it was never fetched.
    pub fn readme(&self, id: i64) -> Result<Option<String>, QueryError> {
        self.node(&NodeRef::Id(id))?;
        Ok(self.graph.readme(id)?)
    }

    pub fn multi(&self, ids: &str) -> Result<Listing<RepoRow>, QueryError> {
        let ids = parse_ids(ids)?;
        Ok(self.graph.repos_by_ids(&ids)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Repository;
    use crate::store::{SqliteFrontierStore, SqliteGraphStore};
    use std::time::Duration;

    struct Fixture {
        graph: Arc<dyn GraphStore>,
        cache: Arc<dyn FrontierStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                graph: Arc::new(SqliteGraphStore::open_in_memory().unwrap()),
                cache: Arc::new(SqliteFrontierStore::open_in_memory().unwrap()),
            }
        }

        fn node(&self, name: &str, stars: Option<i64>) -> i64 {
            let mut repo = Repository::named(name);
            repo.stargazers_count = stars;
            self.graph.upsert_repo(&repo).unwrap()
        }

        fn edge(&self, parent: i64, module: i64) {
            self.graph.add_module(parent, module).unwrap();
        }

        fn service(&self, config: QueryConfig) -> QueryService {
            QueryService::new(self.graph.clone(), self.cache.clone(), config)
        }
    }

    // foo/bar -> {bar/baz, bar/qux}, bar/baz -> deep/one
    fn scenario() -> (Fixture, i64) {
        let fx = Fixture::new();
        let root = fx.node("foo/bar", Some(10));
        let baz = fx.node("bar/baz", Some(5));
        let qux = fx.node("bar/qux", Some(7));
        let deep = fx.node("deep/one", None);
        fx.edge(root, baz);
        fx.edge(root, qux);
        fx.edge(baz, deep);
        (fx, root)
    }

    #[test]
    fn test_depth_one_tree_by_name() {
        let (fx, _) = scenario();
        let service = fx.service(QueryConfig::default());

        let json = service.tree(&NodeRef::parse("foo/bar"), 1).unwrap();
        let tree: RepoTree = serde_json::from_str(&json).unwrap();

        assert_eq!(tree.row.repo.full_name, "foo/bar");
        let names: Vec<_> = tree
            .modules
            .iter()
            .map(|m| m.row.repo.full_name.as_str())
            .collect();
        // Most starred first
        assert_eq!(names, vec!["bar/qux", "bar/baz"]);
        assert!(tree.modules.iter().all(|m| m.modules.is_empty()));
    }

    #[test]
    fn test_tree_by_id_matches_tree_by_name() {
        let (fx, root) = scenario();
        let service = fx.service(QueryConfig::default());

        let by_id = service.build(&NodeRef::Id(root), 2).unwrap();
        let by_name = service.build(&NodeRef::parse("FOO/BAR"), 2).unwrap();
        assert_eq!(by_id, by_name);
        assert_eq!(by_id.depth(), 2);
    }

    #[test]
    fn test_depth_is_clamped_to_max() {
        let fx = Fixture::new();
        let ids: Vec<i64> = (0..8).map(|i| fx.node(&format!("chain/n{}", i), None)).collect();
        for pair in ids.windows(2) {
            fx.edge(pair[0], pair[1]);
        }
        let service = fx.service(QueryConfig {
            max_depth: 5,
            ..QueryConfig::default()
        });

        let json = service.tree(&NodeRef::Id(ids[0]), 99).unwrap();
        let tree: RepoTree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree.depth(), 5);

        // The clamped request shares the cache entry of the max-depth one
        assert!(fx.cache.cache_get(&format!("tree:5:id:{}", ids[0])).unwrap().is_some());
    }

    #[test]
    fn test_zero_depth_rejected_before_lookup() {
        let fx = Fixture::new();
        let service = fx.service(QueryConfig::default());

        // An unknown root would be NotFound; the depth check comes first
        let err = service.tree(&NodeRef::parse("no/such"), 0).unwrap_err();
        assert!(matches!(err, QueryError::InvalidDepth(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unknown_root_is_not_found() {
        let fx = Fixture::new();
        let service = fx.service(QueryConfig::default());

        assert!(matches!(
            service.tree(&NodeRef::parse("ghost/repo"), 1),
            Err(QueryError::NotFound(_))
        ));
        assert!(matches!(
            service.node(&NodeRef::Id(42)),
            Err(QueryError::NotFound(_))
        ));
    }

    #[test]
    fn test_cached_tree_is_returned_verbatim() {
        let (fx, root) = scenario();
        let service = fx.service(QueryConfig::default());

        let first = service.tree(&NodeRef::Id(root), 2).unwrap();

        // The graph grows, but the cached answer stands until it expires
        let extra = fx.node("late/dep", Some(100));
        fx.edge(root, extra);
        let second = service.tree(&NodeRef::Id(root), 2).unwrap();

        assert_eq!(first, second);
        let fresh = serde_json::to_string(&service.build(&NodeRef::Id(root), 2).unwrap()).unwrap();
        assert_ne!(first, fresh);
    }

    #[test]
    fn test_cache_hit_skips_the_graph() {
        let (fx, root) = scenario();
        let service = fx.service(QueryConfig::default());
        fx.cache
            .cache_put(
                &format!("tree:1:id:{}", root),
                "{\"cached\":true}",
                Duration::from_secs(60),
            )
            .unwrap();

        assert_eq!(
            service.tree(&NodeRef::Id(root), 1).unwrap(),
            "{\"cached\":true}"
        );
    }

    #[test]
    fn test_expired_cache_is_rebuilt() {
        let (fx, root) = scenario();
        let service = fx.service(QueryConfig {
            cache_ttl: Duration::ZERO,
            ..QueryConfig::default()
        });

        let first = service.tree(&NodeRef::Id(root), 1).unwrap();
        let extra = fx.node("late/dep", Some(100));
        fx.edge(root, extra);
        let second = service.tree(&NodeRef::Id(root), 1).unwrap();

        assert_ne!(first, second);
        let tree: RepoTree = serde_json::from_str(&second).unwrap();
        assert_eq!(tree.modules[0].row.repo.full_name, "late/dep");
    }

    #[test]
    fn test_page_limits() {
        let fx = Fixture::new();
        for i in 0..15 {
            fx.node(&format!("p/r{:02}", i), Some(i));
        }
        let service = fx.service(QueryConfig {
            max_page_size: 4,
            ..QueryConfig::default()
        });

        let first = service.page(None, None).unwrap();
        assert_eq!(first.count, 4);
        assert_eq!(first.items[0].repo.full_name, "p/r14");

        let fourth = service.page(Some("4"), Some("4")).unwrap();
        assert_eq!(fourth.count, 3);

        assert!(matches!(
            service.page(Some("0"), None),
            Err(QueryError::InvalidPage(_))
        ));
    }

    #[test]
    fn test_page_beyond_addressable_range_is_rejected() {
        let fx = Fixture::new();
        fx.node("p/only", Some(1));
        let service = fx.service(QueryConfig::default());

        let huge = usize::MAX.to_string();
        assert!(matches!(
            service.page(Some(&huge), None),
            Err(QueryError::InvalidPage(_))
        ));
        // Fits in usize but not in SQLite's signed OFFSET
        let past_i64 = (i64::MAX as usize / 10 + 2).to_string();
        assert!(matches!(
            service.page(Some(&past_i64), Some("10")),
            Err(QueryError::InvalidPage(_))
        ));
    }

    #[test]
    fn test_search_and_empty_term() {
        let (fx, _) = scenario();
        let service = fx.service(QueryConfig::default());

        let hits = service.search("BAR").unwrap();
        let names: Vec<_> = hits.items.iter().map(|r| r.repo.full_name.as_str()).collect();
        assert_eq!(names, vec!["foo/bar", "bar/qux", "bar/baz"]);
        assert_eq!(service.search("   ").unwrap().count, 0);
    }

    #[test]
    fn test_readme_and_multi() {
        let (fx, root) = scenario();
        fx.graph.set_readme(root, "<h1>foo</h1>").unwrap();
        let service = fx.service(QueryConfig::default());

        assert_eq!(service.readme(root).unwrap().as_deref(), Some("<h1>foo</h1>"));
        assert!(matches!(service.readme(999), Err(QueryError::NotFound(_))));

        let listing = service.multi(&format!("{},999", root)).unwrap();
        assert_eq!(listing.count, 1);
        assert!(matches!(service.multi("1,a"), Err(QueryError::InvalidId(_))));

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["count"], 1);
        assert!(json["items"][0].get("readme").is_none());
    }
}

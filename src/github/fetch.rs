// src/github/fetch.rs
// =============================================================================
// What the crawler needs from GitHub, expressed as the RepoSource trait:
// - a page of search results (the seed set)
// - repository metadata by owner/repo
// - the raw manifest file (go.mod)
// - the rendered README
//
// GitHubClient implements it on top of request()/do_json()/do_raw(). Tests
// implement it with in-memory fakes, so the crawler never needs the network
// to be exercised.
// =============================================================================

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use super::client::{GitHubClient, HTML_MEDIA_TYPE, RAW_MEDIA_TYPE};
use crate::error::ApiError;
use crate::model::Repository;

#[async_trait]
pub trait RepoSource: Send + Sync {
    /// One page of repository search results, most starred first.
    async fn search_page(&self, query: &str, page: u32, per_page: u32)
        -> Result<Vec<Repository>, ApiError>;

    async fn repository(&self, full_name: &str) -> Result<Repository, ApiError>;

    /// Raw text of `path` at the default branch.
    async fn manifest(&self, full_name: &str, path: &str) -> Result<String, ApiError>;

    /// README rendered to HTML.
    async fn readme(&self, full_name: &str) -> Result<String, ApiError>;

    fn requests_made(&self) -> u64 {
        0
    }
}

// Wire shape of a repository in GitHub responses
#[derive(Debug, Deserialize)]
struct RepoPayload {
    name: String,
    full_name: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stargazers_count: Option<i64>,
    #[serde(default)]
    forks_count: Option<i64>,
    #[serde(default)]
    owner: Option<OwnerPayload>,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    items: Vec<RepoPayload>,
}

impl From<RepoPayload> for Repository {
    fn from(p: RepoPayload) -> Self {
        Repository {
            name: p.name,
            full_name: p.full_name,
            html_url: p.html_url,
            description: p.description,
            stargazers_count: p.stargazers_count,
            forks_count: p.forks_count,
            avatar_url: p.owner.and_then(|o| o.avatar_url),
            readme: None,
        }
        .normalized()
    }
}

#[async_trait]
impl RepoSource for GitHubClient {
    async fn search_page(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>, ApiError> {
        let query = search_query(query, page, per_page);
        let req = self.request(Method::GET, "/search/repositories", &query)?;
        let body: SearchPayload = self.do_json(req).await?;
        Ok(body.items.into_iter().map(Repository::from).collect())
    }

    async fn repository(&self, full_name: &str) -> Result<Repository, ApiError> {
        let req = self.request(Method::GET, &format!("/repos/{}", full_name), "")?;
        let payload: RepoPayload = self.do_json(req).await?;
        Ok(payload.into())
    }

    async fn manifest(&self, full_name: &str, path: &str) -> Result<String, ApiError> {
        let req = self
            .request(
                Method::GET,
                &format!("/repos/{}/contents/{}", full_name, path),
                "",
            )?
            .accept(RAW_MEDIA_TYPE);
        self.do_raw(req).await
    }

    async fn readme(&self, full_name: &str) -> Result<String, ApiError> {
        let req = self
            .request(Method::GET, &format!("/repos/{}/readme", full_name), "")?
            .accept(HTML_MEDIA_TYPE);
        self.do_raw(req).await
    }

    fn requests_made(&self) -> u64 {
        GitHubClient::requests_made(self)
    }
}

// Query string for /search/repositories. Spaces become '+' the way the
// search syntax expects; sorting is always by stars.
pub fn search_query(query: &str, page: u32, per_page: u32) -> String {
    let q: Vec<&str> = query.split_whitespace().collect();
    format!(
        "q={}&sort=stars&order=desc&page={}&per_page={}",
        q.join("+"),
        page,
        per_page
    )
}

// Accepts "owner/repo" or a GitHub URL and returns a lower-cased "owner/repo"
//
// Supported formats:
//   - https://github.com/owner/repo
//   - https://github.com/owner/repo.git
//   - github.com/owner/repo
//   - owner/repo
// Anything else is returned trimmed and lower-cased, unchanged otherwise.
pub fn full_name_from_input(input: &str) -> String {
    let trimmed = input
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    let (is_url, path) = match trimmed.strip_prefix("github.com/") {
        Some(path) => (true, path),
        None => (false, trimmed),
    };
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

    if (is_url && parts.len() >= 2) || parts.len() == 2 {
        let repo = parts[1].trim_end_matches(".git");
        return format!("{}/{}", parts[0], repo).to_lowercase();
    }

    input.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_from_url() {
        assert_eq!(
            full_name_from_input("https://github.com/Sirupsen/logrus"),
            "sirupsen/logrus"
        );
    }

    #[test]
    fn test_full_name_from_url_with_git() {
        assert_eq!(
            full_name_from_input("https://github.com/user/repo.git"),
            "user/repo"
        );
    }

    #[test]
    fn test_full_name_passthrough() {
        assert_eq!(full_name_from_input("foo/bar"), "foo/bar");
        assert_eq!(full_name_from_input("42"), "42");
    }

    #[test]
    fn test_search_query() {
        assert_eq!(
            search_query("go package  in:readme", 3, 100),
            "q=go+package+in:readme&sort=stars&order=desc&page=3&per_page=100"
        );
    }

    #[test]
    fn test_payload_conversion() {
        let json = r#"{
            "name": "Logrus",
            "full_name": "Sirupsen/Logrus",
            "html_url": "https://github.com/Sirupsen/Logrus",
            "description": null,
            "stargazers_count": 20000,
            "forks_count": 2000,
            "owner": { "avatar_url": "https://avatars.example/u/1" }
        }"#;
        let payload: RepoPayload = serde_json::from_str(json).unwrap();
        let repo = Repository::from(payload);
        assert_eq!(repo.full_name, "sirupsen/logrus");
        assert_eq!(repo.name, "Logrus");
        assert_eq!(repo.stargazers_count, Some(20000));
        assert_eq!(repo.avatar_url.as_deref(), Some("https://avatars.example/u/1"));
        assert_eq!(repo.description, None);
    }

    #[test]
    fn test_search_payload_without_items() {
        let body: SearchPayload =
            serde_json::from_str(r#"{"total_count": 0, "incomplete_results": false}"#).unwrap();
        assert!(body.items.is_empty());
    }
}

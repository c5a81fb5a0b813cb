// src/github/mod.rs
// =============================================================================
// Everything that talks to the GitHub REST API.
//
// - client:     authenticated requests, JSON/raw execution, request counter
// - rate_limit: the quota gate shared by every caller of one client
// - fetch:      the RepoSource trait the crawler consumes, and its GitHub impl
// =============================================================================

mod client;
mod fetch;
mod rate_limit;

pub use client::GitHubClient;
pub use fetch::{full_name_from_input, RepoSource};
pub use rate_limit::RateLimiter;

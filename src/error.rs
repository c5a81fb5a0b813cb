// src/error.rs
// =============================================================================
// Typed errors for every layer of the crawler and query service.
//
// Each error knows its Severity, so the crawler and the query service handle
// failures the same way:
// - ContinueItem: log it, skip the current candidate/node, keep going
// - AbortRoot:    give up on the current crawl root, move to the next seed
// - Fatal:        the process cannot do useful work (store setup failed)
// =============================================================================

use reqwest::StatusCode;
use thiserror::Error;

/// How far a failure propagates. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    ContinueItem,
    AbortRoot,
    Fatal,
}

// Errors from the GitHub API client
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (DNS, connect, timeout). Retryable on a later pass.
    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied ({status}) for {url}")]
    Denied { status: StatusCode, url: String },

    #[error("unexpected status {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn severity(&self) -> Severity {
        Severity::ContinueItem
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

// Errors from the graph store and the frontier/cache store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the database or provisioning tables failed.
    #[error("store setup failed: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("cannot create store directory: {0}")]
    Directory(#[source] std::io::Error),

    #[error("store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("refusing self-referencing edge on node {0}")]
    SelfLoop(i64),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn severity(&self) -> Severity {
        match self {
            StoreError::Schema(_) | StoreError::Directory(_) | StoreError::Poisoned => {
                Severity::Fatal
            }
            _ => Severity::ContinueItem,
        }
    }
}

// Errors surfaced at the query boundary
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid depth '{0}': expected a positive integer or 'max'")]
    InvalidDepth(String),

    #[error("invalid id '{0}'")]
    InvalidId(String),

    #[error("invalid page '{0}'")]
    InvalidPage(String),

    #[error("no repository matches {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl QueryError {
    pub fn severity(&self) -> Severity {
        match self {
            QueryError::Store(e) => e.severity(),
            _ => Severity::ContinueItem,
        }
    }

    /// True when the caller sent something malformed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidDepth(_) | QueryError::InvalidId(_) | QueryError::InvalidPage(_)
        )
    }
}

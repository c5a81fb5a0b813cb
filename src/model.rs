// src/model.rs
// =============================================================================
// Data types shared by the crawler, the stores and the query service.
//
// - Repository: a node as seen on GitHub (no database id yet)
// - RepoRow:    a node as stored, with its derived numeric id
// - RepoTree:   a read-only tree view built for query responses
// - Listing:    the { count, items } envelope for list responses
// - NodeRef:    how callers point at a node (by id or by full name)
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

// A repository record. `full_name` is the identity and is always lower-case
// once it has passed through `normalized()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: Option<i64>,
    #[serde(default)]
    pub forks_count: Option<i64>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
}

impl Repository {
    /// Minimal record for tests and fakes.
    #[cfg(test)]
    pub fn named(full_name: &str) -> Self {
        let name = full_name.rsplit('/').next().unwrap_or(full_name).to_string();
        Repository {
            name,
            full_name: full_name.to_string(),
            html_url: format!("https://github.com/{}", full_name),
            description: None,
            stargazers_count: None,
            forks_count: None,
            avatar_url: None,
            readme: None,
        }
    }

    #[cfg(test)]
    pub fn with_stars(mut self, stars: i64) -> Self {
        self.stargazers_count = Some(stars);
        self
    }

    #[cfg(test)]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn normalized(mut self) -> Self {
        self.full_name = normalize_name(&self.full_name);
        self
    }

    pub fn key(&self) -> String {
        normalize_name(&self.full_name)
    }
}

/// Case-normalizes an `owner/repo` identifier.
pub fn normalize_name(full_name: &str) -> String {
    full_name.trim().to_lowercase()
}

// A stored node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRow {
    pub id: i64,
    #[serde(flatten)]
    pub repo: Repository,
}

// A node plus its dependency subtree. `modules` is empty at the leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoTree {
    #[serde(flatten)]
    pub row: RepoRow,
    pub modules: Vec<RepoTree>,
}

impl RepoTree {
    /// Number of levels below this node (0 for a leaf).
    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.modules
            .iter()
            .map(|m| m.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Listing<T> {
    fn from(items: Vec<T>) -> Self {
        Listing {
            count: items.len(),
            items,
        }
    }
}

// Callers may address a node by numeric id or by full name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Id(i64),
    Name(String),
}

impl NodeRef {
    // All-digit input is an id, anything else is a name
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(id) if !raw.starts_with('-') && !raw.starts_with('+') => NodeRef::Id(id),
            _ => NodeRef::Name(normalize_name(raw)),
        }
    }

    pub fn cache_part(&self) -> String {
        match self {
            NodeRef::Id(id) => format!("id:{}", id),
            NodeRef::Name(name) => format!("name:{}", name),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Id(id) => write!(f, "id {}", id),
            NodeRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

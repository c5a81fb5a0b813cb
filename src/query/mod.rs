// src/query/mod.rs
// =============================================================================
// Read side of the graph: depth-bounded dependency trees (cached), ranked
// listings, search, and README lookups.
//
// Raw caller input (depth, page, id lists) is parsed here, before any store
// access, so malformed requests never touch SQLite.
// =============================================================================

mod service;
mod tree;

pub use service::QueryService;

use crate::error::QueryError;

// Depth of a tree request: missing means 1, "max" means `max`, anything
// larger than `max` is clamped to it
pub fn parse_depth(raw: Option<&str>, max: usize) -> Result<usize, QueryError> {
    let max = max.max(1);
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(1),
        Some(raw) => raw,
    };

    if raw.eq_ignore_ascii_case("max") {
        return Ok(max);
    }

    match raw.parse::<i64>() {
        Ok(depth) if depth >= 1 => Ok((depth as u64).min(max as u64) as usize),
        _ => Err(QueryError::InvalidDepth(raw.to_string())),
    }
}

/// Parses a comma-separated id list such as `1,2,3`.
pub fn parse_ids(raw: &str) -> Result<Vec<i64>, QueryError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(QueryError::InvalidId(part.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(QueryError::InvalidId(raw.to_string()));
    }
    Ok(ids)
}

// A positive integer, or `default` when absent
pub fn parse_positive(raw: Option<&str>, default: usize) -> Result<usize, QueryError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(QueryError::InvalidPage(raw.to_string())),
        },
    }
}

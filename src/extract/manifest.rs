// src/extract/manifest.rs
// =============================================================================
// Finds dependency references in a manifest file (go.mod by default).
//
// How it works:
// 1. If the text is GitHub's "Not Found" body, there's nothing to scan
// 2. Walk the text line by line, skipping the manifest's own declaration
//    (`module github.com/foo/bar`)
// 3. Capture the owner/repo part of every `<host>/<owner>/<repo>` path
// 4. Collect into a set, dropping the repository's own name
//
// `github.com/foo/bar` and `github.com/foo/bar/v2` both capture `foo/bar`,
// so they collapse into one candidate.
// =============================================================================

use futures::stream::{self, StreamExt};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::github::RepoSource;
use crate::model::{normalize_name, Repository};

// Body GitHub sends back for a missing file when raw content isn't available
pub const NOT_FOUND_SENTINEL: &str = r#"{"message":"Not Found""#;

// Candidates resolved at the same time
const RESOLVE_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct ManifestScanner {
    pattern: Regex,
    declaration: String,
}

impl ManifestScanner {
    // `host` is matched literally; `declaration` is the keyword that opens the
    // manifest's self-declaration line
    pub fn new(host: &str, declaration: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"{}/([-\w]+/[-\w.]+)", regex::escape(host)))?;
        Ok(ManifestScanner {
            pattern,
            declaration: declaration.to_string(),
        })
    }

    // Returns the unique owner/repo candidates referenced by `manifest`,
    // excluding `own_name`. Case is kept as written in the manifest.
    pub fn candidates(&self, manifest: &str, own_name: &str) -> BTreeSet<String> {
        let mut set = BTreeSet::new();

        if manifest.starts_with(NOT_FOUND_SENTINEL) {
            return set;
        }

        for line in manifest.lines() {
            let line = line.trim();

            if line.starts_with(&self.declaration) {
                continue;
            }

            if let Some(caps) = self.pattern.captures(line) {
                let candidate = caps[1].trim_end_matches(".git").trim_end_matches('.');
                if candidate.is_empty() || candidate.eq_ignore_ascii_case(own_name) {
                    continue;
                }
                set.insert(candidate.to_string());
            }
        }

        set
    }
}

// Looks up full metadata for each candidate. Candidates GitHub can't resolve
// (missing, private, errors) are dropped. Output keeps the input order.
pub async fn resolve_candidates<I>(
    source: &dyn RepoSource,
    candidates: I,
    own_name: &str,
) -> Vec<Repository>
where
    I: IntoIterator<Item = String>,
{
    let own = normalize_name(own_name);

    let lookups = candidates.into_iter().map(|candidate| async move {
        let key = normalize_name(&candidate);
        match source.repository(&key).await {
            Ok(repo) => Some(repo.normalized()),
            Err(e) if e.is_not_found() => {
                debug!(candidate = %key, "dropping unknown dependency");
                None
            }
            Err(e) => {
                warn!(
                    candidate = %key,
                    error = %e,
                    severity = ?e.severity(),
                    "dependency lookup failed, dropping it"
                );
                None
            }
        }
    });

    stream::iter(lookups)
        .buffered(RESOLVE_CONCURRENCY)
        .filter_map(|repo| async move { repo })
        // A renamed repository can redirect back to the owner
        .filter(|repo| {
            let keep = repo.full_name != own;
            async move { keep }
        })
        .collect()
        .await
}

// src/extract/mod.rs
// =============================================================================
// Dependency extraction: manifest text in, candidate repositories out.
// =============================================================================

mod manifest;

pub use manifest::{resolve_candidates, ManifestScanner};

//! Seed-list files.
//!
//! A seed list names extra pages to check, one or more whitespace-separated
//! repository paths per line, e.g.
//! `ambassador-docs/docs/edge-stack/2.0/howtos/rate-limiting.md`. Each token
//! maps to a served URL under the base: repo prefix stripped, `.md` dropped,
//! trailing slash added. Telepresence docs keep their versions under a `v`
//! prefix on disk but not in URLs, so the first `v` is dropped for those
//! tokens.

use std::path::Path;

use anyhow::Context as _;

/// Map one seed token onto a URL under `base_url`.
#[must_use]
pub fn map_seed(base_url: &str, token: &str) -> String {
    let mut path = token.trim().to_string();
    if let Some(stripped) = path.strip_prefix("ambassador-docs/") {
        path = stripped.to_string();
    }
    if let Some(stripped) = path.strip_suffix(".md") {
        path = stripped.to_string();
    }
    if path.contains("telepresence") {
        if let Some(pos) = path.find('v') {
            path.remove(pos);
        }
    }
    format!(
        "{}/{}/",
        base_url.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

/// Read a seed-list file and map every token against `base_url`.
pub fn load(path: &Path, base_url: &str) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed list {}", path.display()))?;
    Ok(text
        .split_whitespace()
        .map(|token| map_seed(base_url, token))
        .collect())
}

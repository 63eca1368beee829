//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Path part of a request URL, percent-decoded, without query or fragment.
pub fn url_path(url: &str) -> String {
    let raw = url.split(['?', '#']).next().unwrap_or(url);
    percent_decode_str(raw)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default()
}

/// Map a request URL onto a file under `serve_root`.
///
/// Directories resolve to their `index.html`. Anything escaping the root,
/// through `..` or a symlink, resolves to `None`.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let decoded = url_path(url);
    let clean = decoded.trim_matches('/');
    if clean.split('/').any(|seg| seg == "..") {
        return None;
    }

    let root = serve_root.canonicalize().ok()?;
    let candidate = root.join(clean).canonicalize().ok()?;
    if !candidate.starts_with(&root) {
        return None;
    }

    if candidate.is_file() {
        return Some(candidate);
    }
    let index = candidate.join("index.html");
    index.is_file().then_some(index)
}

//! Raw report-file serving helpers.

use reporthive_core::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve a request path against a build directory.
///
/// The relative path must stay inside the build directory; a path that
/// would escape is answered like a path that does not exist, before the
/// filesystem is touched.
pub fn resolve_file(build_dir: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    for component in rel_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(Error::not_found(format!("no such file: {rel}"))),
        }
    }

    let path = build_dir.join(rel_path);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::not_found(format!("no such file: {rel}")))
    }
}

/// Content type by file extension; report trees are mostly HTML plus assets.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") | Some("log") => "text/plain",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

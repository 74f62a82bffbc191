// src/server/static_files.rs

//! Static file responses for the output root.

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use crate::server::livereload::inject_script;

/// Map a percent-encoded request path onto a file below `root`.
///
/// Returns `None` for paths that try to leave the root (checked after
/// decoding) or that do not decode to UTF-8. Directories resolve to their
/// `index.html`.
pub fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let mut path = root.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if decoded.ends_with('/') || path.is_dir() {
        path.push("index.html");
    }
    Some(path)
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("eot") => "application/vnd.ms-fontobject",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Serve `request_path` from `root`, injecting the reload script into HTML
/// pages when `livereload` is on.
pub async fn serve_file(root: &Path, request_path: &str, livereload: bool) -> Response {
    let Some(path) = resolve_request_path(root, request_path) else {
        warn!(path = %request_path, "rejected request outside the output root");
        return StatusCode::NOT_FOUND.into_response();
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(?path, error = %err, "static file not found");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let content_type = content_type_for(&path);
    let body = if livereload && content_type.starts_with("text/html") {
        match String::from_utf8(bytes) {
            Ok(html) => Body::from(inject_script(&html)),
            Err(err) => Body::from(err.into_bytes()),
        }
    } else {
        Body::from(bytes)
    };

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

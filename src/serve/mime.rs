//! Content types for the asset kinds a front-end build emits.

use std::path::Path;

pub const HTML: &str = "text/html; charset=utf-8";
pub const PLAIN: &str = "text/plain; charset=utf-8";
pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

pub fn from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html" | "htm") => HTML,
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => JAVASCRIPT,
        Some("map" | "json") => "application/json",
        Some("txt") => PLAIN,
        Some("xml") => "application/xml",

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

        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_extensions() {
        assert_eq!(from_path(Path::new("static/css/style.min.css")), "text/css; charset=utf-8");
        assert_eq!(from_path(Path::new("INDEX.HTML")), HTML);
        assert_eq!(from_path(Path::new("static/fonts/a.woff2")), "font/woff2");
        assert_eq!(from_path(Path::new("blob")), OCTET_STREAM);
    }
}

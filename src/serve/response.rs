//! HTTP response helpers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::mime;
use crate::reload;

/// Respond with a file from disk. HTML gets the live reload script when
/// `reload_port` is set.
pub fn respond_file(request: Request, path: &Path, reload_port: Option<u16>) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let body = match reload_port {
        Some(_) if content_type == mime::HTML => inject_reload_script(&body),
        _ => body,
    };
    send_body(request, 200, content_type, body)
}

/// Serve the live reload client from memory.
pub fn respond_client_script(request: Request, reload_port: u16) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 200, mime::JAVASCRIPT);
    }
    let body = reload::client_script(reload_port);
    send_body(request, 200, mime::JAVASCRIPT, body.into_bytes())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, mime::PLAIN);
    }
    send_body(request, 404, mime::PLAIN, b"404 Not Found".to_vec())
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(header("Content-Type", mime::PLAIN)?)
        .with_header(header("Allow", "GET, HEAD")?);
    request.respond(response)?;
    Ok(())
}

/// Insert the client `<script>` before the last `</body>`, or append it.
pub fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    const CLOSING: &[u8] = b"</body>";
    let tag = reload::script_tag();
    let tag = tag.as_bytes();

    let split = content
        .windows(CLOSING.len())
        .rposition(|w| w.eq_ignore_ascii_case(CLOSING))
        .unwrap_or(content.len());

    let mut out = Vec::with_capacity(content.len() + tag.len());
    out.extend_from_slice(&content[..split]);
    out.extend_from_slice(tag);
    out.extend_from_slice(&content[split..]);
    out
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(header("Content-Type", content_type)?)
        .with_header(header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", content_type)?)
        .with_header(header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

fn header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header {key}: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        let html = b"<html><body><p>hi</p></BODY></html>";
        let out = String::from_utf8(inject_reload_script(html)).unwrap();
        let script = out.find(crate::reload::CLIENT_SCRIPT_PATH).unwrap();
        let closing = out.find("</BODY>").unwrap();
        assert!(script < closing);
        assert!(out.ends_with("</BODY></html>"));
    }

    #[test]
    fn script_appended_without_body_tag() {
        let out = String::from_utf8(inject_reload_script(b"<p>fragment</p>")).unwrap();
        assert!(out.starts_with("<p>fragment</p><script"));
    }
}

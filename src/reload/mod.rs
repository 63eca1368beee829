//! Live reload: notify browsers after successful builds.

mod hub;
mod message;

pub use hub::{LiveReload, ReloadScope};
pub use message::ReloadMessage;

/// URL the dev server serves the client script from.
pub const CLIENT_SCRIPT_PATH: &str = "/__assetflow/livereload.js";

const CLIENT_JS: &str = include_str!("client.js");

/// Browser client connecting to the hub on `port`.
pub fn client_script(port: u16) -> String {
    CLIENT_JS.replace("__ASSETFLOW_RELOAD_PORT__", &port.to_string())
}

/// `<script>` tag loading [`client_script`].
pub fn script_tag() -> String {
    format!(r#"<script src="{CLIENT_SCRIPT_PATH}"></script>"#)
}

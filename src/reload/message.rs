//! Live reload message protocol.
//!
//! JSON objects tagged by `type`, sent from the server to browsers:
//!
//! - `connected`: handshake done
//! - `reload`: full page reload
//! - `css`: swap the listed stylesheets without reloading
//! - `error` / `clear_error`: show or hide the build error overlay

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Connected {
        version: String,
    },

    Reload {
        /// Task whose success caused the reload.
        #[serde(skip_serializing_if = "Option::is_none")]
        task: Option<String>,
    },

    Css {
        /// URL paths of the stylesheets that changed, e.g. `/static/css/style.min.css`.
        paths: Vec<String>,
    },

    Error {
        task: String,
        message: String,
    },

    #[serde(rename = "clear_error")]
    ClearError,
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(
            ReloadMessage::Reload { task: None }.to_json(),
            r#"{"type":"reload"}"#
        );
        assert_eq!(ReloadMessage::ClearError.to_json(), r#"{"type":"clear_error"}"#);
        assert_eq!(
            ReloadMessage::Css {
                paths: vec!["/static/css/style.min.css".into()]
            }
            .to_json(),
            r#"{"type":"css","paths":["/static/css/style.min.css"]}"#
        );
    }

    #[test]
    fn parses_back() {
        let msg = ReloadMessage::Error {
            task: "css".into(),
            message: "boom".into(),
        };
        assert_eq!(ReloadMessage::from_json(&msg.to_json()), Some(msg));
        assert_eq!(ReloadMessage::from_json("nonsense"), None);
    }
}

use std::str::FromStr;

use serde::Deserialize;

/// Behaviour when a watch trigger arrives for a task that is still running.
///
/// - `Coalesce`: remember at most one pending rerun; it starts as soon as the
///   current run finishes (default).
/// - `Queue`: remember up to `queue_length` pending reruns and run them one
///   after another.
///
/// In both modes a task never has two instances in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    #[default]
    Coalesce,
    Queue,
}

impl FromStr for BusyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coalesce" => Ok(BusyPolicy::Coalesce),
            "queue" => Ok(BusyPolicy::Queue),
            other => Err(format!(
                "invalid on_busy: {other} (expected \"coalesce\" or \"queue\")"
            )),
        }
    }
}

/// What a leaf task asks connected browsers to do once it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMode {
    /// Full page reload.
    #[default]
    Full,
    /// Swap the written stylesheets in place.
    Css,
    /// Do not notify.
    None,
}

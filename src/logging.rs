// src/logging.rs

//! `tracing` subscriber setup.
//!
//! `--log-level` wins over `ASSETFLOW_LOG`, which accepts full filter
//! directives (`assetflow::watch=debug,info`). Watcher and socket crates
//! stay at `warn` unless a directive names them. Output goes to stderr;
//! the reporter prints task failures there as well.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const LOG_ENV: &str = "ASSETFLOW_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

const QUIET_DEPS: &[(&str, &str)] = &[
    ("notify", "warn"),
    ("tungstenite", "warn"),
    ("tiny_http", "warn"),
];

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = directives(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter {directives:?} (from --log-level or {LOG_ENV})"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("logging already initialised: {e}"))
}

fn directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    let mut out = match (cli_level, env.map(str::trim).filter(|s| !s.is_empty())) {
        (Some(level), _) => level_directive(level).to_string(),
        (None, Some(env)) => env.to_string(),
        (None, None) => DEFAULT_DIRECTIVE.to_string(),
    };
    for (krate, level) in QUIET_DEPS {
        let named = out
            .split(',')
            .any(|d| d.trim().split(['=', '[', ':']).next() == Some(*krate));
        if !named {
            out.push_str(&format!(",{krate}={level}"));
        }
    }
    out
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_info_with_quiet_deps() {
        assert_eq!(
            directives(None, None),
            "info,notify=warn,tungstenite=warn,tiny_http=warn"
        );
        assert_eq!(directives(None, Some("  ")), directives(None, None));
    }

    #[test]
    fn cli_level_overrides_env() {
        let d = directives(Some(LogLevel::Debug), Some("trace"));
        assert!(d.starts_with("debug,"), "{d}");
    }

    #[test]
    fn env_directives_pass_through() {
        let d = directives(None, Some("assetflow::watch=debug,warn"));
        assert!(d.starts_with("assetflow::watch=debug,warn,notify=warn"), "{d}");
        assert!(EnvFilter::try_new(&d).is_ok());
    }

    #[test]
    fn naming_a_dependency_keeps_its_level() {
        let d = directives(None, Some("info,notify=trace"));
        assert_eq!(d, "info,notify=trace,tungstenite=warn,tiny_http=warn");
    }
}

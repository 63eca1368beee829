//! Helpers shared by assetflow's integration tests.

pub mod builders;
pub mod fake_backend;

use std::future::Future;
use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Longest a single build, run or watch round may take in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Capture `tracing` output through the test harness, so it only shows for
/// failing tests (or with `--nocapture`).
///
/// `ASSETFLOW_LOG` takes filter directives; the default is debug for this
/// crate and warn for everything else.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("ASSETFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new("assetflow=debug,warn"));

    // Called by every test; the first registration in the process wins.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer().without_time().compact())
        .try_init();
}

/// Await `fut`, failing the test if it is still pending after
/// [`TEST_TIMEOUT`].
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_TIMEOUT, fut).await {
        Ok(out) => out,
        Err(_) => panic!("test future still pending after {TEST_TIMEOUT:?}"),
    }
}

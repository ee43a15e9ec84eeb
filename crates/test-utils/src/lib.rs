//! Shared helpers for the `buildloop` integration tests.

pub mod builders;
pub mod fake_actions;
pub mod fake_bundler;
pub mod fake_rebuilder;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use buildloop::logging::{LOG_ENV_VAR, build_filter};
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber (once per test binary).
///
/// Output goes through `with_test_writer()`, so it only shows up for failing
/// tests unless run with `--nocapture`. `RUST_LOG` wins over
/// `BUILDLOOP_LOG`; without either only `info` and above is kept.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            build_filter(None, std::env::var(LOG_ENV_VAR).ok().as_deref())
        });

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test step timed out after {TEST_TIMEOUT:?}"))
}

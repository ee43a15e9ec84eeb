use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildloop::engine::{BatchOutcome, RebuildBackend};
use buildloop::errors::Result;
use buildloop::types::{ReloadKind, WatchTarget};

/// A fake rebuild backend that:
/// - records each batch it is asked to rebuild
/// - sleeps `delay` per batch and per restart, so changes can arrive
///   mid-rebuild or mid-restart
/// - reports the configured targets as failed
/// - records restarts (and how many ran at once) and reload notifications.
#[derive(Debug, Default)]
pub struct FakeRebuilder {
    delay: Duration,
    failing: HashSet<WatchTarget>,
    batches: Mutex<Vec<Vec<WatchTarget>>>,
    reloads: Mutex<Vec<ReloadKind>>,
    restarts: AtomicUsize,
    running_restarts: AtomicUsize,
    peak_restarts: AtomicUsize,
}

impl FakeRebuilder {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn with_failures(delay: Duration, failing: &[WatchTarget]) -> Arc<Self> {
        Arc::new(Self {
            delay,
            failing: failing.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn batches(&self) -> Vec<Vec<WatchTarget>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn reloads(&self) -> Vec<ReloadKind> {
        self.reloads.lock().unwrap().clone()
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Highest number of restarts that were running at the same time.
    pub fn peak_concurrent_restarts(&self) -> usize {
        self.peak_restarts.load(Ordering::SeqCst)
    }
}

impl RebuildBackend for FakeRebuilder {
    fn rebuild(
        &self,
        targets: Vec<WatchTarget>,
    ) -> Pin<Box<dyn Future<Output = BatchOutcome> + Send + '_>> {
        Box::pin(async move {
            self.batches.lock().unwrap().push(targets.clone());
            tokio::time::sleep(self.delay).await;
            let failed = targets
                .iter()
                .copied()
                .filter(|t| self.failing.contains(t))
                .collect();
            BatchOutcome { targets, failed }
        })
    }

    fn restart_server(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.restarts.fetch_add(1, Ordering::SeqCst);
            let running = self.running_restarts.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_restarts.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running_restarts.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn notify_reload(&self, kind: ReloadKind) {
        self.reloads.lock().unwrap().push(kind);
    }
}

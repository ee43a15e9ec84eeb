// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::{RebuildPolicy, WatchTarget};

/// Targets that changed while a rebuild batch was running.
///
/// There is only ever one pending follow-up batch. When the current batch
/// finishes, the runtime calls `drain_pending()` to start it.
#[derive(Debug)]
pub struct TriggerQueue {
    policy: RebuildPolicy,
    pending: BTreeSet<WatchTarget>,
}

impl TriggerQueue {
    pub fn new(policy: RebuildPolicy) -> Self {
        Self {
            policy,
            pending: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn policy(&self) -> RebuildPolicy {
        self.policy
    }

    /// Record a change that arrived while a batch is in flight.
    ///
    /// - `Coalesce`: merge into the pending batch, so any number of changes
    ///   leads to one follow-up batch.
    /// - `Latest`: forget everything pending so far and keep only `target`.
    pub fn record_trigger(&mut self, target: WatchTarget) {
        match self.policy {
            RebuildPolicy::Coalesce => {
                let inserted = self.pending.insert(target);
                debug!(%target, inserted, "merged change into pending batch");
            }
            RebuildPolicy::Latest => {
                debug!(%target, "replacing pending batch with the latest change");
                self.pending.clear();
                self.pending.insert(target);
            }
        }
    }

    /// Remove and return the pending batch in rebuild order.
    pub fn drain_pending(&mut self) -> Vec<WatchTarget> {
        let targets: Vec<WatchTarget> = std::mem::take(&mut self.pending).into_iter().collect();
        debug!(drained = targets.len(), "drained queued changes into a new batch");
        targets
    }
}

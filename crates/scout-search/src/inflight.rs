//! De-duplication of concurrent identical cache misses.
//!
//! The registry maps a fingerprint to a weak handle on the shared future that
//! is computing it. A request that misses the cache either joins a live
//! computation or starts a new one; it never holds the registry lock while
//! awaiting. Only waiters keep a computation alive: when every waiter goes
//! away the shared future is dropped and its weak entry dies with it.

use std::collections::HashMap;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tokio::sync::Mutex;

use scout_core::{Fingerprint, RankedResultSet, Result};

use crate::trace::StageTiming;

/// Output of one pipeline run, shared by every waiter.
#[derive(Debug, Clone)]
pub struct Computed {
    /// Ranked results.
    pub results: RankedResultSet,
    /// Stages the run executed.
    pub stages: Vec<StageTiming>,
}

/// A pipeline run that several requests can await.
pub type SharedSearch = Shared<BoxFuture<'static, Result<Computed>>>;

type WeakSearch = WeakShared<BoxFuture<'static, Result<Computed>>>;

/// Fingerprint-keyed registry of running computations.
#[derive(Default)]
pub struct InflightRegistry {
    entries: Mutex<HashMap<Fingerprint, WeakSearch>>,
}

impl InflightRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the live computation for `fingerprint`, or start one with `start`.
    ///
    /// Returns the shared handle and whether it was joined rather than
    /// started. `start` runs under the registry lock, so it must only build
    /// the future, not poll it.
    pub async fn join_or_start<F, Fut>(
        &self,
        fingerprint: Fingerprint,
        start: F,
    ) -> (SharedSearch, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed>> + Send + 'static,
    {
        let mut entries = self.entries.lock().await;
        if let Some(shared) = entries.get(&fingerprint).and_then(WeakShared::upgrade) {
            return (shared, true);
        }

        entries.retain(|_, weak| weak.upgrade().is_some());
        let shared = start().boxed().shared();
        if let Some(weak) = shared.downgrade() {
            entries.insert(fingerprint, weak);
        }
        (shared, false)
    }

    /// Drop the entry for `fingerprint` once its computation has finished or
    /// has been abandoned. A newer, still running computation is left alone.
    pub async fn finish(&self, fingerprint: &Fingerprint) {
        let mut entries = self.entries.lock().await;
        let done = match entries.get(fingerprint).map(WeakShared::upgrade) {
            Some(Some(shared)) => shared.peek().is_some(),
            Some(None) => true,
            None => false,
        };
        if done {
            entries.remove(fingerprint);
        }
    }

    /// Number of registered, still live computations.
    pub async fn live(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|weak| weak.upgrade().is_some())
            .count()
    }
}

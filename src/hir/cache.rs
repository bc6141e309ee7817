//! Memoizing analysis cache.
//!
//! Every key owns a single-assignment slot. The first caller for a key runs
//! the computation; everyone else arriving while it runs blocks on the slot
//! and receives the very same `Arc` once it is published. The map lock is
//! only held to look up or insert slots, so distinct keys compute in
//! parallel.

use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span};

use super::analyzer::{AnalysisError, AnalysisResult};
use crate::project::AnalysisKey;

/// How often a cancellable waiter checks its token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What happens to a computation that returned an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The error is stored and replayed to every later caller.
    #[default]
    Sticky,
    /// Waiters of the failed computation get the error, then the entry is
    /// dropped so the next caller computes again.
    Retry,
}

/// Errors returned by [`MemoCache::get`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CacheError<E> {
    #[error("{0}")]
    Failed(E),
    #[error("analysis panicked")]
    Panicked,
    #[error("request cancelled")]
    Cancelled,
}

/// Hit and miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

enum Outcome<V, E> {
    Ready(Arc<V>),
    Failed(E),
    Panicked,
}

impl<V, E: Clone> Outcome<V, E> {
    fn to_result(&self) -> Result<Arc<V>, CacheError<E>> {
        match self {
            Outcome::Ready(value) => Ok(Arc::clone(value)),
            Outcome::Failed(err) => Err(CacheError::Failed(err.clone())),
            Outcome::Panicked => Err(CacheError::Panicked),
        }
    }
}

struct Slot<V, E> {
    state: Mutex<Option<Outcome<V, E>>>,
    ready: Condvar,
}

impl<V, E: Clone> Slot<V, E> {
    fn new() -> Self {
        Self {
            state: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn publish(&self, outcome: Outcome<V, E>) {
        *self.state.lock() = Some(outcome);
        self.ready.notify_all();
    }

    fn peek(&self) -> Option<Result<Arc<V>, CacheError<E>>> {
        self.state.lock().as_ref().map(Outcome::to_result)
    }

    fn wait(&self, cancel: Option<&CancellationToken>) -> Result<Arc<V>, CacheError<E>> {
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = state.as_ref() {
                return outcome.to_result();
            }
            match cancel {
                Some(token) if token.is_cancelled() => return Err(CacheError::Cancelled),
                Some(_) => {
                    self.ready.wait_for(&mut state, CANCEL_POLL_INTERVAL);
                }
                None => self.ready.wait(&mut state),
            }
        }
    }
}

/// Cache of analysis results keyed by unit identity.
pub type AnalysisCache = MemoCache<AnalysisKey, AnalysisResult, AnalysisError>;

/// At-most-once memoization of fallible computations.
pub struct MemoCache<K, V, E> {
    slots: Mutex<FxHashMap<K, Arc<Slot<V, E>>>>,
    policy: FailurePolicy,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V, E> Default for MemoCache<K, V, E>
where
    K: Eq + Hash + Clone + fmt::Display,
    E: Clone,
{
    fn default() -> Self {
        Self::new(FailurePolicy::default())
    }
}

impl<K, V, E> MemoCache<K, V, E>
where
    K: Eq + Hash + Clone + fmt::Display,
    E: Clone,
{
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Value for `key`, computing it with `compute` if no caller has yet.
    ///
    /// Concurrent callers for the same key block until the first one
    /// finishes and share its outcome.
    pub fn get<F>(&self, key: &K, compute: F) -> Result<Arc<V>, CacheError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.get_inner(key, None, compute)
    }

    /// Like [`get`](Self::get), but a waiting caller gives up with
    /// [`CacheError::Cancelled`] once `token` is cancelled.
    ///
    /// The token never reaches the computation: a caller that ends up
    /// computing runs to completion and the outcome is cached for others.
    pub fn get_cancellable<F>(
        &self,
        key: &K,
        token: &CancellationToken,
        compute: F,
    ) -> Result<Arc<V>, CacheError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.get_inner(key, Some(token), compute)
    }

    fn get_inner<F>(
        &self,
        key: &K,
        cancel: Option<&CancellationToken>,
        compute: F,
    ) -> Result<Arc<V>, CacheError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let (slot, owner) = {
            let mut slots = self.slots.lock();
            match slots.get(key) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot = Arc::new(Slot::new());
                    slots.insert(key.clone(), Arc::clone(&slot));
                    (slot, true)
                }
            }
        };

        if owner {
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.compute(key, &slot, compute)
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(unit = %key, "analysis cache hit");
            slot.wait(cancel)
        }
    }

    fn compute<F>(&self, key: &K, slot: &Arc<Slot<V, E>>, compute: F) -> Result<Arc<V>, CacheError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let span = info_span!("analysis", unit = %key);
        let _guard = span.enter();
        debug!("analysis cache miss");

        let outcome = match panic::catch_unwind(AssertUnwindSafe(compute)) {
            Ok(Ok(value)) => Outcome::Ready(Arc::new(value)),
            Ok(Err(err)) => Outcome::Failed(err),
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "analysis panicked");
                Outcome::Panicked
            }
        };

        let evict = match outcome {
            Outcome::Ready(_) => false,
            Outcome::Failed(_) => self.policy == FailurePolicy::Retry,
            Outcome::Panicked => true,
        };
        // Evict before publishing so that woken waiters who retry start over.
        if evict {
            let mut slots = self.slots.lock();
            if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
                slots.remove(key);
            }
        }

        let result = outcome.to_result();
        slot.publish(outcome);
        result
    }

    /// Finished outcome for `key`, without blocking or computing.
    pub fn peek(&self, key: &K) -> Option<Result<Arc<V>, CacheError<E>>> {
        let slot = self.slots.lock().get(key).cloned()?;
        slot.peek()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.lock().contains_key(key)
    }

    /// Drop the entry for `key`. A computation in flight still delivers to
    /// its current waiters.
    pub fn evict(&self, key: &K) -> bool {
        self.slots.lock().remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

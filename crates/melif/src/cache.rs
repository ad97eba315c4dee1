//! Cut memoization keyed by weight point.
//!
//! `MapCache` guarantees one computation per distinct key, also under
//! concurrent callers: the first caller installs a `Computing` entry and
//! computes outside the map lock; later callers block on its waiter. The key
//! set doubles as the log of every sampled point of a run.
//!
//! `NopCache` recomputes every time and remembers nothing.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tracing::debug;

use crate::cut::Cut;
use crate::error::{MelifError, Result};

pub trait CutCache<K>: Send + Sync {
    /// Cached cut for `key`, computing it with `compute` on first request.
    fn get_or_compute(&self, key: &K, compute: &dyn Fn(&K) -> Result<Cut>) -> Result<Cut>;

    /// Every key whose cut is known.
    fn all_known_points(&self) -> Vec<K>;
}

struct Waiter {
    state: Mutex<Option<Result<Cut>>>,
    cv: Condvar,
}

impl Waiter {
    fn new() -> Self {
        Self {
            state: Mutex::new(None),
            cv: Condvar::new(),
        }
    }

    fn publish(&self, result: Result<Cut>) {
        {
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = Some(result);
        }
        self.cv.notify_all();
    }

    fn wait(&self) -> Result<Cut> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = guard.as_ref() {
                return result.clone();
            }
            guard = self.cv.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

enum Entry {
    Ready(Cut),
    Computing(Arc<Waiter>),
}

enum Claim {
    Wait(Arc<Waiter>),
    Compute(Arc<Waiter>),
}

/// In-memory memo; entries live for the whole run.
pub struct MapCache<K> {
    entries: Mutex<BTreeMap<K, Entry>>,
    verify: bool,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K: Ord + Clone + Debug> MapCache<K> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            verify: false,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Recompute on every hit and fail with `CacheInconsistency` on mismatch.
    pub fn verifying() -> Self {
        Self {
            verify: true,
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|e| matches!(e, Entry::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` so far.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Cached cut for `key`, if already computed.
    pub fn get(&self, key: &K) -> Option<Cut> {
        match self.lock().get(key) {
            Some(Entry::Ready(cut)) => Some(cut.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<K, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, key: &K, cached: Cut, compute: &dyn Fn(&K) -> Result<Cut>) -> Result<Cut> {
        if !self.verify {
            return Ok(cached);
        }
        let recomputed = compute(key)?;
        if recomputed != cached {
            return Err(MelifError::CacheInconsistency {
                key: format!("{key:?}"),
                cached: cached.to_string(),
                recomputed: recomputed.to_string(),
            });
        }
        Ok(cached)
    }
}

impl<K: Ord + Clone + Debug> Default for MapCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes a failure and frees the key if the computation unwinds.
struct ComputeGuard<'a, K: Ord + Clone + Debug> {
    cache: &'a MapCache<K>,
    key: &'a K,
    waiter: Arc<Waiter>,
    done: bool,
}

impl<K: Ord + Clone + Debug> Drop for ComputeGuard<'_, K> {
    fn drop(&mut self) {
        if !self.done {
            self.cache.lock().remove(self.key);
            self.waiter.publish(Err(MelifError::TaskFailed(format!(
                "cut computation for {:?} panicked",
                self.key
            ))));
        }
    }
}

impl<K> CutCache<K> for MapCache<K>
where
    K: Ord + Clone + Debug + Send + Sync,
{
    fn get_or_compute(&self, key: &K, compute: &dyn Fn(&K) -> Result<Cut>) -> Result<Cut> {
        let waiter = {
            let mut map = self.lock();
            match map.get(key) {
                Some(Entry::Ready(cut)) => {
                    let cut = cut.clone();
                    drop(map);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return self.check(key, cut, compute);
                }
                Some(Entry::Computing(w)) => Claim::Wait(w.clone()),
                None => {
                    let w = Arc::new(Waiter::new());
                    map.insert(key.clone(), Entry::Computing(w.clone()));
                    Claim::Compute(w)
                }
            }
        };
        let waiter = match waiter {
            Claim::Wait(other) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return other.wait();
            }
            Claim::Compute(own) => own,
        };
        self.misses.fetch_add(1, Ordering::Relaxed);
        let mut guard = ComputeGuard {
            cache: self,
            key,
            waiter,
            done: false,
        };
        let result = compute(key);
        {
            let mut map = self.lock();
            match &result {
                Ok(cut) => {
                    map.insert(key.clone(), Entry::Ready(cut.clone()));
                }
                Err(err) => {
                    debug!(key = ?key, error = %err, "cut computation failed");
                    map.remove(key);
                }
            }
        }
        guard.done = true;
        guard.waiter.publish(result.clone());
        result
    }

    fn all_known_points(&self) -> Vec<K> {
        self.lock()
            .iter()
            .filter(|(_, e)| matches!(e, Entry::Ready(_)))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// Recomputes on every call; for benchmarks and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NopCache;

impl<K> CutCache<K> for NopCache {
    fn get_or_compute(&self, key: &K, compute: &dyn Fn(&K) -> Result<Cut>) -> Result<Cut> {
        compute(key)
    }

    fn all_known_points(&self) -> Vec<K> {
        Vec::new()
    }
}

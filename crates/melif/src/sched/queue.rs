use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{MelifError, Result};

pub type TaskId = u64;

/// Default bound on queued tasks.
pub const DEFAULT_CAPACITY: usize = 64;

/// How long `take` waits for a task before reporting starvation.
pub const DEFAULT_STARVATION_TIMEOUT: Duration = Duration::from_secs(5);

struct Slot<T> {
    id: TaskId,
    priority: f64,
    item: T,
}

impl<T> Slot<T> {
    /// Heap order: higher priority first, then submission order.
    #[inline]
    fn before(&self, other: &Slot<T>) -> bool {
        match self.priority.total_cmp(&other.priority) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.id < other.id,
        }
    }
}

struct State<T> {
    heap: Vec<Slot<T>>,
    /// Task id → heap position.
    index: HashMap<TaskId, usize>,
    next_id: TaskId,
    closed: bool,
}

impl<T> State<T> {
    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.index.insert(self.heap[a].id, a);
        self.index.insert(self.heap[b].id, b);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.heap[i].before(&self.heap[parent]) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let (l, r) = (2 * i + 1, 2 * i + 2);
            let mut best = i;
            if l < n && self.heap[l].before(&self.heap[best]) {
                best = l;
            }
            if r < n && self.heap[r].before(&self.heap[best]) {
                best = r;
            }
            if best == i {
                break;
            }
            self.swap(i, best);
            i = best;
        }
    }

    fn pop(&mut self) -> Option<Slot<T>> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let slot = self.heap.pop()?;
        self.index.remove(&slot.id);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(slot)
    }
}

/// Bounded max-priority queue whose entries can be boosted while queued.
///
/// An indexed binary heap: `take` and `increase_priority` are `O(log n)`;
/// a uniform `increase_priorities` keeps the heap order and is `O(n)`.
pub struct PriorityQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
    capacity: usize,
    starvation_timeout: Duration,
}

impl<T> PriorityQueue<T> {
    pub fn new(capacity: usize, starvation_timeout: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(MelifError::config("queue capacity must be positive"));
        }
        Ok(Self {
            state: Mutex::new(State {
                heap: Vec::with_capacity(capacity),
                index: HashMap::with_capacity(capacity),
                next_id: 0,
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
            starvation_timeout,
        })
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn starvation_timeout(&self) -> Duration {
        self.starvation_timeout
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Enqueue `item`; rejects with `QueueFull` at capacity.
    pub fn submit(&self, item: T, priority: f64) -> Result<TaskId> {
        if !priority.is_finite() {
            return Err(MelifError::config(format!(
                "task priority must be finite, got {priority}"
            )));
        }
        let mut state = self.lock();
        if state.closed {
            return Err(MelifError::TaskFailed("queue is closed".into()));
        }
        if state.heap.len() >= self.capacity {
            return Err(MelifError::QueueFull {
                capacity: self.capacity,
            });
        }
        let id = state.next_id;
        state.next_id += 1;
        let at = state.heap.len();
        state.heap.push(Slot { id, priority, item });
        state.index.insert(id, at);
        state.sift_up(at);
        drop(state);
        self.available.notify_one();
        Ok(id)
    }

    /// Highest-priority task, waiting up to the starvation timeout.
    ///
    /// `Ok(None)` once the queue is closed and drained.
    pub fn take(&self) -> Result<Option<(TaskId, T)>> {
        let start = Instant::now();
        let mut state = self.lock();
        loop {
            if let Some(slot) = state.pop() {
                return Ok(Some((slot.id, slot.item)));
            }
            if state.closed {
                return Ok(None);
            }
            let waited = start.elapsed();
            if waited >= self.starvation_timeout {
                return Err(MelifError::Starvation {
                    waited_ms: waited.as_millis(),
                });
            }
            state = self
                .available
                .wait_timeout(state, self.starvation_timeout - waited)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Boost one queued task; `false` if it already left the queue.
    pub fn increase_priority(&self, id: TaskId, delta: f64) -> bool {
        let mut state = self.lock();
        let Some(&at) = state.index.get(&id) else {
            return false;
        };
        state.heap[at].priority += delta;
        if delta >= 0.0 {
            state.sift_up(at);
        } else {
            state.sift_down(at);
        }
        true
    }

    /// Boost every queued task by the same amount.
    pub fn increase_priorities(&self, delta: f64) {
        let mut state = self.lock();
        for slot in &mut state.heap {
            slot.priority += delta;
        }
    }

    /// Current priority of a queued task.
    pub fn priority_of(&self, id: TaskId) -> Option<f64> {
        let state = self.lock();
        state.index.get(&id).map(|&at| state.heap[at].priority)
    }

    /// Stop accepting tasks; waiting takers drain what is left, then get `None`.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }
}

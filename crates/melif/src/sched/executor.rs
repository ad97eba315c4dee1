use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::queue::{PriorityQueue, TaskId, DEFAULT_CAPACITY, DEFAULT_STARVATION_TIMEOUT};
use crate::error::{MelifError, Result};

#[derive(Clone, Copy, Debug)]
pub struct SchedCfg {
    pub threads: usize,
    pub capacity: usize,
    pub starvation_timeout: Duration,
}

impl Default for SchedCfg {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism().map_or(4, NonZeroUsize::get),
            capacity: DEFAULT_CAPACITY,
            starvation_timeout: DEFAULT_STARVATION_TIMEOUT,
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Completion<T> {
    value: Mutex<Option<Result<T>>>,
    cv: Condvar,
}

impl<T> Completion<T> {
    fn set(&self, result: Result<T>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        self.cv.notify_all();
    }
}

/// Waitable result of one submitted task.
pub struct TaskHandle<T> {
    id: TaskId,
    done: Arc<Completion<T>>,
}

impl<T> TaskHandle<T> {
    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_done(&self) -> bool {
        self.done
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Block until the task finished; a panic surfaces as `TaskFailed`.
    pub fn wait(self) -> Result<T> {
        let mut guard = self
            .done
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = guard.take() {
                return result;
            }
            guard = self.done.cv.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

struct Shared {
    queue: PriorityQueue<Job>,
    /// Submitted and not yet finished.
    outstanding: AtomicUsize,
    alive: AtomicUsize,
    fatal: Mutex<Option<MelifError>>,
}

impl Shared {
    fn record(&self, err: MelifError) {
        let mut fatal = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if fatal.is_none() {
            *fatal = Some(err);
        }
    }

    fn fatal(&self) -> Option<MelifError> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Cloneable submission side of an `Executor`; tasks use it to submit follow-ups.
#[derive(Clone)]
pub struct Spawner {
    shared: Arc<Shared>,
}

impl Spawner {
    pub fn submit<T, F>(&self, priority: f64, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        if self.shared.alive.load(Ordering::SeqCst) == 0 {
            return Err(self.shared.fatal().unwrap_or_else(|| {
                MelifError::TaskFailed("executor has no live workers".into())
            }));
        }
        let done = Arc::new(Completion {
            value: Mutex::new(None),
            cv: Condvar::new(),
        });
        let job: Job = {
            let done = done.clone();
            let shared = self.shared.clone();
            Box::new(move || {
                let result = catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
                    Err(MelifError::TaskFailed(panic_message(payload)))
                });
                done.set(result);
                shared.outstanding.fetch_sub(1, Ordering::SeqCst);
            })
        };
        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        match self.shared.queue.submit(job, priority) {
            Ok(id) => Ok(TaskHandle { id, done }),
            Err(err) => {
                self.shared.outstanding.fetch_sub(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    pub fn increase_priority(&self, id: TaskId, delta: f64) -> bool {
        self.shared.queue.increase_priority(id, delta)
    }

    pub fn increase_priorities(&self, delta: f64) {
        self.shared.queue.increase_priorities(delta);
    }

    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::SeqCst)
    }
}

/// Fixed-size worker pool fed by one shared `PriorityQueue`.
///
/// A worker whose `take` starves keeps waiting while any task is still
/// outstanding; with nothing outstanding it records `Starvation` and exits.
/// The last worker to exit closes the queue, so later submissions fail
/// instead of waiting forever. `shutdown` reports the first such error.
pub struct Executor {
    spawner: Spawner,
    workers: Vec<JoinHandle<()>>,
}

impl Executor {
    pub fn new(cfg: SchedCfg) -> Result<Self> {
        if cfg.threads == 0 {
            return Err(MelifError::config("executor needs at least one thread"));
        }
        let shared = Arc::new(Shared {
            queue: PriorityQueue::new(cfg.capacity, cfg.starvation_timeout)?,
            outstanding: AtomicUsize::new(0),
            alive: AtomicUsize::new(cfg.threads),
            fatal: Mutex::new(None),
        });
        let workers = (0..cfg.threads)
            .map(|n| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("melif-worker-{n}"))
                    .spawn(move || work(&shared))
                    .map_err(|e| MelifError::TaskFailed(format!("spawning worker {n}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(threads = cfg.threads, capacity = cfg.capacity, "executor started");
        Ok(Self {
            spawner: Spawner { shared },
            workers,
        })
    }

    #[inline]
    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    pub fn submit<T, F>(&self, priority: f64, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.spawner.submit(priority, task)
    }

    pub fn increase_priorities(&self, delta: f64) {
        self.spawner.increase_priorities(delta);
    }

    /// Close the queue, let workers drain it, and join them.
    pub fn shutdown(mut self) -> Result<()> {
        self.spawner.shared.queue.close();
        for worker in std::mem::take(&mut self.workers) {
            if worker.join().is_err() {
                warn!("worker thread panicked outside a task");
            }
        }
        match self.spawner.shared.fatal() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.spawner.shared.queue.close();
    }
}

fn work(shared: &Shared) {
    loop {
        match shared.queue.take() {
            Ok(Some((_, job))) => job(),
            Ok(None) => break,
            Err(MelifError::Starvation { waited_ms }) => {
                if shared.outstanding.load(Ordering::SeqCst) > 0 {
                    debug!(waited_ms, "worker idle while tasks are running");
                    continue;
                }
                warn!(waited_ms, "worker starved with no outstanding work");
                shared.record(MelifError::Starvation { waited_ms });
                break;
            }
            Err(err) => {
                shared.record(err);
                break;
            }
        }
    }
    if shared.alive.fetch_sub(1, Ordering::SeqCst) == 1 {
        // last worker out: refuse new jobs and run any that were accepted meanwhile
        shared.queue.close();
        while let Ok(Some((_, job))) = shared.queue.take() {
            job();
        }
    }
}

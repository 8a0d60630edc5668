//! # Deferred-Value Protocol
//!
//! Any computation that needs data which may still be in flight returns
//! [`Deferred<T>`]. The error half, [`Loading`], carries a reason and a hook
//! to be told when it is worth trying again.
//!
//! ```text
//! tick-context caller:  Err(Loading) ──► skip this cycle, retry next tick
//! one-shot caller:      Err(Loading) ──► wait_for(callback) ──► retry once
//! ```
//!
//! Suspension is never logged as a failure.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

/// Result of a computation that may have to wait for data.
pub type Deferred<T> = Result<T, Loading>;

/// Callback run when a waited-for dependency becomes ready.
pub type Callback = Box<dyn FnOnce() + Send>;

/// Something a [`Loading`] can wait on.
pub trait WaitFor: Send + Sync {
    /// Registers `callback` to run once when this source changes.
    ///
    /// If the source is already ready the callback may run before this
    /// returns.
    fn wait_for(&self, callback: Callback) -> Waiting;
}

/// A queue of callbacks fired together by [`WaitQueue::notify`].
#[derive(Default)]
pub struct WaitQueue {
    waiters: Mutex<Vec<(u64, Callback)>>,
    next: AtomicU64,
}

impl WaitQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a callback.
    pub fn add(self: &Arc<Self>, callback: Callback) -> Waiting {
        let key = self.next.fetch_add(1, Ordering::Relaxed);
        self.waiters.lock().push((key, callback));
        Waiting {
            entries: vec![(Arc::downgrade(self), key)],
        }
    }

    /// Queues a callback, then fires the queue if `ready` already holds.
    ///
    /// Closes the window between a failed readiness check and registration.
    pub fn add_checked(self: &Arc<Self>, callback: Callback, ready: impl FnOnce() -> bool) -> Waiting {
        let waiting = self.add(callback);
        if ready() {
            self.notify();
        }
        waiting
    }

    /// Runs and clears every queued callback.
    pub fn notify(&self) {
        let fired = std::mem::take(&mut *self.waiters.lock());
        for (_, callback) in fired {
            callback();
        }
    }

    /// Number of callbacks still queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Whether no callbacks are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cancel(&self, key: u64) {
        self.waiters.lock().retain(|(k, _)| *k != key);
    }
}

impl WaitFor for Arc<WaitQueue> {
    fn wait_for(&self, callback: Callback) -> Waiting {
        self.add(callback)
    }
}

/// Registration handle returned by [`WaitFor::wait_for`].
///
/// Dropping it keeps the registration; call [`Waiting::cancel`] to withdraw.
#[must_use = "dropping a Waiting keeps the callback registered; call cancel() to withdraw it"]
#[derive(Default)]
pub struct Waiting {
    entries: Vec<(Weak<WaitQueue>, u64)>,
}

impl Waiting {
    /// A handle that refers to nothing (the callback already ran).
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Withdraws every registration behind this handle.
    pub fn cancel(self) {
        for (queue, key) in self.entries {
            if let Some(queue) = queue.upgrade() {
                queue.cancel(key);
            }
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.entries.extend(other.entries);
        self
    }
}

/// The "not ready yet" signal.
#[derive(Clone)]
pub struct Loading {
    reason: Cow<'static, str>,
    source: Arc<dyn WaitFor>,
}

impl Loading {
    /// Creates a signal that waits on `source`.
    pub fn new(reason: impl Into<Cow<'static, str>>, source: Arc<dyn WaitFor>) -> Self {
        Self {
            reason: reason.into(),
            source,
        }
    }

    /// Human-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Registers a callback for when the blocking dependency resolves.
    pub fn wait_for(&self, callback: Callback) -> Waiting {
        self.source.wait_for(callback)
    }

    /// Composes two waits: the callback fires once, when either resolves.
    ///
    /// Keeps this signal's reason.
    #[must_use]
    pub fn or(self, other: Loading) -> Loading {
        Loading {
            reason: self.reason,
            source: Arc::new(EitherWait(self.source, other.source)),
        }
    }
}

impl fmt::Debug for Loading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Loading").field(&self.reason).finish()
    }
}

impl fmt::Display for Loading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loading: {}", self.reason)
    }
}

impl std::error::Error for Loading {}

struct EitherWait(Arc<dyn WaitFor>, Arc<dyn WaitFor>);

impl WaitFor for EitherWait {
    fn wait_for(&self, callback: Callback) -> Waiting {
        let once = Arc::new(Mutex::new(Some(callback)));
        let fire = |once: Arc<Mutex<Option<Callback>>>| -> Callback {
            Box::new(move || {
                let callback = once.lock().take();
                if let Some(callback) = callback {
                    callback();
                }
            })
        };
        let a = self.0.wait_for(fire(Arc::clone(&once)));
        let b = self.1.wait_for(fire(once));
        a.merge(b)
    }
}

/// A value that becomes available at some later point.
///
/// Stands in for anything fetched asynchronously: resources, terrain, ...
pub struct LoadCell<T> {
    inner: Arc<CellInner<T>>,
}

struct CellInner<T> {
    name: Cow<'static, str>,
    value: RwLock<Option<Arc<T>>>,
    queue: Arc<WaitQueue>,
}

impl<T: Send + Sync + 'static> LoadCell<T> {
    /// Creates an empty cell.
    pub fn pending(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            inner: Arc::new(CellInner {
                name: name.into(),
                value: RwLock::new(None),
                queue: WaitQueue::new(),
            }),
        }
    }

    /// Creates a cell that is already resolved.
    pub fn ready(name: impl Into<Cow<'static, str>>, value: T) -> Self {
        let cell = Self::pending(name);
        *cell.inner.value.write() = Some(Arc::new(value));
        cell
    }

    /// Returns the value, or the signal to wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Loading`] while the cell is unresolved.
    pub fn get(&self) -> Deferred<Arc<T>> {
        if let Some(v) = self.inner.value.read().as_ref() {
            return Ok(Arc::clone(v));
        }
        Err(Loading::new(
            format!("waiting for {}", self.inner.name),
            Arc::clone(&self.inner) as Arc<dyn WaitFor>,
        ))
    }

    /// Returns the value if resolved.
    #[must_use]
    pub fn peek(&self) -> Option<Arc<T>> {
        self.inner.value.read().clone()
    }

    /// Resolves the cell and wakes every waiter.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = Some(Arc::new(value));
        self.inner.queue.notify();
    }
}

impl<T> Clone for LoadCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync> WaitFor for CellInner<T> {
    fn wait_for(&self, callback: Callback) -> Waiting {
        self.queue.add_checked(callback, || self.value.read().is_some())
    }
}

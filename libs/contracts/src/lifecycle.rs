//! Start/stop bookkeeping for contract implementers.
//!
//! Provides:
//! - `Lifecycle` for idempotent start and stop transitions with uptime
//! - `ResourceStack` to record what `start()` acquired so that `stop()`
//!   releases it, including after a start that failed half-way

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// Lifecycle states of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

type Release = Box<dyn FnOnce() + Send>;

/// Release actions for acquired resources, run in reverse order of
/// acquisition. Anything still held is released on drop.
#[derive(Default)]
pub struct ResourceStack {
    releases: Vec<(String, Release)>,
}

impl ResourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a resource and how to release it.
    pub fn push(&mut self, name: impl Into<String>, release: impl FnOnce() + Send + 'static) {
        self.releases.push((name.into(), Box::new(release)));
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Releases everything, newest first. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let count = self.releases.len();
        while let Some((name, release)) = self.releases.pop() {
            debug!(resource = %name, "releasing resource");
            release();
        }
        count
    }
}

impl Drop for ResourceStack {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl std::fmt::Debug for ResourceStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.releases.iter().map(|(name, _)| name))
            .finish()
    }
}

#[derive(Debug)]
struct Inner {
    state: LifecycleState,
    started_at: Option<Instant>,
    resources: ResourceStack,
    /// Set by `stop()` while a start is in flight.
    stop_requested: bool,
}

/// Idempotent lifecycle tracker.
///
/// The lock is never held while release actions run or across an await.
///
/// ```ignore
/// async fn start(&self) -> Result<(), ContractError> {
///     if !self.lifecycle.begin_start() {
///         return Ok(());
///     }
///     let result = async {
///         let pool = connect().await?;
///         self.lifecycle.acquired("pool", move || drop(pool));
///         Ok(())
///     }
///     .await;
///     self.lifecycle.finish_start(result)
/// }
/// ```
#[derive(Debug)]
pub struct Lifecycle {
    inner: Mutex<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: LifecycleState::Stopped,
                started_at: None,
                resources: ResourceStack::new(),
                stop_requested: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Time since the last successful start, zero when not running.
    pub fn uptime(&self) -> Duration {
        self.lock()
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }

    /// Moves `Stopped` to `Starting`. Returns false when a start is already
    /// in progress or done, in which case the caller does nothing.
    pub fn begin_start(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != LifecycleState::Stopped {
            debug!(state = ?inner.state, "start ignored");
            return false;
        }
        inner.state = LifecycleState::Starting;
        true
    }

    /// Records a resource acquired during start.
    pub fn acquired(&self, name: impl Into<String>, release: impl FnOnce() + Send + 'static) {
        self.lock().resources.push(name, release);
    }

    /// Completes a start. On failure, or when `stop()` was called while
    /// starting, everything acquired so far is released and the state
    /// returns to `Stopped`. The start's own result is returned either way.
    pub fn finish_start<E: std::fmt::Display>(&self, result: Result<(), E>) -> Result<(), E> {
        let mut inner = self.lock();
        let stop_requested = std::mem::take(&mut inner.stop_requested);
        if result.is_ok() && !stop_requested {
            inner.state = LifecycleState::Running;
            inner.started_at = Some(Instant::now());
            info!(resources = inner.resources.len(), "service started");
            return result;
        }

        let mut resources = std::mem::take(&mut inner.resources);
        drop(inner);
        match &result {
            Err(e) => warn!(error = %e, "start failed, releasing acquired resources"),
            Ok(()) => info!("stopped while starting, releasing acquired resources"),
        }
        resources.release_all();
        // Still `Starting` until here, so no second start can slip in.
        self.lock().state = LifecycleState::Stopped;
        result
    }

    /// Releases everything acquired by start. Safe to call in any state
    /// and any number of times. Returns how many resources were released.
    ///
    /// During a start the state stays `Starting`; the pending
    /// `finish_start` then releases whatever else was acquired and lands
    /// in `Stopped`.
    pub fn stop(&self) -> usize {
        let (mut resources, starting) = {
            let mut inner = self.lock();
            match inner.state {
                LifecycleState::Stopped if inner.resources.is_empty() => return 0,
                LifecycleState::Starting => {
                    inner.stop_requested = true;
                    (std::mem::take(&mut inner.resources), true)
                }
                _ => {
                    inner.state = LifecycleState::Stopping;
                    (std::mem::take(&mut inner.resources), false)
                }
            }
        };
        let released = resources.release_all();
        if starting {
            debug!(released, "stop requested during start");
            return released;
        }

        let mut inner = self.lock();
        inner.state = LifecycleState::Stopped;
        inner.started_at = None;
        info!(released, "service stopped");
        released
    }
}

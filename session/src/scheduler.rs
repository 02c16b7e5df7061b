//! Cancellable timers backed by tokio tasks.

use std::future::Future;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Stops one scheduled job.
#[derive(Clone, Debug)]
pub struct CancelHandle(AbortHandle);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

/// Spawns repeating and one-shot jobs and cancels all of them on teardown.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Default)]
pub struct Scheduler {
    handles: Vec<CancelHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` now and then every `every`. A run never overlaps the next one;
    /// late ticks are delayed rather than bunched.
    pub fn schedule_repeating<F, Fut>(&mut self, every: Duration, job: F) -> CancelHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.schedule_repeating_after(Duration::ZERO, every, job)
    }

    /// Like [`schedule_repeating`](Self::schedule_repeating) but the first run
    /// happens after `first`.
    pub fn schedule_repeating_after<F, Fut>(
        &mut self,
        first: Duration,
        every: Duration,
        mut job: F,
    ) -> CancelHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + first, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                job().await;
            }
        });
        self.track(CancelHandle(task.abort_handle()))
    }

    /// Run `job` once after `delay`.
    pub fn schedule_once<Fut>(&mut self, delay: Duration, job: Fut) -> CancelHandle
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            job.await;
        });
        self.track(CancelHandle(task.abort_handle()))
    }

    /// Number of jobs that have not finished yet.
    pub fn active(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.cancel();
        }
    }

    fn track(&mut self, handle: CancelHandle) -> CancelHandle {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle.clone());
        handle
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

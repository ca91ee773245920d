use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use crate::{ExecutorError, ExecutorResult, PoolEvent};

/// Live view into a pool, shareable with handlers and observers.
///
/// Counters reflect the most recent run. A task is counted as active from
/// the moment it is admitted until the pool has observed its outcome. Only
/// one run at a time may drive a monitor.
#[derive(Clone)]
pub struct PoolMonitor {
    inner: Arc<MonitorState>,
}

struct MonitorState {
    running: AtomicBool,
    active: AtomicUsize,
    concurrency: AtomicUsize,
    total: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    events: broadcast::Sender<PoolEvent>,
}

impl PoolMonitor {
    pub(crate) fn new(concurrency: usize, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));

        Self {
            inner: Arc::new(MonitorState {
                running: AtomicBool::new(false),
                active: AtomicUsize::new(0),
                concurrency: AtomicUsize::new(concurrency),
                total: AtomicUsize::new(0),
                succeeded: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                events,
            }),
        }
    }

    /// Claim the monitor for a new run and reset its counters.
    ///
    /// Fails if another run still holds the monitor.
    pub(crate) fn begin_run(&self, total: usize, concurrency: usize) -> ExecutorResult<RunGuard> {
        let state = &self.inner;
        if state
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ExecutorError::AlreadyRunning);
        }

        state.active.store(0, Ordering::SeqCst);
        state.concurrency.store(concurrency, Ordering::SeqCst);
        state.total.store(total, Ordering::SeqCst);
        state.succeeded.store(0, Ordering::SeqCst);
        state.failed.store(0, Ordering::SeqCst);

        Ok(RunGuard { monitor: self.clone() })
    }

    /// Tasks detached or aborted with the run are no longer observed
    fn end_run(&self) {
        let state = &self.inner;
        state.active.store(0, Ordering::SeqCst);
        state.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_concurrency(&self, concurrency: usize) {
        self.inner.concurrency.store(concurrency, Ordering::SeqCst);
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_settled(&self, succeeded: bool) {
        let state = &self.inner;
        if succeeded {
            state.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            state.failed.fetch_add(1, Ordering::SeqCst);
        }
        let _ = state.active.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
            Some(active.saturating_sub(1))
        });
    }

    pub(crate) fn emit(&self, event: PoolEvent) {
        trace!("Pool event: {}", event.event_name());
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.inner.events.subscribe()
    }

    /// True while a run holds this monitor
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Number of tasks currently in flight
    pub fn active_count(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Concurrency ceiling of the current (or upcoming) run
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency.load(Ordering::SeqCst)
    }

    pub fn has_reached_concurrency_limit(&self) -> bool {
        self.active_count() >= self.concurrency()
    }

    /// Items the current run was started with
    pub fn total_items(&self) -> usize {
        self.inner.total.load(Ordering::SeqCst)
    }

    pub fn succeeded_count(&self) -> usize {
        self.inner.succeeded.load(Ordering::SeqCst)
    }

    /// Failed items, whether collected or routed to an error handler
    pub fn failed_count(&self) -> usize {
        self.inner.failed.load(Ordering::SeqCst)
    }

    pub fn processed_count(&self) -> usize {
        self.succeeded_count() + self.failed_count()
    }

    /// Share of items settled so far; 0.0 before a run with items
    pub fn processed_percentage(&self) -> f64 {
        let total = self.total_items();
        if total == 0 {
            0.0
        } else {
            (self.processed_count() as f64 / total as f64) * 100.0
        }
    }
}

/// Exclusive claim on a monitor for the duration of one run.
///
/// Dropping it, whether the run finished, failed or was cancelled, releases
/// the monitor and clears the active count.
pub(crate) struct RunGuard {
    monitor: PoolMonitor,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.monitor.end_run();
    }
}

impl std::fmt::Debug for PoolMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolMonitor")
            .field("running", &self.is_running())
            .field("active", &self.active_count())
            .field("concurrency", &self.concurrency())
            .field("total", &self.total_items())
            .field("succeeded", &self.succeeded_count())
            .field("failed", &self.failed_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunId;
    use chrono::Utc;

    #[test]
    fn test_counters_track_admission_and_settlement() {
        let monitor = PoolMonitor::new(2, 16);
        let _guard = monitor.begin_run(4, 2).unwrap();

        monitor.record_admitted();
        monitor.record_admitted();
        assert_eq!(monitor.active_count(), 2);
        assert!(monitor.has_reached_concurrency_limit());

        monitor.record_settled(true);
        assert!(!monitor.has_reached_concurrency_limit());
        monitor.record_settled(false);

        assert_eq!(monitor.active_count(), 0);
        assert_eq!(monitor.processed_count(), 2);
        assert_eq!(monitor.succeeded_count(), 1);
        assert_eq!(monitor.failed_count(), 1);
        assert_eq!(monitor.processed_percentage(), 50.0);
    }

    #[test]
    fn test_begin_run_resets_counters() {
        let monitor = PoolMonitor::new(1, 16);
        let guard = monitor.begin_run(1, 1).unwrap();
        monitor.record_admitted();
        monitor.record_settled(true);
        drop(guard);

        let _guard = monitor.begin_run(3, 5).unwrap();
        assert_eq!(monitor.processed_count(), 0);
        assert_eq!(monitor.concurrency(), 5);
        assert_eq!(monitor.total_items(), 3);
        assert_eq!(monitor.processed_percentage(), 0.0);
    }

    #[test]
    fn test_overlapping_runs_are_rejected() {
        let monitor = PoolMonitor::new(2, 16);
        let guard = monitor.begin_run(2, 2).unwrap();
        monitor.record_admitted();

        assert!(monitor.is_running());
        assert!(matches!(monitor.begin_run(2, 2), Err(ExecutorError::AlreadyRunning)));
        assert_eq!(monitor.active_count(), 1);

        drop(guard);
        assert!(!monitor.is_running());
        assert!(monitor.begin_run(2, 2).is_ok());
    }

    #[test]
    fn test_released_run_clears_active_count() {
        let monitor = PoolMonitor::new(3, 16);
        let guard = monitor.begin_run(3, 3).unwrap();
        monitor.record_admitted();
        monitor.record_admitted();

        drop(guard);
        assert_eq!(monitor.active_count(), 0);
        assert!(!monitor.has_reached_concurrency_limit());
    }

    #[test]
    fn test_active_count_never_goes_below_zero() {
        let monitor = PoolMonitor::new(1, 16);
        let _guard = monitor.begin_run(1, 1).unwrap();

        monitor.record_settled(true);
        assert_eq!(monitor.active_count(), 0);
        assert!(!monitor.has_reached_concurrency_limit());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let monitor = PoolMonitor::new(1, 0);
        let mut events = monitor.subscribe();

        monitor.emit(PoolEvent::TaskStarted {
            run_id: RunId::from("r"),
            index: 7,
            at: Utc::now(),
        });

        let event = events.recv().await.unwrap();
        assert_eq!(event.event_name(), "task_started");
        assert_eq!(event.index(), Some(7));
    }
}

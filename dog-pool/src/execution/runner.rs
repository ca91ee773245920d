use std::any::Any;
use std::fmt::Display;
use chrono::Utc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    BoxError, ExecutorError, ExecutorResult, PoolError, PoolEvent, PoolMonitor, PoolOutput, RunId,
    execution::handler::{ErrorHandler, ItemHandler, TaskHook},
};

/// Immutable snapshot of a pool's configuration for one run.
///
/// The plan's `run` future is the only writer of the output collections:
/// spawned tasks hand their outcome back through the `JoinSet`.
pub(crate) struct RunPlan<T, R, E> {
    pub run_id: RunId,
    pub name: Option<String>,
    pub concurrency: usize,
    pub items: Vec<T>,
    pub handler: ItemHandler<T, R, E>,
    pub error_handler: Option<ErrorHandler<T, E>>,
    pub on_task_started: Vec<TaskHook<T>>,
    pub on_task_finished: Vec<TaskHook<T>>,
    pub monitor: PoolMonitor,
}

/// What a spawned task reports back when it settles
struct Settled<T, R, E> {
    index: usize,
    item: T,
    outcome: Outcome<R, E>,
}

enum Outcome<R, E> {
    Succeeded(R),
    /// No error handler configured; the error is collected
    Failed(E),
    /// The error handler consumed the error
    Handled(String),
    /// The error handler itself failed
    HandlerFailed(String, BoxError),
}

impl<T, R, E> RunPlan<T, R, E>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    E: Display + Send + 'static,
{
    #[instrument(
        name = "pool_run",
        skip(self),
        fields(
            run_id = %self.run_id,
            pool = self.name.as_deref().unwrap_or("default"),
            concurrency = self.concurrency,
            items = self.items.len(),
        )
    )]
    pub async fn run(mut self) -> ExecutorResult<PoolOutput<T, R, E>> {
        let total = self.items.len();
        let items = std::mem::take(&mut self.items);

        // Held until every exit path, including cancellation of this future
        let _guard = self.monitor.begin_run(total, self.concurrency)?;
        self.monitor.emit(PoolEvent::RunStarted {
            run_id: self.run_id.clone(),
            total,
            concurrency: self.concurrency,
            at: Utc::now(),
        });
        info!("Starting pool run over {} items with concurrency {}", total, self.concurrency);

        let mut tasks = JoinSet::new();
        let mut output = PoolOutput::with_capacity(total);

        match self.drive(items, &mut tasks, &mut output).await {
            Ok(()) => {
                let succeeded = output.results.len();
                let failed = total - succeeded;
                self.monitor.emit(PoolEvent::RunFinished {
                    run_id: self.run_id.clone(),
                    succeeded,
                    failed,
                    at: Utc::now(),
                });
                info!("Pool run finished: {} succeeded, {} failed", succeeded, failed);
                Ok(output)
            }
            Err(e) => {
                // Tasks already admitted keep running; nobody observes them,
                // and releasing the guard drops them from the active count
                let orphaned = tasks.len();
                tasks.detach_all();
                error!("Pool run aborted with {} tasks still in flight: {}", orphaned, e);
                Err(e)
            }
        }
    }

    /// Admission loop followed by the drain phase
    async fn drive(
        &self,
        items: Vec<T>,
        tasks: &mut JoinSet<Settled<T, R, E>>,
        output: &mut PoolOutput<T, R, E>,
    ) -> ExecutorResult<()> {
        for (index, item) in items.into_iter().enumerate() {
            // Wait for any one task to settle, not necessarily the oldest
            while tasks.len() >= self.concurrency {
                debug!("Concurrency limit reached, waiting for a free slot");
                self.settle_next(tasks, output).await?;
            }

            self.admit(tasks, index, item);
        }

        debug!("All items admitted, draining {} active tasks", tasks.len());
        while !tasks.is_empty() {
            self.settle_next(tasks, output).await?;
        }

        Ok(())
    }

    fn admit(&self, tasks: &mut JoinSet<Settled<T, R, E>>, index: usize, item: T) {
        for hook in &self.on_task_started {
            hook(&item, index);
        }

        let handler = self.handler.clone();
        let error_handler = self.error_handler.clone();

        tasks.spawn(async move {
            let outcome = match handler(item.clone(), index).await {
                Ok(value) => Outcome::Succeeded(value),
                Err(error) => match error_handler {
                    Some(error_handler) => {
                        let message = error.to_string();
                        match error_handler(error, item.clone()).await {
                            Ok(()) => Outcome::Handled(message),
                            Err(handler_error) => Outcome::HandlerFailed(message, handler_error),
                        }
                    }
                    None => Outcome::Failed(error),
                },
            };

            Settled { index, item, outcome }
        });

        self.monitor.record_admitted();
        self.monitor.emit(PoolEvent::TaskStarted {
            run_id: self.run_id.clone(),
            index,
            at: Utc::now(),
        });
        debug!("Admitted item {} ({} active)", index, tasks.len());
    }

    /// Wait for the next task to settle and record its outcome
    async fn settle_next(
        &self,
        tasks: &mut JoinSet<Settled<T, R, E>>,
        output: &mut PoolOutput<T, R, E>,
    ) -> ExecutorResult<()> {
        let settled = match tasks.join_next().await {
            Some(Ok(settled)) => settled,
            Some(Err(join_error)) => return Err(join_failure(join_error)),
            None => return Ok(()),
        };

        let Settled { index, item, outcome } = settled;

        match outcome {
            Outcome::Succeeded(value) => {
                self.monitor.record_settled(true);
                self.finished(&item, index);
                self.monitor.emit(PoolEvent::TaskSucceeded {
                    run_id: self.run_id.clone(),
                    index,
                    at: Utc::now(),
                });
                debug!("Item {} succeeded", index);
                output.push_result(index, value);
            }
            Outcome::Failed(error) => {
                self.monitor.record_settled(false);
                self.finished(&item, index);
                self.emit_failure(index, error.to_string(), false);
                warn!("Item {} failed: {}", index, error);
                output.push_error(PoolError::new(error, item, index));
            }
            Outcome::Handled(message) => {
                self.monitor.record_settled(false);
                self.finished(&item, index);
                warn!("Item {} failed, passed to error handler: {}", index, message);
                self.emit_failure(index, message, true);
            }
            Outcome::HandlerFailed(message, handler_error) => {
                self.monitor.record_settled(false);
                self.finished(&item, index);
                self.emit_failure(index, message, true);
                error!("Error handler failed for item {}: {}", index, handler_error);
                return Err(ExecutorError::ErrorHandlerFailed(handler_error));
            }
        }

        Ok(())
    }

    fn finished(&self, item: &T, index: usize) {
        for hook in &self.on_task_finished {
            hook(item, index);
        }
    }

    fn emit_failure(&self, index: usize, error: String, handled: bool) {
        self.monitor.emit(PoolEvent::TaskFailed {
            run_id: self.run_id.clone(),
            index,
            error,
            handled,
            at: Utc::now(),
        });
    }
}

fn join_failure(join_error: JoinError) -> ExecutorError {
    if join_error.is_panic() {
        ExecutorError::TaskPanicked(panic_message(join_error.into_panic()))
    } else {
        ExecutorError::Internal(format!("Task join error: {}", join_error))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_test::traced_test;
    use crate::execution::handler::{error_handler, item_handler};

    fn plan<T, R, E>(
        concurrency: usize,
        items: Vec<T>,
        handler: ItemHandler<T, R, E>,
    ) -> RunPlan<T, R, E> {
        RunPlan {
            run_id: RunId::new(),
            name: Some("test".to_string()),
            concurrency,
            items,
            handler,
            error_handler: None,
            on_task_started: Vec::new(),
            on_task_finished: Vec::new(),
            monitor: PoolMonitor::new(concurrency, 64),
        }
    }

    #[tokio::test]
    async fn test_run_collects_results_and_errors() {
        let handler = item_handler(|n: u32, _| async move {
            if n % 2 == 0 {
                Err(format!("{n} is even"))
            } else {
                Ok(n)
            }
        });

        let output = plan(2, vec![1, 2, 3, 4, 5], handler).run().await.unwrap();

        let mut results = output.results.clone();
        results.sort();
        assert_eq!(results, vec![1, 3, 5]);

        let mut failed: Vec<u32> = output.errors.iter().map(|e| *e.item()).collect();
        failed.sort();
        assert_eq!(failed, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_monitor_is_idle_after_run() {
        let handler = item_handler(|n: u32, _| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, String>(n)
        });
        let run = plan(3, (0..10).collect(), handler);
        let monitor = run.monitor.clone();

        run.run().await.unwrap();

        assert_eq!(monitor.active_count(), 0);
        assert_eq!(monitor.processed_count(), 10);
        assert_eq!(monitor.processed_percentage(), 100.0);
    }

    #[tokio::test]
    async fn test_handler_failure_aborts_run() {
        let handler = item_handler(|n: u32, _| async move { Err::<u32, _>(format!("bad {n}")) });
        let mut run = plan(1, vec![1, 2], handler);
        run.error_handler = Some(error_handler(|_e: String, _n: u32| async move {
            Err::<(), _>("handler broke")
        }));
        let monitor = run.monitor.clone();

        let err = run.run().await.unwrap_err();
        assert!(matches!(err, ExecutorError::ErrorHandlerFailed(_)));
        assert_eq!(err.to_string(), "Error handler failed: handler broke");
        assert_eq!(monitor.active_count(), 0);
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_siblings_leave_monitor_idle() {
        let handler = item_handler(|n: u32, _| async move {
            if n == 0 {
                return Err(format!("bad {n}"));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(n)
        });
        let mut run = plan(3, vec![0, 1, 2], handler);
        run.error_handler = Some(error_handler(|_e: String, _n: u32| async move {
            Err::<(), _>("handler broke")
        }));
        let monitor = run.monitor.clone();

        run.run().await.unwrap_err();
        assert_eq!(monitor.active_count(), 0);

        // The detached siblings settle later without touching the counters
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(monitor.active_count(), 0);
        assert!(!monitor.has_reached_concurrency_limit());
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let handler = item_handler(|n: u32, _| async move {
            if n == 2 {
                panic!("item two exploded");
            }
            Ok::<_, String>(n)
        });

        let err = plan(2, vec![1, 2, 3], handler).run().await.unwrap_err();
        match err {
            ExecutorError::TaskPanicked(message) => assert_eq!(message, "item two exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hooks_see_every_item() {
        let started = Arc::new(std::sync::Mutex::new(Vec::new()));
        let finished = Arc::new(std::sync::Mutex::new(Vec::new()));

        let handler = item_handler(|n: u32, _| async move { Ok::<_, String>(n) });
        let mut run = plan(2, vec![10, 20, 30], handler);

        let sink = started.clone();
        run.on_task_started.push(Arc::new(move |item: &u32, index: usize| {
            sink.lock().unwrap().push((*item, index))
        }));
        let sink = finished.clone();
        run.on_task_finished.push(Arc::new(move |item: &u32, index: usize| {
            sink.lock().unwrap().push((*item, index))
        }));

        run.run().await.unwrap();

        assert_eq!(*started.lock().unwrap(), vec![(10, 0), (20, 1), (30, 2)]);
        let mut finished = finished.lock().unwrap().clone();
        finished.sort();
        assert_eq!(finished, vec![(10, 0), (20, 1), (30, 2)]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_run_is_logged() {
        let handler = item_handler(|n: u32, _| async move {
            if n == 1 {
                Err("one failed".to_string())
            } else {
                Ok(n)
            }
        });

        plan(2, vec![0, 1, 2], handler).run().await.unwrap();

        assert!(logs_contain("Starting pool run over 3 items with concurrency 2"));
        assert!(logs_contain("Item 1 failed: one failed"));
        assert!(logs_contain("Pool run finished: 2 succeeded, 1 failed"));
    }
}

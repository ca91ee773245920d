use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::{
    BoxError, ExecutorError, ExecutorResult, PoolConfig, PoolMonitor, PoolOutput, RunId,
    execution::handler::{self, ErrorHandler, ItemHandler, ItemProcessor, TaskHook},
    execution::runner::RunPlan,
};

/// Bounded-concurrency task pool.
///
/// Configure it with the chainable setters, then call [`TaskPool::start`] to
/// run the handler over every item with at most `concurrency` invocations in
/// flight. Results and errors come back in completion order.
///
/// ```rust
/// use dog_pool::TaskPool;
///
/// # #[tokio::main]
/// # async fn main() -> dog_pool::ExecutorResult<()> {
/// let output = TaskPool::new()
///     .with_concurrency(2)
///     .for_items(vec![1, 2, 3, 4, 5])
///     .with_handler(|n: u32, _index| async move { Ok::<_, std::io::Error>(n * 10) })
///     .start()
///     .await?;
///
/// assert_eq!(output.results.len(), 5);
/// assert!(output.errors.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct TaskPool<T, R, E> {
    config: PoolConfig,
    items: Vec<T>,
    handler: Option<ItemHandler<T, R, E>>,
    error_handler: Option<ErrorHandler<T, E>>,
    on_task_started: Vec<TaskHook<T>>,
    on_task_finished: Vec<TaskHook<T>>,
    monitor: PoolMonitor,
}

impl<T, R, E> TaskPool<T, R, E> {
    /// Create a pool with concurrency 10, no items and no handlers
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool from an explicit configuration.
    ///
    /// The pool gets a fresh [`PoolMonitor`]; take handles with
    /// [`TaskPool::monitor`] after this call.
    pub fn with_config(config: PoolConfig) -> Self {
        let monitor = PoolMonitor::new(config.concurrency, config.event_capacity);

        Self {
            config,
            items: Vec::new(),
            handler: None,
            error_handler: None,
            on_task_started: Vec::new(),
            on_task_finished: Vec::new(),
            monitor,
        }
    }

    /// Set the concurrency ceiling for the upcoming run
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self.monitor.set_concurrency(concurrency);
        self
    }

    /// Label used in log records for this pool
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Set the items to process, replacing any previous ones
    pub fn for_items<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        self.items = items.into_iter().collect();
        self
    }

    /// Set the async processing function, called with each item and its index
    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        T: 'static,
        R: 'static,
        E: 'static,
        F: Fn(T, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        self.handler = Some(handler::item_handler(handler));
        self
    }

    /// Set a processing function that completes synchronously
    pub fn with_sync_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(T, usize) -> Result<R, E> + Send + Sync + 'static,
        T: 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        self.handler = Some(handler::sync_item_handler(handler));
        self
    }

    /// Use an [`ItemProcessor`] as the processing function
    pub fn with_processor<P>(mut self, processor: P) -> Self
    where
        T: Send + 'static,
        P: ItemProcessor<T, Output = R, Error = E>,
    {
        self.handler = Some(handler::processor_handler(processor));
        self
    }

    /// Route item failures to `handler` instead of collecting them.
    ///
    /// If the handler itself fails, the whole run fails with
    /// [`ExecutorError::ErrorHandlerFailed`] and collected results are dropped.
    pub fn handle_error<F, Fut, HE>(mut self, handler: F) -> Self
    where
        T: 'static,
        E: 'static,
        F: Fn(E, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HE>> + Send + 'static,
        HE: Into<BoxError> + 'static,
    {
        self.error_handler = Some(handler::error_handler(handler));
        self
    }

    /// Called when an item is admitted, before its handler runs
    pub fn on_task_started<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T, usize) + Send + Sync + 'static,
    {
        self.on_task_started.push(Arc::new(hook));
        self
    }

    /// Called once the pool has observed an item's outcome
    pub fn on_task_finished<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T, usize) + Send + Sync + 'static,
    {
        self.on_task_finished.push(Arc::new(hook));
        self
    }

    /// Check the configuration without running anything
    pub fn validate(&self) -> ExecutorResult<&Self> {
        self.config.validate()?;

        if self.handler.is_none() {
            return Err(ExecutorError::MissingHandler);
        }

        Ok(self)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Handle for observing this pool from handlers or other tasks
    pub fn monitor(&self) -> PoolMonitor {
        self.monitor.clone()
    }

    pub fn active_count(&self) -> usize {
        self.monitor.active_count()
    }

    pub fn has_reached_concurrency_limit(&self) -> bool {
        self.monitor.has_reached_concurrency_limit()
    }
}

impl<T, R, E> TaskPool<T, R, E>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    E: Display + Send + 'static,
{
    /// Validate, then process every item and wait for all of them to settle.
    ///
    /// Runs against a snapshot of the current configuration. Fails on a
    /// configuration error, a failing error handler, a panicking task, or
    /// with [`ExecutorError::AlreadyRunning`] while another run of this pool
    /// is still in progress.
    pub async fn start(&self) -> ExecutorResult<PoolOutput<T, R, E>> {
        self.validate()?;

        let handler = self.handler.clone().ok_or(ExecutorError::MissingHandler)?;

        let plan = RunPlan {
            run_id: RunId::new(),
            name: self.config.name.clone(),
            concurrency: self.config.concurrency,
            items: self.items.clone(),
            handler,
            error_handler: self.error_handler.clone(),
            on_task_started: self.on_task_started.clone(),
            on_task_finished: self.on_task_finished.clone(),
            monitor: self.monitor.clone(),
        };

        plan.run().await
    }
}

impl<T, R, E> Default for TaskPool<T, R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, R, E> Clone for TaskPool<T, R, E> {
    /// The clone gets its own monitor, so it can run alongside the original
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            items: self.items.clone(),
            handler: self.handler.clone(),
            error_handler: self.error_handler.clone(),
            on_task_started: self.on_task_started.clone(),
            on_task_finished: self.on_task_finished.clone(),
            monitor: PoolMonitor::new(self.config.concurrency, self.config.event_capacity),
        }
    }
}

impl<T, R, E> std::fmt::Debug for TaskPool<T, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("config", &self.config)
            .field("items", &self.items.len())
            .field("has_handler", &self.handler.is_some())
            .field("has_error_handler", &self.error_handler.is_some())
            .field("monitor", &self.monitor)
            .finish()
    }
}

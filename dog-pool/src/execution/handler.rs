use std::future::Future;
use std::sync::Arc;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

use crate::BoxError;

/// Type-erased per-item processing function
pub(crate) type ItemHandler<T, R, E> =
    Arc<dyn Fn(T, usize) -> BoxFuture<'static, Result<R, E>> + Send + Sync>;

/// Type-erased error handler
pub(crate) type ErrorHandler<T, E> =
    Arc<dyn Fn(E, T) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Observer hook invoked with an item and its index
pub(crate) type TaskHook<T> = Arc<dyn Fn(&T, usize) + Send + Sync>;

/// Reusable item processing logic, as an alternative to a closure
#[async_trait]
pub trait ItemProcessor<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    type Output: Send + 'static;
    type Error: Send + 'static;

    async fn process(&self, item: T, index: usize) -> Result<Self::Output, Self::Error>;
}

pub(crate) fn item_handler<T, R, E, F, Fut>(handler: F) -> ItemHandler<T, R, E>
where
    T: 'static,
    R: 'static,
    E: 'static,
    F: Fn(T, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    Arc::new(move |item, index| handler(item, index).boxed())
}

pub(crate) fn sync_item_handler<T, R, E, F>(handler: F) -> ItemHandler<T, R, E>
where
    F: Fn(T, usize) -> Result<R, E> + Send + Sync + 'static,
    T: 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    Arc::new(move |item, index| futures::future::ready(handler(item, index)).boxed())
}

pub(crate) fn processor_handler<T, P>(processor: P) -> ItemHandler<T, P::Output, P::Error>
where
    T: Send + 'static,
    P: ItemProcessor<T>,
{
    let processor = Arc::new(processor);
    Arc::new(move |item, index| {
        let processor = processor.clone();
        async move { processor.process(item, index).await }.boxed()
    })
}

pub(crate) fn error_handler<T, E, F, Fut, HE>(handler: F) -> ErrorHandler<T, E>
where
    T: 'static,
    E: 'static,
    F: Fn(E, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HE>> + Send + 'static,
    HE: Into<BoxError> + 'static,
{
    Arc::new(move |error, item| handler(error, item).map(|res| res.map_err(Into::into)).boxed())
}

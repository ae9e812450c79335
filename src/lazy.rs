//! Lazily constructed handlers.
//!
//! Some handlers are expensive to build: they load templates, open pools, or
//! read files. A [`Lazy`] defers that work to the first request that reaches
//! its slot in the chain. The factory's output is cached in place and every
//! later request, on any thread, reuses it.
//!
//! The factory runs on its own spawned task, not on the request that
//! triggered it. Concurrent first requests queue behind that one task
//! instead of racing the factory, and a request dropped mid-resolution (the
//! client hung up) leaves the build running for whoever asks next. The
//! result lands in a per-slot [`OnceCell`].
//!
//! A factory that fails leaves the slot empty, so the next request (or the
//! next queued waiter) calls it again. Failures are never cached.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::handler::{BoxFuture, BoxedHandler, Handler};

type Factory<S> = dyn Fn() -> BoxFuture<'static, Result<BoxedHandler<S>>> + Send + Sync;

/// A handler produced on first use by an asynchronous factory.
///
/// Clones share one cache: the same `Lazy` placed in two chains still runs
/// its factory once.
pub struct Lazy<S> {
    inner: Arc<LazyInner<S>>,
}

struct LazyInner<S> {
    factory: Box<Factory<S>>,
    resolved: OnceCell<BoxedHandler<S>>,
    /// The factory task currently building the handler, if any.
    in_flight: Mutex<Option<JoinHandle<Result<BoxedHandler<S>>>>>,
}

impl<S: 'static> Lazy<S> {
    /// Wraps an async factory. Nothing runs until the first resolution.
    pub fn new<F, Fut, H>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<H>> + Send + 'static,
        H: Handler<S>,
    {
        let factory = move || -> BoxFuture<'static, Result<BoxedHandler<S>>> {
            let fut = factory();
            Box::pin(async move {
                let handler: BoxedHandler<S> = Arc::new(fut.await?);
                Ok(handler)
            })
        };
        Self {
            inner: Arc::new(LazyInner {
                factory: Box::new(factory),
                resolved: OnceCell::new(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Returns the cached handler, running the factory if no earlier call
    /// has succeeded yet.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn resolve(&self) -> Result<BoxedHandler<S>> {
        if let Some(handler) = self.inner.resolved.get() {
            return Ok(Arc::clone(handler));
        }

        let mut slot = self.inner.in_flight.lock().await;
        // Another waiter may have finished the build while we queued.
        if let Some(handler) = self.inner.resolved.get() {
            return Ok(Arc::clone(handler));
        }

        let task = slot.get_or_insert_with(|| {
            debug!("initialising lazy handler");
            tokio::spawn((self.inner.factory)())
        });
        // If this future is dropped here the task keeps running and stays in
        // the slot for the next caller.
        let outcome = task.await;
        *slot = None;

        match outcome {
            Ok(Ok(handler)) => {
                let _ = self.inner.resolved.set(Arc::clone(&handler));
                debug!("lazy handler ready");
                Ok(handler)
            }
            Ok(Err(e)) => Err(e),
            Err(join) => Err(Error::handler(join)),
        }
    }

    /// `true` once a factory call has succeeded.
    pub fn is_resolved(&self) -> bool {
        self.inner.resolved.initialized()
    }
}

impl<S> Clone for Lazy<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

/// One slot of a chain: a ready handler or one still to be built.
pub enum HandlerEntry<S> {
    Ready(BoxedHandler<S>),
    Lazy(Lazy<S>),
}

impl<S: 'static> HandlerEntry<S> {
    /// Resolves the slot to a concrete handler.
    ///
    /// A ready entry is handed back untouched; a lazy one goes through
    /// [`Lazy::resolve`].
    pub async fn resolve(&self) -> Result<BoxedHandler<S>> {
        match self {
            Self::Ready(handler) => Ok(Arc::clone(handler)),
            Self::Lazy(lazy) => lazy.resolve().await,
        }
    }
}

impl<S> Clone for HandlerEntry<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Ready(handler) => Self::Ready(Arc::clone(handler)),
            Self::Lazy(lazy) => Self::Lazy(lazy.clone()),
        }
    }
}

impl<S> From<Lazy<S>> for HandlerEntry<S> {
    fn from(lazy: Lazy<S>) -> Self {
        Self::Lazy(lazy)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use std::time::Duration;

    use super::*;
    use crate::handler::handler_fn;
    use crate::{Context, Response};

    fn counting(calls: Arc<AtomicUsize>) -> Lazy<()> {
        Lazy::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<_, Error>(handler_fn(|_ctx: &mut Context<()>| {
                    Box::pin(async { Ok(Response::text("lazy")) })
                }))
            }
        })
    }

    #[tokio::test]
    async fn ready_entry_resolves_to_itself() {
        let handler: BoxedHandler<()> = Arc::new(handler_fn(|_ctx: &mut Context<()>| {
            Box::pin(async { Ok(Response::text("ready")) })
        }));
        let entry = HandlerEntry::Ready(Arc::clone(&handler));

        let resolved = entry.resolve().await.unwrap();

        assert!(Arc::ptr_eq(&resolved, &handler));
    }

    #[tokio::test]
    async fn factory_runs_once_across_resolutions() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(Arc::clone(&calls));
        assert!(!lazy.is_resolved());

        let first = lazy.resolve().await.unwrap();
        let second = lazy.resolve().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(lazy.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clones_share_one_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(Arc::clone(&calls));
        let other = lazy.clone();

        let (a, b) = tokio::join!(lazy.resolve(), other.resolve());

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("factory unavailable")]
    struct Unavailable;

    #[tokio::test]
    async fn failed_factory_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy: Lazy<()> = Lazy::new(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    return Err(Error::handler(Unavailable));
                }
                Ok::<_, Error>(handler_fn(|_ctx: &mut Context<()>| {
                    Box::pin(async { Ok(Response::text("second try")) })
                }))
            }
        });

        let err = lazy.resolve().await.err().unwrap();
        assert!(err.downcast_ref::<Unavailable>().is_some());
        assert!(!lazy.is_resolved());

        lazy.resolve().await.unwrap();
        assert!(lazy.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_resolution_keeps_building() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy: Lazy<()> = Lazy::new(move || {
            let calls = Arc::clone(&counter);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, Error>(handler_fn(|_ctx: &mut Context<()>| {
                    Box::pin(async { Ok(Response::text("slow")) })
                }))
            }
        });

        let first = tokio::spawn({
            let lazy = lazy.clone();
            async move { lazy.resolve().await.map(|_| ()) }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        lazy.resolve().await.unwrap();
        assert!(lazy.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

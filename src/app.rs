//! The application: a chain plus everything a request context needs.
//!
//! [`App`] is what the [`Server`](crate::Server) serves. For every request it
//! builds a fresh [`Context`] (fresh state included), runs the chain, and is
//! the one place where a failure becomes a response: a chain error is logged
//! and answered with an empty `500 Internal Server Error`.

use std::future::Future;
use std::sync::Arc;

use tracing::error;

use crate::chain::Chain;
use crate::config::Config;
use crate::context::{BuildCache, ConnInfo, Context, ContextBuilder, Fallback, NoBuildCache, not_found};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

type StateInit<S> = dyn Fn() -> S + Send + Sync;

/// A servable application.
///
/// ```rust
/// use baton::{App, Chain, Response};
/// use http::StatusCode;
///
/// let chain = Chain::<()>::builder()
///     .handler_fn(|_ctx| Box::pin(async { Ok(Response::text("hi")) }))
///     .build();
///
/// let app = App::new(chain).fallback(|| async { StatusCode::NOT_FOUND });
/// # let _ = app;
/// ```
pub struct App<S> {
    chain: Chain<S>,
    state: Arc<StateInit<S>>,
    config: Arc<Config>,
    fallback: Fallback,
    build_cache: Arc<dyn BuildCache>,
}

impl<S: Default + Send + 'static> App<S> {
    /// Each request starts with `S::default()`; see [`App::state`] to
    /// change that.
    pub fn new(chain: Chain<S>) -> Self {
        Self {
            chain,
            state: Arc::new(S::default),
            config: Arc::new(Config::default()),
            fallback: not_found(),
            build_cache: Arc::new(NoBuildCache),
        }
    }
}

impl<S: Send + 'static> App<S> {
    /// Sets the initial state bag of every request.
    pub fn state(mut self, init: impl Fn() -> S + Send + Sync + 'static) -> Self {
        self.state = Arc::new(init);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Sets the response produced when the chain runs out of handlers.
    /// Defaults to an empty `404 Not Found`.
    pub fn fallback<F, Fut, R>(mut self, producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.fallback = Arc::new(move || -> BoxFuture<'static, Response> {
            let fut = producer();
            Box::pin(async move { fut.await.into_response() })
        });
        self
    }

    pub fn build_cache(mut self, build_cache: impl BuildCache) -> Self {
        self.build_cache = Arc::new(build_cache);
        self
    }

    pub fn chain(&self) -> &Chain<S> {
        &self.chain
    }

    /// Builds the request context without running anything.
    pub fn context(&self, request: Request, info: ConnInfo) -> Context<S> {
        ContextBuilder::new(request, info, (self.state)())
            .config(Arc::clone(&self.config))
            .fallback(Arc::clone(&self.fallback))
            .build_cache(Arc::clone(&self.build_cache))
            .build()
    }

    /// Handles one request end to end. Never fails.
    pub async fn handle(&self, request: Request, info: ConnInfo) -> Response {
        let path = request.path().to_owned();
        let ctx = self.context(request, info);
        match self.chain.run(ctx).await {
            Ok(res) => res,
            Err(e) => {
                error!(peer = %info.remote_addr, %path, "request failed: {e}");
                Response::status(http::StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

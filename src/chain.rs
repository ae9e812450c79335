//! Handler chains.
//!
//! A [`Chain`] is the ordered list of handlers configured for an application
//! or route. It is built once at startup, shared by every request, and never
//! reordered. Running it is a single call:
//!
//! ```text
//! chain.run(ctx)
//!   └─ ctx.next()              cursor 0 → handler 0
//!        └─ ctx.next()         cursor 1 → handler 1
//!             └─ …             cursor n → fallback response
//!        ← post-`next` code of handler 1
//!   ← post-`next` code of handler 0
//! ```
//!
//! Code a handler runs after `ctx.next().await` happens during the unwind,
//! in reverse order of entry.

use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::handler::{BoxFuture, Handler, HandlerResult};
use crate::lazy::{HandlerEntry, Lazy};
use crate::response::Response;

/// An immutable, cheaply clonable sequence of handler entries.
pub struct Chain<S> {
    entries: Arc<[HandlerEntry<S>]>,
}

impl<S> Chain<S> {
    /// A chain with no handlers: running it yields the fallback response.
    pub fn empty() -> Self {
        Self { entries: Arc::from(Vec::new()) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HandlerEntry<S>> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[HandlerEntry<S>] {
        &self.entries
    }
}

impl<S: Send + 'static> Chain<S> {
    pub fn builder() -> ChainBuilder<S> {
        ChainBuilder::new()
    }

    /// Runs the chain for one request.
    ///
    /// Takes the context by value: one context, one traversal. Failures are
    /// returned exactly as the failing handler or factory produced them.
    pub async fn run(&self, mut ctx: Context<S>) -> Result<Response> {
        ctx.attach(self.clone());
        ctx.next().await
    }
}

impl<S> Clone for Chain<S> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries) }
    }
}

impl<S> Default for Chain<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S> FromIterator<HandlerEntry<S>> for Chain<S> {
    fn from_iter<I: IntoIterator<Item = HandlerEntry<S>>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Collects handlers, in order, into a [`Chain`].
///
/// ```rust
/// use baton::{Chain, Response};
///
/// let chain = Chain::<String>::builder()
///     .handler_fn(|ctx| Box::pin(async move {
///         ctx.state.push('A');
///         ctx.next().await
///     }))
///     .handler_fn(|ctx| Box::pin(async move {
///         Ok(Response::text(ctx.state.clone()))
///     }))
///     .build();
/// assert_eq!(chain.len(), 2);
/// ```
pub struct ChainBuilder<S> {
    entries: Vec<HandlerEntry<S>>,
}

impl<S: Send + 'static> ChainBuilder<S> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Appends a closure handler.
    pub fn handler_fn<F>(self, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context<S>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.handler(crate::handler::handler_fn(f))
    }

    /// Appends a ready handler.
    pub fn handler(self, handler: impl Handler<S>) -> Self {
        self.entry(HandlerEntry::Ready(Arc::new(handler)))
    }

    /// Appends a handler built by `factory` on first use.
    pub fn lazy<F, Fut, H>(self, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<H>> + Send + 'static,
        H: Handler<S>,
    {
        self.entry(HandlerEntry::Lazy(Lazy::new(factory)))
    }

    pub fn entry(mut self, entry: HandlerEntry<S>) -> Self {
        self.entries.push(entry);
        self
    }

    /// Appends every entry of `chain`. Lazy entries keep sharing their cache
    /// with the original chain.
    pub fn extend(mut self, chain: &Chain<S>) -> Self {
        self.entries.extend(chain.entries().iter().cloned());
        self
    }

    pub fn build(self) -> Chain<S> {
        self.entries.into_iter().collect()
    }
}

impl<S: Send + 'static> Default for ChainBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bytes::Bytes;

    use super::*;
    use crate::context::ConnInfo;

    fn ctx<S: Default>() -> Context<S> {
        let req = http::Request::get("/").body(Bytes::new()).unwrap();
        Context::builder(req.into(), ConnInfo::new(SocketAddr::from(([127, 0, 0, 1], 8000)))).build()
    }

    #[tokio::test]
    async fn empty_chain_yields_fallback() {
        let res = Chain::<()>::empty().run(ctx()).await.unwrap();
        assert_eq!(res.status_code(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn short_circuit_skips_the_rest() {
        let chain = Chain::<Vec<u8>>::builder()
            .handler_fn(|ctx| Box::pin(async move {
                ctx.state.push(1);
                Ok(Response::text("stopped"))
            }))
            .handler_fn(|ctx| Box::pin(async move {
                ctx.state.push(2);
                Ok(Response::text("downstream"))
            }))
            .build();

        let res = chain.run(ctx()).await.unwrap();

        assert_eq!(res.body(), b"stopped");
    }

    #[tokio::test]
    async fn second_next_does_not_rerun_downstream() {
        let chain = Chain::<u32>::builder()
            .handler_fn(|ctx| Box::pin(async move {
                ctx.next().await?;
                let again = ctx.next().await?;
                assert_eq!(ctx.cursor(), 2);
                Ok(again)
            }))
            .handler_fn(|ctx| Box::pin(async move {
                ctx.state += 1;
                assert_eq!(ctx.state, 1);
                Ok(Response::text("downstream"))
            }))
            .build();

        let res = chain.run(ctx()).await.unwrap();

        assert_eq!(res.status_code(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn extend_keeps_order() {
        let head = Chain::<String>::builder()
            .handler_fn(|ctx| Box::pin(async move {
                ctx.state.push('x');
                ctx.next().await
            }))
            .build();
        let chain = Chain::<String>::builder()
            .extend(&head)
            .handler_fn(|ctx| Box::pin(async move {
                ctx.state.push('y');
                Ok(Response::text(ctx.state.clone()))
            }))
            .build();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.run(ctx()).await.unwrap().body(), b"xy");
    }
}

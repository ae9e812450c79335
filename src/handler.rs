//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A chain holds handlers of *different* concrete types in one slice, so
//! every handler is erased behind `Arc<dyn Handler<S>>` and called through a
//! single virtual dispatch per step:
//!
//! ```text
//! |ctx| Box::pin(async move { … })       ← user writes this
//!        ↓ ChainBuilder::handler_fn
//! Arc::new(FnHandler(closure))           ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler<S> = Arc<dyn Handler<S>>
//! handler.call(&mut ctx)  at request time
//!        ↓
//! BoxFuture<'_, Result<Response>>        ← borrows the context until it settles
//! ```
//!
//! The returned future borrows the [`Context`] mutably, which is what lets a
//! handler run code both before and after `ctx.next().await`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::response::Response;

/// A heap-allocated, type-erased future.
///
/// `Send` lets tokio move the request task across worker threads; the
/// lifetime ties the future to the context it borrows.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What every handler resolves to.
pub type HandlerResult = Result<Response>;

/// A request handler, generic over the chain's state bag `S`.
///
/// A handler may answer directly, delegate with `ctx.next().await` (and
/// post-process what comes back), or fail. Implement it on your own types
/// when a closure gets unwieldy:
///
/// ```rust
/// use baton::{BoxFuture, Context, Handler, HandlerResult};
///
/// struct Stamp;
///
/// impl Handler<String> for Stamp {
///     fn call<'a>(&'a self, ctx: &'a mut Context<String>) -> BoxFuture<'a, HandlerResult> {
///         Box::pin(async move {
///             ctx.state.push_str("stamped");
///             ctx.next().await
///         })
///     }
/// }
/// ```
pub trait Handler<S>: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context<S>) -> BoxFuture<'a, HandlerResult>;
}

/// A type-erased handler shared by every request that traverses its chain.
pub type BoxedHandler<S> = Arc<dyn Handler<S>>;

/// Turns a closure into a [`Handler`].
///
/// The closure receives the context and returns a boxed future borrowing it:
///
/// ```rust
/// use baton::{Context, Response, handler_fn};
///
/// let hello = handler_fn(|ctx: &mut Context<()>| Box::pin(async move {
///     Ok(Response::text(format!("hello from {}", ctx.request().path())))
/// }));
/// # let _ = hello;
/// ```
pub fn handler_fn<S, F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut Context<S>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    FnHandler(f)
}

/// Newtype wrapper returned by [`handler_fn`], bridging closures to the
/// trait-object world.
pub struct FnHandler<F>(F);

impl<S, F> Handler<S> for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Context<S>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context<S>) -> BoxFuture<'a, HandlerResult> {
        (self.0)(ctx)
    }
}

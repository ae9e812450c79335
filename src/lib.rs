//! # baton
//!
//! A minimal HTTP framework whose whole request path is one middleware
//! chain. Every handler receives the request context and decides: answer
//! now, or pass the baton with `ctx.next().await` and look at what comes
//! back.
//!
//! ## The contract
//!
//! - Handlers run in the order they were added, each at most once per request.
//! - Code after `ctx.next().await` runs on the way back, innermost first.
//! - A chain that runs out of handlers answers with the fallback response
//!   (`404` unless configured otherwise). Running out is not an error.
//! - An error travels back up untouched through every `ctx.next().await`.
//!   [`App`] turns it into a `500`; nothing below it does.
//! - Lazy handlers are built by the first request that reaches them, once
//!   per process, and shared by every request after that.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use baton::{App, Chain, Response, Server, middleware};
//!
//! #[derive(Default)]
//! struct State {
//!     user: Option<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let chain = Chain::<State>::builder()
//!         .handler(middleware::trace())
//!         .handler(middleware::health())
//!         .handler_fn(|ctx| Box::pin(async move {
//!             ctx.state.user = ctx.request().header("x-user").map(str::to_owned);
//!             ctx.next().await
//!         }))
//!         .handler_fn(|ctx| Box::pin(async move {
//!             let name = ctx.state.user.as_deref().unwrap_or("stranger");
//!             Ok(Response::text(format!("hello, {name}")))
//!         }))
//!         .build();
//!
//!     Server::bind("0.0.0.0:3000").serve(App::new(chain)).await.unwrap();
//! }
//! ```

mod app;
mod chain;
mod config;
mod context;
mod error;
mod handler;
mod lazy;
mod request;
mod response;
mod server;

pub mod middleware;

pub use app::App;
pub use chain::{Chain, ChainBuilder};
pub use config::{Config, Mode};
pub use context::{BuildCache, ConnInfo, Context, ContextBuilder, Fallback, NoBuildCache, not_found};
pub use error::{BoxError, Error, Result};
pub use handler::{BoxFuture, BoxedHandler, FnHandler, Handler, HandlerResult, handler_fn};
pub use lazy::{HandlerEntry, Lazy};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use server::Server;

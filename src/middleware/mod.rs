//! Built-in handlers.
//!
//! Cross-cutting concerns that fit any chain, whatever its state type:
//!
//! - [`trace`] — per-request span with method, path, status, latency
//! - [`health`] — Kubernetes liveness and readiness probes
//!
//! ```rust
//! use baton::{Chain, Response, middleware};
//!
//! let chain = Chain::<()>::builder()
//!     .handler(middleware::trace())
//!     .handler(middleware::health())
//!     .handler_fn(|_ctx| Box::pin(async { Ok(Response::text("app")) }))
//!     .build();
//! # let _ = chain;
//! ```

pub mod health;
pub mod trace;

pub use health::{Probes, health};
pub use trace::{Trace, trace};

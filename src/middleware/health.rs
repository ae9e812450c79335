//! Kubernetes health-check probes.
//!
//! Kubernetes asks two questions. baton answers them.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Put [`health()`] early in the chain: probe requests are answered on the
//! spot and never reach the handlers behind it. Everything else is passed on.
//!
//! Override readiness with [`Probes::ready_when`] if you need to gate on
//! dependency availability (database connections, downstream services, etc.).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use http::StatusCode;

use crate::context::Context;
use crate::handler::{BoxFuture, Handler, HandlerResult};
use crate::response::Response;

/// Probe responder. See the [module docs](self).
#[derive(Clone)]
pub struct Probes {
    liveness: String,
    readiness: String,
    ready: Arc<AtomicBool>,
}

/// Probes on `/healthz` and `/readyz`, ready from the start.
pub fn health() -> Probes {
    Probes {
        liveness: "/healthz".to_owned(),
        readiness: "/readyz".to_owned(),
        ready: Arc::new(AtomicBool::new(true)),
    }
}

impl Probes {
    /// Serves the probes under different paths.
    pub fn paths(mut self, liveness: &str, readiness: &str) -> Self {
        self.liveness = liveness.to_owned();
        self.readiness = readiness.to_owned();
        self
    }

    /// Ties readiness to `flag`: `503 Service Unavailable` while it is
    /// `false`. Keep a clone of the flag to flip it after warm-up or during
    /// shutdown.
    pub fn ready_when(mut self, flag: Arc<AtomicBool>) -> Self {
        self.ready = flag;
        self
    }
}

impl<S: Send + 'static> Handler<S> for Probes {
    fn call<'a>(&'a self, ctx: &'a mut Context<S>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let path = ctx.request().path();
            // Liveness has no dependencies: if we can answer, we are alive.
            if path == self.liveness {
                return Ok(Response::text("ok"));
            }
            if path == self.readiness {
                if self.ready.load(Ordering::Acquire) {
                    return Ok(Response::text("ready"));
                }
                return Ok(Response::status(StatusCode::SERVICE_UNAVAILABLE));
            }
            ctx.next().await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bytes::Bytes;

    use super::*;
    use crate::chain::Chain;
    use crate::context::ConnInfo;

    fn chain(probes: Probes) -> Chain<()> {
        Chain::<()>::builder()
            .handler(probes)
            .handler_fn(|_ctx| Box::pin(async { Ok(Response::text("app")) }))
            .build()
    }

    async fn get(chain: &Chain<()>, path: &str) -> Response {
        let req = http::Request::get(path).body(Bytes::new()).unwrap();
        let info = ConnInfo::new(SocketAddr::from(([127, 0, 0, 1], 8000)));
        chain.run(Context::builder(req.into(), info).build()).await.unwrap()
    }

    #[tokio::test]
    async fn answers_probes_and_passes_the_rest() {
        let chain = chain(health());

        assert_eq!(get(&chain, "/healthz").await.body(), b"ok");
        assert_eq!(get(&chain, "/readyz").await.body(), b"ready");
        assert_eq!(get(&chain, "/users").await.body(), b"app");
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let chain = chain(health().paths("/live", "/ready").ready_when(Arc::clone(&flag)));

        assert_eq!(get(&chain, "/ready").await.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        flag.store(true, Ordering::Release);
        assert_eq!(get(&chain, "/ready").await.status_code(), StatusCode::OK);
        assert_eq!(get(&chain, "/healthz").await.body(), b"app");
    }
}

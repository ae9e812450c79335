//! Per-request tracing span.

use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

use crate::context::Context;
use crate::handler::{BoxFuture, Handler, HandlerResult};

/// Wraps the rest of the chain in a `request` span and logs the outcome.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

pub fn trace() -> Trace {
    Trace
}

impl<S: Send + 'static> Handler<S> for Trace {
    fn call<'a>(&'a self, ctx: &'a mut Context<S>) -> BoxFuture<'a, HandlerResult> {
        let span = info_span!(
            "request",
            method = %ctx.request().method(),
            path = %ctx.request().path(),
            peer = %ctx.info().remote_addr,
        );
        Box::pin(
            async move {
                let start = Instant::now();
                let result = ctx.next().await;
                let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
                match &result {
                    Ok(res) => info!(status = res.status_code().as_u16(), latency_us, "request completed"),
                    Err(e) => warn!(latency_us, "request failed: {e}"),
                }
                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bytes::Bytes;

    use super::*;
    use crate::chain::Chain;
    use crate::context::ConnInfo;
    use crate::{Error, Response};

    fn ctx() -> Context<()> {
        let req = http::Request::get("/t").body(Bytes::new()).unwrap();
        Context::builder(req.into(), ConnInfo::new(SocketAddr::from(([127, 0, 0, 1], 8000)))).build()
    }

    #[tokio::test]
    async fn passes_response_through() {
        let chain = Chain::<()>::builder()
            .handler(trace())
            .handler_fn(|_ctx| Box::pin(async { Ok(Response::text("traced")) }))
            .build();

        assert_eq!(chain.run(ctx()).await.unwrap().body(), b"traced");
    }

    #[tokio::test]
    async fn passes_failure_through() {
        let chain = Chain::<()>::builder()
            .handler(trace())
            .handler_fn(|_ctx| Box::pin(async { Err(Error::Config("boom".into())) }))
            .build();

        assert!(matches!(chain.run(ctx()).await, Err(Error::Config(_))));
    }
}

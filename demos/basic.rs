//! Minimal baton example: a traced chain with probes, an auth gate, a lazily
//! built greeting handler, and a response-header post-processor.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/hello
//!   curl -H 'x-user: alice' http://localhost:3000/hello
//!   curl http://localhost:3000/healthz

use std::time::Duration;

use baton::{App, BoxFuture, Chain, Config, Context, Handler, HandlerResult, Response, Server, middleware};
use http::StatusCode;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct State {
    user: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("invalid BATON_* environment");

    let chain = Chain::<State>::builder()
        .handler(middleware::trace())
        .handler(middleware::health())
        // Post-processing: runs after everything below has answered.
        .handler_fn(|ctx| Box::pin(async move {
            let mut res = ctx.next().await?;
            res.set_header("x-powered-by", "baton");
            Ok(res)
        }))
        // Gate: short-circuits anonymous requests.
        .handler_fn(|ctx| Box::pin(async move {
            let Some(user) = ctx.request().header("x-user").map(str::to_owned) else {
                return Ok(Response::status(StatusCode::UNAUTHORIZED));
            };
            ctx.state.user = Some(user);
            ctx.next().await
        }))
        // Built on the first authenticated request, then reused.
        .lazy(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, baton::Error>(Greeter { greeting: "hello".to_owned() })
        })
        .build();

    let app = App::new(chain)
        .config(config)
        .fallback(|| async { StatusCode::NOT_FOUND });

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

struct Greeter {
    greeting: String,
}

impl Handler<State> for Greeter {
    fn call<'a>(&'a self, ctx: &'a mut Context<State>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let user = ctx.state.user.as_deref().unwrap_or("stranger");
            Ok(Response::text(format!("{}, {user} ({})", self.greeting, ctx.config().current_mode())))
        })
    }
}

//! Per-request context and the chain's continuation.
//!
//! One [`Context`] is built for every inbound request and dropped once the
//! response exists. It carries everything a handler may need: the request,
//! the absolute URL, connection info, the matched route, the shared state bag,
//! and [`Context::next`], which hands control to the next handler in line.

use std::net::SocketAddr;
use std::sync::Arc;

use http::Uri;

use crate::chain::Chain;
use crate::config::Config;
use crate::error::Result;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// Produces the response returned when a chain runs out of handlers.
pub type Fallback = Arc<dyn Fn() -> BoxFuture<'static, Response> + Send + Sync>;

/// Asset lookup for the current build, used by handlers that render pages.
///
/// The chain never calls into it; it is carried through the context so
/// handlers can ask which scripts and stylesheets an entry point needs.
pub trait BuildCache: Send + Sync + 'static {
    fn entry_assets(&self) -> Vec<String>;
}

/// A [`BuildCache`] with nothing in it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBuildCache;

impl BuildCache for NoBuildCache {
    fn entry_assets(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Where a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnInfo {
    pub remote_addr: SocketAddr,
}

impl ConnInfo {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self { remote_addr }
    }
}

/// Request-scoped context handed to every handler in a chain.
///
/// `state` is the chain's shared bag: every handler sees and mutates the same
/// value, in order. Its type is fixed when the chain is built.
pub struct Context<S> {
    pub state: S,
    request: Request,
    url: Uri,
    info: ConnInfo,
    route: Option<String>,
    config: Arc<Config>,
    fallback: Fallback,
    build_cache: Arc<dyn BuildCache>,
    chain: Chain<S>,
    cursor: usize,
}

impl<S: Default> Context<S> {
    /// Starts a context for `request` with a default state bag.
    pub fn builder(request: Request, info: ConnInfo) -> ContextBuilder<S> {
        ContextBuilder::new(request, info, S::default())
    }
}

impl<S> Context<S> {
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The request URL, made absolute from the `host` header when the
    /// request line only carried a path.
    pub fn url(&self) -> &Uri {
        &self.url
    }

    pub fn info(&self) -> &ConnInfo {
        &self.info
    }

    /// The matched route pattern, if any.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn build_cache(&self) -> &dyn BuildCache {
        self.build_cache.as_ref()
    }

    /// Index of the handler the next call to [`next`](Context::next) runs.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn attach(&mut self, chain: Chain<S>) {
        self.chain = chain;
        self.cursor = 0;
    }
}

impl<S: Send + 'static> Context<S> {
    /// Runs the rest of the chain and returns its response.
    ///
    /// The handler at the cursor is resolved (building it if it is lazy),
    /// the cursor moves past it, and it is called with this context. Past
    /// the end of the chain the fallback response is returned instead.
    ///
    /// The cursor never moves back, so each handler runs at most once per
    /// request: a second call from the same handler continues from wherever
    /// the first one left the cursor.
    pub fn next(&mut self) -> BoxFuture<'_, Result<Response>> {
        Box::pin(async move {
            let chain = self.chain.clone();
            let Some(entry) = chain.get(self.cursor) else {
                return Ok((self.fallback)().await);
            };
            let handler = entry.resolve().await?;
            self.cursor += 1;
            handler.call(self).await
        })
    }
}

/// Assembles a [`Context`]. Only the request and connection info are
/// required; everything else has a neutral default.
pub struct ContextBuilder<S> {
    request: Request,
    info: ConnInfo,
    state: S,
    route: Option<String>,
    config: Arc<Config>,
    fallback: Fallback,
    build_cache: Arc<dyn BuildCache>,
}

impl<S> ContextBuilder<S> {
    pub fn new(request: Request, info: ConnInfo, state: S) -> Self {
        Self {
            request,
            info,
            state,
            route: None,
            config: Arc::new(Config::default()),
            fallback: not_found(),
            build_cache: Arc::new(NoBuildCache),
        }
    }

    pub fn state(mut self, state: S) -> Self {
        self.state = state;
        self
    }

    pub fn route(mut self, route: Option<String>) -> Self {
        self.route = route;
        self
    }

    pub fn config(mut self, config: Arc<Config>) -> Self {
        self.config = config;
        self
    }

    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn build_cache(mut self, build_cache: Arc<dyn BuildCache>) -> Self {
        self.build_cache = build_cache;
        self
    }

    pub fn build(self) -> Context<S> {
        let url = absolute_url(&self.request);
        Context {
            state: self.state,
            request: self.request,
            url,
            info: self.info,
            route: self.route,
            config: self.config,
            fallback: self.fallback,
            build_cache: self.build_cache,
            chain: Chain::empty(),
            cursor: 0,
        }
    }
}

/// The default fallback: an empty `404 Not Found`.
pub fn not_found() -> Fallback {
    Arc::new(|| -> BoxFuture<'static, Response> {
        Box::pin(async { Response::status(http::StatusCode::NOT_FOUND) })
    })
}

fn absolute_url(request: &Request) -> Uri {
    let uri = request.uri();
    if uri.authority().is_some() {
        return uri.clone();
    }
    let Some(host) = request.header("host") else {
        return uri.clone();
    };
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    Uri::builder()
        .scheme("http")
        .authority(host)
        .path_and_query(path)
        .build()
        .unwrap_or_else(|_| uri.clone())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn request(uri: &str, host: Option<&str>) -> Request {
        let mut builder = http::Request::get(uri);
        if let Some(host) = host {
            builder = builder.header("host", host);
        }
        builder.body(Bytes::new()).unwrap().into()
    }

    fn local() -> ConnInfo {
        ConnInfo::new(SocketAddr::from(([127, 0, 0, 1], 8000)))
    }

    #[test]
    fn url_is_made_absolute_from_host() {
        let ctx: Context<()> = Context::builder(request("/a?b=1", Some("example.com")), local()).build();
        assert_eq!(ctx.url().to_string(), "http://example.com/a?b=1");
    }

    #[test]
    fn url_without_host_is_kept() {
        let ctx: Context<()> = Context::builder(request("/a", None), local()).build();
        assert_eq!(ctx.url().to_string(), "/a");
        assert_eq!(ctx.route(), None);
        assert_eq!(ctx.cursor(), 0);
    }

    #[tokio::test]
    async fn next_without_chain_yields_fallback() {
        let fallback: Fallback = Arc::new(|| -> BoxFuture<'static, Response> {
            Box::pin(async { Response::text("fallback") })
        });
        let mut ctx: Context<()> = Context::builder(request("/", None), local())
            .fallback(fallback)
            .build();

        let res = ctx.next().await.unwrap();

        assert_eq!(res.body(), b"fallback");
        assert_eq!(ctx.cursor(), 0);
    }
}

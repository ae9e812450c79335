//! Unified error type.

/// A boxed application error, the payload of [`Error::Handler`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shorthand for `Result<T, baton::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by baton's fallible operations.
///
/// Application-level outcomes (404, 422, etc.) are expressed as
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures and whatever a handler or lazy factory decides to
/// fail with.
///
/// The chain never wraps or rewrites an error on its way up: the value a
/// handler returns is the value every enclosing `ctx.next().await` sees.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Reading a request body from the connection failed.
    #[error("http: {0}")]
    Hyper(#[from] hyper::Error),

    /// A configuration value could not be parsed.
    #[error("invalid config: {0}")]
    Config(String),

    /// A handler or lazy factory failed.
    #[error(transparent)]
    Handler(BoxError),
}

impl Error {
    /// Wraps any application error so it can be returned from a handler.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns the application error if it is of type `T`.
    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Handler(err) => err.downcast_ref::<T>(),
            _ => None,
        }
    }
}

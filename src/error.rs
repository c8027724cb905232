//! Error types.
//!
//! Application-level errors (404, 422, etc.) are expressed as HTTP
//! [`Response`](crate::Response) values, not as errors. The types here cover
//! the infrastructure: binding a port, writing a response, and turning
//! middleware references into middleware.

/// A type-erased error produced by a collaborator (container factory,
/// type constructor) that sluice wraps rather than redefines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by sluice's fallible application operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Binding, accepting or writing failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The middleware pipeline could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Every emitter in the stack declined the response.
    #[error("no emitter in the stack accepted the response")]
    NotEmitted,
}

/// Why a middleware identifier could not be turned into middleware.
///
/// Both kinds are fatal to the pipeline being built: nothing in sluice
/// recovers from them locally.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// The identifier names neither a container entry nor a registered type,
    /// or obtaining the value behind it failed.
    #[error("cannot resolve middleware `{id}`: {reason}")]
    MissingDependency {
        id: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The value behind the identifier is neither middleware nor a request
    /// handler.
    #[error("middleware `{id}` implements neither Middleware nor RequestHandler")]
    InvalidMiddleware { id: String },
}

impl ResolutionError {
    pub(crate) fn not_found(id: &str) -> Self {
        Self::MissingDependency {
            id: id.to_owned(),
            reason: "no container entry and no registered type by that name".to_owned(),
            source: None,
        }
    }

    pub(crate) fn lookup_failed(id: &str, source: impl Into<BoxError>) -> Self {
        Self::MissingDependency {
            id: id.to_owned(),
            reason: "the container failed to provide it".to_owned(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn construction_failed(id: &str, source: BoxError) -> Self {
        Self::MissingDependency {
            id: id.to_owned(),
            reason: "constructing the registered type failed".to_owned(),
            source: Some(source),
        }
    }

    pub(crate) fn invalid(id: &str) -> Self {
        Self::InvalidMiddleware { id: id.to_owned() }
    }

    /// The identifier that failed to resolve.
    pub fn id(&self) -> &str {
        match self {
            Self::MissingDependency { id, .. } | Self::InvalidMiddleware { id } => id,
        }
    }
}

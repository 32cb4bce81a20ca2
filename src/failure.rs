//! Request-time failures and their HTTP statuses.
//!
//! Every way a request can go wrong is a [`Failure`]. Each one knows its
//! status code, so the explaining boundary never has to guess.
//!
//! | Failure | Status |
//! |---|---|
//! | [`NoSuchResource`](Failure::NoSuchResource) | 404 |
//! | [`InvalidResourceArguments`](Failure::InvalidResourceArguments) | 400 |
//! | [`UnconvertibleArgument`](Failure::UnconvertibleArgument) | 400 |
//! | [`UnsupportedContentType`](Failure::UnsupportedContentType) | 415 (missing) / 501 (unknown) |
//! | [`NoSuchRoute`](Failure::NoSuchRoute) | 406 (non-mutating) / 415 (mutating) |
//! | [`UnknownVerb`](Failure::UnknownVerb) | 501 |
//! | [`Http`](Failure::Http) | declared by the route body |
//! | [`Internal`](Failure::Internal) | 500 |
//!
//! Only `Internal` is a *plain* failure. Everything else carries a status
//! on purpose and counts as a declared HTTP-status failure; the two groups
//! are auto-caught independently (see [`CatchMode`](crate::CatchMode)).

use std::fmt;

use http::StatusCode;

use crate::verb::Verb;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where an unconvertible argument came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArgKey {
    /// Zero-based position among the positional arguments.
    Position(usize),
    /// A keyword argument, by its lower-cased name.
    Keyword(String),
}

impl fmt::Display for ArgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(i) => write!(f, "#{i}"),
            Self::Keyword(k) => write!(f, "`{k}`"),
        }
    }
}

/// A request that could not be served.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("no resource named \"{0}\"")]
    NoSuchResource(String),

    #[error("invalid arguments for resource \"{resource}\": {reason}")]
    InvalidResourceArguments { resource: String, reason: String },

    #[error("cannot convert argument {key} from \"{value}\": {reason}")]
    UnconvertibleArgument {
        key: ArgKey,
        value: String,
        reason: String,
    },

    #[error("unsupported content type{}", .designator.as_deref().map(|d| format!(" \"{d}\"")).unwrap_or_default())]
    UnsupportedContentType { designator: Option<String> },

    #[error("resource \"{resource}\" has no {verb} route for {}", .tried.join(", "))]
    NoSuchRoute {
        resource: String,
        verb: Verb,
        tried: Vec<String>,
    },

    #[error("method \"{0}\" is not implemented")]
    UnknownVerb(String),

    #[error("{message}")]
    Http { status: StatusCode, message: String },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

/// The discriminant of a [`Failure`], used to specialize explain routes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailureKind {
    NoSuchResource,
    InvalidResourceArguments,
    UnconvertibleArgument,
    UnsupportedContentType,
    NoSuchRoute,
    UnknownVerb,
    Http,
    Internal,
}

impl Failure {
    /// A declared HTTP-status failure, for route bodies that want to refuse
    /// a request with a specific status.
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http { status, message: message.into() }
    }

    /// A generic failure wrapping any error. The wrapped error is only
    /// reachable through `source()`, so its text stays out of non-verbose
    /// explanations.
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal { message: "unhandled error".to_owned(), source: Some(Box::new(err)) }
    }

    /// A generic failure with only a message.
    pub fn internal_msg(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoSuchResource(_) => StatusCode::NOT_FOUND,
            Self::InvalidResourceArguments { .. } | Self::UnconvertibleArgument { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::UnsupportedContentType { designator: None } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::UnsupportedContentType { designator: Some(_) } => StatusCode::NOT_IMPLEMENTED,
            Self::NoSuchRoute { verb, .. } if verb.is_mutating() => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::NoSuchRoute { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::UnknownVerb(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Http { status, .. } => *status,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoSuchResource(_) => FailureKind::NoSuchResource,
            Self::InvalidResourceArguments { .. } => FailureKind::InvalidResourceArguments,
            Self::UnconvertibleArgument { .. } => FailureKind::UnconvertibleArgument,
            Self::UnsupportedContentType { .. } => FailureKind::UnsupportedContentType,
            Self::NoSuchRoute { .. } => FailureKind::NoSuchRoute,
            Self::UnknownVerb(_) => FailureKind::UnknownVerb,
            Self::Http { .. } => FailureKind::Http,
            Self::Internal { .. } => FailureKind::Internal,
        }
    }

    /// True for generic faults that carry no status of their own.
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// The canonical reason phrase of [`status`](Self::status).
    pub fn reason(&self) -> &'static str {
        self.status().canonical_reason().unwrap_or("Unknown Status")
    }
}

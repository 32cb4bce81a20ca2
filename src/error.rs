//! Configuration-time error type.

/// The error type returned by restive's registration and configuration APIs.
///
/// Request-level problems (404, 406, 415, etc.) are expressed as
/// [`Failure`](crate::Failure) values and explained to the client. This type
/// surfaces mistakes made while building the engine: an unknown content-type
/// designator, a route on a resource that was never registered, a malformed
/// configuration file. None of these ever reach a client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown content type `{0}`")]
    UnknownContentType(String),

    #[error("malformed content type designator `{0}`")]
    MalformedContentType(String),

    #[error("`{0}` is not a concrete content type")]
    NotALeaf(String),

    #[error("no resource named `{0}`")]
    UnknownResource(String),

    #[error("route on `{resource}` specializes {given} positionals, the signature takes at most {max}")]
    TooManySpecializers {
        resource: String,
        given: usize,
        max: usize,
    },

    #[error("route `{added}` on `{resource}` overlaps `{existing}` for mutating requests")]
    AmbiguousRoute {
        resource: String,
        existing: String,
        added: String,
    },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}

//! Incoming request type.
//!
//! The transport has already read the socket; the engine only needs the
//! method, the request target and two headers. The body is passed through
//! to route bodies untouched.

use bytes::Bytes;

/// An incoming request, as extracted by the transport.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) uri: String,
    pub(crate) accept: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) body: Bytes,
}

impl Request {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            accept: None,
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Shorthand for `Request::new("GET", uri)`.
    pub fn get(uri: impl Into<String>) -> Self { Self::new("GET", uri) }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn uri(&self) -> &str { &self.uri }
    pub fn accept_header(&self) -> Option<&str> { self.accept.as_deref() }
    pub fn content_type_header(&self) -> Option<&str> { self.content_type.as_deref() }
    pub fn payload(&self) -> &Bytes { &self.body }
}

/// Headers that are not valid UTF-8 are treated as absent.
impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        let header = |name: http::header::HeaderName| {
            parts.headers.get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        Self {
            method: parts.method.as_str().to_owned(),
            uri: parts.uri.to_string(),
            accept: header(http::header::ACCEPT),
            content_type: header(http::header::CONTENT_TYPE),
            body: body.into(),
        }
    }
}

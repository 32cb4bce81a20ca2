//! What route bodies return ([`Reply`]) and what the engine hands back to the
//! transport ([`Response`]).
//!
//! A route body only says what it knows: the payload, and optionally a status
//! and a payload content type. The engine fills in the rest: `200` or `204`
//! depending on whether there is a payload, and the negotiated content type.

use bytes::Bytes;
use http::StatusCode;

use crate::failure::Failure;

// ── Reply ────────────────────────────────────────────────────────────────────

/// The outcome of a route body.
///
/// ```rust
/// use restive::Reply;
/// use http::StatusCode;
///
/// Reply::new(br#"{"id":1}"#.to_vec());
/// Reply::empty();
/// Reply::new("created")
///     .status(StatusCode::CREATED)
///     .content_type("text/plain; charset=utf-8");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Reply {
    pub(crate) body: Bytes,
    pub(crate) status: Option<StatusCode>,
    pub(crate) content_type: Option<String>,
}

impl Reply {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into(), status: None, content_type: None }
    }

    /// No payload. Defaults to `204 No Content`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A payload declared as `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(body.into()).content_type("text/plain; charset=utf-8")
    }

    /// A payload declared as `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(body).content_type("application/json")
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_owned());
        self
    }

    pub fn body(&self) -> &Bytes { &self.body }
}

// ── IntoReply ────────────────────────────────────────────────────────────────

/// Conversion of a route body's return value into a [`Reply`].
///
/// Implemented for `Reply`, strings, byte buffers, `()`, a bare
/// [`StatusCode`], and `Result<T, E>` where `T: IntoReply` and
/// `E: Into<Failure>`, so bodies can use `?` freely.
pub trait IntoReply {
    fn into_reply(self) -> Result<Reply, Failure>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, Failure> { Ok(self) }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Reply, Failure> { Ok(Reply::new(self)) }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Reply, Failure> { Ok(Reply::new(self)) }
}

impl IntoReply for Vec<u8> {
    fn into_reply(self) -> Result<Reply, Failure> { Ok(Reply::new(self)) }
}

impl IntoReply for Bytes {
    fn into_reply(self) -> Result<Reply, Failure> { Ok(Reply::new(self)) }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply, Failure> { Ok(Reply::empty()) }
}

/// Return a status directly from a body: `return StatusCode::ACCEPTED`
impl IntoReply for StatusCode {
    fn into_reply(self) -> Result<Reply, Failure> { Ok(Reply::empty().status(self)) }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<Failure>,
{
    fn into_reply(self) -> Result<Reply, Failure> {
        self.map_err(Into::into)?.into_reply()
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// A finished response: status, content type and payload.
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) content_type: String,
    pub(crate) body: Bytes,
}

impl Response {
    pub(crate) fn new(status: StatusCode, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self { status, content_type: content_type.into(), body: body.into() }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn content_type(&self) -> &str { &self.content_type }
    pub fn body(&self) -> &Bytes { &self.body }

    /// The payload as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Converts into an [`http::Response`] for the transport to write out.
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        if let Ok(value) = http::HeaderValue::from_str(&self.content_type) {
            response.headers_mut().insert(http::header::CONTENT_TYPE, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_propagate_failures() {
        let ok: Result<&'static str, Failure> = Ok("fine");
        assert_eq!(ok.into_reply().unwrap().body(), "fine");

        let err: Result<String, Failure> = Err(Failure::http(StatusCode::CONFLICT, "taken"));
        let failure = err.into_reply().unwrap_err();
        assert_eq!(failure.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn status_only_reply_is_empty() {
        let reply = StatusCode::ACCEPTED.into_reply().unwrap();
        assert!(reply.body().is_empty());
        assert_eq!(reply.status, Some(StatusCode::ACCEPTED));
    }

    #[test]
    fn into_http_sets_content_type_header() {
        let response = Response::new(StatusCode::OK, "application/json", "{}");
        let converted = response.into_http();
        assert_eq!(converted.status(), StatusCode::OK);
        assert_eq!(converted.headers()[http::header::CONTENT_TYPE], "application/json");
        assert_eq!(converted.body(), "{}");
    }
}

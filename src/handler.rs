//! Route bodies and type erasure.
//!
//! # How bodies are stored
//!
//! A resource holds routes whose bodies are closures of *different* types.
//! Rust collections hold one concrete type, so each body is boxed behind a
//! trait object (`dyn RouteBody`) and every route stores the same thing.
//!
//! ```text
//! |call: &Call<'_>| -> impl IntoReply        ← user writes this
//!        ↓ engine.route("items", …, body)
//! Box::new(body) as Box<dyn RouteBody>       ← blanket impl below
//!        ↓ stored in the resource's route list
//! route.body.call(&call) at request time     ← one vtable dispatch
//!        ↓
//! body(call).into_reply()                    ← Result<Reply, Failure>
//! ```
//!
//! Explain bodies go through the same erasure with [`ExplainCall`] in place
//! of [`Call`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use bytes::Bytes;

use crate::explain::ExplainCall;
use crate::failure::Failure;
use crate::media::MediaType;
use crate::registry::Args;
use crate::response::{IntoReply, Reply};
use crate::value::Value;
use crate::verb::Verb;

// ── Call ─────────────────────────────────────────────────────────────────────

/// Everything a route body is invoked with.
pub struct Call<'a> {
    pub(crate) verb: Verb,
    pub(crate) resource: &'a str,
    pub(crate) media: MediaType,
    pub(crate) content_type: &'a str,
    pub(crate) args: &'a Args,
    pub(crate) body: &'a Bytes,
}

impl Call<'_> {
    pub fn verb(&self) -> Verb { self.verb }
    pub fn resource(&self) -> &str { self.resource }

    /// The negotiated content type: for GET, the representation the client
    /// will receive; for POST and PUT, the one it sent.
    pub fn content_type(&self) -> &str { self.content_type }
    pub fn media(&self) -> MediaType { self.media }

    pub fn args(&self) -> &Args { self.args }

    /// Positional argument `i`, defaults included.
    pub fn arg(&self, i: usize) -> Option<&Value> { self.args.positional().get(i) }

    /// Keyword argument by lower-cased name, defaults included.
    pub fn keyword(&self, name: &str) -> Option<&Value> { self.args.keyword(name) }

    /// The raw request body.
    pub fn payload(&self) -> &Bytes { self.body }
}

// ── Erasure ──────────────────────────────────────────────────────────────────

pub(crate) trait RouteBody: Send + Sync {
    fn call(&self, call: &Call<'_>) -> Result<Reply, Failure>;
}

impl<F, R> RouteBody for F
where
    F: Fn(&Call<'_>) -> R + Send + Sync,
    R: IntoReply,
{
    fn call(&self, call: &Call<'_>) -> Result<Reply, Failure> {
        self(call).into_reply()
    }
}

pub(crate) type BoxedBody = Box<dyn RouteBody>;

pub(crate) trait ExplainBody: Send + Sync {
    fn call(&self, call: &ExplainCall<'_>) -> Result<Reply, Failure>;
}

impl<F, R> ExplainBody for F
where
    F: Fn(&ExplainCall<'_>) -> R + Send + Sync,
    R: IntoReply,
{
    fn call(&self, call: &ExplainCall<'_>) -> Result<Reply, Failure> {
        self(call).into_reply()
    }
}

pub(crate) type BoxedExplainer = Box<dyn ExplainBody>;

// ── Panic guard ──────────────────────────────────────────────────────────────

/// Runs a body, turning a panic into a generic failure.
pub(crate) fn guarded(f: impl FnOnce() -> Result<Reply, Failure>) -> Result<Reply, Failure> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_owned());
            Err(Failure::internal_msg(format!("body panicked: {message}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_passes_outcomes_through() {
        let reply = guarded(|| Ok(Reply::new("hi"))).unwrap();
        assert_eq!(reply.body(), "hi");
    }

    #[test]
    fn guarded_turns_panics_into_internal_failures() {
        let failure = guarded(|| panic!("kaboom")).unwrap_err();
        assert!(failure.is_plain());
        assert_eq!(failure.to_string(), "internal error: body panicked: kaboom");
    }
}

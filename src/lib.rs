//! # restive
//!
//! A transport-agnostic REST dispatch engine.
//!
//! The transport reads the socket; restive decides what the request means.
//! It takes a method, a URI, an Accept header and a Content-Type header,
//! and hands back a status, a content type and a payload.
//!
//! ## The model
//!
//! - **Resources** are named, like functions. `/items/42?color=red` calls
//!   resource `items` with positional `42` and keyword `color = red`.
//! - **Routes** are the methods of a resource, specialized on verb, content
//!   type and the types of positional arguments. The most specific route
//!   for the client's most preferred representation wins.
//! - **Failures** are explained to the client: brutally as plain text, or
//!   politely in a representation the client accepts.
//!
//! Content types form a tree (`*/*` → `text/*` → `text/plain`), as do verbs
//! and argument kinds. Nothing here does I/O.
//!
//! ## Quick start
//!
//! ```rust
//! use restive::{ArgKind, CatchMode, Call, Engine, EngineConfig, Request, Signature, Verb};
//!
//! let config = EngineConfig::default().catch_all(CatchMode::CatchPlain);
//! let mut engine = Engine::with_config(config)?;
//! engine
//!     .resource("items", Signature::new().required("id").keyword("color"))?
//!     .route("items", Verb::Get, "application/json", &[ArgKind::Integer], |call: &Call<'_>| {
//!         let id = call.arg(0).and_then(|v| v.as_i64()).unwrap_or_default();
//!         format!(r#"{{"id":{id}}}"#)
//!     })?;
//!
//! let ok = engine.handle(&Request::get("/items/42?color=red").accept("application/json"))?;
//! assert_eq!(ok.status(), 200);
//! assert_eq!(ok.content_type(), "application/json");
//!
//! let bad = engine.handle(&Request::get("/items/abc").accept("application/json"))?;
//! assert_eq!(bad.status(), 400);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod dispatch;
mod engine;
mod error;
mod explain;
mod failure;
mod handler;
mod media;
mod negotiate;
mod registry;
mod request;
mod response;
mod uri;
mod value;
mod verb;

pub use config::{CatchMode, EngineConfig, ExplainStyle};
pub use engine::Engine;
pub use error::Error;
pub use explain::{ExplainCall, brutal};
pub use failure::{ArgKey, Failure, FailureKind};
pub use handler::Call;
pub use media::{ContentTypes, MediaType, NodeKind};
pub use negotiate::{Negotiator, accept_entries};
pub use registry::{Args, FRAGMENT, Registry, Resource, Route, Signature};
pub use request::Request;
pub use response::{IntoReply, Reply, Response};
pub use uri::{DecodedUri, StandardDecomposer, UriContext, UriDecomposer, uri_for};
pub use value::{ArgKind, LiteralError, Value};
pub use verb::{Verb, VerbKind};

//! The dispatch engine.
//!
//! # Request lifecycle
//!
//! ```text
//! Parsing ─► Resolved ─► ArgsChecked ─► ContentNegotiated ─► Invoked ─► Responded
//!    │           │            │                 │                │
//!    │       NotFound    ArgsInvalid          NoRoute          failed
//!    └───────────┴────────────┴─────────────────┴────────────────┴──► Explaining ─► Responded
//!                                                                         │
//!                                                          DoNotCatch ────┴──► Err(Failure)
//! ```
//!
//! Every failure is raised where it is detected and unwinds, via `?`, to one
//! boundary in [`Engine::handle`]. The boundary checks the catch mode of the
//! failure's group and either renders an explanation or hands the failure
//! back to the caller.
//!
//! # Sharing
//!
//! Registration takes `&mut Engine`; request handling takes `&Engine`. Build
//! the engine at startup, then share it behind an `Arc` across as many
//! request tasks as the transport likes.

use tracing::{debug, debug_span, error};

use crate::config::{CatchMode, EngineConfig, ExplainStyle};
use crate::dispatch::{PayloadDefaults, invoke, match_route};
use crate::error::Error;
use crate::explain::{Ask, ExplainCall, Explainer, brutal};
use crate::failure::{Failure, FailureKind};
use crate::handler::Call;
use crate::media::{ContentTypes, MediaType};
use crate::negotiate::Negotiator;
use crate::registry::{Registry, Signature};
use crate::request::Request;
use crate::response::{IntoReply, Response};
use crate::uri::{StandardDecomposer, UriContext, UriDecomposer, uri_for};
use crate::value::{ArgKind, Value};
use crate::verb::{Verb, VerbKind};

/// Where a request is in its lifecycle. Only used for tracing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Resolved,
    NotFound,
    ArgsChecked,
    ArgsInvalid,
    ContentNegotiated,
    NoRoute,
    Invoked,
    Explaining,
    Responded,
}

impl Phase {
    /// The failure state a failure of this kind leaves the request in.
    fn failed(kind: FailureKind) -> Self {
        match kind {
            FailureKind::NoSuchResource => Self::NotFound,
            FailureKind::InvalidResourceArguments | FailureKind::UnconvertibleArgument => Self::ArgsInvalid,
            FailureKind::UnsupportedContentType | FailureKind::NoSuchRoute => Self::NoRoute,
            FailureKind::UnknownVerb | FailureKind::Http | FailureKind::Internal => Self::Explaining,
        }
    }
}

/// What dispatch learned before it failed, for the explaining boundary.
#[derive(Debug, Default)]
struct Seen {
    resource: Option<String>,
    uri_types: Vec<MediaType>,
}

pub struct Engine {
    config: EngineConfig,
    types: ContentTypes,
    registry: Registry,
    explainer: Explainer,
    decomposer: Box<dyn UriDecomposer>,
    fallback: MediaType,
}

impl Engine {
    /// An engine with the default configuration and the standard taxonomy.
    pub fn new() -> Self {
        let types = ContentTypes::standard();
        let config = EngineConfig::default();
        let fallback = types.get(&config.fallback_type).unwrap_or(MediaType::ANY);
        Self::assemble(config, types, fallback)
    }

    /// Fails when `fallback-type` is not a concrete type of the standard
    /// taxonomy.
    pub fn with_config(config: EngineConfig) -> Result<Self, Error> {
        let types = ContentTypes::standard();
        let fallback = types.lookup(&config.fallback_type)?;
        if !types.is_leaf(fallback) {
            return Err(Error::NotALeaf(config.fallback_type));
        }
        Ok(Self::assemble(config, types, fallback))
    }

    fn assemble(config: EngineConfig, types: ContentTypes, fallback: MediaType) -> Self {
        let explainer = Explainer::standard(&types);
        Self {
            config,
            types,
            registry: Registry::new(),
            explainer,
            decomposer: Box::new(StandardDecomposer),
            fallback,
        }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn content_types(&self) -> &ContentTypes { &self.types }

    /// For registering additional content types and extensions.
    pub fn content_types_mut(&mut self) -> &mut ContentTypes { &mut self.types }

    pub fn registry(&self) -> &Registry { &self.registry }

    /// Replaces the URI decomposition strategy.
    pub fn decomposer(&mut self, decomposer: impl UriDecomposer + 'static) -> &mut Self {
        self.decomposer = Box::new(decomposer);
        self
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Registers a resource, or replaces the signature of an existing one.
    pub fn resource(&mut self, name: &str, signature: Signature) -> Result<&mut Self, Error> {
        self.registry.register(name, signature)?;
        Ok(self)
    }

    /// Removes a resource and all of its routes.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.registry.unregister(name).is_some()
    }

    /// Adds a route to a registered resource.
    ///
    /// `content` is any node of the taxonomy: a leaf, a `type/*` wildcard,
    /// or `*/*`. `specializers` constrain positional arguments left to right.
    ///
    /// ```rust
    /// use restive::{ArgKind, Engine, Signature, Verb, VerbKind};
    ///
    /// let mut engine = Engine::new();
    /// engine
    ///     .resource("items", Signature::new().required("id"))?
    ///     .route("items", Verb::Get, "application/json", &[ArgKind::Integer], |call: &restive::Call<'_>| {
    ///         format!(r#"{{"id":{}}}"#, call.arg(0).and_then(|v| v.as_i64()).unwrap_or_default())
    ///     })?
    ///     .route("items", VerbKind::Any, "text/*", &[], |_: &restive::Call<'_>| "an item")?;
    /// # Ok::<(), restive::Error>(())
    /// ```
    pub fn route<F, R>(
        &mut self,
        name: &str,
        verb: impl Into<VerbKind>,
        content: &str,
        specializers: &[ArgKind],
        body: F,
    ) -> Result<&mut Self, Error>
    where
        F: Fn(&Call<'_>) -> R + Send + Sync + 'static,
        R: IntoReply + 'static,
    {
        let content = self.types.lookup(content)?;
        let verb = verb.into();
        self.registry.add_route(&self.types, name, verb, content, specializers, Box::new(body))?;
        debug!(resource = name, verb = %verb, content = self.types.name(content), "added route");
        Ok(self)
    }

    /// Adds an explain route. `None` for `failure` or `resource` matches any.
    pub fn explain<F, R>(
        &mut self,
        failure: Option<FailureKind>,
        resource: Option<&str>,
        content: &str,
        body: F,
    ) -> Result<&mut Self, Error>
    where
        F: Fn(&ExplainCall<'_>) -> R + Send + Sync + 'static,
        R: IntoReply + 'static,
    {
        let content = self.types.lookup(content)?;
        self.explainer.add(failure, resource, content, Box::new(body));
        Ok(self)
    }

    /// A URI that dispatches to `name` with these arguments.
    ///
    /// `content_type`, when given and known to have a file extension, is
    /// appended as a content-type hint.
    pub fn uri_for(
        &self,
        name: &str,
        positional: &[Value],
        keywords: &[(String, Value)],
        content_type: Option<&str>,
    ) -> Result<String, Error> {
        let resource = self.registry.find(name).ok_or_else(|| Error::UnknownResource(name.to_owned()))?;
        let extension = match content_type {
            Some(designator) => self.types.extension(self.types.lookup(designator)?),
            None => None,
        };
        Ok(uri_for(resource.name(), positional, keywords, extension))
    }

    // ── Request handling ─────────────────────────────────────────────────────

    /// Dispatches one request.
    ///
    /// Failures whose group is caught are explained and returned as `Ok`;
    /// the others come back as `Err` for an outer layer to inspect.
    pub fn handle(&self, request: &Request) -> Result<Response, Failure> {
        let span = debug_span!("dispatch", method = request.method(), uri = request.uri());
        let _enter = span.enter();

        let mut seen = Seen::default();
        match self.dispatch(request, &mut seen) {
            Ok(response) => {
                debug!(phase = ?Phase::Responded, status = response.status().as_u16());
                Ok(response)
            }
            Err(failure) => self.boundary(request, failure, &seen),
        }
    }

    /// Like [`handle`](Self::handle), but always produces a response: a
    /// failure handed back by the boundary is explained brutally.
    pub fn respond(&self, request: &Request) -> Response {
        self.handle(request).unwrap_or_else(|failure| {
            error!(status = failure.status().as_u16(), error = %failure, "uncaught failure reached the transport");
            brutal(&failure, false)
        })
    }

    fn dispatch(&self, request: &Request, seen: &mut Seen) -> Result<Response, Failure> {
        let verb: Verb = request.method().parse()?;

        let cx = UriContext {
            types: &self.types,
            home: self.config.home_resource.as_deref(),
            extension_hints: self.config.uri_content_type_hints,
        };
        let decoded = self.decomposer.decompose(request.uri(), &cx)?;
        seen.uri_types = decoded.content_types.clone();
        seen.resource = Some(decoded.resource.clone());

        let resource = self
            .registry
            .find(&decoded.resource)
            .ok_or_else(|| Failure::NoSuchResource(decoded.resource.clone()))?;
        debug!(phase = ?Phase::Resolved, resource = resource.name());

        let args = resource.signature().bind(resource.name(), decoded.positional, decoded.keywords)?;
        debug!(phase = ?Phase::ArgsChecked, positional = args.positional().len(), keywords = args.keywords().len());

        let candidates = self.negotiator().candidates(
            verb,
            &decoded.content_types,
            request.accept_header(),
            request.content_type_header(),
        )?;
        let (media, route) = match_route(&self.types, resource, verb, &candidates, &args)?;
        debug!(phase = ?Phase::ContentNegotiated, content_type = self.types.name(media));

        let call = Call {
            verb,
            resource: resource.name(),
            media,
            content_type: self.types.name(media),
            args: &args,
            body: request.payload(),
        };
        let defaults = PayloadDefaults {
            mutating: &self.config.mutating_payload_type,
            fallback: &self.config.fallback_type,
        };
        let response = invoke(&self.types, defaults, route, &call)?;
        debug!(phase = ?Phase::Invoked);
        Ok(response)
    }

    fn boundary(&self, request: &Request, failure: Failure, seen: &Seen) -> Result<Response, Failure> {
        let status = failure.status().as_u16();
        if failure.is_plain() {
            error!(status, error = %failure, "request failed");
        } else {
            debug!(phase = ?Phase::failed(failure.kind()), status, reason = %failure);
        }

        let mode = if failure.is_plain() { self.config.catch_plain } else { self.config.catch_http };
        let verbose = match mode {
            CatchMode::DoNotCatch => {
                debug!(status, "re-raising failure");
                return Err(failure);
            }
            CatchMode::CatchPlain => false,
            CatchMode::CatchWithTrace => true,
        };

        debug!(phase = ?Phase::Explaining, status, style = ?self.config.explain);
        let response = match self.config.explain {
            ExplainStyle::Brutal => brutal(&failure, verbose),
            ExplainStyle::Polite => {
                let ask = Ask {
                    failure: &failure,
                    resource: seen.resource.as_deref(),
                    uri_types: &seen.uri_types,
                    accept: request.accept_header(),
                    verbose,
                    fallback: &self.config.fallback_type,
                };
                self.explainer.polite(&self.negotiator(), &self.types, &ask)
            }
        };
        debug!(phase = ?Phase::Responded, status = response.status().as_u16());
        Ok(response)
    }

    fn negotiator(&self) -> Negotiator<'_> {
        Negotiator::new(&self.types, self.fallback)
    }
}

impl Default for Engine {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::response::Reply;

    fn engine(config: EngineConfig) -> Engine {
        let mut engine = Engine::with_config(config).unwrap();
        engine
            .resource("items", Signature::new().optional("id", "all").keyword("color"))
            .unwrap()
            .route("items", Verb::Get, "text/plain", &[], |call: &Call<'_>| {
                format!("items {}", call.arg(0).map(ToString::to_string).unwrap_or_default())
            })
            .unwrap();
        engine
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn dispatches_a_simple_request() {
        let engine = engine(EngineConfig::default());
        let response = engine.handle(&Request::get("/items/7")).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), "text/plain");
        assert_eq!(response.text(), "items 7");
    }

    #[test]
    fn uncaught_failures_are_returned() {
        let engine = engine(EngineConfig::default());
        let failure = engine.handle(&Request::get("/nope")).unwrap_err();
        assert_eq!(failure.kind(), FailureKind::NoSuchResource);

        let response = engine.respond(&Request::get("/nope"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unknown_verbs_are_501() {
        let engine = engine(EngineConfig::default().catch_all(CatchMode::CatchPlain));
        let response = engine.handle(&Request::new("PATCH", "/items")).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn catch_groups_are_independent() {
        let mut config = EngineConfig::default();
        config.catch_http = CatchMode::CatchPlain;
        let mut engine = engine(config);
        engine
            .route("items", Verb::Get, "application/json", &[], |_: &Call<'_>| -> Result<Reply, Failure> {
                Err(Failure::internal_msg("database down"))
            })
            .unwrap();

        let missing = engine.handle(&Request::get("/nope")).unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let broken = engine.handle(&Request::get("/items").accept("application/json"));
        assert!(broken.unwrap_err().is_plain());
    }

    #[test]
    fn panicking_bodies_become_500() {
        let mut engine = engine(EngineConfig::default().catch_all(CatchMode::CatchPlain));
        engine
            .route("items", Verb::Get, "text/html", &[], |_: &Call<'_>| -> &'static str { panic!("oops") })
            .unwrap();
        let response = engine.handle(&Request::get("/items").accept("text/html")).unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.content_type().starts_with("text/html"));
    }

    #[test]
    fn uri_hint_shapes_the_explanation() {
        let engine = engine(EngineConfig::default().catch_all(CatchMode::CatchPlain));
        let response = engine.handle(&Request::get("/nope.json")).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.content_type(), "application/json");
    }

    #[test]
    fn brutal_style_ignores_accept() {
        let config = EngineConfig::default().catch_all(CatchMode::CatchPlain).explain(ExplainStyle::Brutal);
        let engine = engine(config);
        let response = engine.handle(&Request::get("/nope").accept("application/json")).unwrap();
        assert!(response.content_type().starts_with("text/plain"));
    }

    #[test]
    fn custom_explain_routes_are_used() {
        let mut engine = engine(EngineConfig::default().catch_all(CatchMode::CatchPlain));
        engine
            .explain(Some(FailureKind::NoSuchResource), None, "text/plain", |call: &ExplainCall<'_>| {
                format!("nothing called {}", call.resource().unwrap_or("?"))
            })
            .unwrap();
        let response = engine.handle(&Request::get("/widgets")).unwrap();
        assert_eq!(response.text(), "nothing called widgets");
    }

    #[test]
    fn home_resource_serves_the_root() {
        let engine = engine(EngineConfig::default().home("items"));
        assert_eq!(engine.handle(&Request::get("/")).unwrap().text(), "items all");
    }

    #[test]
    fn uri_for_uses_the_canonical_name_and_extension() {
        let engine = engine(EngineConfig::default());
        let uri = engine.uri_for("ITEMS", &[Value::Integer(3)], &[], Some("application/json")).unwrap();
        assert_eq!(uri, "/items/3.json");
        assert!(matches!(engine.uri_for("nope", &[], &[], None), Err(Error::UnknownResource(_))));
    }

    #[test]
    fn with_config_checks_the_fallback() {
        let mut config = EngineConfig::default();
        config.fallback_type = "text/*".into();
        assert!(matches!(Engine::with_config(config), Err(Error::NotALeaf(_))));
    }

    #[test]
    fn overlapping_mutating_routes_are_refused() {
        let mut engine = engine(EngineConfig::default());
        engine.route("items", Verb::Post, "text/*", &[], |_: &Call<'_>| "post").unwrap();
        let second = engine.route("items", VerbKind::Mutating, "text/plain", &[], |_: &Call<'_>| "mutating");
        assert!(matches!(second, Err(Error::AmbiguousRoute { .. })));

        let request = Request::new("POST", "/items").content_type("text/plain").body("x");
        assert_eq!(engine.handle(&request).unwrap().text(), "post");
    }

    #[test]
    fn non_ascii_keywords_reach_the_body() {
        let mut by_resource = Engine::new();
        by_resource
            .resource("Ärger", Signature::new().keyword("Grund"))
            .unwrap()
            .route("ärger", Verb::Get, "text/plain", &[], |call: &Call<'_>| {
                call.keyword("grund").map(ToString::to_string).unwrap_or_default()
            })
            .unwrap();
        let mut by_keyword = Engine::new();
        by_keyword
            .resource("items", Signature::new().keyword("Ärger"))
            .unwrap()
            .route("items", Verb::Get, "text/plain", &[], |call: &Call<'_>| {
                call.keyword("ärger").map(ToString::to_string).unwrap_or_default()
            })
            .unwrap();

        let response = by_keyword.handle(&Request::get("/items?%C3%84rger=1")).unwrap();
        assert_eq!(response.text(), "1");
        let response = by_resource.handle(&Request::get("/%C3%84RGER?grund=laut")).unwrap();
        assert_eq!(response.text(), "laut");
    }

    #[test]
    fn explain_routes_match_non_ascii_resources() {
        let mut engine = engine(EngineConfig::default().catch_all(CatchMode::CatchPlain));
        engine
            .explain(None, Some("Ärger"), "text/plain", |_: &ExplainCall<'_>| "kein Ärger hier")
            .unwrap();
        let response = engine.handle(&Request::get("/%C3%84RGER")).unwrap();
        assert_eq!(response.text(), "kein Ärger hier");
    }
}

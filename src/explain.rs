//! Explaining failures to clients.
//!
//! Two renderings exist:
//!
//! - [`brutal`] always produces `text/plain`. It cannot fail, which makes it
//!   the last resort of every other path.
//! - Polite explaining negotiates the client's accepted types against a
//!   table of explain routes, each specialized on (failure kind, resource,
//!   content type), using the same first-candidate-wins scan as ordinary
//!   dispatch. When no route fits, or the chosen body itself fails, the
//!   escalation is logged and the response falls back to [`brutal`].
//!
//! ```text
//! failure ─┬─ Brutal ───────────────────────────────────────► text/plain
//!          └─ Polite ─► negotiate ─► explain route ─► body ─► response
//!                           │              │            │
//!                           └── no match ──┴── failed ──┴───► brutal
//! ```

use std::error::Error as StdError;

use http::StatusCode;
use serde::Serialize;
use tracing::{debug, error};

use crate::dispatch::{Fit, first_match};
use crate::failure::{Failure, FailureKind};
use crate::handler::{BoxedExplainer, guarded};
use crate::media::{ContentTypes, MediaType};
use crate::negotiate::Negotiator;
use crate::response::{Reply, Response};

const PLAIN: &str = "text/plain; charset=utf-8";

// ── ExplainCall ──────────────────────────────────────────────────────────────

/// Everything an explain body is invoked with.
pub struct ExplainCall<'a> {
    pub(crate) failure: &'a Failure,
    pub(crate) resource: Option<&'a str>,
    pub(crate) media: MediaType,
    pub(crate) content_type: &'a str,
    pub(crate) verbose: bool,
}

impl ExplainCall<'_> {
    pub fn failure(&self) -> &Failure { self.failure }

    /// The resource the request named, if decomposition got that far.
    pub fn resource(&self) -> Option<&str> { self.resource }

    pub fn media(&self) -> MediaType { self.media }

    /// The negotiated representation of the explanation.
    pub fn content_type(&self) -> &str { self.content_type }

    /// Set when the failure group is caught with a trace: bodies may
    /// include diagnostic detail.
    pub fn verbose(&self) -> bool { self.verbose }

    pub fn status(&self) -> StatusCode { self.failure.status() }

    /// The failure's message followed by its `source()` chain when verbose.
    pub fn message(&self) -> String {
        if self.verbose { trace(self.failure) } else { self.failure.to_string() }
    }
}

// ── Brutal ───────────────────────────────────────────────────────────────────

/// Renders `failure` as plain text.
///
/// ```text
/// 404 Not Found
///
/// no resource named "nope"
/// ```
///
/// With `trace`, the failure's debug form and source chain follow.
pub fn brutal(failure: &Failure, trace: bool) -> Response {
    let status = failure.status();
    let mut text = format!("{} {}\n\n{failure}\n", status.as_u16(), failure.reason());
    if trace {
        text.push_str(&format!("\n{failure:#?}\n"));
        let mut source = failure.source();
        while let Some(cause) = source {
            text.push_str(&format!("caused by: {cause}\n"));
            source = cause.source();
        }
    }
    Response::new(status, PLAIN, text)
}

fn trace(failure: &Failure) -> String {
    let mut message = failure.to_string();
    let mut source = failure.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    message
}

// ── Explain routes ───────────────────────────────────────────────────────────

pub(crate) struct ExplainRoute {
    failure: Option<FailureKind>,
    resource: Option<String>,
    content: MediaType,
    body: BoxedExplainer,
}

impl ExplainRoute {
    fn same_specialization(&self, other: &ExplainRoute) -> bool {
        self.failure == other.failure && self.resource == other.resource && self.content == other.content
    }

    fn fit(&self, types: &ContentTypes, failure: FailureKind, resource: Option<&str>, candidate: MediaType) -> Fit {
        if self.failure.is_some_and(|kind| kind != failure) {
            return Fit::Rejected;
        }
        if let Some(wanted) = &self.resource {
            if resource.is_none_or(|r| r.to_lowercase() != *wanted) {
                return Fit::Rejected;
            }
        }
        if !types.is_a(candidate, self.content) {
            return Fit::Rejected;
        }
        Fit::Accepts(vec![
            usize::from(self.failure.is_some()),
            usize::from(self.resource.is_some()),
            types.depth(self.content),
        ])
    }
}

/// The explain handler: a route table specialized on failure kind,
/// resource and content type.
#[derive(Default)]
pub(crate) struct Explainer {
    routes: Vec<ExplainRoute>,
}

impl Explainer {
    /// Routes for `text/plain`, `text/html` and `application/json`, those
    /// of them `types` knows.
    pub(crate) fn standard(types: &ContentTypes) -> Self {
        let mut explainer = Self::default();
        if let Some(plain) = types.get("text/plain") {
            explainer.add(None, None, plain, Box::new(plain_body));
        }
        if let Some(html) = types.get("text/html") {
            explainer.add(None, None, html, Box::new(html_body));
        }
        if let Some(json) = types.get("application/json") {
            explainer.add(None, None, json, Box::new(json_body));
        }
        explainer
    }

    /// Adds a route; one with the same specialization is replaced.
    pub(crate) fn add(
        &mut self,
        failure: Option<FailureKind>,
        resource: Option<&str>,
        content: MediaType,
        body: BoxedExplainer,
    ) {
        let route = ExplainRoute { failure, resource: resource.map(str::to_lowercase), content, body };
        match self.routes.iter_mut().find(|r| r.same_specialization(&route)) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    /// Renders `failure` in the first representation the client accepts
    /// that some explain route handles.
    pub(crate) fn polite(&self, negotiator: &Negotiator<'_>, types: &ContentTypes, ask: &Ask<'_>) -> Response {
        let failure = ask.failure;
        let kind = failure.kind();
        let candidates = negotiator.accepted(ask.uri_types, ask.accept);
        let found = first_match(&candidates, &self.routes, |route, candidate| {
            route.fit(types, kind, ask.resource, candidate)
        });
        let Ok((media, route)) = found else {
            error!(
                status = failure.status().as_u16(),
                accept = ask.accept.unwrap_or_default(),
                "no explain route for any accepted content type, explaining brutally"
            );
            return brutal(failure, ask.verbose);
        };

        let call = ExplainCall {
            failure,
            resource: ask.resource,
            media,
            content_type: types.name(media),
            verbose: ask.verbose,
        };
        match guarded(|| route.body.call(&call)) {
            Ok(reply) => {
                let content_type = match reply.content_type {
                    Some(declared) => declared,
                    None if types.is_leaf(media) => types.name(media).to_owned(),
                    None => ask.fallback.to_owned(),
                };
                debug!(status = failure.status().as_u16(), content_type = %content_type, "explained politely");
                Response::new(failure.status(), content_type, reply.body)
            }
            Err(escalation) => {
                error!(
                    status = failure.status().as_u16(),
                    error = %escalation,
                    "explain body failed, explaining brutally"
                );
                brutal(failure, ask.verbose)
            }
        }
    }
}

/// One polite explanation request.
pub(crate) struct Ask<'a> {
    pub failure: &'a Failure,
    pub resource: Option<&'a str>,
    pub uri_types: &'a [MediaType],
    pub accept: Option<&'a str>,
    pub verbose: bool,
    pub fallback: &'a str,
}

// ── Standard bodies ──────────────────────────────────────────────────────────

fn plain_body(call: &ExplainCall<'_>) -> Reply {
    let failure = call.failure();
    Reply::text(format!("{} {}\n\n{}\n", call.status().as_u16(), failure.reason(), call.message()))
}

fn html_body(call: &ExplainCall<'_>) -> Reply {
    let status = call.status();
    let title = format!("{} {}", status.as_u16(), call.failure().reason());
    let page = format!(
        "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\n<body><h1>{title}</h1>\n<p>{}</p></body></html>\n",
        escape_html(&call.message())
    );
    Reply::new(page).content_type("text/html; charset=utf-8")
}

#[derive(Serialize)]
struct Explanation<'a> {
    status: u16,
    reason: &'a str,
    message: String,
}

fn json_body(call: &ExplainCall<'_>) -> Result<Reply, Failure> {
    let explanation = Explanation {
        status: call.status().as_u16(),
        reason: call.failure().reason(),
        message: call.message(),
    };
    let body = serde_json::to_vec(&explanation).map_err(Failure::internal)?;
    Ok(Reply::json(body))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

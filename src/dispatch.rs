//! Route matching and invocation.
//!
//! There is no generic-function system to lean on, so multiple dispatch is
//! spelled out: every route carries an explicit specialization tuple and
//! matching is a linear scan.
//!
//! ```text
//! for candidate in candidates            ← negotiation order, first wins
//!     for route in routes                ← every route that accepts it
//!         keep the most specific         ← (verb depth, content depth, arg depths…)
//!     if any: done
//! ```
//!
//! Candidate order is never traded for specificity: a generic route for the
//! client's first choice beats a perfect route for its second. Within one
//! candidate, specificity compares left to right like multiple dispatch
//! does. Every axis is a tree and exact duplicates are replaced on
//! registration, so two accepting routes can never tie.

use http::StatusCode;
use tracing::{debug, warn};

use crate::failure::{ArgKey, Failure};
use crate::handler::{Call, guarded};
use crate::media::{ContentTypes, MediaType, normalize};
use crate::registry::{Args, Resource, Route};
use crate::response::{Reply, Response};
use crate::verb::Verb;

/// How a route (or explain route) relates to one candidate.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Fit {
    /// Accepted, with a specificity key: bigger is more specific.
    Accepts(Vec<usize>),
    /// Verb and content matched, positional `i` did not.
    ArgMismatch(usize),
    Rejected,
}

/// Scans `candidates` in order and returns the first one some route accepts,
/// together with the most specific such route.
///
/// On failure, returns the smallest positional index that kept an otherwise
/// matching route out, if any.
pub(crate) fn first_match<'r, R>(
    candidates: &[MediaType],
    routes: &'r [R],
    mut fit: impl FnMut(&R, MediaType) -> Fit,
) -> Result<(MediaType, &'r R), Option<usize>> {
    let mut mismatch: Option<usize> = None;
    for &candidate in candidates {
        let mut best: Option<(Vec<usize>, &R)> = None;
        for route in routes {
            match fit(route, candidate) {
                Fit::Accepts(key) => {
                    if best.as_ref().is_none_or(|(best_key, _)| key > *best_key) {
                        best = Some((key, route));
                    }
                }
                Fit::ArgMismatch(i) => mismatch = Some(mismatch.map_or(i, |m| m.min(i))),
                Fit::Rejected => {}
            }
        }
        if let Some((_, route)) = best {
            return Ok((candidate, route));
        }
    }
    Err(mismatch)
}

/// How `route` relates to `candidate` for this verb and these arguments.
pub(crate) fn route_fit(types: &ContentTypes, route: &Route, verb: Verb, candidate: MediaType, args: &Args) -> Fit {
    if !route.verb.accepts(verb) || !types.is_a(candidate, route.content) {
        return Fit::Rejected;
    }
    let mut key = Vec::with_capacity(2 + route.specializers.len());
    key.push(route.verb.depth());
    key.push(types.depth(route.content));
    for (i, kind) in route.specializers.iter().enumerate() {
        match args.positional().get(i) {
            Some(value) if kind.accepts(value) => key.push(kind.depth()),
            Some(_) => return Fit::ArgMismatch(i),
            None => return Fit::Rejected,
        }
    }
    Fit::Accepts(key)
}

/// Finds the route for a request whose arguments already fit the signature.
pub(crate) fn match_route<'r>(
    types: &ContentTypes,
    resource: &'r Resource,
    verb: Verb,
    candidates: &[MediaType],
    args: &Args,
) -> Result<(MediaType, &'r Route), Failure> {
    let routes = resource.routes();
    match first_match(candidates, routes, |route, candidate| route_fit(types, route, verb, candidate, args)) {
        Ok(found) => Ok(found),
        Err(Some(i)) => {
            let value = &args.positional()[i];
            let mut expected: Vec<String> = Vec::new();
            let relevant = routes
                .iter()
                .filter(|r| r.verb.accepts(verb))
                .filter(|r| candidates.iter().any(|&c| types.is_a(c, r.content)));
            for kind in relevant.filter_map(|r| r.specializers.get(i)) {
                let kind = kind.to_string();
                if !expected.contains(&kind) {
                    expected.push(kind);
                }
            }
            Err(Failure::UnconvertibleArgument {
                key: ArgKey::Position(i),
                value: value.to_string(),
                reason: format!("expected {}", expected.join(" or ")),
            })
        }
        Err(None) => Err(Failure::NoSuchRoute {
            resource: resource.name().to_owned(),
            verb,
            tried: candidates.iter().map(|&c| types.name(c).to_owned()).collect(),
        }),
    }
}

/// Payload-type defaults the invoker needs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PayloadDefaults<'a> {
    /// Used for mutating verbs when the body declares nothing.
    pub mutating: &'a str,
    /// Used for non-mutating verbs when the matched type is not a leaf.
    pub fallback: &'a str,
}

/// Runs the route body and completes its reply into a response.
pub(crate) fn invoke(
    types: &ContentTypes,
    defaults: PayloadDefaults<'_>,
    route: &Route,
    call: &Call<'_>,
) -> Result<Response, Failure> {
    let reply = guarded(|| route.body.call(call))?;
    Ok(complete(types, defaults, call.verb, call.media, reply))
}

fn complete(
    types: &ContentTypes,
    defaults: PayloadDefaults<'_>,
    verb: Verb,
    matched: MediaType,
    reply: Reply,
) -> Response {
    let status = reply.status.unwrap_or(if reply.body.is_empty() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::OK
    });

    let content_type = match reply.content_type {
        Some(declared) => {
            let consistent = if verb.is_mutating() {
                normalize(&declared) == types.name(matched)
            } else {
                types.get(&declared).is_some_and(|d| types.is_a(d, matched))
            };
            if !consistent {
                warn!(
                    declared = %declared,
                    negotiated = types.name(matched),
                    "payload content type disagrees with negotiated type"
                );
            }
            declared
        }
        None if verb.is_mutating() => defaults.mutating.to_owned(),
        None if types.is_leaf(matched) => types.name(matched).to_owned(),
        None => defaults.fallback.to_owned(),
    };

    debug!(status = status.as_u16(), content_type = %content_type, "route body completed");
    Response::new(status, content_type, reply.body)
}

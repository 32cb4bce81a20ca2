//! URI decomposition and generation.
//!
//! A request target is taken apart in a fixed order:
//!
//! 1. **Content-type hint** — `/items/42.json` becomes `/items/42` plus the
//!    `application/json` leaf, when the extension is known.
//! 2. **Resource name** — the first path segment, percent-decoded. An empty
//!    path names the configured home resource.
//! 3. **Positional arguments** — the remaining segments, each read as a
//!    [`Value`] literal.
//! 4. **Keyword arguments** — `key=value` pairs from the query string, split
//!    on `&` or `;`, keys lower-cased.
//! 5. **Fragment** — stored as the `fragment` keyword.
//!
//! Every step is a provided method of [`UriDecomposer`]; a custom strategy
//! overrides only the steps it cares about. [`uri_for`] runs the process
//! backwards.

use std::borrow::Cow;

use crate::failure::{ArgKey, Failure};
use crate::media::{ContentTypes, MediaType};
use crate::registry::FRAGMENT;
use crate::value::Value;

/// A request target taken apart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedUri {
    pub resource: String,
    pub content_types: Vec<MediaType>,
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

/// What a decomposer needs from the engine.
#[derive(Clone, Copy, Debug)]
pub struct UriContext<'a> {
    pub types: &'a ContentTypes,
    pub home: Option<&'a str>,
    pub extension_hints: bool,
}

/// A strategy for taking request targets apart.
pub trait UriDecomposer: Send + Sync {
    /// Strips a known extension off the last path segment.
    fn content_type_hint<'u>(&self, path: &'u str, types: &ContentTypes) -> (&'u str, Option<MediaType>) {
        let last = path.rsplit('/').next().unwrap_or(path);
        let Some((stem, ext)) = last.rsplit_once('.') else {
            return (path, None);
        };
        if stem.is_empty() {
            return (path, None);
        }
        match types.by_extension(ext) {
            Some(media) => (&path[..path.len() - ext.len() - 1], Some(media)),
            None => (path, None),
        }
    }

    /// Splits the path into the resource name and the relative remainder.
    fn resource_name<'u>(&self, path: &'u str, home: Option<&str>) -> Result<(String, &'u str), Failure> {
        let trimmed = path.trim_start_matches('/');
        let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        let name = decode(first).ok_or_else(|| Failure::NoSuchResource(first.to_owned()))?;
        if !name.is_empty() {
            return Ok((name, rest));
        }
        match home {
            Some(home) => Ok((home.to_owned(), rest)),
            None => Err(Failure::NoSuchResource(String::new())),
        }
    }

    fn positional_args(&self, relative: &str) -> Result<Vec<Value>, Failure> {
        let relative = relative.strip_suffix('/').unwrap_or(relative);
        if relative.is_empty() {
            return Ok(Vec::new());
        }
        relative
            .split('/')
            .enumerate()
            .map(|(i, raw)| -> Result<Value, Failure> {
                let text = decode(raw).ok_or_else(|| unconvertible(ArgKey::Position(i), raw, "invalid UTF-8"))?;
                Value::read(&text).map_err(|e| unconvertible(ArgKey::Position(i), &text, &e.to_string()))
            })
            .collect()
    }

    fn keyword_args(&self, query: &str) -> Result<Vec<(String, Value)>, Failure> {
        let mut keywords = Vec::new();
        for piece in query.split(['&', ';']).filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = piece.split_once('=').unwrap_or((piece, ""));
            let key = decode_query(raw_key)
                .ok_or_else(|| unconvertible(ArgKey::Keyword(raw_key.to_owned()), raw_value, "invalid UTF-8"))?
                .to_lowercase();
            if key.is_empty() {
                return Err(unconvertible(ArgKey::Keyword(key), piece, "empty keyword name"));
            }
            let text = decode_query(raw_value)
                .ok_or_else(|| unconvertible(ArgKey::Keyword(key.clone()), raw_value, "invalid UTF-8"))?;
            let value = Value::read(&text)
                .map_err(|e| unconvertible(ArgKey::Keyword(key.clone()), &text, &e.to_string()))?;
            upsert(&mut keywords, key, value);
        }
        Ok(keywords)
    }

    fn decompose(&self, uri: &str, cx: &UriContext<'_>) -> Result<DecodedUri, Failure> {
        let target = origin_form(uri);
        let (target, fragment) = match target.split_once('#') {
            Some((target, fragment)) => (target, Some(fragment)),
            None => (target, None),
        };
        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        let (path, hint) = if cx.extension_hints {
            self.content_type_hint(path, cx.types)
        } else {
            (path, None)
        };
        let (resource, relative) = self.resource_name(path, cx.home)?;
        let positional = self.positional_args(relative)?;
        let mut keywords = self.keyword_args(query)?;

        if let Some(raw) = fragment {
            let key = ArgKey::Keyword(FRAGMENT.to_owned());
            let text = decode(raw).ok_or_else(|| unconvertible(key, raw, "invalid UTF-8"))?;
            upsert(&mut keywords, FRAGMENT.to_owned(), Value::Text(text));
        }

        Ok(DecodedUri { resource, content_types: hint.into_iter().collect(), positional, keywords })
    }
}

/// Decomposition exactly as described in the module docs.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardDecomposer;

impl UriDecomposer for StandardDecomposer {}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Drops `scheme://authority` from an absolute-form target.
fn origin_form(uri: &str) -> &str {
    if uri.starts_with('/') {
        return uri;
    }
    match uri.split_once("://") {
        Some((_, rest)) => rest.find(['/', '?', '#']).map_or("", |i| &rest[i..]),
        None => uri,
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(Cow::into_owned)
}

/// Query strings also encode spaces as `+`.
fn decode_query(raw: &str) -> Option<String> {
    decode(&raw.replace('+', " "))
}

fn unconvertible(key: ArgKey, value: &str, reason: &str) -> Failure {
    Failure::UnconvertibleArgument { key, value: value.to_owned(), reason: reason.to_owned() }
}

/// Later occurrences of a key replace earlier ones.
fn upsert(keywords: &mut Vec<(String, Value)>, key: String, value: Value) {
    match keywords.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => keywords.push((key, value)),
    }
}

// ── Generation ───────────────────────────────────────────────────────────────

/// Encodes a resource call as a URI that decomposes back into the same call.
///
/// `extension`, when given, is appended to the last segment as a
/// content-type hint. Dots already in the last segment are escaped so they
/// are never mistaken for one. Keyword names are lower-cased, as
/// decomposition does.
///
/// ```rust
/// use restive::{Value, uri_for};
///
/// let uri = uri_for("items", &[Value::Integer(42)], &[("color".into(), "red".into())], None);
/// assert_eq!(uri, "/items/42?color=red");
/// ```
pub fn uri_for(
    resource: &str,
    positional: &[Value],
    keywords: &[(String, Value)],
    extension: Option<&str>,
) -> String {
    let mut segments: Vec<String> = std::iter::once(urlencoding::encode(resource).into_owned())
        .chain(positional.iter().map(|v| urlencoding::encode(&v.to_string()).into_owned()))
        .collect();
    if let Some(last) = segments.last_mut() {
        *last = last.replace('.', "%2E");
        if let Some(ext) = extension {
            last.push('.');
            last.push_str(ext);
        }
    }

    let mut uri = String::new();
    for segment in &segments {
        uri.push('/');
        uri.push_str(segment);
    }
    for (i, (key, value)) in keywords.iter().enumerate() {
        uri.push(if i == 0 { '?' } else { '&' });
        uri.push_str(&urlencoding::encode(&key.to_lowercase()));
        uri.push('=');
        uri.push_str(&urlencoding::encode(&value.to_string()));
    }
    uri
}

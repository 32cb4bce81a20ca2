//! Content negotiation.
//!
//! Turns what the client said about representations into an ordered list of
//! candidate content types for the dispatcher to try.
//!
//! - **Non-mutating** requests (GET, DELETE) negotiate: URI hints first, then
//!   the Accept entries in the order the client wrote them, each wildcard
//!   expanded. Order is authoritative; quality values are ignored.
//! - **Mutating** requests (POST, PUT) do not: the client already committed
//!   to one representation, so the list has exactly one element.

use tracing::debug;

use crate::failure::Failure;
use crate::media::{ContentTypes, MediaType, normalize};
use crate::verb::Verb;

/// Splits an Accept header into bare designators, dropping parameters and
/// quality values.
pub fn accept_entries(header: &str) -> impl Iterator<Item = &str> {
    header
        .split(',')
        .map(|entry| entry.split(';').next().unwrap_or_default().trim())
        .filter(|entry| !entry.is_empty())
}

/// Negotiates against one taxonomy.
#[derive(Clone, Copy, Debug)]
pub struct Negotiator<'a> {
    types: &'a ContentTypes,
    fallback: MediaType,
}

impl<'a> Negotiator<'a> {
    /// `fallback` is the single candidate used when nothing else resolves.
    pub fn new(types: &'a ContentTypes, fallback: MediaType) -> Self {
        Self { types, fallback }
    }

    /// Candidate list for `verb`.
    pub fn candidates(
        &self,
        verb: Verb,
        uri_types: &[MediaType],
        accept: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Vec<MediaType>, Failure> {
        if verb.is_mutating() {
            self.committed(uri_types, content_type)
        } else {
            Ok(self.accepted(uri_types, accept))
        }
    }

    /// Every type the client accepts, in its order of preference.
    ///
    /// Unknown Accept entries are dropped; an empty result becomes the
    /// fallback alone.
    pub fn accepted(&self, uri_types: &[MediaType], accept: Option<&str>) -> Vec<MediaType> {
        let mut out = Vec::new();
        let mut push_expanded = |media: MediaType| {
            for candidate in self.types.expand(media) {
                if !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
        };

        for &media in uri_types {
            push_expanded(media);
        }
        for entry in accept.into_iter().flat_map(accept_entries) {
            match self.types.get(entry) {
                Some(media) => push_expanded(media),
                None => debug!(entry, "dropping unknown accept entry"),
            }
        }

        if out.is_empty() {
            out.push(self.fallback);
        }
        out
    }

    /// The one type a mutating request committed to.
    pub fn committed(&self, uri_types: &[MediaType], content_type: Option<&str>) -> Result<Vec<MediaType>, Failure> {
        if let Some(&media) = uri_types.first() {
            return Ok(vec![media]);
        }
        let Some(header) = content_type else {
            return Err(Failure::UnsupportedContentType { designator: None });
        };
        match self.types.get(header) {
            Some(media) => Ok(vec![media]),
            None => Err(Failure::UnsupportedContentType { designator: Some(normalize(header)) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(types: &ContentTypes, list: &[MediaType]) -> Vec<String> {
        list.iter().map(|&m| types.name(m).to_owned()).collect()
    }

    #[test]
    fn accept_entries_strip_parameters() {
        let entries: Vec<_> = accept_entries("text/html;q=0.9, application/json ,, */*;q=0.1").collect();
        assert_eq!(entries, ["text/html", "application/json", "*/*"]);
    }

    #[test]
    fn order_is_authoritative_not_weighted() {
        let types = ContentTypes::standard();
        let plain = types.lookup("text/plain").unwrap();
        let n = Negotiator::new(&types, plain);
        let list = n.accepted(&[], Some("text/plain;q=0.1, application/json;q=1.0"));
        assert_eq!(names(&types, &list), ["text/plain", "application/json"]);
    }

    #[test]
    fn uri_hint_comes_first() {
        let types = ContentTypes::standard();
        let plain = types.lookup("text/plain").unwrap();
        let html = types.lookup("text/html").unwrap();
        let n = Negotiator::new(&types, plain);
        let list = n.accepted(&[html], Some("application/json"));
        assert_eq!(names(&types, &list), ["text/html", "application/json"]);
    }

    #[test]
    fn wildcards_expand_and_duplicates_collapse() {
        let types = ContentTypes::standard();
        let plain = types.lookup("text/plain").unwrap();
        let n = Negotiator::new(&types, plain);
        let list = n.accepted(&[], Some("text/html, text/*"));
        let names = names(&types, &list);
        assert_eq!(names[0], "text/html");
        assert_eq!(names[1], "text/*");
        assert_eq!(names.iter().filter(|n| *n == "text/html").count(), 1);
        assert!(names.iter().all(|n| n.starts_with("text/")));
    }

    #[test]
    fn unknown_entries_fall_back_to_plain_text() {
        let types = ContentTypes::standard();
        let plain = types.lookup("text/plain").unwrap();
        let n = Negotiator::new(&types, plain);
        assert_eq!(n.accepted(&[], Some("foo/bar")), vec![plain]);
        assert_eq!(n.accepted(&[], None), vec![plain]);
    }

    #[test]
    fn mutating_requests_commit_to_one_type() {
        let types = ContentTypes::standard();
        let plain = types.lookup("text/plain").unwrap();
        let json = types.lookup("application/json").unwrap();
        let n = Negotiator::new(&types, plain);

        let list = n.candidates(Verb::Post, &[], Some("text/plain"), Some("application/json; charset=utf-8"));
        assert_eq!(list.unwrap(), vec![json]);

        let hinted = n.candidates(Verb::Put, &[plain], None, Some("application/json"));
        assert_eq!(hinted.unwrap(), vec![plain]);
    }

    #[test]
    fn mutating_requests_need_a_known_content_type() {
        let types = ContentTypes::standard();
        let plain = types.lookup("text/plain").unwrap();
        let n = Negotiator::new(&types, plain);

        let missing = n.candidates(Verb::Post, &[], None, None).unwrap_err();
        assert_eq!(missing.status(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let unknown = n.candidates(Verb::Post, &[], None, Some("Foo/Bar")).unwrap_err();
        assert_eq!(unknown.status(), http::StatusCode::NOT_IMPLEMENTED);
        assert_eq!(unknown.to_string(), "unsupported content type \"foo/bar\"");
    }
}

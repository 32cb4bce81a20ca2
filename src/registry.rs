//! Resource registry.
//!
//! One entry per resource, keyed by lower-cased name. Each resource owns its
//! parameter [`Signature`] and an ordered list of [`Route`]s. No magic, no
//! reflection: build it once at startup, then the engine only reads it.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::Error;
use crate::failure::Failure;
use crate::handler::BoxedBody;
use crate::media::{ContentTypes, MediaType};
use crate::value::{ArgKind, Value};
use crate::verb::{Verb, VerbKind};

/// Keyword the URI decomposer uses for the fragment.
pub const FRAGMENT: &str = "fragment";

// ── Signature ────────────────────────────────────────────────────────────────

/// The parameters a resource accepts.
///
/// ```rust
/// use restive::Signature;
///
/// // items(id, page = 1, &key color, &key (sort "name"))
/// Signature::new()
///     .required("id")
///     .optional("page", 1)
///     .keyword("color")
///     .keyword_or("sort", "name");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Signature {
    required: Vec<String>,
    optional: Vec<(String, Value)>,
    keywords: Vec<(String, Option<Value>)>,
    allow_other_keys: bool,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str) -> Self {
        self.required.push(name.to_owned());
        self
    }

    /// An optional positional, filled with `default` when the URI omits it.
    pub fn optional(mut self, name: &str, default: impl Into<Value>) -> Self {
        self.optional.push((name.to_owned(), default.into()));
        self
    }

    /// A keyword with no default: absent unless the query string has it.
    pub fn keyword(mut self, name: &str) -> Self {
        self.keywords.push((name.to_lowercase(), None));
        self
    }

    pub fn keyword_or(mut self, name: &str, default: impl Into<Value>) -> Self {
        self.keywords.push((name.to_lowercase(), Some(default.into())));
        self
    }

    /// Accept keywords the signature does not name.
    pub fn allow_other_keys(mut self) -> Self {
        self.allow_other_keys = true;
        self
    }

    pub fn min_positional(&self) -> usize {
        self.required.len()
    }

    pub fn max_positional(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    pub fn accepts_keyword(&self, name: &str) -> bool {
        self.allow_other_keys || self.keywords.iter().any(|(k, _)| k == name)
    }

    fn validate(&self) -> Result<(), Error> {
        let positional = self.required.iter().chain(self.optional.iter().map(|(n, _)| n));
        let mut seen = Vec::new();
        for name in positional.chain(self.keywords.iter().map(|(k, _)| k)) {
            if seen.contains(&name) {
                return Err(Error::InvalidSignature(format!("parameter `{name}` appears twice")));
            }
            seen.push(name);
        }
        Ok(())
    }

    /// Checks decoded arguments against the signature and fills in defaults.
    ///
    /// A `fragment` keyword the signature does not accept is dropped rather
    /// than refused: fragments are the client's business.
    pub fn bind(
        &self,
        resource: &str,
        mut positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Args, Failure> {
        let invalid = |reason: String| Failure::InvalidResourceArguments {
            resource: resource.to_owned(),
            reason,
        };

        if let Some(missing) = self.required.get(positional.len()) {
            return Err(invalid(format!("missing required argument `{missing}`")));
        }
        if positional.len() > self.max_positional() {
            return Err(invalid(format!(
                "too many positional arguments: got {}, at most {}",
                positional.len(),
                self.max_positional()
            )));
        }
        let supplied_optional = positional.len() - self.required.len();
        positional.extend(self.optional[supplied_optional..].iter().map(|(_, d)| d.clone()));

        let mut bound = Vec::with_capacity(keywords.len());
        for (key, value) in keywords {
            if !self.accepts_keyword(&key) {
                if key == FRAGMENT {
                    continue;
                }
                return Err(invalid(format!("unknown keyword `{key}`")));
            }
            bound.push((key, value));
        }
        for (key, default) in &self.keywords {
            if let Some(default) = default {
                if !bound.iter().any(|(k, _)| k == key) {
                    bound.push((key.clone(), default.clone()));
                }
            }
        }

        Ok(Args { positional, keywords: bound })
    }
}

/// Arguments bound to a signature, defaults filled in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn positional(&self) -> &[Value] { &self.positional }
    pub fn keywords(&self) -> &[(String, Value)] { &self.keywords }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

// ── Route & Resource ─────────────────────────────────────────────────────────

/// One specialization tuple (verb kind, content kind, positional kinds) and
/// the body it dispatches to.
pub struct Route {
    pub(crate) verb: VerbKind,
    pub(crate) content: MediaType,
    pub(crate) specializers: Vec<ArgKind>,
    pub(crate) body: BoxedBody,
}

impl Route {
    pub fn verb(&self) -> VerbKind { self.verb }
    pub fn content(&self) -> MediaType { self.content }
    pub fn specializers(&self) -> &[ArgKind] { &self.specializers }

    fn same_specialization(&self, other: &Route) -> bool {
        self.verb == other.verb
            && self.content == other.content
            && self.specializers == other.specializers
    }

    /// True when some POST or PUT request could be accepted by both routes.
    fn overlaps_mutating(&self, other: &Route, types: &ContentTypes) -> bool {
        let verbs = [Verb::Post, Verb::Put]
            .into_iter()
            .any(|v| self.verb.accepts(v) && other.verb.accepts(v));
        let content = types.is_a(self.content, other.content) || types.is_a(other.content, self.content);
        let width = self.specializers.len().max(other.specializers.len());
        let args = (0..width).all(|i| {
            let a = self.specializers.get(i).copied().unwrap_or_default();
            let b = other.specializers.get(i).copied().unwrap_or_default();
            a.is_a(b) || b.is_a(a)
        });
        verbs && content && args
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("verb", &self.verb)
            .field("content", &self.content)
            .field("specializers", &self.specializers)
            .finish_non_exhaustive()
    }
}

/// A named, multi-route request handler.
#[derive(Debug)]
pub struct Resource {
    name: String,
    signature: Signature,
    routes: Vec<Route>,
}

impl Resource {
    pub fn name(&self) -> &str { &self.name }
    pub fn signature(&self) -> &Signature { &self.signature }
    pub fn routes(&self) -> &[Route] { &self.routes }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// The set of resources, keyed case-insensitively by name.
#[derive(Debug, Default)]
pub struct Registry {
    resources: HashMap<String, Resource>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource, or replaces the signature of an existing one.
    ///
    /// Existing routes are kept. Routes specializing more positionals than
    /// the new signature allows are logged; they can never match again.
    pub fn register(&mut self, name: &str, signature: Signature) -> Result<&mut Resource, Error> {
        signature.validate()?;
        let key = name.to_lowercase();
        let resource = match self.resources.entry(key) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                let resource = entry.into_mut();
                for route in &resource.routes {
                    if route.specializers.len() > signature.max_positional() {
                        warn!(
                            resource = %resource.name,
                            verb = %route.verb,
                            "route specializes more positionals than the new signature accepts"
                        );
                    }
                }
                resource.signature = signature;
                resource
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                debug!(resource = name, "registered resource");
                entry.insert(Resource { name: name.to_owned(), signature, routes: Vec::new() })
            }
        };
        Ok(resource)
    }

    pub fn find(&self, name: &str) -> Option<&Resource> {
        self.resources.get(&name.to_lowercase())
    }

    pub fn unregister(&mut self, name: &str) -> Option<Resource> {
        self.resources.remove(&name.to_lowercase())
    }

    /// Appends a route. A route with the exact same specialization is
    /// replaced in place. Trailing `Any` specializers are dropped, so
    /// `[Integer, Any]` and `[Integer]` are the same specialization.
    ///
    /// Mutating requests never negotiate, so two distinct routes that could
    /// both serve one POST or PUT are refused with [`Error::AmbiguousRoute`].
    /// Non-mutating overlaps are fine: the most specific route wins.
    pub(crate) fn add_route(
        &mut self,
        types: &ContentTypes,
        name: &str,
        verb: VerbKind,
        content: MediaType,
        specializers: &[ArgKind],
        body: BoxedBody,
    ) -> Result<(), Error> {
        let resource = self
            .resources
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| Error::UnknownResource(name.to_owned()))?;

        let mut specializers = specializers.to_vec();
        while specializers.last() == Some(&ArgKind::Any) {
            specializers.pop();
        }
        let max = resource.signature.max_positional();
        if specializers.len() > max {
            return Err(Error::TooManySpecializers {
                resource: resource.name.clone(),
                given: specializers.len(),
                max,
            });
        }

        let route = Route { verb, content, specializers, body };
        match resource.routes.iter().position(|r| r.same_specialization(&route)) {
            Some(i) => resource.routes[i] = route,
            None => {
                if let Some(existing) = resource.routes.iter().find(|r| r.overlaps_mutating(&route, types)) {
                    return Err(Error::AmbiguousRoute {
                        resource: resource.name.clone(),
                        existing: format!("{} {}", existing.verb, types.name(existing.content)),
                        added: format!("{} {}", route.verb, types.name(route.content)),
                    });
                }
                resource.routes.push(route);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize { self.resources.len() }
    pub fn is_empty(&self) -> bool { self.resources.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Call;
    use crate::response::Reply;

    fn body(tag: &'static str) -> BoxedBody {
        Box::new(move |_: &Call<'_>| Reply::new(tag))
    }

    fn items() -> Signature {
        Signature::new().required("id").optional("page", 1).keyword("color")
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut registry = Registry::new();
        registry.register("Items", items()).unwrap();
        assert_eq!(registry.find("ITEMS").unwrap().name(), "Items");
        assert!(registry.unregister("items").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistering_keeps_routes() {
        let types = ContentTypes::standard();
        let mut registry = Registry::new();
        registry.register("items", items()).unwrap();
        registry
            .add_route(&types, "items", VerbKind::Only(Verb::Get), MediaType::ANY, &[], body("a"))
            .unwrap();
        registry.register("items", Signature::new()).unwrap();
        let resource = registry.find("items").unwrap();
        assert_eq!(resource.routes().len(), 1);
        assert_eq!(resource.signature().max_positional(), 0);
    }

    #[test]
    fn duplicate_specialization_replaces() {
        let types = ContentTypes::standard();
        let mut registry = Registry::new();
        registry.register("items", items()).unwrap();
        let get = VerbKind::Only(Verb::Get);
        registry.add_route(&types, "items", get, MediaType::ANY, &[ArgKind::Integer], body("a")).unwrap();
        registry
            .add_route(&types, "items", get, MediaType::ANY, &[ArgKind::Integer, ArgKind::Any], body("b"))
            .unwrap();
        registry.add_route(&types, "items", get, MediaType::ANY, &[ArgKind::Text], body("c")).unwrap();
        assert_eq!(registry.find("items").unwrap().routes().len(), 2);
    }

    #[test]
    fn add_route_checks_resource_and_arity() {
        let types = ContentTypes::standard();
        let mut registry = Registry::new();
        let get = VerbKind::Only(Verb::Get);
        assert!(matches!(
            registry.add_route(&types, "nope", get, MediaType::ANY, &[], body("a")),
            Err(Error::UnknownResource(_))
        ));
        registry.register("items", items()).unwrap();
        let three = [ArgKind::Integer, ArgKind::Integer, ArgKind::Integer];
        assert!(matches!(
            registry.add_route(&types, "items", get, MediaType::ANY, &three, body("a")),
            Err(Error::TooManySpecializers { given: 3, max: 2, .. })
        ));
    }

    #[test]
    fn overlapping_mutating_routes_are_ambiguous() {
        let types = ContentTypes::standard();
        let text = types.lookup("text/*").unwrap();
        let plain = types.lookup("text/plain").unwrap();
        let json = types.lookup("application/json").unwrap();
        let mut registry = Registry::new();
        registry.register("items", items()).unwrap();

        registry.add_route(&types, "items", Verb::Post.into(), text, &[], body("a")).unwrap();
        assert!(matches!(
            registry.add_route(&types, "items", VerbKind::Mutating, plain, &[], body("b")),
            Err(Error::AmbiguousRoute { .. })
        ));
        assert!(matches!(
            registry.add_route(&types, "items", VerbKind::Any, MediaType::ANY, &[ArgKind::Number], body("c")),
            Err(Error::AmbiguousRoute { .. })
        ));

        // Disjoint on verb, content or a positional kind: no ambiguity.
        registry.add_route(&types, "items", Verb::Put.into(), plain, &[], body("d")).unwrap();
        registry.add_route(&types, "items", Verb::Post.into(), json, &[ArgKind::Integer], body("e")).unwrap();
        registry.add_route(&types, "items", VerbKind::Mutating, json, &[ArgKind::Keyword], body("f")).unwrap();

        // An unspecialized positional overlaps both of those.
        assert!(matches!(
            registry.add_route(&types, "items", Verb::Post.into(), json, &[], body("g")),
            Err(Error::AmbiguousRoute { .. })
        ));

        // Exact duplicates still replace.
        registry.add_route(&types, "items", Verb::Post.into(), text, &[], body("h")).unwrap();
        assert_eq!(registry.find("items").unwrap().routes().len(), 4);
    }

    #[test]
    fn overlapping_non_mutating_routes_rank_by_specificity() {
        let types = ContentTypes::standard();
        let text = types.lookup("text/*").unwrap();
        let plain = types.lookup("text/plain").unwrap();
        let mut registry = Registry::new();
        registry.register("items", items()).unwrap();
        registry.add_route(&types, "items", Verb::Get.into(), text, &[], body("a")).unwrap();
        registry.add_route(&types, "items", VerbKind::NonMutating, plain, &[], body("b")).unwrap();
        registry.add_route(&types, "items", Verb::Delete.into(), MediaType::ANY, &[], body("c")).unwrap();
        assert_eq!(registry.find("items").unwrap().routes().len(), 3);
    }

    #[test]
    fn non_ascii_keywords_bind() {
        let sig = Signature::new().keyword("Ärger");
        let args = sig.bind("items", vec![], vec![("ärger".into(), 1.into())]).unwrap();
        assert_eq!(args.keyword("ärger"), Some(&Value::Integer(1)));
    }

    #[test]
    fn rejects_duplicate_parameter_names() {
        let mut registry = Registry::new();
        let sig = Signature::new().required("id").keyword("ID");
        assert!(matches!(registry.register("x", sig), Err(Error::InvalidSignature(_))));
    }

    #[test]
    fn bind_fills_defaults() {
        let sig = items().keyword_or("sort", "name");
        let args = sig.bind("items", vec![Value::Integer(42)], vec![]).unwrap();
        assert_eq!(args.positional(), &[Value::Integer(42), Value::Integer(1)]);
        assert_eq!(args.keyword("sort"), Some(&Value::from("name")));
        assert_eq!(args.keyword("color"), None);
    }

    #[test]
    fn bind_checks_arity_and_keywords() {
        let sig = items();
        let too_few = sig.bind("items", vec![], vec![]);
        assert!(matches!(too_few, Err(Failure::InvalidResourceArguments { .. })));

        let too_many = sig.bind("items", vec![1.into(), 2.into(), 3.into()], vec![]);
        assert!(matches!(too_many, Err(Failure::InvalidResourceArguments { .. })));

        let unknown = sig.bind("items", vec![1.into()], vec![("size".into(), 3.into())]);
        assert!(matches!(unknown, Err(Failure::InvalidResourceArguments { .. })));

        let open = sig.clone().allow_other_keys();
        assert!(open.bind("items", vec![1.into()], vec![("size".into(), 3.into())]).is_ok());
    }

    #[test]
    fn bind_drops_unaccepted_fragment() {
        let args = items()
            .bind("items", vec![1.into()], vec![(FRAGMENT.into(), "top".into())])
            .unwrap();
        assert_eq!(args.keyword(FRAGMENT), None);

        let args = items()
            .keyword(FRAGMENT)
            .bind("items", vec![1.into()], vec![(FRAGMENT.into(), "top".into())])
            .unwrap();
        assert_eq!(args.keyword(FRAGMENT), Some(&Value::from("top")));
    }
}

//! HTTP verbs as a typed enum, and the verb-kind taxonomy routes specialize on.
//!
//! ```text
//! Any
//! ├── Mutating      POST, PUT
//! ├── NonMutating   GET
//! └── DELETE
//! ```
//!
//! DELETE hangs directly off the root: it changes server state but carries no
//! representation, so it is neither mutating nor non-mutating. Method strings
//! outside this set are refused with `501 Not Implemented` before any
//! resource is looked up.

use std::fmt;
use std::str::FromStr;

use crate::failure::Failure;

/// A verb the engine dispatches on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verb {
    Delete,
    Get,
    Post,
    Put,
}

impl Verb {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get    => "GET",
            Self::Post   => "POST",
            Self::Put    => "PUT",
        }
    }

    /// POST and PUT carry a representation the client committed to.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Verb {
    type Err = Failure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELETE" => Ok(Self::Delete),
            "GET"    => Ok(Self::Get),
            "POST"   => Ok(Self::Post),
            "PUT"    => Ok(Self::Put),
            _        => Err(Failure::UnknownVerb(s.to_owned())),
        }
    }
}

impl TryFrom<&http::Method> for Verb {
    type Error = Failure;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<Verb> for http::Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Delete => http::Method::DELETE,
            Verb::Get    => http::Method::GET,
            Verb::Post   => http::Method::POST,
            Verb::Put    => http::Method::PUT,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── VerbKind ─────────────────────────────────────────────────────────────────

/// A node of the verb taxonomy. Routes specialize on one of these.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum VerbKind {
    Any,
    Mutating,
    NonMutating,
    Only(Verb),
}

impl VerbKind {
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Any => None,
            Self::Mutating | Self::NonMutating => Some(Self::Any),
            Self::Only(Verb::Post | Verb::Put) => Some(Self::Mutating),
            Self::Only(Verb::Get) => Some(Self::NonMutating),
            Self::Only(Verb::Delete) => Some(Self::Any),
        }
    }

    /// Distance from [`VerbKind::Any`]. Deeper kinds are more specific.
    pub fn depth(self) -> usize {
        let mut depth = 0;
        let mut kind = self;
        while let Some(parent) = kind.parent() {
            depth += 1;
            kind = parent;
        }
        depth
    }

    /// True when `verb` is this kind or one of its descendants.
    pub fn accepts(self, verb: Verb) -> bool {
        let mut kind = Some(Self::Only(verb));
        while let Some(k) = kind {
            if k == self {
                return true;
            }
            kind = k.parent();
        }
        false
    }
}

impl From<Verb> for VerbKind {
    fn from(verb: Verb) -> Self {
        Self::Only(verb)
    }
}

impl fmt::Display for VerbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any         => f.write_str("any verb"),
            Self::Mutating    => f.write_str("mutating verbs"),
            Self::NonMutating => f.write_str("non-mutating verbs"),
            Self::Only(verb)  => verb.fmt(f),
        }
    }
}

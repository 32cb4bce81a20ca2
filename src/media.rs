//! Content-type taxonomy.
//!
//! Media types form a three-level tree, built once from a static table:
//!
//! ```text
//! */*                      root: "any content type"
//! ├── text/*               wildcard, created on first sighting of text/…
//! │   ├── text/plain
//! │   └── text/html
//! └── application/*
//!     └── application/json
//! ```
//!
//! A route specialized on `text/*` accepts every `text/…` leaf; one on `*/*`
//! accepts everything. Nodes are addressed by [`MediaType`] handles, which
//! are only meaningful for the [`ContentTypes`] that issued them.

use std::collections::HashMap;

use crate::error::Error;

/// The standard table: every leaf with the file extensions that hint at it.
/// Registration order matters: it is the expansion order of `*/*`.
const STANDARD: &[(&str, &[&str])] = &[
    ("text/plain",                        &["txt", "text"]),
    ("text/html",                         &["html", "htm"]),
    ("text/css",                          &["css"]),
    ("text/csv",                          &["csv"]),
    ("text/markdown",                     &["md", "markdown"]),
    ("text/javascript",                   &["js", "mjs"]),
    ("text/xml",                          &[]),
    ("text/event-stream",                 &[]),
    ("application/json",                  &["json"]),
    ("application/xml",                   &["xml"]),
    ("application/xhtml+xml",             &["xhtml"]),
    ("application/ld+json",               &["jsonld"]),
    ("application/x-www-form-urlencoded", &[]),
    ("application/octet-stream",          &["bin"]),
    ("application/msgpack",               &["msgpack"]),
    ("application/pdf",                   &["pdf"]),
    ("application/zip",                   &["zip"]),
    ("application/gzip",                  &["gz"]),
    ("multipart/form-data",               &[]),
    ("image/png",                         &["png"]),
    ("image/jpeg",                        &["jpg", "jpeg"]),
    ("image/gif",                         &["gif"]),
    ("image/svg+xml",                     &["svg"]),
    ("image/webp",                        &["webp"]),
    ("image/x-icon",                      &["ico"]),
    ("audio/mpeg",                        &["mp3"]),
    ("audio/ogg",                         &["oga", "ogg"]),
    ("video/mp4",                         &["mp4"]),
    ("video/webm",                        &["webm"]),
    ("font/woff",                         &["woff"]),
    ("font/woff2",                        &["woff2"]),
];

/// Handle to a node of a [`ContentTypes`] taxonomy.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MediaType(usize);

impl MediaType {
    /// The root, `*/*`. Present in every taxonomy.
    pub const ANY: MediaType = MediaType(0);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Root,
    Wildcard,
    Leaf,
}

#[derive(Debug)]
struct Node {
    name: String,
    kind: NodeKind,
    parent: Option<MediaType>,
    children: Vec<MediaType>,
    extensions: Vec<String>,
}

/// The content-type tree plus its string and extension lookup maps.
#[derive(Debug)]
pub struct ContentTypes {
    nodes: Vec<Node>,
    by_name: HashMap<String, MediaType>,
    by_extension: HashMap<String, MediaType>,
}

impl ContentTypes {
    /// A taxonomy holding only the root.
    pub fn empty() -> Self {
        let root = Node {
            name: "*/*".to_owned(),
            kind: NodeKind::Root,
            parent: None,
            children: Vec::new(),
            extensions: Vec::new(),
        };
        let mut by_name = HashMap::new();
        by_name.insert(root.name.clone(), MediaType::ANY);
        Self { nodes: vec![root], by_name, by_extension: HashMap::new() }
    }

    /// The taxonomy built from the standard MIME table.
    pub fn standard() -> Self {
        let mut types = Self::empty();
        for (designator, extensions) in STANDARD {
            // The table is well-formed; a failure here would be a typo in it.
            if let Ok(leaf) = types.register(designator) {
                for ext in *extensions {
                    types.by_extension.entry((*ext).to_owned()).or_insert(leaf);
                    types.nodes[leaf.0].extensions.push((*ext).to_owned());
                }
            }
        }
        types
    }

    /// Registers a concrete `type/subtype`, creating its `type/*` wildcard on
    /// first sighting. Registering a known leaf returns the existing handle.
    pub fn register(&mut self, designator: &str) -> Result<MediaType, Error> {
        let name = normalize(designator);
        let Some((major, minor)) = name.split_once('/') else {
            return Err(Error::MalformedContentType(designator.to_owned()));
        };
        if major.is_empty() || minor.is_empty() || major == "*" || minor == "*" || minor.contains('/') {
            return Err(Error::MalformedContentType(designator.to_owned()));
        }
        if let Some(&existing) = self.by_name.get(&name) {
            return Ok(existing);
        }

        let wildcard_name = format!("{major}/*");
        let wildcard = match self.by_name.get(&wildcard_name) {
            Some(&w) => w,
            None => self.push(wildcard_name, NodeKind::Wildcard, MediaType::ANY),
        };
        Ok(self.push(name, NodeKind::Leaf, wildcard))
    }

    /// Maps a file extension to a registered leaf, replacing any earlier mapping.
    pub fn register_extension(&mut self, extension: &str, designator: &str) -> Result<(), Error> {
        let leaf = self.lookup(designator)?;
        if !self.is_leaf(leaf) {
            return Err(Error::NotALeaf(designator.to_owned()));
        }
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.nodes[leaf.0].extensions.push(extension.clone());
        self.by_extension.insert(extension, leaf);
        Ok(())
    }

    fn push(&mut self, name: String, kind: NodeKind, parent: MediaType) -> MediaType {
        let id = MediaType(self.nodes.len());
        self.nodes.push(Node { name: name.clone(), kind, parent: Some(parent), children: Vec::new(), extensions: Vec::new() });
        self.nodes[parent.0].children.push(id);
        self.by_name.insert(name, id);
        id
    }

    /// Exact lookup; `type/*` resolves to the wildcard node and `*/*` to the root.
    /// Parameters (`; charset=…`) and case are ignored.
    pub fn get(&self, designator: &str) -> Option<MediaType> {
        self.by_name.get(&normalize(designator)).copied()
    }

    /// Like [`get`](Self::get), failing with [`Error::UnknownContentType`].
    pub fn lookup(&self, designator: &str) -> Result<MediaType, Error> {
        self.get(designator).ok_or_else(|| Error::UnknownContentType(designator.to_owned()))
    }

    pub fn by_extension(&self, extension: &str) -> Option<MediaType> {
        self.by_extension.get(&extension.to_ascii_lowercase()).copied()
    }

    /// The preferred (first registered) extension of a leaf.
    pub fn extension(&self, media: MediaType) -> Option<&str> {
        self.nodes[media.0].extensions.first().map(String::as_str)
    }

    pub fn name(&self, media: MediaType) -> &str {
        &self.nodes[media.0].name
    }

    pub fn kind(&self, media: MediaType) -> NodeKind {
        self.nodes[media.0].kind
    }

    pub fn is_leaf(&self, media: MediaType) -> bool {
        self.kind(media) == NodeKind::Leaf
    }

    pub fn parent(&self, media: MediaType) -> Option<MediaType> {
        self.nodes[media.0].parent
    }

    pub fn children(&self, media: MediaType) -> &[MediaType] {
        &self.nodes[media.0].children
    }

    /// Distance from the root. Deeper nodes are more specific.
    pub fn depth(&self, media: MediaType) -> usize {
        let mut depth = 0;
        let mut node = media;
        while let Some(parent) = self.parent(node) {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// True when `ancestor` is `media` or lies on its chain to the root.
    pub fn is_a(&self, media: MediaType, ancestor: MediaType) -> bool {
        let mut node = Some(media);
        while let Some(n) = node {
            if n == ancestor {
                return true;
            }
            node = self.parent(n);
        }
        false
    }

    /// The node itself followed by every leaf below it, in registration order.
    pub fn expand(&self, media: MediaType) -> Vec<MediaType> {
        let mut out = vec![media];
        if self.is_leaf(media) {
            return out;
        }
        out.extend(
            (0..self.nodes.len())
                .map(MediaType)
                .filter(|&id| self.is_leaf(id) && self.is_a(id, media)),
        );
        out
    }

    /// Every leaf, in registration order.
    pub fn leaves(&self) -> impl Iterator<Item = MediaType> + '_ {
        (0..self.nodes.len()).map(MediaType).filter(|&id| self.is_leaf(id))
    }
}

impl Default for ContentTypes {
    fn default() -> Self { Self::standard() }
}

/// Lower-cases a designator and strips its parameters.
pub(crate) fn normalize(designator: &str) -> String {
    designator.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_leaves_wildcards_and_root() {
        let types = ContentTypes::standard();
        let json = types.lookup("application/json").unwrap();
        assert_eq!(types.name(json), "application/json");
        assert_eq!(types.kind(types.lookup("text/*").unwrap()), NodeKind::Wildcard);
        assert_eq!(types.lookup("*/*").unwrap(), MediaType::ANY);
        assert!(matches!(types.lookup("foo/bar"), Err(Error::UnknownContentType(_))));
    }

    #[test]
    fn lookup_ignores_case_and_parameters() {
        let types = ContentTypes::standard();
        assert_eq!(types.get("Text/HTML; charset=utf-8"), types.get("text/html"));
    }

    #[test]
    fn every_leaf_has_one_chain_to_root() {
        let types = ContentTypes::standard();
        for leaf in types.leaves() {
            let wildcard = types.parent(leaf).unwrap();
            assert_eq!(types.kind(wildcard), NodeKind::Wildcard);
            assert_eq!(types.parent(wildcard), Some(MediaType::ANY));
            assert_eq!(types.depth(leaf), 2);
            assert!(types.children(wildcard).contains(&leaf));
        }
    }

    #[test]
    fn wildcard_exists_only_once_a_subtype_is_registered() {
        let mut types = ContentTypes::empty();
        assert!(types.get("model/*").is_none());
        let gltf = types.register("model/gltf+json").unwrap();
        let wildcard = types.lookup("model/*").unwrap();
        assert_eq!(types.parent(gltf), Some(wildcard));
        assert_eq!(types.register("model/gltf+json").unwrap(), gltf);
    }

    #[test]
    fn expand_covers_own_top_level_type_only() {
        let types = ContentTypes::standard();
        let text = types.lookup("text/*").unwrap();
        let expanded = types.expand(text);
        assert_eq!(expanded[0], text);
        for leaf in types.leaves() {
            let under_text = types.name(leaf).starts_with("text/");
            assert_eq!(expanded.contains(&leaf), under_text, "{}", types.name(leaf));
        }
    }

    #[test]
    fn expand_of_root_follows_registration_order() {
        let types = ContentTypes::standard();
        let expanded = types.expand(MediaType::ANY);
        assert_eq!(expanded[0], MediaType::ANY);
        assert_eq!(types.name(expanded[1]), "text/plain");
        assert_eq!(types.name(expanded[2]), "text/html");
        assert_eq!(expanded.len(), STANDARD.len() + 1);
    }

    #[test]
    fn rejects_malformed_designators() {
        let mut types = ContentTypes::empty();
        for bad in ["text", "text/*", "*/json", "/json", "a/b/c"] {
            assert!(matches!(types.register(bad), Err(Error::MalformedContentType(_))), "{bad}");
        }
    }

    #[test]
    fn extensions_map_to_leaves() {
        let mut types = ContentTypes::standard();
        let json = types.lookup("application/json").unwrap();
        assert_eq!(types.by_extension("JSON"), Some(json));
        assert_eq!(types.extension(json), Some("json"));
        assert!(types.register_extension("txt", "text/*").is_err());
        types.register_extension(".geojson", "application/json").unwrap();
        assert_eq!(types.by_extension("geojson"), Some(json));
    }
}

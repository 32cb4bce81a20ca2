//! Engine configuration.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! home-resource = "index"
//! catch-plain = "catch-with-trace"
//! catch-http = "catch-plain"
//! explain = "polite"
//! uri-content-type-hints = true
//! fallback-type = "text/plain"
//! mutating-payload-type = "text/html"
//! ```

use serde::Deserialize;

use crate::error::Error;

/// Whether a group of failures is rendered by the engine or handed back to
/// the caller.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum CatchMode {
    /// Return the failure to the caller as `Err`.
    #[default]
    DoNotCatch,
    /// Render an explanation.
    CatchPlain,
    /// Render an explanation that includes the failure's diagnostic trace.
    CatchWithTrace,
}

/// How caught failures are rendered.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ExplainStyle {
    /// Always plain text, whatever the client accepts.
    Brutal,
    /// Negotiated against the client's Accept header, brutal as a last resort.
    #[default]
    Polite,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineConfig {
    /// Resource served for an empty path. `None` makes `/` a 404.
    pub home_resource: Option<String>,
    /// Generic failures: faults and panics inside route bodies.
    pub catch_plain: CatchMode,
    /// Failures that carry an HTTP status: 404, 400, 406, 415, 501, and
    /// statuses declared by route bodies.
    pub catch_http: CatchMode,
    pub explain: ExplainStyle,
    /// Read `/items/42.json` as `/items/42` with an `application/json` hint.
    pub uri_content_type_hints: bool,
    /// The candidate used when negotiation yields nothing.
    pub fallback_type: String,
    /// Payload type of mutating responses whose body declares none.
    pub mutating_payload_type: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home_resource: None,
            catch_plain: CatchMode::DoNotCatch,
            catch_http: CatchMode::DoNotCatch,
            explain: ExplainStyle::Polite,
            uri_content_type_hints: true,
            fallback_type: "text/plain".to_owned(),
            mutating_payload_type: "text/html".to_owned(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    /// Catch both groups of failures with `mode`.
    pub fn catch_all(mut self, mode: CatchMode) -> Self {
        self.catch_plain = mode;
        self.catch_http = mode;
        self
    }

    pub fn home(mut self, resource: &str) -> Self {
        self.home_resource = Some(resource.to_owned());
        self
    }

    pub fn explain(mut self, style: ExplainStyle) -> Self {
        self.explain = style;
        self
    }
}

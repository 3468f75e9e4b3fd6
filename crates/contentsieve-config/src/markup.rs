//! Markup policy configuration.
//!
//! This module contains the `MarkupConfig` struct which holds the URI,
//! form and media rules applied by the markup policies.

use serde::{Deserialize, Serialize};

/// Query appended to media `src` attributes by the media-rewrite policy.
pub const DEFAULT_MEDIA_QUERY: &str = "noprogress&max-size=0";

/// Markup policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarkupConfig {
    /// URI schemes that may appear in links.
    /// Default: http, https, ftp, mailto, nntp, news, snews, about, irc
    #[serde(default = "default_protocols")]
    pub allowed_protocols: Vec<String>,

    /// Prefix that external links are routed through, e.g. a warning page.
    /// The percent-encoded target is appended to it.
    /// Default: unset (external links are kept as they are)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_link_prefix: Option<String>,

    /// Exact form action paths that may be submitted to.
    /// Default: empty
    #[serde(default)]
    pub allowed_form_paths: Vec<String>,

    /// Form action prefixes; the remainder must be `[A-Za-z0-9.]+`.
    /// Default: empty
    #[serde(default)]
    pub allowed_form_prefixes: Vec<String>,

    /// Query appended to `src` of `video` and `audio` elements.
    /// Default: "noprogress&max-size=0"
    #[serde(default = "default_media_query")]
    pub media_query: String,

    /// Name of the markup policy the CLI uses.
    /// Default: "media"
    #[serde(default = "default_policy")]
    pub policy: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            allowed_protocols: default_protocols(),
            external_link_prefix: None,
            allowed_form_paths: Vec::new(),
            allowed_form_prefixes: Vec::new(),
            media_query: default_media_query(),
            policy: default_policy(),
        }
    }
}

impl MarkupConfig {
    /// Merge another MarkupConfig into this one.
    pub fn merge(&mut self, other: &MarkupConfig) {
        self.allowed_protocols = other.allowed_protocols.clone();
        self.external_link_prefix = other.external_link_prefix.clone();
        self.allowed_form_paths = other.allowed_form_paths.clone();
        self.allowed_form_prefixes = other.allowed_form_prefixes.clone();
        self.media_query = other.media_query.clone();
        self.policy = other.policy.clone();
    }

    /// Whether a URI scheme is allowed. Schemes are case-insensitive.
    pub fn protocol_allowed(&self, scheme: &str) -> bool {
        self.allowed_protocols
            .iter()
            .any(|p| p.eq_ignore_ascii_case(scheme))
    }
}

fn default_protocols() -> Vec<String> {
    [
        "http", "https", "ftp", "mailto", "nntp", "news", "snews", "about", "irc",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_media_query() -> String {
    DEFAULT_MEDIA_QUERY.to_string()
}

fn default_policy() -> String {
    "media".to_string()
}

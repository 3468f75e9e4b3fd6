//! Content-type helpers.

use serde::{Deserialize, Serialize};

/// A MIME type split into its base type and optional charset parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentType {
    /// Base type, e.g. `text/html`
    pub base: String,
    /// Value of the `charset` parameter, unquoted
    pub charset: Option<String>,
}

impl ContentType {
    pub fn new(base: impl Into<String>, charset: Option<&str>) -> Self {
        Self {
            base: base.into(),
            charset: charset.map(str::to_string),
        }
    }

    /// Split a content type such as `text/html; charset="UTF-8"`.
    ///
    /// Parameters other than `charset` are discarded.
    ///
    /// # Example
    ///
    /// ```
    /// use contentsieve_core::ContentType;
    ///
    /// let ct = ContentType::split("text/html; charset=\"utf-8\"");
    /// assert_eq!(ct.base, "text/html");
    /// assert_eq!(ct.charset.as_deref(), Some("utf-8"));
    /// ```
    pub fn split(value: &str) -> Self {
        let mut fields = value.split(';');
        let base = fields.next().unwrap_or("").trim().to_string();
        let charset = fields.find_map(|field| {
            let (name, val) = field.split_once('=')?;
            if !name.trim().eq_ignore_ascii_case("charset") {
                return None;
            }
            let val = val.trim().trim_matches('"').trim();
            (!val.is_empty()).then(|| val.to_string())
        });
        Self { base, charset }
    }

    /// Whether a charset name is a plain token that is safe to embed in a
    /// query string.
    pub fn is_safe_charset(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= 40
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.charset {
            Some(cs) => write!(f, "{}; charset={}", self.base, cs),
            None => write!(f, "{}", self.base),
        }
    }
}

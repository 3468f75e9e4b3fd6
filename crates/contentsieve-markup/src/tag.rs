//! Parsed markup tags.
//!
//! A [`ParsedTag`] holds an element name, the attributes that have already
//! been validated, and the raw `name="value"` strings nobody has looked at
//! yet. Element names match case-insensitively but keep their case on
//! output.

use crate::comment::html_encode;
use std::collections::HashMap;
use std::fmt;

/// One markup tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedTag {
    /// Element name as written
    pub element: String,
    /// `</element>`
    pub start_slash: bool,
    /// `<element ... />`
    pub end_slash: bool,
    /// Validated attributes, in output order
    pub attributes: Vec<(String, String)>,
    /// Raw attribute strings, normally `name="value"`
    pub unparsed: Vec<String>,
}

impl ParsedTag {
    /// An opening tag with no attributes.
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            ..Self::default()
        }
    }

    /// Build a self-closing tag from validated attributes.
    pub fn from_attributes(element: impl Into<String>, attributes: Vec<(String, String)>) -> Self {
        Self {
            element: element.into(),
            end_slash: true,
            attributes,
            ..Self::default()
        }
    }

    /// Build a tag from whitespace-separated tokens, the first of which is
    /// the element name.
    ///
    /// A leading `/` on the element marks a closing tag and a trailing `/`
    /// on the last token marks a self-closing one. Returns `None` when
    /// there is no element name.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Option<Self> {
        let mut tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        if tokens.is_empty() {
            return None;
        }

        let mut end_slash = false;
        let last = tokens.len() - 1;
        if (last != 0 || tokens[last].len() > 1) && tokens[last].ends_with('/') {
            tokens[last].pop();
            if tokens[last].is_empty() {
                tokens.pop();
            }
            end_slash = true;
        }

        let mut element = tokens.remove(0);
        let mut start_slash = false;
        if element.len() > 1 && element.starts_with('/') {
            element.remove(0);
            start_slash = true;
        }
        if element.is_empty() {
            return None;
        }

        Some(Self {
            element,
            start_slash,
            end_slash,
            attributes: Vec::new(),
            unparsed: tokens,
        })
    }

    /// Parse `<...>` text into a tag.
    ///
    /// Whitespace separates tokens except inside double or single quotes.
    /// Returns `None` if the text is not enclosed in angle brackets or has
    /// no element name.
    pub fn parse(text: &str) -> Option<Self> {
        let inner = text.trim().strip_prefix('<')?.strip_suffix('>')?;
        Self::from_tokens(&tokenize(inner))
    }

    /// Same element and flags, different raw attributes.
    pub fn with_unparsed(&self, unparsed: Vec<String>) -> Self {
        Self {
            element: self.element.clone(),
            start_slash: self.start_slash,
            end_slash: self.end_slash,
            attributes: self.attributes.clone(),
            unparsed,
        }
    }

    /// Whether this tag is the element `name`, ignoring case.
    pub fn is_element(&self, name: &str) -> bool {
        self.element.eq_ignore_ascii_case(name)
    }

    /// Every attribute that can be read safely, keyed by lowercase name.
    ///
    /// Raw attributes that are not `name="value"` are skipped. Validated
    /// attributes win over raw ones of the same name.
    pub fn attributes_as_map(&self) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = self
            .unparsed
            .iter()
            .filter_map(|raw| split_attribute(raw))
            .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
            .collect();
        for (name, value) in &self.attributes {
            map.insert(name.to_ascii_lowercase(), value.clone());
        }
        map
    }

    /// Look an attribute up by name, ignoring case.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes_as_map().remove(&name.to_ascii_lowercase())
    }
}

impl fmt::Display for ParsedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        if self.start_slash {
            f.write_str("/")?;
        }
        f.write_str(&self.element)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, html_encode(value))?;
        }
        for raw in &self.unparsed {
            write!(f, " {}", raw)?;
        }
        if self.end_slash {
            f.write_str(" /")?;
        }
        f.write_str(">")
    }
}

/// Split a raw `name="value"` attribute.
///
/// Returns `None` unless there is a non-empty name, an `=`, and a value
/// wrapped in double quotes with no quote inside it.
pub fn split_attribute(raw: &str) -> Option<(&str, &str)> {
    let (name, rest) = raw.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    let value = rest.strip_prefix('"')?.strip_suffix('"')?;
    if value.contains('"') {
        return None;
    }
    Some((name, value))
}

/// Split tag contents on whitespace outside quotes.
fn tokenize(inner: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in inner.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

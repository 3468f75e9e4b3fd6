//! URI-bearing attributes.
//!
//! Helpers that run attribute URIs through a [`FilterCallback`] and write
//! back only what the callback explicitly replaced.

use crate::callback::FilterCallback;
use crate::comment::html_comment;
use crate::tag::{split_attribute, ParsedTag};
use contentsieve_core::{ContentType, Result, Verdict};
use log::{debug, trace};

/// Attributes whose value is a URI.
pub const URI_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "action",
    "cite",
    "background",
    "poster",
    "longdesc",
    "usemap",
    "data",
];

/// URI attributes the browser fetches without user action.
pub const INLINE_ATTRIBUTES: &[&str] = &["src", "poster", "background", "data"];

pub fn is_uri_attribute(name: &str) -> bool {
    URI_ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

pub fn is_inline_attribute(name: &str) -> bool {
    INLINE_ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

/// Join a query parameter onto a URI with `?` or `&` as appropriate.
///
/// The parameter goes before any `#fragment`.
pub fn append_query(uri: &str, query: &str) -> String {
    let (resource, fragment) = match uri.find('#') {
        Some(at) => uri.split_at(at),
        None => (uri, ""),
    };
    let separator = if resource.contains('?') { '&' } else { '?' };
    format!("{}{}{}{}", resource, separator, query, fragment)
}

/// Sanitize one attribute URI.
///
/// A non-empty `override_charset` is folded into `override_type`.
/// Otherwise a `maybe_charset` hint is passed on as a `maybecharset`
/// query parameter, provided it is a plain charset name.
pub fn sanitize_uri_attribute(
    uri: &str,
    override_type: Option<&str>,
    override_charset: Option<&str>,
    maybe_charset: Option<&str>,
    cb: &mut dyn FilterCallback,
    inline: bool,
) -> Result<Verdict<String>> {
    trace!(
        "Sanitizing URI: {} (override type {:?}, override charset {:?}) inline={}",
        uri,
        override_type,
        override_charset,
        inline
    );

    let mut maybe = None;
    let full_type = match (override_type, override_charset) {
        (Some(base), Some(charset)) if !charset.is_empty() => {
            Some(ContentType::new(base, Some(charset)).to_string())
        }
        (base, _) => {
            maybe = maybe_charset.filter(|c| ContentType::is_safe_charset(c));
            base.map(str::to_string)
        }
    };

    let verdict = cb.process_uri_in_context(uri, full_type.as_deref(), false, inline)?;
    Ok(match maybe {
        Some(charset) => verdict.map(|u| append_query(&u, &format!("maybecharset={}", charset))),
        None => verdict,
    })
}

/// Like [`sanitize_uri_attribute`], but a `Comment` error becomes an HTML
/// comment appended to `write_after_tag` and the URI is dropped.
pub fn html_sanitize_uri(
    uri: &str,
    override_type: Option<&str>,
    override_charset: Option<&str>,
    maybe_charset: Option<&str>,
    cb: &mut dyn FilterCallback,
    write_after_tag: &mut String,
    inline: bool,
) -> Verdict<String> {
    match sanitize_uri_attribute(uri, override_type, override_charset, maybe_charset, cb, inline) {
        Ok(verdict) => verdict,
        Err(e) if e.is_comment() => {
            write_after_tag.push_str(&html_comment(&e.to_string()));
            Verdict::Drop
        }
        Err(e) => {
            debug!("Dropping URI {}: {}", uri, e);
            Verdict::Drop
        }
    }
}

/// Run every URI attribute of `tag` through `cb`.
///
/// Attributes the callback replaces are rewritten; attributes it drops or
/// abstains on, or that fail, are removed. Other attributes are kept as
/// they are, except raw URI attributes that are not `name="value"`, which
/// are removed.
pub fn rewrite_uri_attributes(
    tag: &ParsedTag,
    cb: &mut dyn FilterCallback,
    write_after_tag: &mut String,
) -> ParsedTag {
    let mut out = tag.with_unparsed(Vec::with_capacity(tag.unparsed.len()));
    out.attributes.clear();

    for (name, value) in &tag.attributes {
        if !is_uri_attribute(name) {
            out.attributes.push((name.clone(), value.clone()));
            continue;
        }
        let verdict = html_sanitize_uri(
            value,
            None,
            None,
            None,
            cb,
            write_after_tag,
            is_inline_attribute(name),
        );
        if let Verdict::Replace(uri) = verdict {
            out.attributes.push((name.clone(), uri));
        }
    }

    for raw in &tag.unparsed {
        let name = raw.split('=').next().unwrap_or(raw);
        if !is_uri_attribute(name) {
            out.unparsed.push(raw.clone());
            continue;
        }
        let Some((name, value)) = split_attribute(raw) else {
            debug!("Removing malformed URI attribute {:?} from <{}>", raw, tag.element);
            continue;
        };
        let verdict = html_sanitize_uri(
            value,
            None,
            None,
            None,
            cb,
            write_after_tag,
            is_inline_attribute(name),
        );
        if let Verdict::Replace(uri) = verdict {
            out.unparsed.push(format!("{}=\"{}\"", name, uri));
        }
    }
    out
}

//! Policy hooks invoked while markup is filtered.
//!
//! Every hook that can refuse returns a [`Verdict`]: `Abstain` leaves the
//! decision to the caller's default, `Drop` removes the construct, and
//! `Replace` substitutes a value. A `Comment` error means the value could
//! not be placed safely and the caller should explain why in an HTML
//! comment.

use crate::tag::ParsedTag;
use contentsieve_core::{Result, Verdict};

/// A sanitized form submission target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTarget {
    /// Uppercase HTTP method
    pub method: String,
    pub action: String,
}

/// Decision points of a markup filter.
///
/// # Example
///
/// ```
/// use contentsieve_core::{Result, Verdict};
/// use contentsieve_markup::{FilterCallback, FormTarget, ParsedTag};
///
/// struct NoForms;
///
/// impl FilterCallback for NoForms {
///     fn process_uri_in_context(
///         &mut self,
///         _uri: &str,
///         _override_type: Option<&str>,
///         _no_relative: bool,
///         _inline: bool,
///     ) -> Result<Verdict<String>> {
///         Ok(Verdict::Abstain)
///     }
///
///     fn on_base_href(&mut self, _base_href: &str) -> Verdict<String> {
///         Verdict::Abstain
///     }
///
///     fn process_form(
///         &mut self,
///         _method: Option<&str>,
///         _action: Option<&str>,
///     ) -> Result<Verdict<FormTarget>> {
///         Ok(Verdict::Drop)
///     }
///
///     fn process_tag(&mut self, _tag: &ParsedTag) -> Verdict<String> {
///         Verdict::Abstain
///     }
/// }
///
/// let mut cb = NoForms;
/// assert!(cb.process_form(Some("POST"), Some("/x")).unwrap().is_drop());
/// ```
pub trait FilterCallback: Send {
    /// Sanitize a URI found in a link or attribute.
    fn process_uri(&mut self, uri: &str, override_type: Option<&str>) -> Result<Verdict<String>> {
        self.process_uri_in_context(uri, override_type, false, false)
    }

    /// Sanitize a URI, knowing whether relative resolution is forbidden
    /// and whether the browser would fetch it without a click.
    fn process_uri_in_context(
        &mut self,
        uri: &str,
        override_type: Option<&str>,
        no_relative: bool,
        inline: bool,
    ) -> Result<Verdict<String>>;

    /// Sanitize the target of a `<base href>` tag.
    fn on_base_href(&mut self, base_href: &str) -> Verdict<String>;

    /// Observe a run of text. Nothing is returned; this is for scanning.
    fn on_text(&mut self, _text: &str, _content_type: Option<&str>) {}

    /// Sanitize a form's method and action.
    fn process_form(
        &mut self,
        method: Option<&str>,
        action: Option<&str>,
    ) -> Result<Verdict<FormTarget>>;

    /// Replace a whole tag.
    fn process_tag(&mut self, tag: &ParsedTag) -> Verdict<String>;

    /// Called once the document has been filtered.
    fn on_finished(&mut self) {}
}

/// Resolves and vets URIs on behalf of a [`TagReplacerCallback`].
pub trait UriProcessor {
    /// Sanitize a URI. `Drop` means it is unsafe and must be removed.
    fn sanitize_uri(
        &mut self,
        uri: &str,
        override_type: Option<&str>,
        no_relative: bool,
        inline: bool,
    ) -> Result<Verdict<String>>;

    /// Resolve `uri` against the current base.
    ///
    /// Fails with [`FilterError::UriSyntax`](contentsieve_core::FilterError::UriSyntax)
    /// on malformed input.
    fn make_uri_absolute(&self, uri: &str) -> Result<String>;
}

/// Rewrites whole tags, with a URI processor to vet any URIs it emits.
pub trait TagReplacerCallback: Send {
    fn process_tag(&self, tag: &ParsedTag, uri_processor: &mut dyn UriProcessor)
        -> Verdict<String>;
}

/// Receives the links and text a policy encounters.
pub trait LinkObserver: Send {
    /// A URI was accepted. `inline` is true for resources fetched without
    /// user action.
    fn found_uri(&mut self, uri: &str, inline: bool);

    /// A text run was seen while `base` was the document base.
    fn on_text(&mut self, _text: &str, _content_type: Option<&str>, _base: &str) {}

    fn on_finished_page(&mut self) {}
}

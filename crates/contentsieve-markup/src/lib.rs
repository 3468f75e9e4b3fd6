//! Contentsieve Markup
//!
//! The tag model and policy contracts used when filtering untrusted
//! markup. A document filter (not part of this crate) walks the markup and
//! consults a [`FilterCallback`] at every decision point: each URI, the
//! base href, text runs, forms and whole tags.
//!
//! # Example
//!
//! ```
//! use contentsieve_markup::{split_attribute, ParsedTag};
//!
//! let tag = ParsedTag::parse("<video src=\"clip.ogv\" controls>").unwrap();
//! assert!(tag.is_element("VIDEO"));
//! assert_eq!(split_attribute(&tag.unparsed[0]), Some(("src", "clip.ogv")));
//! assert_eq!(split_attribute(&tag.unparsed[1]), None);
//! ```

pub mod callback;
pub mod comment;
pub mod tag;
pub mod uri;

pub use callback::{FilterCallback, FormTarget, LinkObserver, TagReplacerCallback, UriProcessor};
pub use comment::{html_comment, html_encode};
pub use tag::{split_attribute, ParsedTag};
pub use uri::{
    append_query, html_sanitize_uri, is_inline_attribute, is_uri_attribute,
    rewrite_uri_attributes, sanitize_uri_attribute,
};

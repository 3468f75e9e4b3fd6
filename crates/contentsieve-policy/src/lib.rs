//! Contentsieve Policies
//!
//! Concrete [`FilterCallback`](contentsieve_markup::FilterCallback)
//! implementations for markup filtering:
//!
//! - [`NullFilterCallback`] abstains everywhere
//! - [`MediaRewritePolicy`] bounds `video`/`audio` sources with a query
//! - [`GenericReadFilterCallback`] keeps a page inside its origin
//!
//! Policies are selected by name through [`create_policy`].
//!
//! # Example
//!
//! ```
//! use contentsieve_config::MarkupConfig;
//! use contentsieve_markup::ParsedTag;
//! use contentsieve_policy::create_policy;
//!
//! let mut policy = create_policy("media", &MarkupConfig::default(), None).unwrap();
//! let tag = ParsedTag::parse("<video src=\"http://x/y.ogv\">").unwrap();
//! assert_eq!(
//!     policy.process_tag(&tag).into_replacement().unwrap(),
//!     "<video src=\"http://x/y.ogv?noprogress&max-size=0\">"
//! );
//! ```

pub mod builtin;
pub mod generic;
pub mod media;
pub mod null;

pub use builtin::{builtin_policy_info, create_policy, PolicyInfo};
pub use generic::GenericReadFilterCallback;
pub use media::MediaRewritePolicy;
pub use null::NullFilterCallback;

//! Built-in policies and policy lookup.
//!
//! This module provides:
//! - A list of all built-in policies
//! - A factory creating a policy by name

use crate::{GenericReadFilterCallback, MediaRewritePolicy, NullFilterCallback};
use contentsieve_config::MarkupConfig;
use contentsieve_core::{FilterError, Result};
use contentsieve_markup::FilterCallback;
use url::Url;

/// Policy metadata.
#[derive(Debug, Clone)]
pub struct PolicyInfo {
    /// Policy name
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
    /// Whether it needs a base URL
    pub needs_base: bool,
}

/// Get information about all built-in policies.
pub fn builtin_policy_info() -> Vec<PolicyInfo> {
    vec![
        PolicyInfo {
            name: "null",
            description: "Abstains at every decision point",
            needs_base: false,
        },
        PolicyInfo {
            name: "media",
            description: "Appends a bounding query to video and audio sources",
            needs_base: false,
        },
        PolicyInfo {
            name: "generic",
            description: "Keeps pages inside their origin and vets links, forms and media",
            needs_base: true,
        },
    ]
}

/// Create a policy by name.
///
/// The `generic` policy needs `base` and rewrites media tags with the
/// `media` policy.
///
/// # Errors
/// - [`FilterError::Config`] if the name is not recognized or a required
///   base URL is missing
pub fn create_policy(
    name: &str,
    config: &MarkupConfig,
    base: Option<&Url>,
) -> Result<Box<dyn FilterCallback>> {
    match name {
        "null" => Ok(Box::new(NullFilterCallback::new())),
        "media" => Ok(Box::new(MediaRewritePolicy::from_config(config))),
        "generic" => {
            let base = base.ok_or_else(|| {
                FilterError::Config("The generic policy needs a base URL".into())
            })?;
            Ok(Box::new(
                GenericReadFilterCallback::new(base.clone(), config.clone())
                    .with_tag_replacer(Box::new(MediaRewritePolicy::from_config(config))),
            ))
        }
        _ => Err(FilterError::Config(format!("Unknown policy: {}", name))),
    }
}

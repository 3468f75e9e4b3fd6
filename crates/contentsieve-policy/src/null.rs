//! Policy with no opinions.

use contentsieve_core::{Result, Verdict};
use contentsieve_markup::{FilterCallback, FormTarget, ParsedTag};

/// Abstains at every decision point, leaving the caller's defaults in force.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFilterCallback;

impl NullFilterCallback {
    pub fn new() -> Self {
        Self
    }
}

impl FilterCallback for NullFilterCallback {
    fn process_uri_in_context(
        &mut self,
        _uri: &str,
        _override_type: Option<&str>,
        _no_relative: bool,
        _inline: bool,
    ) -> Result<Verdict<String>> {
        Ok(Verdict::Abstain)
    }

    fn on_base_href(&mut self, _base_href: &str) -> Verdict<String> {
        Verdict::Abstain
    }

    fn process_form(
        &mut self,
        _method: Option<&str>,
        _action: Option<&str>,
    ) -> Result<Verdict<FormTarget>> {
        Ok(Verdict::Abstain)
    }

    fn process_tag(&mut self, _tag: &ParsedTag) -> Verdict<String> {
        Verdict::Abstain
    }
}

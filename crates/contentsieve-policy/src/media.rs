//! Media source rewriting.
//!
//! Rewrites the `src` of `video` and `audio` tags so the media is fetched
//! with a bounding query (by default `noprogress&max-size=0`), which stops
//! it from being streamed and rendered progressively. Everything else is
//! left to the caller.

use contentsieve_config::{MarkupConfig, DEFAULT_MEDIA_QUERY};
use contentsieve_core::{Result, Verdict};
use contentsieve_markup::{
    append_query, split_attribute, FilterCallback, FormTarget, ParsedTag, TagReplacerCallback,
    UriProcessor,
};
use log::debug;

const MEDIA_ELEMENTS: &[&str] = &["video", "audio"];

/// Rewrites media `src` attributes; abstains on everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRewritePolicy {
    query: String,
}

impl Default for MediaRewritePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaRewritePolicy {
    /// Policy appending the default query.
    pub fn new() -> Self {
        Self::with_query(DEFAULT_MEDIA_QUERY)
    }

    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn from_config(config: &MarkupConfig) -> Self {
        Self::with_query(config.media_query.clone())
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Rewrite `tag`, vetting `src` values with `uri_processor` if given.
    ///
    /// Abstains unless `tag` is an opening `video` or `audio` tag whose raw
    /// attributes are all `name="value"`.
    fn rewrite(
        &self,
        tag: &ParsedTag,
        mut uri_processor: Option<&mut dyn UriProcessor>,
    ) -> Verdict<String> {
        if tag.start_slash || !MEDIA_ELEMENTS.iter().any(|e| tag.is_element(e)) {
            return Verdict::Abstain;
        }

        let mut attributes = Vec::with_capacity(tag.unparsed.len());
        for raw in &tag.unparsed {
            let Some((name, value)) = split_attribute(raw) else {
                debug!("Malformed attribute {:?} on <{}>, abstaining", raw, tag.element);
                return Verdict::Abstain;
            };
            if name != "src" {
                attributes.push(raw.clone());
                continue;
            }

            let source = match uri_processor.as_deref_mut() {
                None => value.to_string(),
                Some(processor) => match processor.sanitize_uri(value, None, false, true) {
                    Ok(Verdict::Replace(uri)) => uri,
                    Ok(_) => {
                        debug!("Removing src {:?} from <{}>", value, tag.element);
                        continue;
                    }
                    Err(e) => {
                        debug!("Could not vet src {:?}: {}", value, e);
                        return Verdict::Abstain;
                    }
                },
            };
            attributes.push(format!("{}=\"{}\"", name, append_query(&source, &self.query)));
        }

        Verdict::Replace(tag.with_unparsed(attributes).to_string())
    }
}

impl FilterCallback for MediaRewritePolicy {
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

    fn process_tag(&mut self, tag: &ParsedTag) -> Verdict<String> {
        self.rewrite(tag, None)
    }
}

impl TagReplacerCallback for MediaRewritePolicy {
    fn process_tag(
        &self,
        tag: &ParsedTag,
        uri_processor: &mut dyn UriProcessor,
    ) -> Verdict<String> {
        self.rewrite(tag, Some(uri_processor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentsieve_core::FilterError;

    fn rewrite(text: &str) -> Verdict<String> {
        let tag = ParsedTag::parse(text).unwrap();
        FilterCallback::process_tag(&mut MediaRewritePolicy::new(), &tag)
    }

    #[test]
    fn test_video_src_rewritten() {
        assert_eq!(
            rewrite("<video src=\"http://x/y.ogv\">"),
            Verdict::Replace("<video src=\"http://x/y.ogv?noprogress&max-size=0\">".to_string())
        );
    }

    #[test]
    fn test_audio_case_insensitive() {
        assert_eq!(
            rewrite("<AUDIO src=\"a.oga\" />"),
            Verdict::Replace("<AUDIO src=\"a.oga?noprogress&max-size=0\" />".to_string())
        );
    }

    #[test]
    fn test_other_attributes_untouched() {
        let out = rewrite("<video poster=\"p.png\" SRC=\"x\" width=\"10\">")
            .into_replacement()
            .unwrap();
        // Only the exact name `src` is rewritten.
        assert_eq!(out, "<video poster=\"p.png\" SRC=\"x\" width=\"10\">");
    }

    #[test]
    fn test_existing_query_joined() {
        assert_eq!(
            rewrite("<video src=\"a.ogv?t=1\">"),
            Verdict::Replace("<video src=\"a.ogv?t=1&noprogress&max-size=0\">".to_string())
        );
    }

    #[test]
    fn test_query_goes_before_fragment() {
        assert_eq!(
            rewrite("<video src=\"http://x/y.ogv#t=10\">"),
            Verdict::Replace("<video src=\"http://x/y.ogv?noprogress&max-size=0#t=10\">".to_string())
        );
        assert_eq!(
            rewrite("<video src=\"y.ogv#a?b\">"),
            Verdict::Replace("<video src=\"y.ogv?noprogress&max-size=0#a?b\">".to_string())
        );
    }

    #[test]
    fn test_non_media_abstains() {
        assert!(rewrite("<div>").is_abstain());
        assert!(rewrite("<img src=\"a.png\">").is_abstain());
        assert!(rewrite("</video>").is_abstain());
    }

    #[test]
    fn test_malformed_attributes_abstain() {
        assert!(rewrite("<video controls src=\"a\">").is_abstain());
        assert!(rewrite("<video src=a>").is_abstain());
        assert!(rewrite("<video src=\"a>").is_abstain());
    }

    #[test]
    fn test_custom_query() {
        let config = MarkupConfig {
            media_query: "max-size=1024".to_string(),
            ..MarkupConfig::default()
        };
        let mut policy = MediaRewritePolicy::from_config(&config);
        let tag = ParsedTag::parse("<audio src=\"a\">").unwrap();
        assert_eq!(
            FilterCallback::process_tag(&mut policy, &tag),
            Verdict::Replace("<audio src=\"a?max-size=1024\">".to_string())
        );
    }

    /// Drops `javascript:`, fails on `bad`, prefixes everything else.
    struct Prefixer;

    impl UriProcessor for Prefixer {
        fn sanitize_uri(
            &mut self,
            uri: &str,
            _override_type: Option<&str>,
            _no_relative: bool,
            inline: bool,
        ) -> Result<Verdict<String>> {
            assert!(inline);
            match uri {
                "bad" => Err(FilterError::comment("bad")),
                u if u.starts_with("javascript:") => Ok(Verdict::Drop),
                u => Ok(Verdict::Replace(format!("/proxy/{}", u))),
            }
        }

        fn make_uri_absolute(&self, uri: &str) -> Result<String> {
            Ok(uri.to_string())
        }
    }

    #[test]
    fn test_tag_replacer_vets_src() {
        let policy = MediaRewritePolicy::new();
        let tag = ParsedTag::parse("<video src=\"a.ogv\" loop=\"loop\">").unwrap();
        assert_eq!(
            TagReplacerCallback::process_tag(&policy, &tag, &mut Prefixer),
            Verdict::Replace(
                "<video src=\"/proxy/a.ogv?noprogress&max-size=0\" loop=\"loop\">".to_string()
            )
        );
    }

    #[test]
    fn test_tag_replacer_keeps_fragment_last() {
        let policy = MediaRewritePolicy::new();
        let tag = ParsedTag::parse("<audio src=\"a.oga#t=10\">").unwrap();
        assert_eq!(
            TagReplacerCallback::process_tag(&policy, &tag, &mut Prefixer),
            Verdict::Replace("<audio src=\"/proxy/a.oga?noprogress&max-size=0#t=10\">".to_string())
        );
    }

    #[test]
    fn test_tag_replacer_removes_dropped_src() {
        let policy = MediaRewritePolicy::new();
        let tag = ParsedTag::parse("<video src=\"javascript:x\" loop=\"loop\">").unwrap();
        assert_eq!(
            TagReplacerCallback::process_tag(&policy, &tag, &mut Prefixer),
            Verdict::Replace("<video loop=\"loop\">".to_string())
        );

        let tag = ParsedTag::parse("<video src=\"bad\">").unwrap();
        assert!(TagReplacerCallback::process_tag(&policy, &tag, &mut Prefixer).is_abstain());
    }
}

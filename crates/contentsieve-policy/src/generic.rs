//! Generic read policy.
//!
//! [`GenericReadFilterCallback`] keeps a page inside the origin it was
//! fetched from. Same-origin URIs are rewritten origin-relative, links to
//! other origins are kept (optionally routed through an external link
//! prefix) and inline fetches from other origins are dropped. URIs with a
//! scheme outside `AllowedProtocols` never survive.

use contentsieve_config::MarkupConfig;
use contentsieve_core::{ContentType, FilterError, Result, Verdict};
use contentsieve_markup::{
    FilterCallback, FormTarget, LinkObserver, ParsedTag, TagReplacerCallback, UriProcessor,
};
use log::{debug, trace, warn};
use regex::Regex;
use std::sync::LazyLock;
use url::{form_urlencoded, ParseError, Url};

/// `#fragment` per RFC 3986.
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[a-zA-Z0-9\-._~]|%[0-9A-Fa-f]{2}|[!$&'()*+,;=]|[:@]|/|\?)*$").unwrap()
});

/// What may follow an allowed form prefix.
static FORM_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.]+$").unwrap());

/// Filter callback and URI processor for pages read from one origin.
pub struct GenericReadFilterCallback {
    base: Url,
    config: MarkupConfig,
    observer: Option<Box<dyn LinkObserver>>,
    tag_replacer: Option<Box<dyn TagReplacerCallback>>,
}

impl GenericReadFilterCallback {
    pub fn new(base: Url, config: MarkupConfig) -> Self {
        Self {
            base,
            config,
            observer: None,
            tag_replacer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn LinkObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_tag_replacer(mut self, tag_replacer: Box<dyn TagReplacerCallback>) -> Self {
        self.tag_replacer = Some(tag_replacer);
        self
    }

    /// Current document base, updated by accepted `<base href>` tags.
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn resolve(&self, uri: &str, no_relative: bool) -> Result<Url> {
        match Url::parse(uri) {
            Ok(url) => Ok(url),
            Err(ParseError::RelativeUrlWithoutBase) if no_relative => Err(FilterError::comment(
                format!("Relative URI not allowed here: {}", uri),
            )),
            Err(ParseError::RelativeUrlWithoutBase) => self
                .base
                .join(uri)
                .map_err(|e| FilterError::comment(format!("Could not parse URI: {}", e))),
            Err(e) => Err(FilterError::comment(format!("Could not parse URI: {}", e))),
        }
    }

    /// Origin-relative form of a same-origin URL.
    ///
    /// A type override replaces any `type` query parameter. Its charset is
    /// kept only if it is a plain token. A path starting with `//` gets a
    /// `/.` prefix so it is never read as a network-path reference.
    fn origin_relative(url: &Url, override_type: Option<&str>) -> String {
        let path = url.path();
        let mut out = if path.starts_with("//") {
            format!("/.{}", path)
        } else {
            path.to_string()
        };

        match override_type {
            Some(override_type) => {
                let ct = ContentType::split(override_type);
                let charset = ct.charset.as_deref().filter(|c| ContentType::is_safe_charset(c));
                let full_type = ContentType::new(ct.base.as_str(), charset).to_string();

                let mut query = form_urlencoded::Serializer::new(String::new());
                for (name, value) in url.query_pairs().filter(|(name, _)| name != "type") {
                    query.append_pair(&name, &value);
                }
                query.append_pair("type", &full_type);
                out.push('?');
                out.push_str(&query.finish());
            }
            None => {
                if let Some(query) = url.query() {
                    out.push('?');
                    out.push_str(query);
                }
            }
        }

        if let Some(fragment) = url.fragment() {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}

impl FilterCallback for GenericReadFilterCallback {
    fn process_uri_in_context(
        &mut self,
        uri: &str,
        override_type: Option<&str>,
        no_relative: bool,
        inline: bool,
    ) -> Result<Verdict<String>> {
        if ANCHOR_RE.is_match(uri) {
            return Ok(Verdict::Replace(uri.to_string()));
        }

        let uri = uri.replace(" #", " %23");
        trace!("Processing {}", uri);
        let url = self.resolve(&uri, no_relative)?;
        trace!("Resolved: {}", url);

        if !self.config.protocol_allowed(url.scheme()) {
            warn!("Dropping URI with disallowed protocol {}: {}", url.scheme(), uri);
            return Ok(Verdict::Drop);
        }

        if url.origin() == self.base.origin() {
            if let Some(observer) = self.observer.as_mut() {
                observer.found_uri(url.as_str(), inline);
            }
            return Ok(Verdict::Replace(Self::origin_relative(&url, override_type)));
        }

        if inline {
            debug!("Dropping inline fetch from another origin: {}", url);
            return Ok(Verdict::Drop);
        }
        Ok(Verdict::Replace(match &self.config.external_link_prefix {
            Some(prefix) => format!(
                "{}{}",
                prefix,
                form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect::<String>()
            ),
            None => url.to_string(),
        }))
    }

    fn on_base_href(&mut self, base_href: &str) -> Verdict<String> {
        let url = match self.resolve(base_href, false) {
            Ok(url) => url,
            Err(e) => {
                warn!("Failed to parse base href {}: {}", base_href, e);
                return Verdict::Drop;
            }
        };
        if url.origin() != self.base.origin() {
            warn!("Dropping base href to another origin: {}", base_href);
            return Verdict::Drop;
        }
        debug!("Base changed to {}", url);
        self.base = url;
        Verdict::Replace(self.base.to_string())
    }

    fn on_text(&mut self, text: &str, content_type: Option<&str>) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_text(text, content_type, self.base.as_str());
        }
    }

    fn process_form(
        &mut self,
        method: Option<&str>,
        action: Option<&str>,
    ) -> Result<Verdict<FormTarget>> {
        let Some(action) = action else {
            return Ok(Verdict::Drop);
        };
        let method = method.unwrap_or("GET").to_ascii_uppercase();
        if method != "GET" && method != "POST" {
            debug!("Dropping form with method {}", method);
            return Ok(Verdict::Drop);
        }
        let target = || FormTarget {
            method: method.clone(),
            action: action.to_string(),
        };

        if self.config.allowed_form_paths.iter().any(|p| p == action) {
            return Ok(Verdict::Replace(target()));
        }

        match Url::parse(action) {
            Err(ParseError::RelativeUrlWithoutBase) if !action.starts_with("//") => {}
            Err(ParseError::RelativeUrlWithoutBase) | Ok(_) => {
                return Err(FilterError::comment(format!("Invalid form URI: {}", action)));
            }
            Err(e) => {
                return Err(FilterError::comment(format!(
                    "Could not parse form URI: {}",
                    e
                )));
            }
        }

        let path = action.split(['?', '#']).next().unwrap_or(action);
        for prefix in &self.config.allowed_form_prefixes {
            let Some(tail) = path.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if tail.contains("../") || (!tail.is_empty() && tail.bytes().all(|b| b == b'.')) {
                return Err(FilterError::comment(format!(
                    "Invalid form URI, attempt to escape {}: {}",
                    prefix, action
                )));
            }
            if FORM_TAIL_RE.is_match(tail) {
                return Ok(Verdict::Replace(target()));
            }
        }

        debug!("Dropping form with action {}", action);
        Ok(Verdict::Drop)
    }

    fn process_tag(&mut self, tag: &ParsedTag) -> Verdict<String> {
        let Some(replacer) = self.tag_replacer.take() else {
            return Verdict::Abstain;
        };
        let verdict = replacer.process_tag(tag, self);
        self.tag_replacer = Some(replacer);
        verdict
    }

    fn on_finished(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_finished_page();
        }
    }
}

impl UriProcessor for GenericReadFilterCallback {
    fn sanitize_uri(
        &mut self,
        uri: &str,
        override_type: Option<&str>,
        no_relative: bool,
        inline: bool,
    ) -> Result<Verdict<String>> {
        self.process_uri_in_context(uri, override_type, no_relative, inline)
    }

    fn make_uri_absolute(&self, uri: &str) -> Result<String> {
        self.base
            .join(uri)
            .map(String::from)
            .map_err(|e| FilterError::UriSyntax(format!("{}: {}", uri, e)))
    }
}

// microformats — extract Microformats (h-*, p-*, u-*, dt-*, e-*) data from
// parsed HTML trees.
//
// Architecture:
//   HTML string ──(facade, html5ever)──▶ HTML tree ──(driver)──▶ Document
//
// The core algorithm (driver → walker → matcher/property/vcp/text/date/url)
// never touches a raw string: it consumes an already-built
// `markup5ever_rcdom::Handle` tree. `parse_microformats` below is the
// convenience facade that also owns the HTML-parsing step.
//
// Reference: the microformats2 parsing specification
// (http://microformats.org/wiki/microformats2-parsing).

mod date;
mod dom;
mod driver;
mod error;
mod matcher;
mod model;
mod prefix;
mod property;
mod rel;
mod text;
mod url_resolve;
mod vcp;
mod walker;

pub use error::Error;
pub use model::{Document, Item, PropertyValue, RelUrl};

/// Re-exported so callers that already have a parsed tree (e.g. from their
/// own `html5ever` pipeline) can call [`parse_html_element`] directly
/// without adding a second `markup5ever_rcdom` dependency version.
pub use markup5ever_rcdom::Handle;

/// Parsing options (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Parse and canonicalize dates everywhere, not only inside the
    /// Value-Class-Pattern sub-parser. Default `true`.
    pub date_normalization: bool,
    /// Allow a previously seen date's zone to be inherited by a later bare
    /// time value. Default `false`.
    pub implied_tz: bool,
    /// Attach `lang` to items and `e-` structures. Default `true`.
    pub lang: bool,
    /// Use the "thorough" text-extraction algorithm rather than "simple".
    /// Default `true`.
    pub thorough_trim: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { date_normalization: true, implied_tz: false, lang: true, thorough_trim: true }
    }
}

impl Options {
    /// Options with every spec.md §6 default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_normalization(mut self, value: bool) -> Self {
        self.date_normalization = value;
        self
    }

    pub fn with_implied_tz(mut self, value: bool) -> Self {
        self.implied_tz = value;
        self
    }

    pub fn with_lang(mut self, value: bool) -> Self {
        self.lang = value;
        self
    }

    pub fn with_thorough_trim(mut self, value: bool) -> Self {
        self.thorough_trim = value;
        self
    }
}

/// Parse an HTML string for Microformats, using default [`Options`].
///
/// # Examples
///
/// ```
/// let doc = microformats::parse_microformats(
///     r#"<div class="h-card"><a class="u-url" href="/me">Jo</a></div>"#,
///     "https://example.test/",
///     &microformats::Options::default(),
/// ).unwrap();
/// assert_eq!(doc.items[0].r#type, vec!["h-card".to_string()]);
/// ```
pub fn parse_microformats(html: &str, base_url: &str, options: &Options) -> Result<Document, Error> {
    let root = dom::parse_detached_fragment(html);
    parse_html_element(&root, base_url, options)
}

/// Extract Microformats from an already-parsed HTML tree (spec.md §3
/// primary entry point). `element` may be any node in the tree; its
/// entire subtree is scanned for root candidates.
pub fn parse_html_element(element: &Handle, base_url: &str, options: &Options) -> Result<Document, Error> {
    driver::parse_html_element(element, base_url, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_microformats_yields_empty_document() {
        let doc = parse_microformats("<p>Hello</p>", "https://example.test/", &Options::default()).unwrap();
        assert!(doc.items.is_empty());
        assert!(doc.rels.is_empty());
        assert!(doc.rel_urls.is_empty());
    }

    #[test]
    fn default_options_match_spec() {
        let options = Options::default();
        assert!(options.date_normalization);
        assert!(!options.implied_tz);
        assert!(options.lang);
        assert!(options.thorough_trim);
    }

    #[test]
    fn builder_overrides_defaults() {
        let options = Options::new().with_implied_tz(true).with_lang(false);
        assert!(options.implied_tz);
        assert!(!options.lang);
    }

    #[test]
    fn simple_h_card_with_implied_name() {
        let doc = parse_microformats(
            r#"<div class="h-card"><a class="u-url" href="/me">Jo</a></div>"#,
            "https://x.test/",
            &Options::default(),
        )
        .unwrap();
        assert_eq!(doc.items.len(), 1);
        let item = &doc.items[0];
        assert_eq!(item.r#type, vec!["h-card".to_string()]);
        assert_eq!(item.properties.get("url").unwrap()[0], PropertyValue::Url("https://x.test/me".into()));
        assert_eq!(item.properties.get("name").unwrap()[0], PropertyValue::Text("Jo".into()));
    }
}

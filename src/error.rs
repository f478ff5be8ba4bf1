/// Errors that can occur while extracting microformats.
///
/// The core algorithm (spec.md §7) never rejects a document: malformed
/// dates, URLs, and class syntax degrade to raw strings or absent
/// properties. Neither of spec.md §7's two named error kinds has a
/// variant here: `InvalidUrl` is raised and caught entirely inside
/// `url_resolve`, never escaping that module, and `ProgrammerError`
/// ("unknown property prefix") has no representable case to guard
/// against once the prefix is a closed `Prefix` enum rather than a
/// string. The variants below are the ones this crate's public API can
/// actually produce.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The convenience facade could not decode the input as UTF-8 HTML.
    #[error("HTML input error: {0}")]
    Html(String),

    /// The caller's `base_url` argument could not be parsed as a URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

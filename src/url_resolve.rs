// URL resolution and normalization — spec.md §4.A (component A).
//
// The WHATWG URL Standard machinery (scheme classification, authority
// parsing, IPv4/IPv6 host normalization, IDNA, percent-encoding sets,
// dot-segment collapsing, default-port elision) is exactly what the
// `url` crate implements; this module is a thin, fallback-on-failure
// wrapper, generalized from the teacher crate's
// `hast_to_mdast/mod.rs::State::resolve` (`base.join(raw)` with a
// fallback to the raw string).

use url::Url;

/// Resolve `raw` against `base` and return its normalized serialization.
/// On any parse/resolution failure, spec.md §4.A/§7 says to return the
/// input unchanged rather than propagate an error.
pub fn resolve_url(raw: &str, base: &Url) -> String {
    match base.join(raw) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Resolve `raw` against a base URL given as a string. If `base_str`
/// itself fails to parse, the raw input is returned unchanged (the
/// resolver never panics or propagates `InvalidUrl`, per spec.md §7).
pub fn resolve_url_str(raw: &str, base_str: &str) -> String {
    match Url::parse(base_str) {
        Ok(base) => resolve_url(raw, &base),
        Err(_) => raw.to_string(),
    }
}

/// Parse and normalize a standalone URL (no base), used for the driver's
/// own caller-supplied base URL. Returns the raw string on failure.
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(u) => u.to_string(),
        Err(_) => raw.to_string(),
    }
}

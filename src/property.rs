// Property extractor — spec.md §4.F (component F).
//
// Per-prefix extraction cascades, generalized from the teacher crate's
// per-tag handler dispatch shape (`stringify/handlers.rs::handle`) into one
// cascade-of-rules function per prefix rather than one function per node
// type — the property extractor dispatches on *prefix*, not on tag, so a
// single ordered `if let` chain per prefix is the natural shape here.

use markup5ever_rcdom::Handle;
use url::Url;

use crate::date::{self, DateTimeParts, Stitched};
use crate::dom::{get_attr, inner_html, parse_detached_fragment, rewrite_urls_in_place, tag_name};
use crate::model::PropertyValue;
use crate::prefix::Prefix;
use crate::text;
use crate::url_resolve::{resolve_url, resolve_url_str};
use crate::vcp::{self, VcpValue};

/// Per-call settings threaded through every property cascade.
pub struct PropertyContext<'a> {
    pub base: &'a Url,
    pub raw_doc_url: &'a str,
    pub thorough_trim: bool,
    pub date_normalization: bool,
    pub implied_tz: bool,
}

/// The outcome of a `dt-*` extraction: a value plus, when the VCP
/// sub-parser yielded a time-only fragment with no implied date yet
/// available, the partial record for the walker's post-implied-date pass
/// (spec.md §4.G step 4c).
pub struct DtResult {
    pub value: PropertyValue,
    pub partial: Option<DateTimeParts>,
    /// The full record, when one was produced — the walker uses this to
    /// update its running `impliedDate`.
    pub full: Option<DateTimeParts>,
}

// ---------------------------------------------------------------------------
// p-*
// ---------------------------------------------------------------------------

pub fn extract_p(
    handle: &Handle,
    ctx: &PropertyContext,
    has_child_microformat: bool,
    backcompat_scope: Option<&str>,
    via_tag_relation: bool,
) -> PropertyValue {
    if !has_child_microformat {
        if let Some(VcpValue::Text(s)) = vcp::extract(handle, Prefix::P, backcompat_scope) {
            return PropertyValue::Text(s);
        }
    }
    let tag = tag_name(handle).unwrap_or_default();
    if matches!(tag.as_str(), "abbr" | "link") {
        if let Some(title) = get_attr(handle, "title") {
            return PropertyValue::Text(title);
        }
    }
    if matches!(tag.as_str(), "data" | "input") {
        if let Some(value) = get_attr(handle, "value") {
            return PropertyValue::Text(value);
        }
    }
    if matches!(tag.as_str(), "img" | "area") {
        if let Some(alt) = get_attr(handle, "alt") {
            return PropertyValue::Text(alt);
        }
    }
    if via_tag_relation {
        if let Some(href) = get_attr(handle, "href") {
            if let Some(segment) = last_path_segment_decoded(&href) {
                return PropertyValue::Text(segment);
            }
        }
    }
    PropertyValue::Text(text::extract(handle, Prefix::P, ctx.base, ctx.thorough_trim))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn last_path_segment_decoded(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    Some(percent_decode(segment))
}

// ---------------------------------------------------------------------------
// u-*
// ---------------------------------------------------------------------------

pub fn extract_u(
    handle: &Handle,
    ctx: &PropertyContext,
    has_child_microformat: bool,
    backcompat_scope: Option<&str>,
) -> PropertyValue {
    let tag = tag_name(handle).unwrap_or_default();

    if matches!(tag.as_str(), "a" | "area" | "link") {
        if let Some(href) = get_attr(handle, "href") {
            return PropertyValue::Url(resolve_url(&href, ctx.base));
        }
    }
    if tag == "img" {
        if let Some(src) = get_attr(handle, "src") {
            let url = resolve_url(&src, ctx.base);
            return if backcompat_scope.is_some() {
                PropertyValue::Url(url)
            } else {
                PropertyValue::Image { value: url, alt: get_attr(handle, "alt").unwrap_or_default() }
            };
        }
    }
    if matches!(tag.as_str(), "audio" | "video" | "source" | "iframe") {
        if let Some(src) = get_attr(handle, "src") {
            return PropertyValue::Url(resolve_url(&src, ctx.base));
        }
    }
    if tag == "video" {
        if let Some(poster) = get_attr(handle, "poster") {
            return PropertyValue::Url(resolve_url(&poster, ctx.base));
        }
    }
    if tag == "object" {
        if let Some(data) = get_attr(handle, "data") {
            return PropertyValue::Url(resolve_url(&data, ctx.base));
        }
    }
    if !has_child_microformat {
        if let Some(VcpValue::Text(s)) = vcp::extract(handle, Prefix::U, backcompat_scope) {
            return PropertyValue::Url(resolve_url(&s, ctx.base));
        }
    }
    if tag == "abbr" {
        if let Some(title) = get_attr(handle, "title") {
            return PropertyValue::Url(resolve_url(&title, ctx.base));
        }
    }
    if matches!(tag.as_str(), "data" | "input") {
        if let Some(value) = get_attr(handle, "value") {
            return PropertyValue::Url(resolve_url(&value, ctx.base));
        }
    }
    let text = text::extract(handle, Prefix::U, ctx.base, ctx.thorough_trim);
    PropertyValue::Url(resolve_url(&text, ctx.base))
}

// ---------------------------------------------------------------------------
// dt-*
// ---------------------------------------------------------------------------

pub fn extract_dt(
    handle: &Handle,
    ctx: &PropertyContext,
    has_child_microformat: bool,
    backcompat_scope: Option<&str>,
    implied: Option<&DateTimeParts>,
) -> DtResult {
    if !has_child_microformat {
        if let Some(VcpValue::Date(parts)) = vcp::extract(handle, Prefix::Dt, backcompat_scope) {
            return finish(parts, ctx, implied, true);
        }
    }
    let tag = tag_name(handle).unwrap_or_default();
    if matches!(tag.as_str(), "time" | "ins" | "del") {
        if let Some(dt) = get_attr(handle, "datetime") {
            return finish_raw(&dt, ctx, implied);
        }
    }
    if tag == "abbr" {
        if let Some(title) = get_attr(handle, "title") {
            return finish_raw(&title, ctx, implied);
        }
    }
    if matches!(tag.as_str(), "data" | "input") {
        if let Some(value) = get_attr(handle, "value") {
            return finish_raw(&value, ctx, implied);
        }
    }
    let text = text::extract(handle, Prefix::Dt, ctx.base, ctx.thorough_trim);
    finish_raw(&text, ctx, implied)
}

fn finish_raw(raw: &str, ctx: &PropertyContext, implied: Option<&DateTimeParts>) -> DtResult {
    if !ctx.date_normalization {
        return DtResult { value: PropertyValue::Text(raw.to_string()), partial: None, full: None };
    }
    finish(date::parse(raw), ctx, implied, false)
}

fn finish(parts: DateTimeParts, ctx: &PropertyContext, implied: Option<&DateTimeParts>, vcp_mode: bool) -> DtResult {
    match date::stitch(&parts, implied, vcp_mode, ctx.implied_tz) {
        Stitched::Full(s) => DtResult { value: PropertyValue::Text(s), partial: None, full: Some(parts) },
        Stitched::Partial(p) => DtResult { value: PropertyValue::Text(String::new()), partial: Some(p), full: None },
        Stitched::None => DtResult { value: PropertyValue::Text(String::new()), partial: None, full: None },
    }
}

// ---------------------------------------------------------------------------
// e-*
// ---------------------------------------------------------------------------

/// `{html, value[, lang]}` per spec.md §4.F. The subtree is cloned (by
/// reserializing and reparsing, since an rcdom `Handle` clone only bumps a
/// reference count rather than copying node data — mutating the "clone"
/// in place would otherwise mutate the caller's input tree) so URL
/// rewriting never touches the original document (spec.md §5).
pub fn extract_e(handle: &Handle, ctx: &PropertyContext, lang: Option<String>) -> PropertyValue {
    let raw_html = inner_html(handle);
    let clone = parse_detached_fragment(&raw_html);
    rewrite_urls_in_place(&clone, ctx.base.as_str(), ctx.raw_doc_url, &|raw, base| resolve_url_str(raw, base));
    let html = inner_html(&clone).trim().to_string();
    let value = text::extract(handle, Prefix::E, ctx.base, ctx.thorough_trim);
    PropertyValue::Markup { html, value, lang }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{element_children, parse_detached_fragment};

    fn base() -> Url {
        Url::parse("https://x.test/").unwrap()
    }

    fn ctx(base: &Url) -> PropertyContext<'_> {
        PropertyContext {
            base,
            raw_doc_url: "https://x.test/",
            thorough_trim: true,
            date_normalization: true,
            implied_tz: false,
        }
    }

    #[test]
    fn p_uses_abbr_title() {
        let b = base();
        let root = parse_detached_fragment(r#"<abbr title="Full Name">FN</abbr>"#);
        let abbr = &element_children(&root)[0];
        let v = extract_p(abbr, &ctx(&b), false, None, false);
        assert_eq!(v, PropertyValue::Text("Full Name".into()));
    }

    #[test]
    fn u_resolves_anchor_href_against_base() {
        let b = base();
        let root = parse_detached_fragment(r#"<a href="/me">Jo</a>"#);
        let a = &element_children(&root)[0];
        let v = extract_u(a, &ctx(&b), false, None);
        assert_eq!(v, PropertyValue::Url("https://x.test/me".into()));
    }

    #[test]
    fn u_img_v2_returns_image_struct() {
        let b = base();
        let root = parse_detached_fragment(r#"<img src="p.jpg" alt="A">"#);
        let img = &element_children(&root)[0];
        let v = extract_u(img, &ctx(&b), false, None);
        assert_eq!(v, PropertyValue::Image { value: "https://x.test/p.jpg".into(), alt: "A".into() });
    }

    #[test]
    fn u_img_backcompat_returns_plain_string() {
        let b = base();
        let root = parse_detached_fragment(r#"<img src="p.jpg" alt="A">"#);
        let img = &element_children(&root)[0];
        let v = extract_u(img, &ctx(&b), false, Some("h-card"));
        assert_eq!(v, PropertyValue::Url("https://x.test/p.jpg".into()));
    }

    #[test]
    fn dt_reads_time_datetime_attribute() {
        let b = base();
        let root = parse_detached_fragment(r#"<time datetime="2020-01-02T03:04">x</time>"#);
        let t = &element_children(&root)[0];
        let result = extract_dt(t, &ctx(&b), false, None, None);
        assert_eq!(result.value, PropertyValue::Text("2020-01-02 03:04".into()));
    }

    #[test]
    fn dt_raw_when_normalization_disabled() {
        let b = base();
        let mut c = ctx(&b);
        c.date_normalization = false;
        let root = parse_detached_fragment(r#"<time datetime="not-a-date">x</time>"#);
        let t = &element_children(&root)[0];
        let result = extract_dt(t, &c, false, None, None);
        assert_eq!(result.value, PropertyValue::Text("not-a-date".into()));
    }

    #[test]
    fn e_rewrites_relative_urls_in_html() {
        let b = base();
        let root = parse_detached_fragment(r#"<div><a href="/x">link</a></div>"#);
        let div = &element_children(&root)[0];
        let PropertyValue::Markup { html, .. } = extract_e(div, &ctx(&b), None) else {
            panic!("expected markup");
        };
        assert!(html.contains("https://x.test/x"), "got {html}");
    }

    #[test]
    fn e_does_not_mutate_original_tree() {
        let b = base();
        let root = parse_detached_fragment(r#"<div><a href="/x">link</a></div>"#);
        let div = &element_children(&root)[0];
        let _ = extract_e(div, &ctx(&b), None);
        let a = &element_children(div)[0];
        assert_eq!(get_attr(a, "href").as_deref(), Some("/x"));
    }
}

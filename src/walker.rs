// Microformat walker — spec.md §4.G (component G).
//
// The recursive engine: finds properties and child items on each
// descendant, applies implied-value inference, and performs post-implied-
// date stitching. Grounded on the teacher crate's `hast_to_mdast/mod.rs::
// transform` top-level orchestration shape (index pass, then walk, then
// post-process) and `hast_to_mdast/whitespace.rs::post_process_whitespace`'s
// two-phase build-then-revisit-and-fix pattern — the same shape
// post-implied-date stitching needs. Partial-date references are recorded
// as `(key, index, partial)` locators into the item being built rather
// than mutable aliases into already-emitted values (spec.md §9 redesign
// note).

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use url::Url;

use crate::date::{self, DateTimeParts};
use crate::dom::{
    class_tokens, element_children, get_attr, has_attr, is_in_template, is_tag, nearest_attr, tag_name,
    walk_descendants,
};
use crate::matcher;
use crate::model::{Item, PropertyValue};
use crate::prefix::Prefix;
use crate::property::{self, PropertyContext};
use crate::url_resolve::resolve_url;

/// Immutable per-call settings (spec.md §9: an immutable `Context` rather
/// than instance state).
pub struct WalkContext<'a> {
    pub base: &'a Url,
    pub raw_doc_url: &'a str,
    pub lang: bool,
    pub thorough_trim: bool,
    pub date_normalization: bool,
    pub implied_tz: bool,
}

fn node_rel_tokens(node: &Handle) -> Vec<String> {
    match get_attr(node, "rel") {
        Some(v) => v.split_ascii_whitespace().map(str::to_string).collect(),
        None => Vec::new(),
    }
}

/// Recursively parse the microformat rooted at `root`, given its already-
/// determined `types` (v2 tags or backcompat-mapped-to-v2 tags) and
/// whether backcompat rules are in effect for this subtree. `root_candidates`
/// is the driver's shared root-candidate list; descendants consumed here as
/// nested child items are removed from it so the driver does not re-parse
/// them as top-level roots (spec.md §4.I/§4.G).
pub fn parse_microformat(
    root: &Handle,
    types: Vec<String>,
    backcompat: bool,
    ctx: &WalkContext,
    root_candidates: &mut Vec<Handle>,
) -> Item {
    #[cfg(feature = "tracing")]
    tracing::trace!(types = ?types, backcompat, "parsing microformat item");

    let mut item = Item::new(types.clone());
    if let Some(id) = get_attr(root, "id") {
        if !id.is_empty() {
            item.id = Some(id);
        }
    }
    if ctx.lang {
        if let Some(lang) = nearest_attr(root, "lang") {
            item.lang = Some(lang);
        }
    }

    let backcompat_root_type = types.first().cloned();

    let mut has_p = false;
    let mut has_e = false;
    let mut has_u = false;
    let mut has_child = false;
    let mut implied_date: Option<DateTimeParts> = None;
    let mut partials: Vec<(String, usize, DateTimeParts)> = Vec::new();
    let mut deferred: Vec<(String, PropertyValue)> = Vec::new();

    // The root element itself may carry a `rel` attribute (e.g. an
    // `<a rel="self bookmark" class="h-review" href="...">` where the
    // hyperlink *is* the item root) — the descendant walk below starts at
    // root's children and never revisits root, so backcompat rel-derived
    // properties on the root itself are handled here first (spec.md §4.D
    // "self bookmark" rule, §8 scenario 3).
    if backcompat {
        if let Some(root_type) = backcompat_root_type.as_deref() {
            let rels = node_rel_tokens(root);
            if !rels.is_empty() {
                let mut root_entries: Vec<(Prefix, String, bool)> = Vec::new();
                for rel in &rels {
                    if let Some(rule) = matcher::backcompat_rel(rel) {
                        root_entries.push((rule.prefix, rule.name.to_string(), rule.defer));
                    }
                }
                if matcher::self_bookmark_url(&rels, root_type) {
                    root_entries.push((Prefix::U, "url".to_string(), false));
                }
                if !root_entries.is_empty() {
                    let prop_ctx = PropertyContext {
                        base: ctx.base,
                        raw_doc_url: ctx.raw_doc_url,
                        thorough_trim: ctx.thorough_trim,
                        date_normalization: ctx.date_normalization,
                        implied_tz: ctx.implied_tz,
                    };
                    for (prefix, key, defer) in root_entries {
                        match prefix {
                            Prefix::P => {
                                has_p = true;
                                let value = property::extract_p(root, &prop_ctx, false, Some(root_type), false);
                                push_or_defer(&mut item, &mut deferred, key, value, defer);
                            }
                            Prefix::U => {
                                has_u = true;
                                let value = property::extract_u(root, &prop_ctx, false, Some(root_type));
                                push_or_defer(&mut item, &mut deferred, key, value, defer);
                            }
                            Prefix::E => {
                                has_e = true;
                                let lang = if ctx.lang { nearest_attr(root, "lang") } else { None };
                                let value = property::extract_e(root, &prop_ctx, lang);
                                push_or_defer(&mut item, &mut deferred, key, value, defer);
                            }
                            Prefix::Dt => {
                                let result =
                                    property::extract_dt(root, &prop_ctx, false, Some(root_type), implied_date.as_ref());
                                if let Some(full) = result.full.clone() {
                                    implied_date = Some(full);
                                }
                                if defer {
                                    deferred.push((key, result.value));
                                } else {
                                    item.push_property(&key, result.value);
                                    if let Some(partial) = result.partial {
                                        let idx = item.properties[&key].len() - 1;
                                        partials.push((key, idx, partial));
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    walk_descendants(root, |node| {
        if is_in_template(node) {
            return false;
        }

        let mut tokens = class_tokens(node);
        let mut entries: Vec<(Prefix, String, bool)> =
            matcher::v2_properties(&tokens).into_iter().map(|(p, n)| (p, n, false)).collect();

        if backcompat {
            if let Some(root_type) = backcompat_root_type.as_deref() {
                for class in tokens.clone() {
                    let rule = if class == "entry-date" && is_tag(node, "time") && has_attr(node, "datetime") {
                        Some(matcher::ENTRY_DATE)
                    } else {
                        matcher::backcompat_property(root_type, &class)
                    };
                    if let Some(rule) = rule {
                        entries.push((rule.prefix, rule.name.to_string(), rule.defer));
                        for extra in rule.extra_roots {
                            if !tokens.iter().any(|t| t == extra) {
                                tokens.push(extra.to_string());
                            }
                        }
                    }
                }
                let rels = node_rel_tokens(node);
                if !rels.is_empty() {
                    for rel in &rels {
                        if let Some(rule) = matcher::backcompat_rel(rel) {
                            entries.push((rule.prefix, rule.name.to_string(), rule.defer));
                        }
                    }
                    if matcher::self_bookmark_url(&rels, root_type) {
                        entries.push((Prefix::U, "url".to_string(), false));
                    }
                }
            }
        }

        let via_tag_relation = backcompat
            && node_rel_tokens(node).iter().any(|r| r == "tag")
            && entries.iter().any(|(p, n, _)| *p == Prefix::P && n == "category");

        // Child-microformat detection: v2 roots first, then backcompat
        // roots over the possibly-extended token list, then the "item"
        // marker promoted to h-item when no other root applies.
        let mut child_types = matcher::v2_roots(&tokens);
        let mut child_is_backcompat = false;
        if child_types.is_empty() && backcompat {
            let bc_roots = matcher::backcompat_roots(&tokens);
            if !bc_roots.is_empty() {
                child_types = bc_roots.into_iter().map(str::to_string).collect();
                child_is_backcompat = true;
            } else if tokens.iter().any(|t| t == "item") {
                child_types = vec!["h-item".to_string()];
                child_is_backcompat = true;
            }
        }

        let mut child_item: Option<Item> = None;
        if !child_types.is_empty() {
            has_child = true;
            root_candidates.retain(|h| !Rc::ptr_eq(h, node));
            let recurse_backcompat = backcompat || child_is_backcompat;
            child_item = Some(parse_microformat(node, child_types, recurse_backcompat, ctx, root_candidates));
        }

        if entries.is_empty() {
            if let Some(child) = child_item {
                item.children.push(child);
                return false;
            }
            return true;
        }

        let prop_ctx = PropertyContext {
            base: ctx.base,
            raw_doc_url: ctx.raw_doc_url,
            thorough_trim: ctx.thorough_trim,
            date_normalization: ctx.date_normalization,
            implied_tz: ctx.implied_tz,
        };
        let backcompat_scope = backcompat_root_type.as_deref();
        let has_child_flag = child_item.is_some();

        for (prefix, key, defer) in entries {
            match prefix {
                Prefix::P => {
                    has_p = true;
                    let raw = property::extract_p(node, &prop_ctx, has_child_flag, backcompat_scope, via_tag_relation);
                    let value = match &child_item {
                        Some(child) => combine_with_child(Prefix::P, raw, child),
                        None => raw,
                    };
                    push_or_defer(&mut item, &mut deferred, key, value, defer);
                }
                Prefix::U => {
                    has_u = true;
                    let raw = property::extract_u(node, &prop_ctx, has_child_flag, backcompat_scope);
                    let value = match &child_item {
                        Some(child) => combine_with_child(Prefix::U, raw, child),
                        None => raw,
                    };
                    push_or_defer(&mut item, &mut deferred, key, value, defer);
                }
                Prefix::E => {
                    has_e = true;
                    let lang = if ctx.lang { nearest_attr(node, "lang") } else { None };
                    let raw = property::extract_e(node, &prop_ctx, lang);
                    let value = match &child_item {
                        Some(child) => combine_with_child(Prefix::E, raw, child),
                        None => raw,
                    };
                    push_or_defer(&mut item, &mut deferred, key, value, defer);
                }
                Prefix::Dt => {
                    let result =
                        property::extract_dt(node, &prop_ctx, has_child_flag, backcompat_scope, implied_date.as_ref());
                    if let Some(full) = result.full.clone() {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(?full, "post-implied date discovered, restitching earlier partials");
                        implied_date = Some(full.clone());
                        resolve_partials(&mut item, &mut partials, &full, ctx.implied_tz);
                    }
                    let value = match &child_item {
                        Some(child) => combine_with_child(Prefix::Dt, result.value, child),
                        None => result.value,
                    };
                    if defer {
                        deferred.push((key, value));
                    } else {
                        item.push_property(&key, value);
                        if let Some(partial) = result.partial {
                            let idx = item.properties[&key].len() - 1;
                            partials.push((key, idx, partial));
                        }
                    }
                }
            }
        }

        !has_child_flag
    });

    for (key, value) in deferred {
        if !item.has_property(&key) {
            item.push_property(key, value);
        }
    }

    if !item.has_property("name") && !has_p && !has_e && !has_child {
        if let Some(name) = implied_name(root, ctx) {
            item.push_property("name", PropertyValue::Text(name));
        }
    }
    if !item.has_property("photo") && !has_u && !has_child {
        if let Some(photo) = implied_photo(root, ctx) {
            item.push_property("photo", photo);
        }
    }
    if !item.has_property("url") && !has_u && !has_child {
        if let Some(url) = implied_url(root, ctx) {
            item.push_property("url", PropertyValue::Url(url));
        }
    }

    item
}

fn push_or_defer(item: &mut Item, deferred: &mut Vec<(String, PropertyValue)>, key: String, value: PropertyValue, defer: bool) {
    if defer {
        deferred.push((key, value));
    } else {
        item.push_property(key, value);
    }
}

/// Combine a property's own parsed value with a nested child item per
/// spec.md §4.G step 4.d: the envelope carries the child item's own keys,
/// plus a `value` field copied from the prefix-specific combining rule.
fn combine_with_child(prefix: Prefix, parsed_value: PropertyValue, child: &Item) -> PropertyValue {
    let mut envelope = child.clone();
    let value_field = match prefix {
        Prefix::P => child.properties.get("name").and_then(|v| v.first()).cloned().unwrap_or(parsed_value),
        Prefix::U => child.properties.get("url").and_then(|v| v.first()).cloned().unwrap_or(parsed_value),
        // e- and dt- combining reuse the extractor's own result verbatim
        // (the Open Question on e- combining both `html` and `value` is
        // satisfied by carrying the whole Markup struct through here).
        Prefix::E | Prefix::Dt => parsed_value,
    };
    envelope.value = Some(Box::new(value_field));
    PropertyValue::Item(Box::new(envelope))
}

fn resolve_partials(item: &mut Item, partials: &mut Vec<(String, usize, DateTimeParts)>, full: &DateTimeParts, implied_tz: bool) {
    for (key, idx, partial) in partials.drain(..) {
        if let date::Stitched::Full(stitched) = date::stitch(&partial, Some(full), true, implied_tz) {
            if let Some(slot) = item.properties.get_mut(&key).and_then(|list| list.get_mut(idx)) {
                *slot = PropertyValue::Text(stitched);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Implied name / photo / url (spec.md §4.G step 6, v2 only)
// ---------------------------------------------------------------------------

fn implied_name(root: &Handle, ctx: &WalkContext) -> Option<String> {
    if is_tag(root, "img") {
        if let Some(alt) = get_attr(root, "alt") {
            return Some(alt.trim().to_string());
        }
    }
    if is_tag(root, "abbr") {
        if let Some(title) = get_attr(root, "title") {
            return Some(title.trim().to_string());
        }
    }
    if let Some(name) = single_child_name(root) {
        return Some(name.trim().to_string());
    }
    if let Some(children) = one_element_child(root) {
        if let Some(name) = single_child_name(&children) {
            return Some(name.trim().to_string());
        }
    }
    let text = crate::text::extract(root, Prefix::P, ctx.base, ctx.thorough_trim);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn one_element_child(root: &Handle) -> Option<Handle> {
    let children = element_children(root);
    if children.len() == 1 {
        Some(children[0].clone())
    } else {
        None
    }
}

fn single_child_name(root: &Handle) -> Option<String> {
    let child = one_element_child(root)?;
    match tag_name(&child).as_deref() {
        Some("img") | Some("area") => get_attr(&child, "alt"),
        Some("abbr") => get_attr(&child, "title"),
        _ => None,
    }
}

fn implied_photo(root: &Handle, ctx: &WalkContext) -> Option<PropertyValue> {
    if is_tag(root, "img") {
        if let Some(src) = get_attr(root, "src") {
            return Some(PropertyValue::Image { value: resolve_url(&src, ctx.base), alt: get_attr(root, "alt").unwrap_or_default() });
        }
    }
    if is_tag(root, "object") {
        if let Some(data) = get_attr(root, "data") {
            return Some(PropertyValue::Url(resolve_url(&data, ctx.base)));
        }
    }
    if let Some(photo) = single_child_photo(root, ctx) {
        return Some(photo);
    }
    let child = one_element_child(root)?;
    single_child_photo(&child, ctx)
}

fn single_child_photo(root: &Handle, ctx: &WalkContext) -> Option<PropertyValue> {
    let child = one_element_child(root)?;
    match tag_name(&child).as_deref() {
        Some("img") => get_attr(&child, "src")
            .map(|src| PropertyValue::Image { value: resolve_url(&src, ctx.base), alt: get_attr(&child, "alt").unwrap_or_default() }),
        Some("object") => get_attr(&child, "data").map(|data| PropertyValue::Url(resolve_url(&data, ctx.base))),
        _ => None,
    }
}

fn implied_url(root: &Handle, ctx: &WalkContext) -> Option<String> {
    if matches!(tag_name(root).as_deref(), Some("a") | Some("area")) {
        if let Some(href) = get_attr(root, "href") {
            return Some(resolve_url(&href, ctx.base));
        }
    }
    if let Some(url) = single_child_url(root, ctx) {
        return Some(url);
    }
    let child = one_element_child(root)?;
    single_child_url(&child, ctx)
}

fn single_child_url(root: &Handle, ctx: &WalkContext) -> Option<String> {
    let child = one_element_child(root)?;
    if matches!(tag_name(&child).as_deref(), Some("a") | Some("area")) {
        return get_attr(&child, "href").map(|href| resolve_url(&href, ctx.base));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_detached_fragment;

    fn ctx(base: &Url) -> WalkContext<'_> {
        WalkContext { base, raw_doc_url: base.as_str(), lang: true, thorough_trim: true, date_normalization: true, implied_tz: false }
    }

    #[test]
    fn implied_name_falls_back_to_cleaned_text() {
        let base = Url::parse("https://x.test/").unwrap();
        let root = parse_detached_fragment(r#"<div class="h-card">Jo</div>"#);
        let div = &element_children(&root)[0];
        let c = ctx(&base);
        let mut candidates = Vec::new();
        let item = parse_microformat(div, vec!["h-card".to_string()], false, &c, &mut candidates);
        assert_eq!(item.properties.get("name").unwrap()[0], PropertyValue::Text("Jo".into()));
    }

    #[test]
    fn explicit_url_property_suppresses_implied_name_absence_check() {
        let base = Url::parse("https://x.test/").unwrap();
        let root = parse_detached_fragment(r#"<div class="h-card"><a class="u-url" href="/me">Jo</a></div>"#);
        let div = &element_children(&root)[0];
        let c = ctx(&base);
        let mut candidates = Vec::new();
        let item = parse_microformat(div, vec!["h-card".to_string()], false, &c, &mut candidates);
        assert_eq!(item.properties.get("url").unwrap()[0], PropertyValue::Url("https://x.test/me".into()));
        assert_eq!(item.properties.get("name").unwrap()[0], PropertyValue::Text("Jo".into()));
    }

    #[test]
    fn post_implied_date_stitches_earlier_partial() {
        let base = Url::parse("https://x.test/").unwrap();
        let root = parse_detached_fragment(
            r#"<div class="h-entry">
                 <time class="dt-published"><span class="value">10:00</span></time>
                 <time class="dt-published">2020-03-04</time>
               </div>"#,
        );
        let div = &element_children(&root)[0];
        let c = ctx(&base);
        let mut candidates = Vec::new();
        let item = parse_microformat(div, vec!["h-entry".to_string()], false, &c, &mut candidates);
        let published = item.properties.get("published").unwrap();
        assert_eq!(published[0], PropertyValue::Text("2020-03-04 10:00".into()));
        assert_eq!(published[1], PropertyValue::Text("2020-03-04".into()));
    }

    #[test]
    fn implied_photo_from_root_img() {
        let base = Url::parse("https://x.test/").unwrap();
        let root = parse_detached_fragment(r#"<img class="h-card" src="p.jpg" alt="A">"#);
        let img = &element_children(&root)[0];
        let c = ctx(&base);
        let mut candidates = Vec::new();
        let item = parse_microformat(img, vec!["h-card".to_string()], false, &c, &mut candidates);
        assert_eq!(item.properties.get("name").unwrap()[0], PropertyValue::Text("A".into()));
        assert_eq!(
            item.properties.get("photo").unwrap()[0],
            PropertyValue::Image { value: "https://x.test/p.jpg".into(), alt: "A".into() }
        );
    }

    #[test]
    fn nested_child_not_also_property_goes_to_children() {
        let base = Url::parse("https://x.test/").unwrap();
        let root = parse_detached_fragment(
            r#"<div class="h-entry"><div class="h-card">Jo</div></div>"#,
        );
        let div = &element_children(&root)[0];
        let c = ctx(&base);
        let mut candidates = Vec::new();
        let item = parse_microformat(div, vec!["h-entry".to_string()], false, &c, &mut candidates);
        assert_eq!(item.children.len(), 1);
        assert_eq!(item.children[0].r#type, vec!["h-card".to_string()]);
    }

    #[test]
    fn nested_child_also_property_is_embedded_not_duplicated() {
        let base = Url::parse("https://x.test/").unwrap();
        let root = parse_detached_fragment(
            r#"<div class="h-entry"><div class="p-author h-card">Jo</div></div>"#,
        );
        let div = &element_children(&root)[0];
        let c = ctx(&base);
        let mut candidates = Vec::new();
        let item = parse_microformat(div, vec!["h-entry".to_string()], false, &c, &mut candidates);
        assert!(item.children.is_empty());
        let author = item.properties.get("author").unwrap();
        let nested = author[0].as_item().unwrap();
        assert_eq!(nested.r#type, vec!["h-card".to_string()]);
    }

    #[test]
    fn root_element_self_bookmark_rel_yields_url_property() {
        let base = Url::parse("https://x.test/").unwrap();
        let root = parse_detached_fragment(r#"<a rel="self bookmark" class="h-review" href="/r">X</a>"#);
        let a = &element_children(&root)[0];
        let c = ctx(&base);
        let mut candidates = Vec::new();
        let item = parse_microformat(a, vec!["h-review".to_string()], true, &c, &mut candidates);
        assert_eq!(item.properties.get("url").unwrap()[0], PropertyValue::Url("https://x.test/r".into()));
    }
}

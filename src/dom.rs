// Shared HTML-tree access helpers (ambient layer all components build on).
//
// Generalizes the teacher crate's single-purpose helpers
// (`hast_to_mdast/handlers.rs::{get_attr, tag_name}`,
// `hast_to_mdast/mod.rs::index_ids`) into the full "opaque tree" interface
// spec.md §3 describes: element identity, local name, attribute lookup,
// ordered children, ancestor chain, text content, inner-HTML serialization.

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_fragment, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

/// URL-bearing attributes present on every element (spec.md §6).
pub const GLOBAL_URL_ATTRS: &[&str] = &["itemid", "itemprop", "itemtype"];

/// Per-element URL-bearing attributes (spec.md §6).
pub fn url_attrs_for(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" | "area" => &["href", "ping"],
        "audio" | "embed" | "iframe" | "img" | "source" | "track" => &["src"],
        "base" => &["href"],
        "blockquote" | "del" | "ins" | "q" => &["cite"],
        "button" => &["formaction"],
        "form" => &["action"],
        "input" => &["formaction", "src"],
        "link" => &["href"],
        "object" => &["data"],
        "script" => &["src"],
        "video" => &["poster", "src"],
        _ => &[],
    }
}

/// Returns true if `handle` is an element node.
pub fn is_element(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Element { .. })
}

/// The element's local (lowercase ASCII) tag name, if it is an element.
pub fn tag_name(handle: &Handle) -> Option<String> {
    if let NodeData::Element { ref name, .. } = handle.data {
        Some(name.local.as_ref().to_string())
    } else {
        None
    }
}

/// Whether `handle` is an element with local name `tag`.
pub fn is_tag(handle: &Handle, tag: &str) -> bool {
    tag_name(handle).as_deref() == Some(tag)
}

/// Get an attribute's raw value.
pub fn get_attr(handle: &Handle, name: &str) -> Option<String> {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        for attr in attrs.borrow().iter() {
            if attr.name.local.as_ref() == name {
                return Some(attr.value.to_string());
            }
        }
    }
    None
}

/// Whether an attribute is present at all (distinguishes "" from absent).
pub fn has_attr(handle: &Handle, name: &str) -> bool {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        attrs.borrow().iter().any(|a| a.name.local.as_ref() == name)
    } else {
        false
    }
}

/// Split an element's `class` attribute into an ordered, non-deduplicated
/// token list (spec.md §3 "Token set" — dedup happens at call sites that
/// need it, not here).
pub fn class_tokens(handle: &Handle) -> Vec<String> {
    match get_attr(handle, "class") {
        Some(value) => value
            .split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{000C}'))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect(),
        None => Vec::new(),
    }
}

/// Whether the element's class list contains `token`.
pub fn has_class(handle: &Handle, token: &str) -> bool {
    class_tokens(handle).iter().any(|t| t == token)
}

/// Direct element children (skipping text/comment nodes), in document order.
pub fn element_children(handle: &Handle) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|c| is_element(c))
        .cloned()
        .collect()
}

/// All direct children (any node kind), in document order.
pub fn all_children(handle: &Handle) -> Vec<Handle> {
    handle.children.borrow().iter().cloned().collect()
}

/// The parent node, if any. rcdom tracks parents as weak references.
pub fn parent(handle: &Handle) -> Option<Handle> {
    let weak = handle.parent.take();
    let result = weak.as_ref().and_then(|w| w.upgrade());
    handle.parent.set(weak);
    result
}

/// Walk up from `handle` (inclusive) looking for the nearest ancestor
/// (or self) carrying attribute `name`.
pub fn nearest_attr(handle: &Handle, name: &str) -> Option<String> {
    let mut cur = Some(handle.clone());
    while let Some(node) = cur {
        if let Some(v) = get_attr(&node, name) {
            return Some(v);
        }
        cur = parent(&node);
    }
    None
}

/// Whether `handle` is inside a `<template>` subtree (itself included),
/// per spec.md §4.I/§4.H/§4.E's shared "template" exclusion.
pub fn is_in_template(handle: &Handle) -> bool {
    let mut cur = Some(handle.clone());
    while let Some(node) = cur {
        if is_tag(&node, "template") {
            return true;
        }
        cur = parent(&node);
    }
    false
}

/// Depth-first, document-order descendant iteration starting below `root`
/// (root itself is not visited). `enter` runs before descending into an
/// element's children and returning `false` skips that element's subtree —
/// used by the VCP extractor and the microformat walker to avoid
/// descending into nested properties/roots/consumed child items.
pub fn walk_descendants(root: &Handle, mut enter: impl FnMut(&Handle) -> bool) {
    fn go(node: &Handle, enter: &mut dyn FnMut(&Handle) -> bool) {
        for child in element_children(node) {
            if enter(&child) {
                go(&child, enter);
            }
        }
    }
    go(root, &mut enter);
}

/// Concatenate all descendant text-node content, verbatim (no whitespace
/// normalization — callers in `text.rs` do that themselves).
pub fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    collect_text(handle, &mut out);
    out
}

fn collect_text(handle: &Handle, out: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in all_children(handle) {
                collect_text(&child, out);
            }
        }
        _ => {}
    }
}

/// Serialize `handle`'s children (not the element itself) as an HTML
/// fragment string, used by the `e-` property extractor.
pub fn inner_html(handle: &Handle) -> String {
    let mut buf = Vec::new();
    for child in all_children(handle) {
        let serializable: SerializableHandle = child.clone().into();
        let _ = serialize(
            &mut buf,
            &serializable,
            SerializeOpts {
                traversal_scope: TraversalScope::IncludeNode,
                ..Default::default()
            },
        );
    }
    String::from_utf8(buf).unwrap_or_default()
}

/// Rewrite every URL-bearing attribute of every element in `handle`'s
/// subtree in place. `base[href]` resolves against `raw_doc_url`; every
/// other URL attribute resolves against `effective_base` (the document
/// base, which already accounts for a `<base href>` element).
pub fn rewrite_urls_in_place(
    handle: &Handle,
    effective_base: &str,
    raw_doc_url: &str,
    resolve: &impl Fn(&str, &str) -> String,
) {
    if let NodeData::Element { ref name, ref attrs, .. } = handle.data {
        let tag = name.local.as_ref().to_string();
        let mut attr_names: Vec<&str> = GLOBAL_URL_ATTRS.to_vec();
        attr_names.extend_from_slice(url_attrs_for(&tag));
        let base = if tag == "base" { raw_doc_url } else { effective_base };
        for attr in attrs.borrow_mut().iter_mut() {
            if attr_names.contains(&attr.name.local.as_ref()) {
                attr.value = resolve(&attr.value, base).into();
            }
        }
    }
    for child in all_children(handle) {
        rewrite_urls_in_place(&child, effective_base, raw_doc_url, resolve);
    }
}

/// Parse an HTML fragment (no implicit `<html>`/`<body>` wrapper) and
/// return its top-level nodes, wrapped in a synthetic detached `<div>` so
/// callers get a single `Handle` root. Used by the `e-` property extractor
/// to produce an independent copy of a subtree before rewriting its URLs
/// (spec.md §5: the input tree is never mutated), and by test helpers.
pub fn parse_detached_fragment(html: &str) -> Handle {
    let context = QualName::new(None, ns!(html), local_name!("body"));
    let dom: RcDom = parse_fragment(RcDom::default(), ParseOpts::default(), context, vec![])
        .from_utf8()
        .one(html.as_bytes());
    let children = all_children(&dom.document);
    wrap_in_synthetic_root(children)
}

/// Wrap a list of detached nodes in a synthetic `<div>` element so they
/// share a single root `Handle`.
pub fn wrap_in_synthetic_root(children: Vec<Handle>) -> Handle {
    let name = QualName::new(None, ns!(html), local_name!("div"));
    let root = Node::new(NodeData::Element {
        name,
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    for child in children {
        child.parent.set(Some(Rc::downgrade(&root)));
        root.children.borrow_mut().push(child);
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(root: &Handle, tag: &str) -> Option<Handle> {
        let mut found = None;
        walk_descendants(root, |h| {
            if found.is_none() && is_tag(h, tag) {
                found = Some(h.clone());
            }
            found.is_none()
        });
        found
    }

    fn find_by_id(root: &Handle, id: &str) -> Option<Handle> {
        let mut found = None;
        walk_descendants(root, |h| {
            if found.is_none() && get_attr(h, "id").as_deref() == Some(id) {
                found = Some(h.clone());
            }
            found.is_none()
        });
        found
    }

    #[test]
    fn class_tokens_split_on_ascii_whitespace() {
        let root = parse_detached_fragment("<div class=\"h-card  p-name\">x</div>");
        let div = first_element(&root, "div").unwrap();
        assert_eq!(class_tokens(&div), vec!["h-card", "p-name"]);
    }

    #[test]
    fn is_in_template_detects_ancestor() {
        let root = parse_detached_fragment(
            "<template><div class=\"x\"><span id=\"s\"></span></div></template>",
        );
        let span = find_by_id(&root, "s").unwrap();
        assert!(is_in_template(&span));
    }

    #[test]
    fn inner_html_round_trips_simple_markup() {
        let root = parse_detached_fragment("<p>hello <b>world</b></p>");
        let p = first_element(&root, "p").unwrap();
        assert_eq!(inner_html(&p), "hello <b>world</b>");
    }

    #[test]
    fn rewrite_urls_in_place_updates_href() {
        let root = parse_detached_fragment("<a href=\"/x\">link</a>");
        rewrite_urls_in_place(&root, "https://example.test/", "https://example.test/", &|raw, base| {
            format!("{base}#{raw}")
        });
        let a = first_element(&root, "a").unwrap();
        assert_eq!(get_attr(&a, "href").unwrap(), "https://example.test/#/x");
    }
}

// Top-level driver — spec.md §4.I (component I).
//
// Owns the short-lived context for a single parse call: resolves the
// effective document base (accounting for a `<base href>`), pre-scans the
// tree once for root candidates, then hands each surviving candidate to
// the walker (component G) and runs the rel collector (component H) once
// at the end. Grounded on the teacher crate's `hast_to_mdast/mod.rs::
// transform` shape — a single owned context value for the duration of a
// call, no globals (spec.md §5/§9).

use std::collections::BTreeMap;
use std::rc::Rc;

use markup5ever_rcdom::Handle;
use url::Url;

use crate::dom::{class_tokens, get_attr, is_in_template, is_tag, walk_descendants};
use crate::error::Error;
use crate::matcher;
use crate::model::Document;
use crate::rel;
use crate::url_resolve::resolve_url;
use crate::walker::{parse_microformat, WalkContext};
use crate::Options;

/// Parse the microformats in `root`'s subtree (spec.md §3 primary entry
/// point). `base_url` is the caller's URL for the document; a `<base
/// href>` found in the tree takes precedence for relative-URL resolution
/// everywhere except `base[href]` itself, which always resolves against
/// the raw `base_url` (spec.md §4.F "e-*").
pub fn parse_html_element(root: &Handle, base_url: &str, options: &Options) -> Result<Document, Error> {
    let raw_base = Url::parse(base_url).map_err(|e| Error::InvalidBaseUrl(e.to_string()))?;

    #[cfg(feature = "tracing")]
    tracing::debug!(base_url, "starting microformats parse");

    let effective_base = find_base_href(root)
        .map(|href| resolve_url(&href, &raw_base))
        .and_then(|resolved| Url::parse(&resolved).ok())
        .unwrap_or_else(|| raw_base.clone());

    let order = scan_root_candidates(root);
    let mut root_candidates = order.clone();

    let ctx = WalkContext {
        base: &effective_base,
        raw_doc_url: base_url,
        lang: options.lang,
        thorough_trim: options.thorough_trim,
        date_normalization: options.date_normalization,
        implied_tz: options.implied_tz,
    };

    let mut items = Vec::new();
    for node in order {
        if !root_candidates.iter().any(|h| Rc::ptr_eq(h, &node)) {
            // Already consumed as a nested child item by an earlier root.
            continue;
        }
        root_candidates.retain(|h| !Rc::ptr_eq(h, &node));

        let tokens = class_tokens(&node);
        let v2_types = matcher::v2_roots(&tokens);
        let (types, backcompat) = if !v2_types.is_empty() {
            (v2_types, false)
        } else {
            let bc_types = matcher::backcompat_roots(&tokens).into_iter().map(str::to_string).collect();
            (bc_types, true)
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(?types, backcompat, "parsing top-level root candidate");

        items.push(parse_microformat(&node, types, backcompat, &ctx, &mut root_candidates));
    }

    let mut rels: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut rel_urls = BTreeMap::new();
    rel::collect(root, &effective_base, options.thorough_trim, &mut rels, &mut rel_urls);

    Ok(Document { items, rels, rel_urls })
}

/// The first `<base href>` found in document order, if any.
fn find_base_href(root: &Handle) -> Option<String> {
    let mut found = None;
    walk_descendants(root, |node| {
        if found.is_some() {
            return false;
        }
        if is_tag(node, "base") {
            if let Some(href) = get_attr(node, "href") {
                found = Some(href);
                return false;
            }
        }
        true
    });
    found
}

/// Every element whose class carries a v2 or backcompat root token,
/// excluding anything inside a `<template>` subtree, in document order
/// (spec.md §4.I).
fn scan_root_candidates(root: &Handle) -> Vec<Handle> {
    let mut candidates = Vec::new();
    walk_descendants(root, |node| {
        if is_in_template(node) {
            return false;
        }
        let tokens = class_tokens(node);
        if !matcher::v2_roots(&tokens).is_empty() || !matcher::backcompat_roots(&tokens).is_empty() {
            candidates.push(node.clone());
        }
        true
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_detached_fragment;

    fn opts() -> Options {
        Options::default()
    }

    #[test]
    fn no_microformats_yields_empty_document() {
        let root = parse_detached_fragment("<div>plain text</div>");
        let doc = parse_html_element(&root, "https://x.test/", &opts()).unwrap();
        assert!(doc.items.is_empty());
        assert!(doc.rels.is_empty());
        assert!(doc.rel_urls.is_empty());
    }

    #[test]
    fn base_href_overrides_caller_base_for_resolution() {
        let root = parse_detached_fragment(
            r#"<div><base href="https://other.test/sub/"><a class="h-card u-url" href="me">Jo</a></div>"#,
        );
        let doc = parse_html_element(&root, "https://x.test/", &opts()).unwrap();
        let item = &doc.items[0];
        assert_eq!(
            item.properties.get("url").unwrap()[0],
            crate::model::PropertyValue::Url("https://other.test/sub/me".into())
        );
    }

    #[test]
    fn two_roots_produce_two_items_in_document_order() {
        let root = parse_detached_fragment(
            r#"<div><span class="h-card">A</span><span class="h-card">B</span></div>"#,
        );
        let doc = parse_html_element(&root, "https://x.test/", &opts()).unwrap();
        assert_eq!(doc.items.len(), 2);
    }

    #[test]
    fn invalid_base_url_errors() {
        let root = parse_detached_fragment("<div></div>");
        assert!(parse_html_element(&root, "not a url", &opts()).is_err());
    }
}

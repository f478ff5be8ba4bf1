// Rel collector — spec.md §4.H (component H).
//
// A single-pass collector over every `a`/`area`/`link` with both `rel` and
// `href`, generalized from the teacher crate's `hast_to_mdast/mod.rs::
// index_ids` single-pass-collector-into-a-map pattern.

use std::collections::BTreeMap;

use markup5ever_rcdom::Handle;
use url::Url;

use crate::dom::{get_attr, is_in_template, tag_name, walk_descendants};
use crate::model::RelUrl;
use crate::text;
use crate::url_resolve::resolve_url;

fn rel_tokens(handle: &Handle) -> Vec<String> {
    match get_attr(handle, "rel") {
        Some(value) => value.split_ascii_whitespace().map(str::to_string).collect(),
        None => Vec::new(),
    }
}

/// Scan `root`'s subtree for `rel`-bearing hyperlinks (root itself is not
/// inspected — callers pass the document root), populating `rels` and
/// `rel_urls`.
pub fn collect(
    root: &Handle,
    base: &Url,
    thorough_trim: bool,
    rels: &mut BTreeMap<String, Vec<String>>,
    rel_urls: &mut BTreeMap<String, RelUrl>,
) {
    walk_descendants(root, |node| {
        if is_in_template(node) {
            return false;
        }
        let tag = tag_name(node).unwrap_or_default();
        if matches!(tag.as_str(), "a" | "area" | "link") {
            if let Some(href) = get_attr(node, "href") {
                let tokens = rel_tokens(node);
                if !tokens.is_empty() {
                    let url = resolve_url(&href, base);
                    for token in &tokens {
                        rels.entry(token.clone()).or_default().push(url.clone());
                    }
                    let entry = rel_urls.entry(url).or_default();
                    if entry.hreflang.is_none() {
                        entry.hreflang = get_attr(node, "hreflang");
                    }
                    if entry.media.is_none() {
                        entry.media = get_attr(node, "media");
                    }
                    if entry.title.is_none() {
                        entry.title = get_attr(node, "title");
                    }
                    if entry.r#type.is_none() {
                        entry.r#type = get_attr(node, "type");
                    }
                    if entry.text.is_none() {
                        entry.text = Some(text::extract(node, crate::prefix::Prefix::P, base, thorough_trim));
                    }
                    entry.rels.extend(tokens);
                }
            }
        }
        true
    });

    for urls in rels.values_mut() {
        dedup_preserve_order(urls);
    }
    for entry in rel_urls.values_mut() {
        entry.rels.sort();
        entry.rels.dedup();
    }
}

fn dedup_preserve_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

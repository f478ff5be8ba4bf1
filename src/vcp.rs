// Value-Class-Pattern extractor — spec.md §4.E (component E).
//
// Traverses a property element's descendants collecting `value`/
// `value-title` fragments, skipping anything that is itself a property or
// root. Generalized from the teacher crate's `hast_to_mdast/handlers.rs`
// dispatch-and-recurse shape (`all`/`one`), adapted into a collect-instead-
// of-emit traversal via `dom::walk_descendants`'s `enter` callback.

use markup5ever_rcdom::Handle;

use crate::date::{self, DateTimeParts};
use crate::dom::{class_tokens, get_attr, has_attr, has_class, is_in_template, tag_name, text_content, walk_descendants};
use crate::matcher;
use crate::prefix::Prefix;

/// Whether `handle` carries a v2 or backcompat property/root class — the
/// boundary VCP traversal must not cross (spec.md §4.E rule 1).
fn is_property_or_root(handle: &Handle, backcompat_scope: Option<&str>) -> bool {
    let tokens = class_tokens(handle);
    if !matcher::v2_roots(&tokens).is_empty() || !matcher::v2_properties(&tokens).is_empty() {
        return true;
    }
    if let Some(root_type) = backcompat_scope {
        if !matcher::backcompat_roots(&tokens).is_empty() {
            return true;
        }
        if tokens.iter().any(|t| matcher::backcompat_property(root_type, t).is_some()) {
            return true;
        }
    }
    false
}

fn value_candidate(handle: &Handle, prefix: Prefix) -> Option<String> {
    if has_class(handle, "value-title") {
        return get_attr(handle, "title");
    }
    if !has_class(handle, "value") {
        return None;
    }
    let tag = tag_name(handle).unwrap_or_default();
    match tag.as_str() {
        "img" | "area" => get_attr(handle, "alt"),
        "data" => get_attr(handle, "value").or_else(|| Some(text_content(handle))),
        "abbr" => get_attr(handle, "title").or_else(|| Some(text_content(handle))),
        "del" | "ins" | "time" if prefix == Prefix::Dt => {
            get_attr(handle, "datetime").or_else(|| Some(text_content(handle)))
        }
        _ => Some(text_content(handle)),
    }
}

/// Outcome of a VCP extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcpValue {
    Text(String),
    Date(DateTimeParts),
}

/// Extract the Value-Class-Pattern value for `prefix` from `root`'s
/// subtree, if any candidate fragments are present.
pub fn extract(root: &Handle, prefix: Prefix, backcompat_scope: Option<&str>) -> Option<VcpValue> {
    let mut text_fragments: Vec<String> = Vec::new();
    let mut date_parts = DateTimeParts::default();
    let mut found_any = false;

    walk_descendants(root, |node| {
        if is_in_template(node) {
            return false;
        }
        if is_property_or_root(node, backcompat_scope) {
            return false;
        }
        if let Some(candidate) = value_candidate(node, prefix) {
            found_any = true;
            if prefix == Prefix::Dt {
                date_parts.merge_missing(&date::parse(&candidate));
            } else {
                text_fragments.push(candidate);
            }
        }
        true
    });

    if !found_any {
        return None;
    }
    if prefix == Prefix::Dt {
        Some(VcpValue::Date(date_parts))
    } else {
        Some(VcpValue::Text(text_fragments.concat()))
    }
}

/// Convenience used by callers that only need to know whether `handle`
/// itself (not its subtree) is a `value`/`value-title` marker — used by
/// the property extractor cascades to short-circuit VCP when irrelevant.
pub fn has_value_marker(handle: &Handle) -> bool {
    has_class(handle, "value") || has_class(handle, "value-title") || has_attr(handle, "data-value")
}

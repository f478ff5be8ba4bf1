// Output data model — spec.md §3.
//
// Mirrors the teacher crate's `mdast.rs` shape (plain structs, a tagged
// enum for the polymorphic slot, accessor helpers) but serializes to the
// exact JSON shape spec.md §3/§6 describes instead of Markdown.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single extracted microformats item (spec.md §3 "Microformat item").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Sorted, deduplicated `h-*` type tags.
    #[serde(rename = "type")]
    pub r#type: Vec<String>,

    /// Property name → non-empty ordered list of values.
    ///
    /// Empty lists are never inserted (spec.md §3 invariant); serializes
    /// as a JSON object, never an array, even when empty.
    pub properties: BTreeMap<String, Vec<PropertyValue>>,

    /// The element's `id` attribute, if non-empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Nearest ancestor (or self) `lang` attribute, when the `lang`
    /// option is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Descendant microformats not used as a property value of this item.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<Item>,

    /// Present when this item itself is carried as a property's value
    /// (e.g. a `u-` property whose element is also a root): the
    /// prefix-specific parsed value copied alongside the item's own keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<PropertyValue>>,
}

impl Item {
    pub fn new(types: Vec<String>) -> Self {
        let mut r#type = types;
        r#type.sort();
        r#type.dedup();
        Self {
            r#type,
            properties: BTreeMap::new(),
            id: None,
            lang: None,
            children: Vec::new(),
            value: None,
        }
    }

    /// Append `value` under `key`, creating the list if absent.
    pub fn push_property(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.properties.entry(key.into()).or_default().push(value);
    }

    /// Whether this item already has a non-empty value list for `key`.
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.get(key).is_some_and(|v| !v.is_empty())
    }
}

/// A property value (spec.md §3 "Property value", §9 redesign note: a
/// tagged sum rather than an untyped dynamic value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Plain text value.
    Text(String),

    /// An absolute-normalized URL string, or the raw input if
    /// normalization failed.
    Url(String),

    /// An image: `{value, alt}`.
    Image { value: String, alt: String },

    /// Embedded markup produced by an `e-` property.
    Markup {
        html: String,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
    },

    /// A nested microformats item, used as a property's value.
    Item(Box<Item>),
}

impl PropertyValue {
    /// The plain-text rendering of this value, used when this value is
    /// read back as (e.g.) an implied-name source or a VCP fragment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) | PropertyValue::Url(s) => Some(s),
            PropertyValue::Markup { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            PropertyValue::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut Item> {
        match self {
            PropertyValue::Item(item) => Some(item),
            _ => None,
        }
    }
}

/// A `rel-urls` entry (spec.md §3 Output document).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelUrl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hreflang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Sorted, deduplicated `rel` tokens seen on any link to this URL.
    pub rels: Vec<String>,
}

/// The top-level output (spec.md §3 "Output document", §6 "Document shape").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub items: Vec<Item>,
    /// rel name → URLs, deduplicated preserving first-seen order.
    pub rels: BTreeMap<String, Vec<String>>,
    #[serde(rename = "rel-urls")]
    pub rel_urls: BTreeMap<String, RelUrl>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_sorted_and_deduped() {
        let item = Item::new(vec!["h-entry".into(), "h-card".into(), "h-entry".into()]);
        assert_eq!(item.r#type, vec!["h-card".to_string(), "h-entry".to_string()]);
    }

    #[test]
    fn empty_document_serializes_to_empty_objects() {
        let doc = Document::default();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"items": [], "rels": {}, "rel-urls": {}})
        );
    }

    #[test]
    fn has_property_false_for_empty_list() {
        let mut item = Item::new(vec!["h-card".into()]);
        item.properties.insert("name".into(), vec![]);
        assert!(!item.has_property("name"));
    }
}

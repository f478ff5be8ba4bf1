// End-to-end scenario tests for the microformats extraction engine —
// spec.md §8 "End-to-end scenarios" and "Invariants to verify".

use microformats::{parse_microformats, Options, PropertyValue};
use pretty_assertions::assert_eq;

fn parse(html: &str, base: &str) -> microformats::Document {
    parse_microformats(html, base, &Options::default()).unwrap()
}

// --- §8 end-to-end scenarios, in order -------------------------------------

#[test]
fn scenario_1_implied_name_from_vcard_link_text() {
    let doc = parse(r#"<div class="h-card"><a class="u-url" href="/me">Jo</a></div>"#, "https://x.test/");
    assert_eq!(doc.items.len(), 1);
    let item = &doc.items[0];
    assert_eq!(item.r#type, vec!["h-card".to_string()]);
    assert_eq!(item.properties.get("url").unwrap(), &vec![PropertyValue::Url("https://x.test/me".into())]);
    assert_eq!(item.properties.get("name").unwrap(), &vec![PropertyValue::Text("Jo".into())]);
}

#[test]
fn scenario_2_vcp_stitches_dt_properties() {
    let doc = parse(
        r#"<span class="h-entry"><time class="dt-published" datetime="2020-01-02T03:04">A</time><span class="dt-updated"><span class="value">05:06</span></span></span>"#,
        "https://x.test/",
    );
    let item = &doc.items[0];
    assert_eq!(item.properties.get("published").unwrap()[0], PropertyValue::Text("2020-01-02 03:04".into()));
    assert_eq!(item.properties.get("updated").unwrap()[0], PropertyValue::Text("2020-01-02 05:06".into()));
}

#[test]
fn scenario_3_self_bookmark_rel_on_review_root() {
    let doc = parse(r#"<a rel="self bookmark" class="h-review" href="/r">X</a>"#, "https://x.test/");
    let item = &doc.items[0];
    assert_eq!(item.r#type, vec!["h-review".to_string()]);
    assert_eq!(item.properties.get("url").unwrap()[0], PropertyValue::Url("https://x.test/r".into()));
}

#[test]
fn scenario_4_backcompat_vcard_with_tag_relation() {
    let doc = parse(
        r#"<p class="vcard"><span class="fn">A</span><a rel="tag" href="/t/a">A</a></p>"#,
        "https://x.test/",
    );
    let item = &doc.items[0];
    assert_eq!(item.r#type, vec!["h-card".to_string()]);
    assert_eq!(item.properties.get("name").unwrap()[0], PropertyValue::Text("A".into()));
    assert_eq!(item.properties.get("category").unwrap()[0], PropertyValue::Text("a".into()));
}

#[test]
fn rel_derived_category_defers_to_an_explicit_category_property() {
    let doc = parse(
        r#"<p class="vcard"><span class="fn">A</span><span class="category">explicit</span><a rel="tag" href="/t/a">tagged</a></p>"#,
        "https://x.test/",
    );
    let item = &doc.items[0];
    assert_eq!(item.properties.get("category").unwrap(), &vec![PropertyValue::Text("explicit".into())]);
}

#[test]
fn scenario_5_implied_photo_and_name_from_root_img() {
    let doc = parse(r#"<img class="h-card" src="p.jpg" alt="A">"#, "https://x.test/");
    let item = &doc.items[0];
    assert_eq!(item.properties.get("name").unwrap()[0], PropertyValue::Text("A".into()));
    assert_eq!(
        item.properties.get("photo").unwrap()[0],
        PropertyValue::Image { value: "https://x.test/p.jpg".into(), alt: "A".into() }
    );
}

#[test]
fn scenario_6_post_implied_date_fills_earlier_partial() {
    let doc = parse(
        r#"<div class="h-entry">
             <time class="dt-published"><span class="value">10:00</span></time>
             <time class="dt-published">2020-03-04</time>
           </div>"#,
        "https://x.test/",
    );
    let item = &doc.items[0];
    let published = item.properties.get("published").unwrap();
    assert_eq!(published[0], PropertyValue::Text("2020-03-04 10:00".into()));
    assert_eq!(published[1], PropertyValue::Text("2020-03-04".into()));
}

// --- Invariants --------------------------------------------------------------

#[test]
fn item_type_is_sorted_and_deduplicated() {
    let doc = parse(r#"<div class="h-entry h-card h-entry">x</div>"#, "https://x.test/");
    assert_eq!(doc.items[0].r#type, vec!["h-card".to_string(), "h-entry".to_string()]);
}

#[test]
fn empty_property_lists_are_never_present() {
    let doc = parse(r#"<div class="h-card"><span class="p-category"></span>Jo</div>"#, "https://x.test/");
    let item = &doc.items[0];
    // An empty p-category (no text) still produces an entry ("" is a
    // valid, non-empty-*list* value) — what must never happen is a key
    // mapped to a zero-length Vec.
    for values in item.properties.values() {
        assert!(!values.is_empty());
    }
}

#[test]
fn nested_microformat_appears_either_as_property_or_in_children_never_both() {
    let doc = parse(
        r#"<div class="h-entry"><div class="p-author h-card">Jo</div></div>"#,
        "https://x.test/",
    );
    let item = &doc.items[0];
    assert!(item.children.is_empty());
    assert!(item.properties.get("author").unwrap()[0].as_item().is_some());
}

#[test]
fn unrelated_nested_microformat_goes_to_children() {
    let doc = parse(r#"<div class="h-entry"><div class="h-card">Jo</div></div>"#, "https://x.test/");
    let item = &doc.items[0];
    assert_eq!(item.children.len(), 1);
    assert!(item.properties.is_empty());
}

#[test]
fn rel_urls_rels_sorted_rels_map_dedup_preserves_first_seen_order() {
    let doc = parse(
        r#"<div>
             <a rel="me tag" href="/a">A</a>
             <a rel="tag nofollow" href="/a">A again</a>
             <a rel="me" href="/b">B</a>
           </div>"#,
        "https://x.test/",
    );
    assert_eq!(
        doc.rels.get("me").unwrap(),
        &vec!["https://x.test/a".to_string(), "https://x.test/b".to_string()]
    );
    assert_eq!(doc.rel_urls.get("https://x.test/a").unwrap().rels, vec!["me", "nofollow", "tag"]);
}

// --- Round-trips and boundary behaviors --------------------------------------

#[test]
fn parsing_is_idempotent() {
    let html = r#"<div class="h-card"><a class="u-url" href="/me">Jo</a></div>"#;
    let first = parse(html, "https://x.test/");
    let second = parse(html, "https://x.test/");
    assert_eq!(first, second);
}

#[test]
fn reordering_class_whitespace_does_not_change_results() {
    let a = parse(r#"<div class="h-card  p-name">Jo</div>"#, "https://x.test/");
    let b = parse(r#"<div class="p-name   h-card">Jo</div>"#, "https://x.test/");
    assert_eq!(a, b);
}

#[test]
fn element_with_no_microformats_yields_empty_document() {
    let doc = parse("<div><p>Nothing here.</p></div>", "https://x.test/");
    assert_eq!(doc, microformats::Document::default());
}

#[test]
fn ordinal_leap_day_resolves_and_rejects_in_non_leap_year() {
    let leap = parse(r#"<div class="h-entry"><time class="dt-published">2020-366</time></div>"#, "https://x.test/");
    assert_eq!(
        leap.items[0].properties.get("published").unwrap()[0],
        PropertyValue::Text("2020-12-31".into())
    );

    let non_leap =
        parse(r#"<div class="h-entry"><time class="dt-published">2021-366</time></div>"#, "https://x.test/");
    // An unrecognizable date degrades to no dt- property at all (cleaned
    // text fallback yields an empty stitch, spec.md §4.C/§7).
    assert!(non_leap.items[0].properties.get("published").is_none());
}

#[test]
fn zone_normalization_boundary_cases() {
    let doc = parse(
        r#"<div class="h-entry">
             <time class="dt-published">2020-01-02 03:04+00</time>
             <time class="dt-updated">2020-01-02 03:04-00</time>
             <time class="dt-deleted">2020-01-02 03:04z</time>
           </div>"#,
        "https://x.test/",
    );
    let item = &doc.items[0];
    assert_eq!(item.properties.get("published").unwrap()[0], PropertyValue::Text("2020-01-02 03:04+00:00".into()));
    assert_eq!(item.properties.get("updated").unwrap()[0], PropertyValue::Text("2020-01-02 03:04+00:00".into()));
    assert_eq!(item.properties.get("deleted").unwrap()[0], PropertyValue::Text("2020-01-02 03:04Z".into()));
}

#[test]
fn json_serialization_shape_matches_spec() {
    let doc = parse(r#"<div class="h-card"><a class="u-url" href="/me">Jo</a></div>"#, "https://x.test/");
    let json = serde_json::to_value(&doc).unwrap();
    assert!(json.get("items").unwrap().is_array());
    assert!(json.get("rels").unwrap().is_object());
    assert!(json.get("rel-urls").unwrap().is_object());
}

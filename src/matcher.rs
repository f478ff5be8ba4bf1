// Class/relation matcher — spec.md §4.D (component D).
//
// Static tables, generalized from the teacher crate's big-match-over-tag-name
// idiom (`hast_to_mdast/handlers.rs::dispatch_element`) into data tables,
// since the backcompat vocabulary is data, not behavior. Regexes are
// compiled once via `LazyLock`, the same pattern the teacher's own test
// suite (`tests/commonmark.rs`) and `stringify/escape.rs` use.

use std::sync::LazyLock;

use regex::Regex;

use crate::prefix::Prefix;

/// Tailwind utility classes that collide with the v2 root syntax and must
/// be excluded (spec.md §4.D).
const ROOT_EXCLUSIONS: &[&str] = &["h-px", "h-auto", "h-full", "h-screen", "h-min", "h-max", "h-fit"];

static ROOT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^h(-[a-z0-9]+)?(-[a-z]+)+$").unwrap());
static PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(p|u|dt|e)((?:-[a-z0-9]+)?(?:-[a-z]+)+)$").unwrap());

/// Whether `token` is a v2 root class (`h-card`, `h-entry`, ...).
pub fn is_v2_root(token: &str) -> bool {
    ROOT_RE.is_match(token) && !ROOT_EXCLUSIONS.contains(&token)
}

/// Parse a v2 property class into its prefix and property name.
pub fn parse_v2_property(token: &str) -> Option<(Prefix, String)> {
    let caps = PROPERTY_RE.captures(token)?;
    let prefix = Prefix::from_token(&caps[1])?;
    let name = caps[2].trim_start_matches('-').to_string();
    Some((prefix, name))
}

/// Every v2 root class token present in `tokens`.
pub fn v2_roots(tokens: &[String]) -> Vec<String> {
    tokens.iter().filter(|t| is_v2_root(t)).cloned().collect()
}

/// Every v2 property class present in `tokens` (no deduplication — spec.md
/// §4.D: "the same element may contribute multiple entries for the same
/// name with different prefixes").
pub fn v2_properties(tokens: &[String]) -> Vec<(Prefix, String)> {
    tokens.iter().filter_map(|t| parse_v2_property(t)).collect()
}

// ---------------------------------------------------------------------------
// Backcompat roots
// ---------------------------------------------------------------------------

/// Legacy vocabulary marker → v2 root equivalent (spec.md §4.D).
const BACKCOMPAT_ROOTS: &[(&str, &str)] = &[
    ("vcard", "h-card"),
    ("hentry", "h-entry"),
    ("vevent", "h-event"),
    ("adr", "h-adr"),
    ("geo", "h-geo"),
    ("hproduct", "h-product"),
    ("hrecipe", "h-recipe"),
    ("hresume", "h-resume"),
    ("hreview", "h-review"),
    ("hreview-aggregate", "h-review-aggregate"),
    ("hfeed", "h-feed"),
    ("hnews", "h-news"),
];

/// The v2 root a legacy class token maps to, if any. Excludes the special
/// `item` marker, handled separately by the walker (it only promotes to
/// `h-item` when nested inside another backcompat root and no other root
/// applies — a contextual rule the matcher has no access to).
pub fn backcompat_root(token: &str) -> Option<&'static str> {
    BACKCOMPAT_ROOTS.iter().find(|(legacy, _)| *legacy == token).map(|(_, v2)| *v2)
}

/// Every backcompat root class present in `tokens`, mapped to their v2
/// equivalents, in document order.
pub fn backcompat_roots(tokens: &[String]) -> Vec<&'static str> {
    tokens.iter().filter_map(|t| backcompat_root(t)).collect()
}

// ---------------------------------------------------------------------------
// Backcompat properties
// ---------------------------------------------------------------------------

/// A backcompat property rule: `(legacy-class, current-root-v2-type) →
/// (prefix, v2-name, extra-roots-to-add, defer)` (spec.md §4.D).
#[derive(Debug, Clone, Copy)]
pub struct BackcompatProperty {
    pub prefix: Prefix,
    pub name: &'static str,
    pub extra_roots: &'static [&'static str],
    pub defer: bool,
}

macro_rules! bp {
    ($prefix:expr, $name:expr) => {
        BackcompatProperty { prefix: $prefix, name: $name, extra_roots: &[], defer: false }
    };
    ($prefix:expr, $name:expr, defer) => {
        BackcompatProperty { prefix: $prefix, name: $name, extra_roots: &[], defer: true }
    };
    ($prefix:expr, $name:expr, roots = $roots:expr) => {
        BackcompatProperty { prefix: $prefix, name: $name, extra_roots: $roots, defer: false }
    };
}

use Prefix::*;

/// `(root-v2-type, legacy-class, rule)`. Looked up by exact
/// `(root_type, class)` pair; a class not listed for a given root
/// contributes no backcompat property on that root.
const PROPERTY_TABLE: &[(&str, &str, BackcompatProperty)] = &[
    // hCard
    ("h-card", "fn", bp!(P, "name")),
    ("h-card", "honorific-prefix", bp!(P, "honorific-prefix")),
    ("h-card", "given-name", bp!(P, "given-name")),
    ("h-card", "additional-name", bp!(P, "additional-name")),
    ("h-card", "family-name", bp!(P, "family-name")),
    ("h-card", "honorific-suffix", bp!(P, "honorific-suffix")),
    ("h-card", "nickname", bp!(P, "nickname")),
    ("h-card", "email", bp!(U, "email")),
    ("h-card", "logo", bp!(U, "logo")),
    ("h-card", "photo", bp!(U, "photo")),
    ("h-card", "url", bp!(U, "url")),
    ("h-card", "uid", bp!(U, "uid")),
    ("h-card", "category", bp!(P, "category")),
    ("h-card", "adr", bp!(P, "adr", roots = &["adr"])),
    ("h-card", "extended-address", bp!(P, "extended-address")),
    ("h-card", "street-address", bp!(P, "street-address")),
    ("h-card", "locality", bp!(P, "locality")),
    ("h-card", "region", bp!(P, "region")),
    ("h-card", "postal-code", bp!(P, "postal-code")),
    ("h-card", "country-name", bp!(P, "country-name")),
    ("h-card", "label", bp!(P, "label")),
    ("h-card", "geo", bp!(P, "geo", roots = &["geo"])),
    ("h-card", "latitude", bp!(P, "latitude")),
    ("h-card", "longitude", bp!(P, "longitude")),
    ("h-card", "tel", bp!(P, "tel")),
    ("h-card", "note", bp!(P, "note")),
    ("h-card", "bday", bp!(Dt, "bday")),
    ("h-card", "key", bp!(P, "key")),
    ("h-card", "org", bp!(P, "org")),
    ("h-card", "tz", bp!(P, "tz")),
    ("h-card", "role", bp!(P, "role")),
    // hEntry
    ("h-entry", "entry-title", bp!(P, "name")),
    ("h-entry", "entry-summary", bp!(P, "summary")),
    ("h-entry", "entry-content", bp!(E, "content")),
    ("h-entry", "updated", bp!(Dt, "updated")),
    ("h-entry", "published", bp!(Dt, "published")),
    ("h-entry", "author", bp!(P, "author", roots = &["vcard"])),
    ("h-entry", "category", bp!(P, "category")),
    ("h-entry", "geo", bp!(P, "geo", roots = &["geo"])),
    // hRecipe
    ("h-recipe", "fn", bp!(P, "name")),
    ("h-recipe", "ingredient", bp!(P, "ingredient")),
    ("h-recipe", "yield", bp!(P, "yield")),
    ("h-recipe", "instructions", bp!(E, "instructions")),
    ("h-recipe", "duration", bp!(Dt, "duration")),
    ("h-recipe", "nutrition", bp!(P, "nutrition")),
    ("h-recipe", "photo", bp!(U, "photo")),
    ("h-recipe", "summary", bp!(P, "summary")),
    ("h-recipe", "author", bp!(P, "author", roots = &["vcard"])),
    // hProduct
    ("h-product", "fn", bp!(P, "name")),
    ("h-product", "photo", bp!(U, "photo")),
    ("h-product", "brand", bp!(P, "brand")),
    ("h-product", "category", bp!(P, "category")),
    ("h-product", "description", bp!(P, "description")),
    ("h-product", "identifier", bp!(U, "identifier")),
    ("h-product", "url", bp!(U, "url")),
    ("h-product", "review", bp!(P, "review", roots = &["hreview"])),
    ("h-product", "price", bp!(P, "price")),
    // hReview / hReview-aggregate
    ("h-review", "item", bp!(P, "item")),
    ("h-review", "reviewer", bp!(P, "author", roots = &["vcard"])),
    ("h-review", "summary", bp!(P, "name")),
    ("h-review", "description", bp!(E, "content")),
    ("h-review", "rating", bp!(P, "rating")),
    ("h-review", "best", bp!(P, "best")),
    ("h-review", "worst", bp!(P, "worst")),
    ("h-review", "dtreviewed", bp!(Dt, "published")),
    ("h-review-aggregate", "item", bp!(P, "item")),
    ("h-review-aggregate", "rating", bp!(P, "average")),
    ("h-review-aggregate", "best", bp!(P, "best")),
    ("h-review-aggregate", "worst", bp!(P, "worst")),
    ("h-review-aggregate", "count", bp!(P, "count")),
    ("h-review-aggregate", "votes", bp!(P, "votes")),
    // hResume
    ("h-resume", "summary", bp!(P, "summary")),
    ("h-resume", "contact", bp!(P, "contact", roots = &["vcard"])),
    ("h-resume", "education", bp!(P, "education", roots = &["vevent"])),
    ("h-resume", "experience", bp!(P, "experience", roots = &["vevent"])),
    ("h-resume", "skill", bp!(P, "skill")),
    ("h-resume", "affiliation", bp!(P, "affiliation", roots = &["vcard"])),
    // vEvent
    ("h-event", "summary", bp!(P, "name")),
    ("h-event", "dtstart", bp!(Dt, "start")),
    ("h-event", "dtend", bp!(Dt, "end")),
    ("h-event", "duration", bp!(Dt, "duration")),
    ("h-event", "description", bp!(P, "description")),
    ("h-event", "url", bp!(U, "url")),
    ("h-event", "category", bp!(P, "category")),
    ("h-event", "location", bp!(P, "location", roots = &["vcard", "geo"])),
    ("h-event", "geo", bp!(P, "geo", roots = &["geo"])),
    // hFeed / hNews
    ("h-feed", "entry-title", bp!(P, "name")),
    ("h-news", "entry-title", bp!(P, "name")),
    ("h-news", "source-org", bp!(P, "source-org", roots = &["vcard"])),
    ("h-news", "geo", bp!(P, "geo", roots = &["geo"])),
];

/// `entry-date`, classic-only: only applies to a `<time datetime>` element
/// (spec.md §4.D), checked by the caller before consulting this table.
pub const ENTRY_DATE: BackcompatProperty = bp!(Dt, "published");

/// Look up a backcompat property rule for `class` on an element whose
/// current root is `root_type`.
pub fn backcompat_property(root_type: &str, class: &str) -> Option<BackcompatProperty> {
    PROPERTY_TABLE
        .iter()
        .find(|(root, legacy, _)| *root == root_type && *legacy == class)
        .map(|(_, _, rule)| *rule)
}

// ---------------------------------------------------------------------------
// Backcompat relations
// ---------------------------------------------------------------------------

// Deferred (spec.md GLOSSARY "Deferred property"): a rel-derived value is
// a fallback, suppressed if the item already got the same-named property
// from somewhere else (spec.md §4.D/§4.G step 5).
const REL_TABLE: &[(&str, BackcompatProperty)] = &[
    ("tag", bp!(P, "category", defer)),
    ("author", bp!(P, "author", defer)),
    ("nofollow", bp!(P, "nofollow", defer)),
];

/// Backcompat relation rule for a single `rel` token, not accounting for
/// the `rel="self bookmark"` special case (see [`self_bookmark_url`]).
pub fn backcompat_rel(token: &str) -> Option<BackcompatProperty> {
    REL_TABLE.iter().find(|(rel, _)| *rel == token).map(|(_, rule)| *rule)
}

/// `rel="self bookmark"` inside `h-review`/`h-review-aggregate` yields a
/// `u-url` property (spec.md §4.D special rule).
pub fn self_bookmark_url(rel_tokens: &[String], root_type: &str) -> bool {
    (root_type == "h-review" || root_type == "h-review-aggregate")
        && rel_tokens.iter().any(|t| t == "self")
        && rel_tokens.iter().any(|t| t == "bookmark")
}

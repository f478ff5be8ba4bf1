// Date/time mini-language — spec.md §4.C (component C).
//
// A small hand-rolled recognizer (compiled-regex-per-concern, matching the
// teacher crate's `stringify/escape.rs::NEEDS_ESCAPE` idiom of a
// `LazyLock<Regex>` per pattern) over the date/time/zone grammar spec.md
// describes, plus the `stitch_date` combination rules used by both the VCP
// extractor and the microformat walker's post-implied-date handling.
//
// Calendar arithmetic (ordinal-day → calendar date, leap-year validation)
// is delegated to `chrono` rather than hand-rolled, following the wider
// pack's convention (Pacsea, redical, rust-orgmode, view-from-nowhere all
// reach for `chrono` for date handling).

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// A recognized (possibly partial) date/time/zone record, in canonical
/// output format (spec.md §3 "date parser", §4.C).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateTimeParts {
    /// `Y-m-d`.
    pub date: Option<String>,
    /// `H:i:s`, `H:i`, or `H:00` (24-hour).
    pub time: Option<String>,
    /// `±HH:MM` (RFC 3339) or `Z`.
    pub zone: Option<String>,
}

impl DateTimeParts {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none() && self.zone.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.date.is_some() && self.time.is_some()
    }

    /// Merge a missing slot from `other` into `self` (VCP's "fill missing
    /// slots greedily, ignoring duplicates" rule, spec.md §4.E).
    pub fn merge_missing(&mut self, other: &DateTimeParts) {
        if self.date.is_none() {
            self.date = other.date.clone();
        }
        if self.time.is_none() {
            self.time = other.time.clone();
        }
        if self.zone.is_none() {
            self.zone = other.zone.clone();
        }
    }
}

/// Result of `stitch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stitched {
    /// A complete, formatted string.
    Full(String),
    /// A time-only partial awaiting a later post-implied date (VCP mode
    /// only, spec.md §4.C "VCP mode with only time and no implied date").
    Partial(DateTimeParts),
    /// Nothing could be stitched.
    None,
}

static DATE_CALENDAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static DATE_ORDINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{3})$").unwrap());
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?\s*(am|pm)?$").unwrap());
static ZONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})?$").unwrap());
static TRAILING_ZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<sign>[+-])(?P<h>\d{1,2}):?(?P<m>\d{2})?\s*$").unwrap());
static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<date>\d{4}-\d{2}-\d{2}|\d{4}-\d{3})?[T t]?(?P<time>\d{1,2}(?::\d{2})?(?::\d{2})?\s*(?:am|pm)?)?\s*(?P<zone>z|[+-]\d{2}:?\d{2})?$",
    )
    .unwrap()
});

/// Recognize a date/time/zone fragment, applying the pre-pass
/// normalizations spec.md §4.C lists, returning whichever slots were
/// present. An unrecognized fragment yields an all-`None` record.
pub fn parse(raw: &str) -> DateTimeParts {
    let s = prepass(raw);
    if s.is_empty() {
        return DateTimeParts::default();
    }
    let Some(caps) = SPLIT_RE.captures(&s) else {
        return DateTimeParts::default();
    };
    let date = caps.name("date").and_then(|m| canonical_date(m.as_str()));
    let time = caps.name("time").and_then(|m| canonical_time(m.as_str()));
    let zone = caps.name("zone").and_then(|m| canonical_zone(m.as_str()));
    if date.is_none() && time.is_none() && zone.is_none() {
        return DateTimeParts::default();
    }
    DateTimeParts { date, time, zone }
}

fn prepass(input: &str) -> String {
    let mut s = input.trim().to_string();
    s = s
        .replace("a.m.", "am")
        .replace("A.M.", "am")
        .replace("p.m.", "pm")
        .replace("P.M.", "pm")
        .replace("AM", "am")
        .replace("PM", "pm");
    s = collapse_whitespace(&s);
    normalize_trailing_zone(&s)
}

fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for c in input.trim().chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out
}

/// Pad single-digit offset hours, add `:00` minutes to hour-only offsets,
/// and convert `-00`/`-0000` to `+` form (spec.md §4.C pre-pass).
///
/// A bare calendar or ordinal date never carries a zone — spec.md §4.C's
/// date/time/zone combinations are date; date+time; date+time+zone, never
/// date+zone — so a date-only fragment is left untouched here. Without
/// this guard the date's own trailing `-DD`/`-DDD` group is indistinguishable
/// from a `±HH[:MM]` offset and gets "normalized" into a spurious zone
/// (`"2020-03-04"` → `"2020-03-0400"`, `"2020-366"` → `"2020-0366"`).
fn normalize_trailing_zone(s: &str) -> String {
    if DATE_CALENDAR.is_match(s) || DATE_ORDINAL.is_match(s) {
        return s.to_string();
    }
    let Some(caps) = TRAILING_ZONE.captures(s) else {
        return s.to_string();
    };
    let whole = caps.get(0).unwrap();
    let h: u32 = caps["h"].parse().unwrap_or(0);
    let m = caps.name("m").map(|m| m.as_str()).unwrap_or("00");
    let sign = if &caps["sign"] == "-" && h == 0 && m == "00" {
        "+"
    } else {
        &caps["sign"]
    };
    format!("{}{sign}{h:02}{m}", &s[..whole.start()])
}

fn canonical_date(raw: &str) -> Option<String> {
    if let Some(caps) = DATE_CALENDAR.captures(raw) {
        let y: i32 = caps[1].parse().ok()?;
        let m: u32 = caps[2].parse().ok()?;
        let d: u32 = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(y, m, d)?;
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Some(caps) = DATE_ORDINAL.captures(raw) {
        let y: i32 = caps[1].parse().ok()?;
        let ordinal: u32 = caps[2].parse().ok()?;
        let date = NaiveDate::from_yo_opt(y, ordinal)?;
        return Some(date.format("%Y-%m-%d").to_string());
    }
    None
}

fn canonical_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let caps = TIME_RE.captures(raw)?;
    let mut h: u32 = caps[1].parse().ok()?;
    let min = caps.get(2).map(|m| m.as_str());
    let sec = caps.get(3).map(|m| m.as_str());
    let ampm = caps.get(4).map(|m| m.as_str().to_lowercase());
    if let Some(marker) = ampm.as_deref() {
        if !(1..=12).contains(&h) {
            return None;
        }
        if marker == "pm" && h != 12 {
            h += 12;
        }
        if marker == "am" && h == 12 {
            h = 0;
        }
    }
    if h > 23 {
        return None;
    }
    match (min, sec) {
        (Some(mi), Some(se)) => Some(format!("{:02}:{:02}:{:02}", h, mi.parse::<u32>().ok()?, se.parse::<u32>().ok()?)),
        (Some(mi), None) => Some(format!("{:02}:{:02}", h, mi.parse::<u32>().ok()?)),
        (None, None) => Some(format!("{h:02}:00")),
        (None, Some(_)) => None,
    }
}

fn canonical_zone(raw: &str) -> Option<String> {
    if raw.eq_ignore_ascii_case("z") {
        return Some("Z".to_string());
    }
    let caps = ZONE_RE.captures(raw)?;
    let sign = &caps[1];
    let h: u32 = caps[2].parse().ok()?;
    let m: u32 = caps.get(3).map(|m| m.as_str()).unwrap_or("00").parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(format!("{sign}{h:02}:{m:02}"))
}

fn format_zone_for_mode(zone: &str, vcp_mode: bool) -> String {
    if vcp_mode && zone != "Z" {
        zone.replace(':', "")
    } else {
        zone.to_string()
    }
}

/// Combine a recognized record with a previously implied record, per
/// spec.md §4.C's `stitchDate` rules.
pub fn stitch(
    parts: &DateTimeParts,
    implied: Option<&DateTimeParts>,
    vcp_mode: bool,
    implied_tz: bool,
) -> Stitched {
    match (&parts.date, &parts.time, &parts.zone) {
        (Some(d), Some(t), Some(z)) => Stitched::Full(format!("{d} {t} {}", format_zone_for_mode(z, vcp_mode))),
        (Some(d), None, None) => Stitched::Full(d.clone()),
        (Some(d), Some(t), None) => {
            if implied_tz {
                if let Some(iz) = implied.and_then(|i| i.zone.as_deref()) {
                    return Stitched::Full(format!("{d} {t} {}", format_zone_for_mode(iz, vcp_mode)));
                }
            }
            Stitched::Full(format!("{d} {t}"))
        }
        (None, Some(t), maybe_zone) => {
            if let Some(implied_date) = implied.and_then(|i| i.date.as_deref()) {
                let zone = maybe_zone
                    .as_deref()
                    .or_else(|| if implied_tz { implied.and_then(|i| i.zone.as_deref()) } else { None });
                match zone {
                    Some(z) => Stitched::Full(format!("{implied_date} {t} {}", format_zone_for_mode(z, vcp_mode))),
                    None => Stitched::Full(format!("{implied_date} {t}")),
                }
            } else if vcp_mode {
                Stitched::Partial(parts.clone())
            } else {
                Stitched::None
            }
        }
        (None, None, Some(_)) => Stitched::None,
        (None, None, None) => Stitched::None,
    }
}

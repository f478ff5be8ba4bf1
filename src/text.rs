// Text extraction — spec.md §4.B (component B).
//
// Two algorithms selected by the `thorough_trim` option. Generalized from
// the teacher crate's per-tag dispatch idiom
// (`hast_to_mdast/handlers.rs::dispatch_element`) and its whitespace-run
// collapsing idiom (`hast_to_mdast/whitespace.rs`).

use markup5ever_rcdom::{Handle, NodeData};
use url::Url;

use crate::dom::{all_children, get_attr, tag_name};
use crate::prefix::Prefix;
use crate::url_resolve::resolve_url;

const ASCII_WS: [char; 5] = [' ', '\r', '\n', '\t', '\u{000C}'];

/// Extract a property-appropriate plain-text value from `handle`'s subtree.
pub fn extract(handle: &Handle, prefix: Prefix, base: &Url, thorough: bool) -> String {
    if thorough {
        extract_thorough(handle, base)
    } else {
        extract_simple(handle, prefix, base)
    }
}

// ---------------------------------------------------------------------------
// Simple
// ---------------------------------------------------------------------------

fn extract_simple(handle: &Handle, prefix: Prefix, base: &Url) -> String {
    let mut out = String::new();
    simple_collect(handle, prefix, base, &mut out);
    out.trim_matches(|c| ASCII_WS.contains(&c)).to_string()
}

fn simple_collect(handle: &Handle, prefix: Prefix, base: &Url, out: &mut String) {
    for child in all_children(handle) {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => {
                let tag = tag_name(&child).unwrap_or_default();
                match tag.as_str() {
                    "script" | "style" | "template" => {}
                    "img" => out.push_str(&simple_img_replacement(&child, prefix, base)),
                    _ => simple_collect(&child, prefix, base, out),
                }
            }
            _ => {}
        }
    }
}

fn simple_img_replacement(img: &Handle, prefix: Prefix, base: &Url) -> String {
    let alt = get_attr(img, "alt");
    match prefix {
        Prefix::U => get_attr(img, "src").unwrap_or_default(),
        Prefix::E => match alt {
            Some(a) => a,
            None => format!(" {} ", normalized_src(img, base)),
        },
        Prefix::P | Prefix::Dt => alt.unwrap_or_default(),
    }
}

fn normalized_src(img: &Handle, base: &Url) -> String {
    match get_attr(img, "src") {
        Some(src) => resolve_url(&src, base),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Thorough
// ---------------------------------------------------------------------------

fn extract_thorough(handle: &Handle, base: &Url) -> String {
    let mut raw = String::new();
    thorough_collect(handle, base, &mut raw);
    post_process_thorough(&raw)
}

fn thorough_collect(handle: &Handle, base: &Url, out: &mut String) {
    for child in all_children(handle) {
        match &child.data {
            NodeData::Text { contents } => {
                for c in contents.borrow().chars() {
                    out.push(if matches!(c, '\t' | '\n' | '\r' | '\u{000C}') { ' ' } else { c });
                }
            }
            NodeData::Element { .. } => {
                let tag = tag_name(&child).unwrap_or_default();
                match tag.as_str() {
                    "script" | "style" | "template" => {}
                    "img" => out.push_str(&thorough_img_replacement(&child, base)),
                    "br" => out.push('\n'),
                    "p" => {
                        out.push('\n');
                        thorough_collect(&child, base, out);
                    }
                    _ => thorough_collect(&child, base, out),
                }
            }
            _ => {}
        }
    }
}

fn thorough_img_replacement(img: &Handle, base: &Url) -> String {
    match get_attr(img, "alt") {
        Some(alt) => format!(" {alt} "),
        None => format!(" {} ", normalized_src(img, base)),
    }
}

fn post_process_thorough(input: &str) -> String {
    let no_edge_ws = strip_horizontal_ws_around_newlines(input);
    let trimmed = no_edge_ws.trim();
    collapse_spaces(trimmed)
}

fn strip_horizontal_ws_around_newlines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            while matches!(out.chars().last(), Some(' ') | Some('\t')) {
                out.pop();
            }
            out.push('\n');
            while matches!(chars.peek(), Some(' ') | Some('\t')) {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn collapse_spaces(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for c in input.chars() {
        if c == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

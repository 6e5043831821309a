// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

use super::scan::{scan_literal, scan_number, scan_squash, scan_string};
use super::text::into_string;

// Nesting ceiling; anything deeper is emitted compact as-is.
const MAX_DEPTH: usize = 500;

pub(crate) struct Style {
    pub indent: String,
    pub prefix: String,
    pub sort_keys: bool,
    // column budget for single-line arrays, 0 disables them
    pub width: usize,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            indent: "  ".to_string(),
            prefix: String::new(),
            sort_keys: false,
            width: 80,
        }
    }
}

pub(crate) fn pretty(json: &str) -> String {
    pretty_with(json, &Style::default())
}

pub(crate) fn pretty_with(json: &str, style: &Style) -> String {
    let jb = json.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(jb.len() * 2);
    out.extend_from_slice(style.prefix.as_bytes());
    write_value(&mut out, jb, 0, 0, style, 0);
    if !out.is_empty() {
        out.push(b'\n');
    }
    into_string(out)
}

/// Strips insignificant whitespace, leaving the shortest equivalent text.
pub(crate) fn ugly(json: &str) -> String {
    let jb = json.as_bytes();
    let mut out = Vec::with_capacity(jb.len());
    let mut i = 0;
    while i < jb.len() {
        if jb[i] > b' ' {
            if jb[i] == b'"' {
                let (ni, raw, _, _) = scan_string(jb, i);
                out.extend_from_slice(raw);
                i = ni;
                continue;
            }
            out.push(jb[i]);
        }
        i += 1;
    }
    into_string(out)
}

// Emits the next value token; returns the cursor past it.
fn write_value(
    out: &mut Vec<u8>,
    json: &[u8],
    mut i: usize,
    depth: usize,
    style: &Style,
    tabs: usize,
) -> usize {
    while i < json.len() {
        let c = json[i];
        if c <= b' ' {
            i += 1;
            continue;
        }
        return match c {
            b'"' => {
                let (ni, raw, _, _) = scan_string(json, i);
                out.extend_from_slice(raw);
                ni
            }
            b'{' | b'[' => write_block(out, json, i, depth, style, tabs),
            b't' | b'f' | b'n' => {
                let (ni, raw) = scan_literal(json, i);
                out.extend_from_slice(raw);
                ni
            }
            _ => {
                let (ni, raw) = scan_number(json, i);
                out.extend_from_slice(raw);
                ni
            }
        };
    }
    i
}

fn write_tabs(out: &mut Vec<u8>, style: &Style, tabs: usize) {
    out.extend_from_slice(style.prefix.as_bytes());
    for _ in 0..tabs {
        out.extend_from_slice(style.indent.as_bytes());
    }
}

fn line_column(out: &[u8]) -> usize {
    match out.iter().rposition(|&c| c == b'\n') {
        Some(p) => out.len() - p - 1,
        None => out.len(),
    }
}

fn write_block(
    out: &mut Vec<u8>,
    json: &[u8],
    i: usize,
    depth: usize,
    style: &Style,
    tabs: usize,
) -> usize {
    let open = json[i];
    let close = if open == b'{' { b'}' } else { b']' };
    if depth == MAX_DEPTH {
        let (ni, raw) = scan_squash(json, i);
        let flat = ugly(super::scan::as_str(raw));
        out.extend_from_slice(flat.as_bytes());
        return ni;
    }
    if open == b'[' && style.width > 0 {
        let budget = style.width.saturating_sub(line_column(out));
        if budget > 3 {
            let mark = out.len();
            if let Some(ni) = write_inline(out, json, i, mark, budget) {
                return ni;
            }
            out.truncate(mark);
        }
    }
    if open == b'{' && style.sort_keys {
        return write_sorted_object(out, json, i, depth, style, tabs);
    }
    out.push(open);
    let mut j = i + 1;
    let mut n = 0;
    while j < json.len() {
        let c = json[j];
        if c <= b' ' || c == b',' || c == b':' {
            j += 1;
            continue;
        }
        if c == close {
            j += 1;
            break;
        }
        if n > 0 {
            out.push(b',');
        }
        out.push(b'\n');
        write_tabs(out, style, tabs + 1);
        if open == b'{' {
            if c != b'"' {
                j += 1;
                continue;
            }
            let (nj, kraw, _, ok) = scan_string(json, j);
            out.extend_from_slice(kraw);
            out.extend_from_slice(b": ");
            j = nj;
            if !ok {
                break;
            }
            while j < json.len() && (json[j] <= b' ' || json[j] == b':') {
                j += 1;
            }
            if j >= json.len() {
                break;
            }
        }
        j = write_value(out, json, j, depth + 1, style, tabs + 1);
        n += 1;
    }
    if n > 0 {
        out.push(b'\n');
        write_tabs(out, style, tabs);
    }
    out.push(close);
    j
}

// Members are re-emitted in key order; the sort is stable so duplicate keys
// keep their source order.
fn write_sorted_object(
    out: &mut Vec<u8>,
    json: &[u8],
    i: usize,
    depth: usize,
    style: &Style,
    tabs: usize,
) -> usize {
    let mut pairs: Vec<(&[u8], &[u8])> = Vec::new();
    let mut j = i + 1;
    let mut end = json.len();
    while j < json.len() {
        let c = json[j];
        if c <= b' ' || c == b',' || c == b':' {
            j += 1;
            continue;
        }
        if c == b'}' {
            end = j + 1;
            break;
        }
        if c != b'"' {
            j += 1;
            continue;
        }
        let (nj, kraw, _, ok) = scan_string(json, j);
        j = nj;
        if !ok {
            end = j;
            break;
        }
        while j < json.len() && (json[j] <= b' ' || json[j] == b':') {
            j += 1;
        }
        if j >= json.len() {
            end = j;
            break;
        }
        let s = j;
        j = match json[j] {
            b'"' => scan_string(json, j).0,
            b'{' | b'[' => scan_squash(json, j).0,
            b't' | b'f' | b'n' => scan_literal(json, j).0,
            _ => scan_number(json, j).0,
        };
        pairs.push((kraw, &json[s..j]));
    }
    pairs.sort_by(|a, b| a.0[1..a.0.len() - 1].cmp(&b.0[1..b.0.len() - 1]));
    out.push(b'{');
    for (n, (kraw, vraw)) in pairs.iter().enumerate() {
        if n > 0 {
            out.push(b',');
        }
        out.push(b'\n');
        write_tabs(out, style, tabs + 1);
        out.extend_from_slice(kraw);
        out.extend_from_slice(b": ");
        write_value(out, vraw, 0, depth + 1, style, tabs + 1);
    }
    if !pairs.is_empty() {
        out.push(b'\n');
        write_tabs(out, style, tabs);
    }
    out.push(b'}');
    end
}

// Best-effort single-line array: plain values and nested arrays joined by
// ", ". Objects or a blown budget abort the attempt.
fn write_inline(
    out: &mut Vec<u8>,
    json: &[u8],
    i: usize,
    mark: usize,
    budget: usize,
) -> Option<usize> {
    out.push(b'[');
    let mut j = i + 1;
    let mut n = 0;
    while j < json.len() {
        let c = json[j];
        if c <= b' ' || c == b',' {
            j += 1;
            continue;
        }
        if c == b']' {
            out.push(b']');
            if out.len() - mark > budget {
                return None;
            }
            return Some(j + 1);
        }
        if c == b'{' {
            return None;
        }
        if n > 0 {
            out.extend_from_slice(b", ");
        }
        j = match c {
            b'[' => write_inline(out, json, j, mark, budget)?,
            b'"' => {
                let (nj, raw, _, _) = scan_string(json, j);
                out.extend_from_slice(raw);
                nj
            }
            b't' | b'f' | b'n' => {
                let (nj, raw) = scan_literal(json, j);
                out.extend_from_slice(raw);
                nj
            }
            _ => {
                let (nj, raw) = scan_number(json, j);
                out.extend_from_slice(raw);
                nj
            }
        };
        if out.len() - mark > budget {
            return None;
        }
        n += 1;
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    const UGLY: &str = r#"{"name":{"last":"Sanders","first":"Janet"},"children":["Andy","Carol","Mike"],"values":[10.10,true,false,null,{"a":"b"},[]],"empty":{}}"#;

    #[test]
    fn basic() {
        let expect = r#"{
  "name": {
    "last": "Sanders",
    "first": "Janet"
  },
  "children": ["Andy", "Carol", "Mike"],
  "values": [
    10.10,
    true,
    false,
    null,
    {
      "a": "b"
    },
    []
  ],
  "empty": {}
}
"#;
        assert_eq!(pretty(UGLY), expect);
    }

    #[test]
    fn round_trip() {
        assert_eq!(ugly(&pretty(UGLY)), UGLY);
    }

    #[test]
    fn sorted_and_styled() {
        let style = Style {
            indent: "\t".to_string(),
            prefix: String::new(),
            sort_keys: true,
            width: 0,
        };
        let out = pretty_with(r#"{"b":[1,2],"a":{"z":1,"y":2}}"#, &style);
        let expect = "{\n\t\"a\": {\n\t\t\"y\": 2,\n\t\t\"z\": 1\n\t},\n\t\"b\": [\n\t\t1,\n\t\t2\n\t]\n}\n";
        assert_eq!(out, expect);
    }

    #[test]
    fn prefixed() {
        let style = Style {
            prefix: "> ".to_string(),
            width: 0,
            ..Style::default()
        };
        let out = pretty_with(r#"{"a":1}"#, &style);
        assert_eq!(out, "> {\n>   \"a\": 1\n> }\n");
    }

    #[test]
    fn depth_guard() {
        let mut deep = String::new();
        for _ in 0..600 {
            deep.push('[');
        }
        deep.push('1');
        for _ in 0..600 {
            deep.push(']');
        }
        // must terminate and stay balanced
        let out = pretty_with(&deep, &Style { width: 0, ..Style::default() });
        assert_eq!(out.matches('[').count(), out.matches(']').count());
    }
}

// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

use super::text::{append_json_string, into_string};
use super::{get, into_owned, valid, Value};

struct Sel<'a> {
    name: &'a str,
    path: &'a str,
}

// Splits the comma-separated selectors of a leading '[...]' or '{...}'
// multipath. Selector names come from an explicit `name:` prefix; modifier
// arguments, nested brackets and quoted strings are crossed intact.
// Returns the selectors and the path remainder after the closing bracket.
fn parse_selectors(path: &str) -> Option<(Vec<Sel<'_>>, &str)> {
    let pb = path.as_bytes();
    let mut sels = Vec::new();
    let mut depth = 1;
    let mut colon = 0;
    let mut modifier = 0;
    let mut start = 1;
    let mut i = 1;
    while i < pb.len() {
        match pb[i] {
            b'\\' => i += 1,
            b'@' => {
                if modifier == 0 && i > 0 && (pb[i - 1] == b'.' || pb[i - 1] == b'|') {
                    modifier = i;
                }
            }
            b':' => {
                if modifier == 0 && colon == 0 && depth == 1 {
                    colon = i;
                }
            }
            b',' => {
                if depth == 1 {
                    push_sel(path, &mut sels, &mut colon, &mut modifier, &mut start, i);
                }
            }
            b'"' => {
                i += 1;
                while i < pb.len() {
                    match pb[i] {
                        b'\\' => i += 1,
                        b'"' => break,
                        _ => {}
                    }
                    i += 1;
                }
            }
            b'[' | b'(' | b'{' => depth += 1,
            b']' | b')' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    push_sel(path, &mut sels, &mut colon, &mut modifier, &mut start, i);
                    return Some((sels, &path[i + 1..]));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn push_sel<'a>(
    path: &'a str,
    sels: &mut Vec<Sel<'a>>,
    colon: &mut usize,
    modifier: &mut usize,
    start: &mut usize,
    i: usize,
) {
    let sel = if *colon == 0 {
        Sel {
            name: "",
            path: &path[*start..i],
        }
    } else {
        Sel {
            name: &path[*start..*colon],
            path: &path[*colon + 1..i],
        }
    };
    sels.push(sel);
    *colon = 0;
    *modifier = 0;
    *start = i + 1;
}

fn name_of_last(path: &str) -> &str {
    let pb = path.as_bytes();
    for i in (0..pb.len()).rev() {
        if pb[i] == b'|' || pb[i] == b'.' {
            if i > 0 && pb[i - 1] == b'\\' {
                continue;
            }
            return &path[i + 1..];
        }
    }
    path
}

fn is_simple_name(component: &str) -> bool {
    component.bytes().all(|c| {
        c >= b' '
            && !matches!(
                c,
                b'[' | b']' | b'{' | b'}' | b'(' | b')' | b'#' | b'|' | b'!'
            )
    })
}

// Builds a fresh JSON array or object out of sub-path results. Missing
// sub-paths are skipped. Object keys fall back to the last path component
// when no name is given, or "_" when that is not a simple name.
pub(crate) fn exec<'a>(json: &'a str, path: &'a str) -> Option<Value<'a>> {
    let kind = path.as_bytes()[0];
    let (sels, rest) = parse_selectors(path)?;
    let rb = rest.as_bytes();
    if !(rb.is_empty() || rb[0] == b'|' || rb[0] == b'.') {
        return None;
    }
    let mut out: Vec<u8> = Vec::new();
    out.push(kind);
    let mut n = 0;
    for sel in &sels {
        let res = get(json, sel.path);
        if !res.exists() {
            continue;
        }
        if n > 0 {
            out.push(b',');
        }
        if kind == b'{' {
            if !sel.name.is_empty() {
                if sel.name.as_bytes()[0] == b'"' && valid(sel.name) {
                    out.extend_from_slice(sel.name.as_bytes());
                } else {
                    append_json_string(&mut out, sel.name);
                }
            } else {
                let last = name_of_last(sel.path);
                if is_simple_name(last) {
                    append_json_string(&mut out, last);
                } else {
                    append_json_string(&mut out, "_");
                }
            }
            out.push(b':');
        }
        let raw = res.raw();
        if raw.is_empty() {
            let s = res.string();
            if s.is_empty() {
                out.extend_from_slice(b"null");
            } else {
                out.extend_from_slice(s.as_bytes());
            }
        } else {
            out.extend_from_slice(raw.as_bytes());
        }
        n += 1;
    }
    out.push(if kind == b'{' { b'}' } else { b']' });
    let mut res = Value::owned_json(into_string(out), None);
    if !rb.is_empty() {
        res = into_owned(res.get(&rest[1..]));
    }
    res.index = None;
    Some(res)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn selectors() {
        let (sels, rest) = parse_selectors(r#"[name.first,age]"#).unwrap();
        assert_eq!(sels.len(), 2);
        assert_eq!((sels[0].name, sels[0].path), ("", "name.first"));
        assert_eq!((sels[1].name, sels[1].path), ("", "age"));
        assert_eq!(rest, "");

        let (sels, rest) = parse_selectors(r#"{"n":name.first,a:age}.x"#).unwrap();
        assert_eq!((sels[0].name, sels[0].path), (r#""n""#, "name.first"));
        assert_eq!((sels[1].name, sels[1].path), ("a", "age"));
        assert_eq!(rest, ".x");

        // a nested query comma stays inside its selector
        let (sels, _) = parse_selectors(r#"[friends.#(age>40)#,age]"#).unwrap();
        assert_eq!(sels[0].path, "friends.#(age>40)#");
        assert_eq!(sels[1].path, "age");

        assert!(parse_selectors("[no.closer").is_none());
    }

    #[test]
    fn names() {
        assert_eq!(name_of_last("a.b.last"), "last");
        assert_eq!(name_of_last(r"a.fav\.movie"), r"fav\.movie");
        assert_eq!(name_of_last("plain"), "plain");
        assert!(is_simple_name("last"));
        assert!(!is_simple_name("x|y"));
        assert!(!is_simple_name("q#"));
    }
}
